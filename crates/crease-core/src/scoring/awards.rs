// Man-of-the-match: a points heuristic over each participant's figures in
// the match.

use super::innings::InningsState;
use super::player::PlayerId;
use super::scorecard::innings_card;

/// Minimum balls faced before strike-rate bonuses apply.
const MIN_BALLS_FOR_STRIKE_RATE: u32 = 6;
/// Minimum legal balls bowled (one over) before economy bands apply.
const MIN_BALLS_FOR_ECONOMY: u32 = 6;

/// A player's combined figures across both innings of one match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Performance {
    pub player_id: PlayerId,
    pub runs: u32,
    pub balls_faced: u32,
    pub fours: u32,
    pub sixes: u32,
    pub wickets: u32,
    pub balls_bowled: u32,
    pub runs_conceded: u32,
}

impl Performance {
    fn new(player_id: &str) -> Self {
        Performance {
            player_id: player_id.to_string(),
            ..Default::default()
        }
    }

    pub fn strike_rate(&self) -> f64 {
        if self.balls_faced == 0 {
            return 0.0;
        }
        f64::from(self.runs) * 100.0 / f64::from(self.balls_faced)
    }

    pub fn economy(&self) -> f64 {
        if self.balls_bowled == 0 {
            return 0.0;
        }
        f64::from(self.runs_conceded) * 6.0 / f64::from(self.balls_bowled)
    }
}

/// Points for one performance.
pub fn performance_points(p: &Performance) -> i32 {
    let mut points = p.runs as i32;

    if p.balls_faced >= MIN_BALLS_FOR_STRIKE_RATE {
        let sr = p.strike_rate();
        points += if sr >= 200.0 {
            15
        } else if sr >= 150.0 {
            10
        } else if sr >= 120.0 {
            5
        } else {
            0
        };
    }
    points += p.fours as i32;
    points += 2 * p.sixes as i32;
    if p.runs >= 50 {
        points += 10;
    } else if p.runs >= 30 {
        points += 5;
    }

    points += 25 * p.wickets as i32;
    if p.wickets >= 3 {
        points += 15;
    } else if p.wickets >= 2 {
        points += 5;
    }

    if p.balls_bowled >= MIN_BALLS_FOR_ECONOMY {
        let economy = p.economy();
        points += if economy <= 4.0 {
            15
        } else if economy <= 6.0 {
            10
        } else if economy <= 8.0 {
            5
        } else if economy >= 12.0 {
            -5
        } else {
            0
        };
    }
    points
}

/// Everyone who batted or bowled, in first-encountered order: each innings'
/// batting order, then its bowlers by first ball.
pub fn performances(innings: &[&InningsState]) -> Vec<Performance> {
    let mut lines: Vec<Performance> = Vec::new();
    for inn in innings {
        let card = innings_card(inn);
        for bat in &card.batting {
            let line = line_for(&mut lines, &bat.player_id);
            line.runs += bat.runs;
            line.balls_faced += bat.balls;
            line.fours += bat.fours;
            line.sixes += bat.sixes;
        }
        for bowl in &card.bowling {
            let line = line_for(&mut lines, &bowl.player_id);
            line.wickets += bowl.wickets;
            line.balls_bowled += bowl.overs.balls();
            line.runs_conceded += bowl.runs_conceded;
        }
    }
    lines
}

fn line_for<'a>(lines: &'a mut Vec<Performance>, player_id: &str) -> &'a mut Performance {
    let idx = match lines.iter().position(|l| l.player_id == player_id) {
        Some(idx) => idx,
        None => {
            lines.push(Performance::new(player_id));
            lines.len() - 1
        }
    };
    &mut lines[idx]
}

/// Highest-scoring participant; ties go to whoever was encountered first.
pub fn man_of_the_match(innings: &[&InningsState]) -> Option<PlayerId> {
    let mut best: Option<(i32, PlayerId)> = None;
    for p in performances(innings) {
        let points = performance_points(&p);
        if best.as_ref().map_or(true, |(top, _)| points > *top) {
            best = Some((points, p.player_id));
        }
    }
    best.map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perf() -> Performance {
        Performance::new("p")
    }

    #[test]
    fn batting_bands() {
        // 52 off 24: SR 216 => +15, 50+ => +10, 6 fours, 2 sixes.
        let p = Performance {
            runs: 52,
            balls_faced: 24,
            fours: 6,
            sixes: 2,
            ..perf()
        };
        assert_eq!(performance_points(&p), 52 + 15 + 10 + 6 + 4);
    }

    #[test]
    fn strike_rate_needs_six_balls() {
        let p = Performance {
            runs: 12,
            balls_faced: 2,
            sixes: 2,
            ..perf()
        };
        assert_eq!(performance_points(&p), 12 + 4);
    }

    #[test]
    fn bowling_bands() {
        // 3 for 18 in 4 overs: economy 4.5 => +10.
        let p = Performance {
            wickets: 3,
            balls_bowled: 24,
            runs_conceded: 18,
            ..perf()
        };
        assert_eq!(performance_points(&p), 75 + 15 + 10);

        let expensive = Performance {
            balls_bowled: 12,
            runs_conceded: 26,
            ..perf()
        };
        assert_eq!(performance_points(&expensive), -5);
    }

    #[test]
    fn economy_needs_a_full_over() {
        let p = Performance {
            balls_bowled: 5,
            runs_conceded: 0,
            ..perf()
        };
        assert_eq!(performance_points(&p), 0);
    }

    #[test]
    fn no_participants_no_award() {
        assert_eq!(man_of_the_match(&[]), None);
    }
}
