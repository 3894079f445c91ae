// Scorecards derived from ball history, and the per-ball stat crediting
// shared by live recording and replay.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ball::{BallEvent, ExtraKind, WicketKind};
use super::innings::{FallOfWicket, InningsState, Partnership};
use super::match_state::Match;
use super::overs::Overs;
use super::player::{PlayerId, PlayerStats, Team, TeamId};

// ---------------------------------------------------------------------------
// Stat crediting
// ---------------------------------------------------------------------------

/// Credit a delivery to the striker's cumulative figures.
pub fn credit_batter(ball: &BallEvent, stats: &mut PlayerStats) {
    stats.runs += ball.runs_scored;
    if ball.faced_by_batter() {
        stats.balls_faced += 1;
    }
    if ball.is_boundary_four() {
        stats.fours += 1;
    } else if ball.is_boundary_six() {
        stats.sixes += 1;
    }
}

/// Credit a delivery to the bowler's cumulative figures.
pub fn credit_bowler(ball: &BallEvent, stats: &mut PlayerStats) {
    stats.runs_conceded += ball.bowler_runs();
    if ball.credits_bowler_wicket() {
        stats.wickets += 1;
    }
    if ball.is_valid_ball {
        stats.overs_bowled.add_ball();
    }
}

/// Rebuild every rostered player's stats from all recorded ball histories.
/// Produces the same figures as committing each ball as it was recorded.
pub fn replay_player_stats(teams: &mut [Team], matches: &[Match]) {
    let mut totals: HashMap<PlayerId, PlayerStats> = HashMap::new();
    for m in matches {
        for innings in m.innings() {
            for ball in &innings.balls {
                credit_batter(ball, totals.entry(ball.batter_id.clone()).or_default());
                credit_bowler(ball, totals.entry(ball.bowler_id.clone()).or_default());
            }
        }
    }
    for team in teams.iter_mut() {
        for player in &mut team.players {
            player.stats = totals.remove(&player.id).unwrap_or_default();
        }
    }
}

// ---------------------------------------------------------------------------
// Innings card
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattingFigures {
    pub player_id: PlayerId,
    pub runs: u32,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    /// How the batter was dismissed; `None` while not out.
    pub dismissal: Option<WicketKind>,
}

impl BattingFigures {
    fn new(player_id: &str) -> Self {
        BattingFigures {
            player_id: player_id.to_string(),
            runs: 0,
            balls: 0,
            fours: 0,
            sixes: 0,
            dismissal: None,
        }
    }

    pub fn is_out(&self) -> bool {
        self.dismissal.is_some()
    }

    pub fn strike_rate(&self) -> f64 {
        if self.balls == 0 {
            return 0.0;
        }
        f64::from(self.runs) * 100.0 / f64::from(self.balls)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowlingFigures {
    pub player_id: PlayerId,
    pub overs: Overs,
    pub runs_conceded: u32,
    /// Wickets credited to the bowler (run-outs excluded).
    pub wickets: u32,
    pub wides: u32,
    pub no_balls: u32,
}

impl BowlingFigures {
    fn new(player_id: &str) -> Self {
        BowlingFigures {
            player_id: player_id.to_string(),
            overs: Overs::ZERO,
            runs_conceded: 0,
            wickets: 0,
            wides: 0,
            no_balls: 0,
        }
    }

    pub fn economy(&self) -> f64 {
        if self.overs.balls() == 0 {
            return 0.0;
        }
        f64::from(self.runs_conceded) / self.overs.true_overs()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrasBreakdown {
    pub wides: u32,
    pub no_balls: u32,
    pub byes: u32,
    pub leg_byes: u32,
}

impl ExtrasBreakdown {
    pub fn total(&self) -> u32 {
        self.wides + self.no_balls + self.byes + self.leg_byes
    }
}

/// Full card for one innings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InningsCard {
    pub number: u8,
    pub batting_team_id: TeamId,
    pub bowling_team_id: TeamId,
    pub runs: u32,
    pub wickets: u32,
    pub overs: Overs,
    pub run_rate: f64,
    pub extras: ExtrasBreakdown,
    /// In batting order.
    pub batting: Vec<BattingFigures>,
    /// In order of first ball bowled.
    pub bowling: Vec<BowlingFigures>,
    pub fall_of_wickets: Vec<FallOfWicket>,
    pub partnership: Partnership,
}

/// Build the card for an innings from its history.
pub fn innings_card(innings: &InningsState) -> InningsCard {
    let mut batting: Vec<BattingFigures> = innings
        .batting_order
        .iter()
        .map(|id| BattingFigures::new(id))
        .collect();
    let mut bowling: Vec<BowlingFigures> = Vec::new();
    let mut extras = ExtrasBreakdown::default();

    for ball in &innings.balls {
        let batter = figures_for(&mut batting, &ball.batter_id, BattingFigures::new);
        batter.runs += ball.runs_scored;
        if ball.faced_by_batter() {
            batter.balls += 1;
        }
        if ball.is_boundary_four() {
            batter.fours += 1;
        } else if ball.is_boundary_six() {
            batter.sixes += 1;
        }

        let bowler = figures_for(&mut bowling, &ball.bowler_id, BowlingFigures::new);
        bowler.runs_conceded += ball.bowler_runs();
        if ball.credits_bowler_wicket() {
            bowler.wickets += 1;
        }
        if ball.is_valid_ball {
            bowler.overs.add_ball();
        }

        match ball.extra_kind {
            ExtraKind::Wide => {
                bowler.wides += 1;
                extras.wides += ball.extras;
            }
            ExtraKind::NoBall => {
                bowler.no_balls += 1;
                extras.no_balls += ball.extras;
            }
            ExtraKind::Bye => extras.byes += ball.extras,
            ExtraKind::LegBye => extras.leg_byes += ball.extras,
            ExtraKind::None => {}
        }

        if let (Some(victim), Some(kind)) = (&ball.dismissed_player_id, ball.wicket_kind) {
            figures_for(&mut batting, victim, BattingFigures::new).dismissal = Some(kind);
        }
    }

    InningsCard {
        number: innings.number,
        batting_team_id: innings.batting_team_id.clone(),
        bowling_team_id: innings.bowling_team_id.clone(),
        runs: innings.runs,
        wickets: innings.wickets,
        overs: innings.overs,
        run_rate: innings.run_rate(),
        extras,
        batting,
        bowling,
        fall_of_wickets: innings.fall_of_wickets.clone(),
        partnership: innings.partnership.clone(),
    }
}

trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for BattingFigures {
    fn key(&self) -> &str {
        &self.player_id
    }
}

impl Keyed for BowlingFigures {
    fn key(&self) -> &str {
        &self.player_id
    }
}

fn figures_for<'a, T: Keyed>(rows: &'a mut Vec<T>, id: &str, make: fn(&str) -> T) -> &'a mut T {
    let idx = match rows.iter().position(|r| r.key() == id) {
        Some(idx) => idx,
        None => {
            rows.push(make(id));
            rows.len() - 1
        }
    };
    &mut rows[idx]
}
