// Tournament ledger: folds completed and abandoned matches into team stats.
//
// Standings are always rebuilt from scratch, so every match is counted
// exactly once and a match reopened by undo drops out cleanly.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scoring::innings::InningsState;
use crate::scoring::match_state::{KnockoutStage, Match, MatchPhase};
use crate::scoring::overs::Overs;
use crate::scoring::player::{Team, TeamStats};

use super::nrr::net_run_rate;

pub const GROUP_WIN_POINTS: u32 = 10;
pub const GROUP_LOSS_POINTS: u32 = 0;
pub const SEMIFINAL_WIN_POINTS: u32 = 8;
pub const SEMIFINAL_LOSS_POINTS: u32 = 3;
pub const FINAL_WIN_POINTS: u32 = 10;
pub const FINAL_LOSS_POINTS: u32 = 6;
pub const TIE_POINTS: u32 = 5;
pub const ABANDONED_POINTS: u32 = 5;

/// Points for (winner, loser) at a stage.
pub fn result_points(stage: Option<KnockoutStage>) -> (u32, u32) {
    match stage {
        None => (GROUP_WIN_POINTS, GROUP_LOSS_POINTS),
        Some(KnockoutStage::Semifinal) => (SEMIFINAL_WIN_POINTS, SEMIFINAL_LOSS_POINTS),
        Some(KnockoutStage::Final) => (FINAL_WIN_POINTS, FINAL_LOSS_POINTS),
    }
}

/// Other sports played alongside the cricket, whose knockout losers earn
/// bonus points toward the overall table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnockoutSport {
    Badminton,
    TableTennis,
    Chess,
    Carrom,
}

/// Bonus for the losing side of a knockout in another sport.
pub fn knockout_bonus(sport: KnockoutSport, stage: KnockoutStage) -> u32 {
    match (sport, stage) {
        (KnockoutSport::Badminton | KnockoutSport::TableTennis, KnockoutStage::Semifinal) => 3,
        (KnockoutSport::Badminton | KnockoutSport::TableTennis, KnockoutStage::Final) => 5,
        (KnockoutSport::Chess | KnockoutSport::Carrom, KnockoutStage::Semifinal) => 2,
        (KnockoutSport::Chess | KnockoutSport::Carrom, KnockoutStage::Final) => 4,
    }
}

/// Reset every team's stats and fold all finished matches back in.
pub fn recompute_standings(teams: &mut [Team], matches: &[Match]) {
    for team in teams.iter_mut() {
        team.stats = TeamStats::default();
    }
    for m in matches {
        apply_match(teams, m);
    }
    for team in teams.iter_mut() {
        let s = &mut team.stats;
        s.net_run_rate = net_run_rate(
            s.total_runs_scored,
            s.total_overs_faced,
            s.total_runs_conceded,
            s.total_overs_bowled,
        );
    }
}

fn apply_match(teams: &mut [Team], m: &Match) {
    match &m.phase {
        MatchPhase::Completed {
            first: Some(first),
            second: Some(second),
            result,
            ..
        } => {
            for team_id in [&m.team_a_id, &m.team_b_id] {
                if let Some(stats) = stats_mut(teams, team_id) {
                    stats.played += 1;
                }
            }
            add_innings_totals(teams, first, m.total_overs);
            add_innings_totals(teams, second, m.total_overs);

            match &result.winner_id {
                Some(winner) => {
                    let loser = if *winner == m.team_a_id { &m.team_b_id } else { &m.team_a_id };
                    let (win_points, loss_points) = result_points(m.knockout_stage);
                    if let Some(stats) = stats_mut(teams, winner) {
                        stats.won += 1;
                        stats.points += win_points;
                    }
                    if let Some(stats) = stats_mut(teams, loser) {
                        stats.lost += 1;
                        stats.points += loss_points;
                    }
                }
                None => {
                    for team_id in [&m.team_a_id, &m.team_b_id] {
                        if let Some(stats) = stats_mut(teams, team_id) {
                            stats.tied += 1;
                            stats.points += TIE_POINTS;
                        }
                    }
                }
            }
            debug!("ledger: folded {} ({})", m.id, result.message);
        }
        MatchPhase::Abandoned { .. } => {
            for team_id in [&m.team_a_id, &m.team_b_id] {
                if let Some(stats) = stats_mut(teams, team_id) {
                    stats.played += 1;
                    stats.points += ABANDONED_POINTS;
                }
            }
            debug!("ledger: folded abandoned {}", m.id);
        }
        // Not finished, or finished without a chase.
        _ => {}
    }
}

/// Credit an innings to both sides. A side bowled out is charged the full
/// quota of overs.
fn add_innings_totals(teams: &mut [Team], innings: &InningsState, total_overs: u32) {
    let overs = if innings.is_all_out() {
        Overs::from_whole(total_overs)
    } else {
        innings.overs
    };
    if let Some(stats) = stats_mut(teams, &innings.batting_team_id) {
        stats.total_runs_scored = stats.total_runs_scored.saturating_add(innings.runs);
        stats.total_overs_faced = stats.total_overs_faced + overs;
    }
    if let Some(stats) = stats_mut(teams, &innings.bowling_team_id) {
        stats.total_runs_conceded = stats.total_runs_conceded.saturating_add(innings.runs);
        stats.total_overs_bowled = stats.total_overs_bowled + overs;
    }
}

fn stats_mut<'a>(teams: &'a mut [Team], team_id: &str) -> Option<&'a mut TeamStats> {
    teams.iter_mut().find(|t| t.id == team_id).map(|t| &mut t.stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::match_state::{MatchResult, TossDecision, TossResult};
    use crate::scoring::player::Group;
    use chrono::NaiveDate;

    fn teams() -> Vec<Team> {
        vec![
            Team::new("t1", "Falcons", Group::A),
            Team::new("t2", "Herons", Group::A),
        ]
    }

    fn innings(number: u8, batting: &str, bowling: &str, runs: u32, wickets: u32, balls: u32) -> InningsState {
        let mut inn = InningsState::new(number, batting, bowling, "x1", "x2", "y1");
        inn.runs = runs;
        inn.wickets = wickets;
        inn.overs = Overs::from_balls(balls);
        inn
    }

    fn completed(stage: Option<KnockoutStage>, first: InningsState, second: InningsState, winner: Option<&str>) -> Match {
        let mut m = Match::new(
            "match_1",
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            "t1",
            "t2",
            10,
            stage,
        );
        m.phase = MatchPhase::Completed {
            toss: Some(TossResult {
                winner_id: "t1".into(),
                decision: TossDecision::Bat,
            }),
            first: Some(first),
            second: Some(second),
            result: MatchResult {
                winner_id: winner.map(str::to_string),
                message: String::new(),
                man_of_the_match_id: None,
            },
            closed_by_ball: true,
        };
        m
    }

    #[test]
    fn group_win_and_nrr() {
        let mut teams = teams();
        let m = completed(
            None,
            innings(1, "t1", "t2", 120, 4, 60),
            innings(2, "t2", "t1", 100, 6, 60),
            Some("t1"),
        );
        recompute_standings(&mut teams, &[m]);
        let (a, b) = (&teams[0].stats, &teams[1].stats);
        assert_eq!((a.played, a.won, a.points), (1, 1, 10));
        assert_eq!((b.played, b.lost, b.points), (1, 1, 0));
        assert_eq!(a.net_run_rate, 2.0);
        assert_eq!(b.net_run_rate, -2.0);
    }

    #[test]
    fn all_out_counts_full_overs() {
        let mut teams = teams();
        let m = completed(
            None,
            innings(1, "t1", "t2", 150, 5, 60),
            innings(2, "t2", "t1", 50, 10, 30),
            Some("t1"),
        );
        recompute_standings(&mut teams, &[m]);
        assert_eq!(teams[1].stats.total_overs_faced, Overs::from_whole(10));
        assert_eq!(teams[0].stats.total_overs_bowled, Overs::from_whole(10));
    }

    #[test]
    fn knockout_and_tie_points() {
        let mut teams = teams();
        let semi = completed(
            Some(KnockoutStage::Semifinal),
            innings(1, "t1", "t2", 80, 2, 60),
            innings(2, "t2", "t1", 81, 3, 50),
            Some("t2"),
        );
        let tie = completed(
            Some(KnockoutStage::Final),
            innings(1, "t1", "t2", 80, 2, 60),
            innings(2, "t2", "t1", 80, 3, 60),
            None,
        );
        recompute_standings(&mut teams, &[semi, tie]);
        assert_eq!(teams[0].stats.points, 3 + 5);
        assert_eq!(teams[1].stats.points, 8 + 5);
        assert_eq!(teams[0].stats.tied, 1);
    }

    #[test]
    fn abandoned_shares_points_without_totals() {
        let mut teams = teams();
        let mut m = completed(
            None,
            innings(1, "t1", "t2", 80, 2, 60),
            innings(2, "t2", "t1", 81, 3, 50),
            Some("t2"),
        );
        m.phase = MatchPhase::Abandoned {
            toss: None,
            first: None,
            second: None,
            reason: "rain".into(),
        };
        recompute_standings(&mut teams, &[m]);
        for team in &teams {
            assert_eq!((team.stats.played, team.stats.points), (1, ABANDONED_POINTS));
            assert_eq!(team.stats.won + team.stats.lost + team.stats.tied, 0);
            assert_eq!(team.stats.total_runs_scored, 0);
        }
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut teams = teams();
        let m = completed(
            None,
            innings(1, "t1", "t2", 120, 4, 60),
            innings(2, "t2", "t1", 100, 6, 60),
            Some("t1"),
        );
        let matches = vec![m];
        recompute_standings(&mut teams, &matches);
        let once = teams.clone();
        recompute_standings(&mut teams, &matches);
        assert_eq!(teams, once);
    }

    #[test]
    fn knockout_bonus_table() {
        assert_eq!(knockout_bonus(KnockoutSport::Badminton, KnockoutStage::Final), 5);
        assert_eq!(knockout_bonus(KnockoutSport::Chess, KnockoutStage::Semifinal), 2);
    }
}
