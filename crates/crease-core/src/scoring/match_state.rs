// Match state machine: toss, two innings, innings break, completion, and the
// undo path back across those boundaries.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::awards;
use super::ball::BallInput;
use super::error::ScoreError;
use super::events::{InningsEnd, MatchEvent};
use super::innings::{BallOutcome, InningsState};
use super::overs::BALLS_PER_OVER;
use super::player::{find_player, team_name, PlayerId, Team, TeamId};

/// Result message for a match completed before a second innings began.
pub const NO_RESULT: &str = "No result";

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Coarse match status, derived from the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Toss,
    Scheduled,
    Live,
    InningsBreak,
    Completed,
    Abandoned,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStatus::Toss => "toss",
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::InningsBreak => "innings_break",
            MatchStatus::Completed => "completed",
            MatchStatus::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}

/// Whether the next ball can be bowled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayStatus {
    #[default]
    Active,
    /// An over just finished; a bowler must be chosen first.
    WaitingForBowler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnockoutStage {
    Semifinal,
    Final,
}

impl fmt::Display for KnockoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnockoutStage::Semifinal => write!(f, "semifinal"),
            KnockoutStage::Final => write!(f, "final"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TossDecision {
    Bat,
    Bowl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TossResult {
    pub winner_id: TeamId,
    pub decision: TossDecision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// `None` for a tie or no result.
    pub winner_id: Option<TeamId>,
    pub message: String,
    pub man_of_the_match_id: Option<PlayerId>,
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where a match is in its lifecycle, carrying exactly the data that exists
/// at that point.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum MatchPhase {
    AwaitingToss,
    TossRecorded {
        toss: TossResult,
    },
    FirstInnings {
        toss: TossResult,
        first: InningsState,
    },
    InningsBreak {
        toss: TossResult,
        first: InningsState,
    },
    SecondInnings {
        toss: TossResult,
        first: InningsState,
        second: InningsState,
    },
    Completed {
        toss: Option<TossResult>,
        first: Option<InningsState>,
        second: Option<InningsState>,
        result: MatchResult,
        /// False when completed by an explicit end-of-match call, which undo
        /// cannot reverse.
        closed_by_ball: bool,
    },
    Abandoned {
        toss: Option<TossResult>,
        first: Option<InningsState>,
        second: Option<InningsState>,
        reason: String,
    },
}

/// A recorded ball plus the events it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BallReport {
    pub outcome: BallOutcome,
    pub events: Vec<MatchEvent>,
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub date: NaiveDate,
    pub team_a_id: TeamId,
    pub team_b_id: TeamId,
    pub is_group_stage: bool,
    #[serde(default)]
    pub knockout_stage: Option<KnockoutStage>,
    /// Overs per innings.
    pub total_overs: u32,
    #[serde(default)]
    pub play_status: PlayStatus,
    pub phase: MatchPhase,
}

impl Match {
    pub fn new(
        id: &str,
        date: NaiveDate,
        team_a_id: &str,
        team_b_id: &str,
        total_overs: u32,
        knockout_stage: Option<KnockoutStage>,
    ) -> Self {
        Match {
            id: id.to_string(),
            date,
            team_a_id: team_a_id.to_string(),
            team_b_id: team_b_id.to_string(),
            is_group_stage: knockout_stage.is_none(),
            knockout_stage,
            total_overs,
            play_status: PlayStatus::Active,
            phase: MatchPhase::AwaitingToss,
        }
    }

    // --- reads ---

    pub fn status(&self) -> MatchStatus {
        match &self.phase {
            MatchPhase::AwaitingToss => MatchStatus::Toss,
            MatchPhase::TossRecorded { .. } => MatchStatus::Scheduled,
            MatchPhase::FirstInnings { .. } | MatchPhase::SecondInnings { .. } => {
                MatchStatus::Live
            }
            MatchPhase::InningsBreak { .. } => MatchStatus::InningsBreak,
            MatchPhase::Completed { .. } => MatchStatus::Completed,
            MatchPhase::Abandoned { .. } => MatchStatus::Abandoned,
        }
    }

    pub fn involves(&self, team_id: &str) -> bool {
        self.team_a_id == team_id || self.team_b_id == team_id
    }

    pub fn toss(&self) -> Option<&TossResult> {
        match &self.phase {
            MatchPhase::AwaitingToss => None,
            MatchPhase::TossRecorded { toss }
            | MatchPhase::FirstInnings { toss, .. }
            | MatchPhase::InningsBreak { toss, .. }
            | MatchPhase::SecondInnings { toss, .. } => Some(toss),
            MatchPhase::Completed { toss, .. } | MatchPhase::Abandoned { toss, .. } => {
                toss.as_ref()
            }
        }
    }

    pub fn first_innings(&self) -> Option<&InningsState> {
        match &self.phase {
            MatchPhase::FirstInnings { first, .. }
            | MatchPhase::InningsBreak { first, .. }
            | MatchPhase::SecondInnings { first, .. } => Some(first),
            MatchPhase::Completed { first, .. } | MatchPhase::Abandoned { first, .. } => {
                first.as_ref()
            }
            _ => None,
        }
    }

    pub fn second_innings(&self) -> Option<&InningsState> {
        match &self.phase {
            MatchPhase::SecondInnings { second, .. } => Some(second),
            MatchPhase::Completed { second, .. } | MatchPhase::Abandoned { second, .. } => {
                second.as_ref()
            }
            _ => None,
        }
    }

    /// Innings in play order.
    pub fn innings(&self) -> impl Iterator<Item = &InningsState> {
        [self.first_innings(), self.second_innings()].into_iter().flatten()
    }

    /// The innings currently being bowled, if any.
    pub fn current_innings(&self) -> Option<&InningsState> {
        match &self.phase {
            MatchPhase::FirstInnings { first, .. } => Some(first),
            MatchPhase::SecondInnings { second, .. } => Some(second),
            _ => None,
        }
    }

    fn current_innings_mut(&mut self) -> Option<&mut InningsState> {
        match &mut self.phase {
            MatchPhase::FirstInnings { first, .. } => Some(first),
            MatchPhase::SecondInnings { second, .. } => Some(second),
            _ => None,
        }
    }

    fn live_innings_mut(&mut self, operation: &'static str) -> Result<&mut InningsState, ScoreError> {
        let status = self.status();
        self.current_innings_mut()
            .ok_or(ScoreError::InvalidTransition { operation, status })
    }

    /// Runs the chasing side needs, once the first innings is closed.
    pub fn target(&self) -> Option<u32> {
        match &self.phase {
            MatchPhase::InningsBreak { first, .. } | MatchPhase::SecondInnings { first, .. } => {
                Some(first.runs + 1)
            }
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&MatchResult> {
        match &self.phase {
            MatchPhase::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn winner_id(&self) -> Option<&str> {
        self.result().and_then(|r| r.winner_id.as_deref())
    }

    pub fn result_message(&self) -> Option<&str> {
        self.result().map(|r| r.message.as_str())
    }

    pub fn man_of_the_match_id(&self) -> Option<&str> {
        self.result().and_then(|r| r.man_of_the_match_id.as_deref())
    }

    fn take_phase(&mut self) -> MatchPhase {
        std::mem::replace(&mut self.phase, MatchPhase::AwaitingToss)
    }

    fn other_team(&self, team_id: &str) -> &str {
        if team_id == self.team_a_id {
            &self.team_b_id
        } else {
            &self.team_a_id
        }
    }

    // --- transitions ---

    pub fn record_toss(&mut self, toss: TossResult) -> Result<Vec<MatchEvent>, ScoreError> {
        if !matches!(self.phase, MatchPhase::AwaitingToss) {
            return Err(ScoreError::InvalidTransition {
                operation: "record the toss",
                status: self.status(),
            });
        }
        if !self.involves(&toss.winner_id) {
            return Err(ScoreError::UnknownTeam(toss.winner_id));
        }
        self.phase = MatchPhase::TossRecorded { toss: toss.clone() };
        Ok(vec![MatchEvent::TossRecorded {
            match_id: self.id.clone(),
            toss,
        }])
    }

    /// Start the first innings after the toss, or the second after the break.
    pub fn start_innings(
        &mut self,
        teams: &[Team],
        striker_id: &str,
        non_striker_id: &str,
        bowler_id: &str,
    ) -> Result<Vec<MatchEvent>, ScoreError> {
        let (number, batting, bowling) = match &self.phase {
            MatchPhase::TossRecorded { toss } => {
                let batting = match toss.decision {
                    TossDecision::Bat => toss.winner_id.clone(),
                    TossDecision::Bowl => self.other_team(&toss.winner_id).to_string(),
                };
                let bowling = self.other_team(&batting).to_string();
                (1, batting, bowling)
            }
            MatchPhase::InningsBreak { first, .. } => (
                2,
                first.bowling_team_id.clone(),
                first.batting_team_id.clone(),
            ),
            _ => {
                return Err(ScoreError::InvalidTransition {
                    operation: "start an innings",
                    status: self.status(),
                })
            }
        };

        if striker_id == non_striker_id {
            return Err(ScoreError::SamePlayerBothEnds);
        }
        check_member(teams, striker_id, &batting)?;
        check_member(teams, non_striker_id, &batting)?;
        check_member(teams, bowler_id, &bowling)?;

        let innings = InningsState::new(number, &batting, &bowling, striker_id, non_striker_id, bowler_id);
        self.phase = match self.take_phase() {
            MatchPhase::TossRecorded { toss } => MatchPhase::FirstInnings { toss, first: innings },
            MatchPhase::InningsBreak { toss, first } => MatchPhase::SecondInnings {
                toss,
                first,
                second: innings,
            },
            other => other,
        };
        self.play_status = PlayStatus::Active;

        info!("{}: innings {} started, {} batting", self.id, number, batting);
        Ok(vec![MatchEvent::InningsStarted {
            match_id: self.id.clone(),
            innings: number,
            batting_team_id: batting,
            bowling_team_id: bowling,
        }])
    }

    /// Choose the bowler for the next ball. After an over, the bowler of that
    /// over may not continue.
    pub fn set_next_bowler(&mut self, teams: &[Team], bowler_id: &str) -> Result<Vec<MatchEvent>, ScoreError> {
        let waiting = self.play_status == PlayStatus::WaitingForBowler;
        let innings = self.live_innings_mut("change the bowler")?;
        check_member(teams, bowler_id, &innings.bowling_team_id)?;
        if waiting && innings.last_bowler_id() == Some(bowler_id) {
            return Err(ScoreError::ConsecutiveOvers(bowler_id.to_string()));
        }
        innings.set_bowler(bowler_id);
        self.play_status = PlayStatus::Active;
        Ok(vec![MatchEvent::BowlerChanged {
            match_id: self.id.clone(),
            bowler_id: bowler_id.to_string(),
        }])
    }

    pub fn set_next_batter(&mut self, teams: &[Team], batter_id: &str) -> Result<Vec<MatchEvent>, ScoreError> {
        let innings = self.live_innings_mut("seat a batter")?;
        innings.seat_batter(batter_id, teams)?;
        Ok(vec![MatchEvent::BatterSeated {
            match_id: self.id.clone(),
            batter_id: batter_id.to_string(),
        }])
    }

    pub fn swap_strike(&mut self) -> Result<Vec<MatchEvent>, ScoreError> {
        let innings = self.live_innings_mut("swap strike")?;
        innings.swap_strike();
        let striker_id = innings.striker_id.clone();
        Ok(vec![MatchEvent::StrikeSwapped {
            match_id: self.id.clone(),
            striker_id,
        }])
    }

    /// Record a delivery in the live innings, then close the innings (and the
    /// match) if it ended.
    pub fn record_ball(
        &mut self,
        input: &BallInput,
        teams: &[Team],
        next_batter_id: Option<&str>,
    ) -> Result<BallReport, ScoreError> {
        if self.current_innings().is_some() && self.play_status == PlayStatus::WaitingForBowler {
            return Err(ScoreError::AwaitingBowler);
        }
        let target = self.target();
        let max_balls = self.total_overs.saturating_mul(BALLS_PER_OVER);
        let match_id = self.id.clone();

        let innings = self.live_innings_mut("record a ball")?;
        let outcome = innings.record_ball(input, teams, next_batter_id)?;

        let mut events = vec![MatchEvent::BallRecorded {
            match_id: match_id.clone(),
            ball: outcome.ball.clone(),
        }];
        if let Some(fall) = &outcome.fall_of_wicket {
            events.push(MatchEvent::WicketFell {
                match_id: match_id.clone(),
                fall: fall.clone(),
            });
        }
        if outcome.over_completed {
            events.push(MatchEvent::OverCompleted {
                match_id: match_id.clone(),
                over: innings.overs.whole_overs(),
                bowler_id: outcome.ball.bowler_id.clone(),
            });
        }

        let end = if target.is_some_and(|t| innings.runs >= t) {
            Some(InningsEnd::TargetReached)
        } else if innings.is_all_out() {
            Some(InningsEnd::AllOut)
        } else if innings.overs.balls() >= max_balls {
            Some(InningsEnd::OversComplete)
        } else {
            None
        };

        if outcome.over_completed {
            self.play_status = PlayStatus::WaitingForBowler;
        }
        if let Some(reason) = end {
            events.extend(self.close_innings(reason, teams));
        }
        Ok(BallReport { outcome, events })
    }

    fn close_innings(&mut self, reason: InningsEnd, teams: &[Team]) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        if let Some(innings) = self.current_innings() {
            events.push(closed_event(&self.id, innings, reason));
            info!(
                "{}: innings {} closed at {}/{} ({:?})",
                self.id, innings.number, innings.runs, innings.wickets, reason
            );
        }
        self.play_status = PlayStatus::Active;
        self.phase = match self.take_phase() {
            MatchPhase::FirstInnings { toss, first } => MatchPhase::InningsBreak { toss, first },
            MatchPhase::SecondInnings { toss, first, second } => {
                let result = decide_result(&first, Some(&second), teams);
                events.push(self.completed_event(&result));
                MatchPhase::Completed {
                    toss: Some(toss),
                    first: Some(first),
                    second: Some(second),
                    result,
                    closed_by_ball: true,
                }
            }
            other => other,
        };
        events
    }

    fn completed_event(&self, result: &MatchResult) -> MatchEvent {
        info!("{}: {}", self.id, result.message);
        MatchEvent::MatchCompleted {
            match_id: self.id.clone(),
            winner_id: result.winner_id.clone(),
            result: result.message.clone(),
        }
    }

    /// Undo the most recent ball. Reopens an innings break or a completed
    /// match when the ball being undone is what closed it.
    pub fn undo_last_ball(&mut self) -> Result<Vec<MatchEvent>, ScoreError> {
        let status = self.status();
        match &self.phase {
            MatchPhase::AwaitingToss | MatchPhase::TossRecorded { .. } => return Ok(Vec::new()),
            MatchPhase::Abandoned { .. } => {
                return Err(ScoreError::InvalidTransition {
                    operation: "undo",
                    status,
                })
            }
            MatchPhase::Completed {
                toss,
                first,
                second,
                closed_by_ball,
                ..
            } => {
                if !closed_by_ball || toss.is_none() || first.is_none() || second.is_none() {
                    return Err(ScoreError::InvalidTransition {
                        operation: "undo",
                        status,
                    });
                }
            }
            _ => {}
        }

        let mut reopened = None;
        self.phase = match self.take_phase() {
            MatchPhase::InningsBreak { toss, first } => {
                reopened = Some(1);
                MatchPhase::FirstInnings { toss, first }
            }
            MatchPhase::Completed {
                toss: Some(toss),
                first: Some(first),
                second: Some(second),
                ..
            } => {
                reopened = Some(2);
                MatchPhase::SecondInnings { toss, first, second }
            }
            other => other,
        };

        let match_id = self.id.clone();
        let mut events = Vec::new();
        if let Some(innings) = self.current_innings_mut() {
            if let Some(undone) = innings.undo_last_ball() {
                events.push(MatchEvent::BallUndone {
                    match_id: match_id.clone(),
                    ball: undone.ball,
                });
                // A ball can only have been bowled while play was active.
                self.play_status = PlayStatus::Active;
            }
        }
        if let Some(innings) = reopened {
            info!("{}: reopened innings {}", match_id, innings);
            events.push(MatchEvent::MatchReopened { match_id, innings });
        }
        Ok(events)
    }

    /// Complete a live match or one at the innings break without further
    /// play (e.g. rain).
    pub fn end_match(&mut self, teams: &[Team]) -> Result<Vec<MatchEvent>, ScoreError> {
        if !matches!(
            self.phase,
            MatchPhase::FirstInnings { .. }
                | MatchPhase::InningsBreak { .. }
                | MatchPhase::SecondInnings { .. }
        ) {
            return Err(ScoreError::InvalidTransition {
                operation: "end the match",
                status: self.status(),
            });
        }

        let mut events = Vec::new();
        if let Some(innings) = self.current_innings() {
            events.push(closed_event(&self.id, innings, InningsEnd::Stopped));
        }
        let (toss, first, second) = match self.take_phase() {
            MatchPhase::FirstInnings { toss, first } | MatchPhase::InningsBreak { toss, first } => {
                (toss, first, None)
            }
            MatchPhase::SecondInnings { toss, first, second } => (toss, first, Some(second)),
            // Ruled out above.
            other => {
                self.phase = other;
                return Ok(Vec::new());
            }
        };

        let result = decide_result(&first, second.as_ref(), teams);
        events.push(self.completed_event(&result));
        self.play_status = PlayStatus::Active;
        self.phase = MatchPhase::Completed {
            toss: Some(toss),
            first: Some(first),
            second,
            result,
            closed_by_ball: false,
        };
        Ok(events)
    }

    /// Abandon a match that has not finished. Any innings played are kept.
    pub fn abandon(&mut self, reason: &str) -> Result<Vec<MatchEvent>, ScoreError> {
        let status = self.status();
        let (toss, first, second) = match self.take_phase() {
            MatchPhase::AwaitingToss => (None, None, None),
            MatchPhase::TossRecorded { toss } => (Some(toss), None, None),
            MatchPhase::FirstInnings { toss, first } | MatchPhase::InningsBreak { toss, first } => {
                (Some(toss), Some(first), None)
            }
            MatchPhase::SecondInnings { toss, first, second } => {
                (Some(toss), Some(first), Some(second))
            }
            finished => {
                self.phase = finished;
                return Err(ScoreError::InvalidTransition {
                    operation: "abandon",
                    status,
                });
            }
        };
        self.phase = MatchPhase::Abandoned {
            toss,
            first,
            second,
            reason: reason.to_string(),
        };
        self.play_status = PlayStatus::Active;
        info!("{}: abandoned ({})", self.id, reason);
        Ok(vec![MatchEvent::MatchAbandoned {
            match_id: self.id.clone(),
            reason: reason.to_string(),
        }])
    }
}

fn check_member(teams: &[Team], player_id: &str, team_id: &str) -> Result<(), ScoreError> {
    let player = find_player(teams, player_id)
        .ok_or_else(|| ScoreError::UnknownPlayer(player_id.to_string()))?;
    if player.team_id != team_id {
        return Err(ScoreError::WrongTeam {
            player: player_id.to_string(),
            team: team_id.to_string(),
        });
    }
    Ok(())
}

fn closed_event(match_id: &str, innings: &InningsState, reason: InningsEnd) -> MatchEvent {
    MatchEvent::InningsClosed {
        match_id: match_id.to_string(),
        innings: innings.number,
        runs: innings.runs,
        wickets: innings.wickets,
        overs: innings.overs,
        reason,
    }
}

/// Decide the result from the innings played. Without a second innings the
/// match has no result.
pub fn decide_result(first: &InningsState, second: Option<&InningsState>, teams: &[Team]) -> MatchResult {
    let man_of_the_match_id = match second {
        Some(second) => awards::man_of_the_match(&[first, second]),
        None => awards::man_of_the_match(&[first]),
    };
    let Some(second) = second else {
        return MatchResult {
            winner_id: None,
            message: NO_RESULT.to_string(),
            man_of_the_match_id,
        };
    };

    let (winner_id, message) = if second.runs > first.runs {
        let margin = 10u32.saturating_sub(second.wickets);
        let name = team_name(teams, &second.batting_team_id);
        (
            Some(second.batting_team_id.clone()),
            format!("{name} won by {margin} {}", if margin == 1 { "wicket" } else { "wickets" }),
        )
    } else if first.runs > second.runs {
        let margin = first.runs - second.runs;
        let name = team_name(teams, &first.batting_team_id);
        (
            Some(first.batting_team_id.clone()),
            format!("{name} won by {margin} {}", if margin == 1 { "run" } else { "runs" }),
        )
    } else {
        (None, "Match tied".to_string())
    };

    MatchResult {
        winner_id,
        message,
        man_of_the_match_id,
    }
}
