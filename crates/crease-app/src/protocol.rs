// Message types exchanged between the scorer client and the app loop.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crease_core::scoring::{BallInput, KnockoutStage, MatchEvent, TossResult};
use crease_core::tournament::{MatchSetup, StandingRow, TournamentSnapshot};

// ---------------------------------------------------------------------------
// Inbound commands
// ---------------------------------------------------------------------------

/// A scorer command, sent as JSON tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScorerCommand {
    /// `total_overs` falls back to the configured default.
    CreateMatch {
        date: NaiveDate,
        team_a_id: String,
        team_b_id: String,
        #[serde(default)]
        total_overs: Option<u32>,
        #[serde(default)]
        knockout_stage: Option<KnockoutStage>,
    },
    RecordToss {
        match_id: String,
        toss: TossResult,
    },
    StartInnings {
        match_id: String,
        striker_id: String,
        non_striker_id: String,
        bowler_id: String,
    },
    SetNextBowler {
        match_id: String,
        bowler_id: String,
    },
    SetNextBatter {
        match_id: String,
        batter_id: String,
    },
    SwapStrike {
        match_id: String,
    },
    RecordBall {
        match_id: String,
        ball: BallInput,
        /// Replacement batter when the ball takes a wicket.
        #[serde(default)]
        next_batter_id: Option<String>,
    },
    UndoLastBall {
        match_id: String,
    },
    EndMatch {
        match_id: String,
    },
    AbandonMatch {
        match_id: String,
        reason: String,
    },
    /// Replace local state with a remote snapshot.
    Hydrate {
        snapshot: TournamentSnapshot,
    },
    RequestSnapshot,
    /// Local shutdown request. Never accepted from the wire.
    #[serde(skip)]
    Quit,
}

impl ScorerCommand {
    /// Fixture parameters for a `CreateMatch` command.
    pub fn match_setup(&self, default_overs: u32) -> Option<MatchSetup> {
        match self {
            ScorerCommand::CreateMatch {
                date,
                team_a_id,
                team_b_id,
                total_overs,
                knockout_stage,
            } => Some(MatchSetup {
                date: *date,
                team_a_id: team_a_id.clone(),
                team_b_id: team_b_id.clone(),
                total_overs: total_overs.unwrap_or(default_overs),
                knockout_stage: *knockout_stage,
            }),
            _ => None,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ScorerCommand::CreateMatch { .. } => "create_match",
            ScorerCommand::RecordToss { .. } => "record_toss",
            ScorerCommand::StartInnings { .. } => "start_innings",
            ScorerCommand::SetNextBowler { .. } => "set_next_bowler",
            ScorerCommand::SetNextBatter { .. } => "set_next_batter",
            ScorerCommand::SwapStrike { .. } => "swap_strike",
            ScorerCommand::RecordBall { .. } => "record_ball",
            ScorerCommand::UndoLastBall { .. } => "undo_last_ball",
            ScorerCommand::EndMatch { .. } => "end_match",
            ScorerCommand::AbandonMatch { .. } => "abandon_match",
            ScorerCommand::Hydrate { .. } => "hydrate",
            ScorerCommand::RequestSnapshot => "request_snapshot",
            ScorerCommand::Quit => "quit",
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Pushed to connected clients after each command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Full tournament state plus the overall points table.
    Snapshot {
        snapshot: Box<TournamentSnapshot>,
        standings: Vec<StandingRow>,
    },
    /// Facts produced by a successful command.
    Events { events: Vec<MatchEvent> },
    /// A command that was refused. State is unchanged.
    Rejected { command: String, reason: String },
    ConnectionStatus { status: ConnectionStatus },
}
