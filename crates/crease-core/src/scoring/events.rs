// Facts emitted by match mutations. The app layer decides what to persist and
// what to push to connected clients based on these.

use serde::{Deserialize, Serialize};

use super::ball::BallEvent;
use super::innings::FallOfWicket;
use super::match_state::TossResult;
use super::overs::Overs;
use super::player::{PlayerId, TeamId};

/// Why an innings closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InningsEnd {
    AllOut,
    OversComplete,
    TargetReached,
    /// Closed by an explicit end-of-match call (e.g. rain).
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MatchEvent {
    MatchCreated {
        match_id: String,
    },
    TossRecorded {
        match_id: String,
        toss: TossResult,
    },
    InningsStarted {
        match_id: String,
        innings: u8,
        batting_team_id: TeamId,
        bowling_team_id: TeamId,
    },
    BowlerChanged {
        match_id: String,
        bowler_id: PlayerId,
    },
    BatterSeated {
        match_id: String,
        batter_id: PlayerId,
    },
    StrikeSwapped {
        match_id: String,
        striker_id: Option<PlayerId>,
    },
    BallRecorded {
        match_id: String,
        ball: BallEvent,
    },
    WicketFell {
        match_id: String,
        fall: FallOfWicket,
    },
    OverCompleted {
        match_id: String,
        /// 1-indexed number of the over just finished.
        over: u32,
        bowler_id: PlayerId,
    },
    InningsClosed {
        match_id: String,
        innings: u8,
        runs: u32,
        wickets: u32,
        overs: Overs,
        reason: InningsEnd,
    },
    MatchCompleted {
        match_id: String,
        winner_id: Option<TeamId>,
        result: String,
    },
    BallUndone {
        match_id: String,
        ball: BallEvent,
    },
    MatchReopened {
        match_id: String,
        innings: u8,
    },
    MatchAbandoned {
        match_id: String,
        reason: String,
    },
    StandingsUpdated,
}

impl MatchEvent {
    /// The match this event belongs to; `None` for tournament-wide events.
    pub fn match_id(&self) -> Option<&str> {
        match self {
            MatchEvent::MatchCreated { match_id }
            | MatchEvent::TossRecorded { match_id, .. }
            | MatchEvent::InningsStarted { match_id, .. }
            | MatchEvent::BowlerChanged { match_id, .. }
            | MatchEvent::BatterSeated { match_id, .. }
            | MatchEvent::StrikeSwapped { match_id, .. }
            | MatchEvent::BallRecorded { match_id, .. }
            | MatchEvent::WicketFell { match_id, .. }
            | MatchEvent::OverCompleted { match_id, .. }
            | MatchEvent::InningsClosed { match_id, .. }
            | MatchEvent::MatchCompleted { match_id, .. }
            | MatchEvent::BallUndone { match_id, .. }
            | MatchEvent::MatchReopened { match_id, .. }
            | MatchEvent::MatchAbandoned { match_id, .. } => Some(match_id),
            MatchEvent::StandingsUpdated => None,
        }
    }

    /// Whether the event changes a completed/abandoned result the standings
    /// are folded from.
    pub fn affects_standings(&self) -> bool {
        matches!(
            self,
            MatchEvent::MatchCompleted { .. }
                | MatchEvent::MatchAbandoned { .. }
                | MatchEvent::MatchReopened { .. }
        )
    }
}
