// Scoring engine: overs, balls, innings, matches, and everything derived from
// ball history.

pub mod awards;
pub mod ball;
pub mod commentary;
pub mod error;
pub mod events;
pub mod innings;
pub mod match_state;
pub mod overs;
pub mod player;
pub mod scorecard;

pub use ball::{BallEvent, BallInput, Dismissal, ExtraKind, WicketKind};
pub use error::ScoreError;
pub use events::{InningsEnd, MatchEvent};
pub use innings::{BallOutcome, FallOfWicket, InningsState, Partnership};
pub use match_state::{
    KnockoutStage, Match, MatchPhase, MatchResult, MatchStatus, PlayStatus, TossDecision,
    TossResult,
};
pub use overs::Overs;
pub use player::{Group, Player, PlayerId, PlayerStats, Team, TeamId, TeamStats};
