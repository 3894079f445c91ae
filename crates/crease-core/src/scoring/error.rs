// Errors returned by scoring operations. None of these are fatal: a rejected
// operation leaves the match exactly as it was.

use thiserror::Error;

use super::match_state::MatchStatus;
use super::player::{PlayerId, TeamId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    // --- invalid transitions ---
    #[error("cannot {operation} while the match is {status}")]
    InvalidTransition {
        operation: &'static str,
        status: MatchStatus,
    },

    #[error("a new bowler must be selected before the next ball")]
    AwaitingBowler,

    #[error("a replacement batter must be seated before the next ball")]
    AwaitingBatter,

    #[error("no batter is waiting to be replaced")]
    NoVacancy,

    // --- invalid ball / actors ---
    #[error("invalid ball: {0}")]
    InvalidBall(String),

    #[error("no {0} is assigned")]
    MissingActor(&'static str),

    #[error("unknown player `{0}`")]
    UnknownPlayer(PlayerId),

    #[error("player `{player}` does not play for `{team}`")]
    WrongTeam { player: PlayerId, team: TeamId },

    #[error("dismissed player `{0}` is not at the crease")]
    VictimNotAtCrease(PlayerId),

    #[error("player `{0}` has already batted in this innings")]
    PlayerAlreadyBatted(PlayerId),

    #[error("striker and non-striker must be different players")]
    SamePlayerBothEnds,

    #[error("`{0}` bowled the previous over")]
    ConsecutiveOvers(PlayerId),

    // --- lookups / setup ---
    #[error("unknown match `{0}`")]
    UnknownMatch(String),

    #[error("unknown team `{0}`")]
    UnknownTeam(TeamId),

    #[error("invalid match setup: {0}")]
    InvalidMatchSetup(String),
}
