// Tournament: ledger, net run rate, standings, and the session object that
// owns teams and matches.

pub mod ledger;
pub mod nrr;
pub mod session;
pub mod standings;

pub use ledger::{knockout_bonus, recompute_standings, KnockoutSport};
pub use nrr::net_run_rate;
pub use session::{MatchSetup, Tournament, TournamentSnapshot, MAX_OVERS_PER_INNINGS};
pub use standings::{standings, StandingRow};
