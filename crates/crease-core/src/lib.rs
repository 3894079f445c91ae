// Library root: cricket scoring engine and tournament bookkeeping. No I/O.

pub mod scoring;
pub mod tournament;
