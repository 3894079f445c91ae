// Net run rate over cumulative team totals.

use crate::scoring::overs::{overs_to_balls, Overs};

/// `runs_scored / overs_faced - runs_conceded / overs_bowled`, using true
/// overs (balls / 6), rounded to 3 decimals. 0 when either side has no overs.
pub fn net_run_rate(runs_scored: u32, overs_faced: Overs, runs_conceded: u32, overs_bowled: Overs) -> f64 {
    if overs_faced.balls() == 0 || overs_bowled.balls() == 0 {
        return 0.0;
    }
    let nrr = f64::from(runs_scored) / overs_faced.true_overs()
        - f64::from(runs_conceded) / overs_bowled.true_overs();
    round3(nrr)
}

/// Same calculation with overs given in `W.B` decimal notation.
pub fn net_run_rate_decimal(runs_scored: u32, overs_faced: f64, runs_conceded: u32, overs_bowled: f64) -> f64 {
    net_run_rate(
        runs_scored,
        Overs::from_balls(overs_to_balls(overs_faced)),
        runs_conceded,
        Overs::from_balls(overs_to_balls(overs_bowled)),
    )
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_overs_is_zero() {
        assert_eq!(net_run_rate(100, Overs::ZERO, 50, Overs::from_whole(10)), 0.0);
        assert_eq!(net_run_rate(100, Overs::from_whole(10), 50, Overs::ZERO), 0.0);
    }

    #[test]
    fn uses_true_overs() {
        // 100 in 10.3 overs (63 balls) vs 90 in 10 overs.
        let nrr = net_run_rate_decimal(100, 10.3, 90, 10.0);
        let expected = 100.0 / 10.5 - 9.0;
        assert!((nrr - round3(expected)).abs() < 1e-9);
        assert_eq!(nrr, 0.524);
    }

    #[test]
    fn negative_rate() {
        let nrr = net_run_rate(60, Overs::from_whole(10), 120, Overs::from_whole(10));
        assert_eq!(nrr, -6.0);
    }
}
