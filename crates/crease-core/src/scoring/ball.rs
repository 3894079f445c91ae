// Ball-level types: what the scorer enters and what the innings records.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ScoreError;
use super::player::PlayerId;

/// Most runs a batter can physically complete off one delivery, overthrows
/// included.
pub const MAX_RUNS_OFF_BAT: u32 = 7;

/// Most extras one delivery can carry (a wide or no-ball plus a boundary
/// of byes and overthrows).
pub const MAX_EXTRAS: u32 = 7;

/// How any extra runs on a delivery were conceded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtraKind {
    #[default]
    None,
    Wide,
    NoBall,
    Bye,
    LegBye,
}

impl ExtraKind {
    /// Wides and no-balls do not count toward the six balls of an over.
    pub fn is_legal_delivery(&self) -> bool {
        !matches!(self, ExtraKind::Wide | ExtraKind::NoBall)
    }

    /// Whether the extras are charged to the bowler's figures.
    pub fn charged_to_bowler(&self) -> bool {
        matches!(self, ExtraKind::Wide | ExtraKind::NoBall)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WicketKind {
    Bowled,
    Caught,
    Lbw,
    Stumped,
    RunOut,
    HitWicket,
    Retired,
}

impl WicketKind {
    /// Run-outs (and retirements) are not credited to the bowler.
    pub fn credits_bowler(&self) -> bool {
        !matches!(self, WicketKind::RunOut | WicketKind::Retired)
    }
}

impl fmt::Display for WicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WicketKind::Bowled => "bowled",
            WicketKind::Caught => "caught",
            WicketKind::Lbw => "lbw",
            WicketKind::Stumped => "stumped",
            WicketKind::RunOut => "run out",
            WicketKind::HitWicket => "hit wicket",
            WicketKind::Retired => "retired",
        };
        f.write_str(s)
    }
}

/// A dismissal on a delivery. `player_id` defaults to the striker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dismissal {
    pub kind: WicketKind,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
}

/// A delivery as entered by the scorer, before it is placed in the innings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallInput {
    /// Runs off the bat.
    #[serde(default)]
    pub runs_scored: u32,
    #[serde(default)]
    pub extras: u32,
    #[serde(default)]
    pub extra_kind: ExtraKind,
    #[serde(default)]
    pub wicket: Option<Dismissal>,
}

impl BallInput {
    pub fn dot() -> Self {
        BallInput::default()
    }

    pub fn runs(runs: u32) -> Self {
        BallInput {
            runs_scored: runs,
            ..Default::default()
        }
    }

    /// A wide worth `extras` runs in total (usually 1 plus any run).
    pub fn wide(extras: u32) -> Self {
        BallInput {
            extras,
            extra_kind: ExtraKind::Wide,
            ..Default::default()
        }
    }

    /// A no-ball: one penalty run plus whatever came off the bat.
    pub fn no_ball(runs_off_bat: u32) -> Self {
        BallInput {
            runs_scored: runs_off_bat,
            extras: 1,
            extra_kind: ExtraKind::NoBall,
            ..Default::default()
        }
    }

    pub fn byes(runs: u32) -> Self {
        BallInput {
            extras: runs,
            extra_kind: ExtraKind::Bye,
            ..Default::default()
        }
    }

    pub fn leg_byes(runs: u32) -> Self {
        BallInput {
            extras: runs,
            extra_kind: ExtraKind::LegBye,
            ..Default::default()
        }
    }

    /// The striker is out with no runs scored.
    pub fn wicket(kind: WicketKind) -> Self {
        BallInput {
            wicket: Some(Dismissal {
                kind,
                player_id: None,
            }),
            ..Default::default()
        }
    }

    /// A run-out of `player_id` after `runs` were completed.
    pub fn run_out(player_id: &str, runs: u32) -> Self {
        BallInput {
            runs_scored: runs,
            wicket: Some(Dismissal {
                kind: WicketKind::RunOut,
                player_id: Some(player_id.to_string()),
            }),
            ..Default::default()
        }
    }

    pub fn is_valid_ball(&self) -> bool {
        self.extra_kind.is_legal_delivery()
    }

    /// Reject run counts no delivery can produce.
    pub fn check_runs(&self) -> Result<(), ScoreError> {
        if self.runs_scored > MAX_RUNS_OFF_BAT {
            return Err(ScoreError::InvalidBall(format!(
                "{} runs off the bat (at most {MAX_RUNS_OFF_BAT})",
                self.runs_scored
            )));
        }
        if self.extras > MAX_EXTRAS {
            return Err(ScoreError::InvalidBall(format!(
                "{} extras (at most {MAX_EXTRAS})",
                self.extras
            )));
        }
        Ok(())
    }
}

/// A delivery as recorded in innings history. Immutable once appended,
/// except that `incoming_batter_id` is filled in when the replacement for a
/// wicket is seated after the ball.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallEvent {
    /// Position in the innings history, starting at 1.
    pub id: u32,
    /// 0-indexed over this ball belongs to.
    pub over_number: u32,
    /// 1-indexed legal ball within the over; extras reuse the current count.
    pub ball_in_over: u32,
    pub bowler_id: PlayerId,
    /// Striker when the ball was bowled.
    pub batter_id: PlayerId,
    pub non_striker_id: PlayerId,
    pub runs_scored: u32,
    pub extras: u32,
    pub extra_kind: ExtraKind,
    pub is_wicket: bool,
    pub wicket_kind: Option<WicketKind>,
    pub dismissed_player_id: Option<PlayerId>,
    pub is_valid_ball: bool,
    /// Whether this delivery was a free hit.
    #[serde(default)]
    pub is_free_hit: bool,
    pub commentary: String,
    #[serde(default)]
    pub incoming_batter_id: Option<PlayerId>,
}

impl BallEvent {
    /// Everything added to the innings total by this ball.
    pub fn total_runs(&self) -> u32 {
        self.runs_scored.saturating_add(self.extras)
    }

    /// Whether the ball counts as faced by the striker (wides do not).
    pub fn faced_by_batter(&self) -> bool {
        self.extra_kind != ExtraKind::Wide
    }

    pub fn bowler_runs(&self) -> u32 {
        if self.extra_kind.charged_to_bowler() {
            self.total_runs()
        } else {
            self.runs_scored
        }
    }

    pub fn credits_bowler_wicket(&self) -> bool {
        self.is_wicket && self.wicket_kind.is_some_and(|k| k.credits_bowler())
    }

    /// Whether this was the sixth legal ball of its over.
    pub fn completes_over(&self) -> bool {
        self.is_valid_ball && self.ball_in_over == super::overs::BALLS_PER_OVER
    }

    pub fn is_boundary_four(&self) -> bool {
        self.runs_scored == 4
    }

    pub fn is_boundary_six(&self) -> bool {
        self.runs_scored == 6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legality_of_extras() {
        assert!(ExtraKind::None.is_legal_delivery());
        assert!(ExtraKind::Bye.is_legal_delivery());
        assert!(ExtraKind::LegBye.is_legal_delivery());
        assert!(!ExtraKind::Wide.is_legal_delivery());
        assert!(!ExtraKind::NoBall.is_legal_delivery());
    }

    #[test]
    fn run_counts_are_bounded() {
        assert!(BallInput::runs(6).check_runs().is_ok());
        assert!(BallInput::runs(MAX_RUNS_OFF_BAT).check_runs().is_ok());
        assert!(BallInput::wide(5).check_runs().is_ok());

        let err = BallInput::runs(8).check_runs().unwrap_err();
        assert!(matches!(err, ScoreError::InvalidBall(_)));

        let huge = BallInput {
            runs_scored: u32::MAX,
            extras: 1,
            extra_kind: ExtraKind::NoBall,
            wicket: None,
        };
        assert!(matches!(huge.check_runs(), Err(ScoreError::InvalidBall(_))));
        assert!(matches!(
            BallInput::byes(u32::MAX).check_runs(),
            Err(ScoreError::InvalidBall(_))
        ));
    }

    #[test]
    fn run_out_does_not_credit_bowler() {
        assert!(!WicketKind::RunOut.credits_bowler());
        assert!(WicketKind::Caught.credits_bowler());
    }

    #[test]
    fn input_deserializes_with_defaults() {
        let input: BallInput = serde_json::from_str(r#"{"runs_scored":4}"#).unwrap();
        assert_eq!(input, BallInput::runs(4));

        let input: BallInput =
            serde_json::from_str(r#"{"extras":1,"extra_kind":"no-ball"}"#).unwrap();
        assert_eq!(input.extra_kind, ExtraKind::NoBall);
        assert!(!input.is_valid_ball());

        let input: BallInput =
            serde_json::from_str(r#"{"wicket":{"kind":"run-out","player_id":"p2"}}"#).unwrap();
        assert_eq!(input.wicket.unwrap().kind, WicketKind::RunOut);
    }
}
