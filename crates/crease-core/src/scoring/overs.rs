// Overs arithmetic: decimal "overs.balls" values and legal ball counts.

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Legal deliveries in one over.
pub const BALLS_PER_OVER: u32 = 6;

// ---------------------------------------------------------------------------
// Free functions over the decimal representation
// ---------------------------------------------------------------------------

/// Convert a legal ball count to the decimal `W.B` form (64 balls -> 10.4).
pub fn balls_to_overs(balls: u32) -> f64 {
    let whole = balls / BALLS_PER_OVER;
    let rem = balls % BALLS_PER_OVER;
    // Dividing the exact integer keeps the result identical to the literal.
    (u64::from(whole) * 10 + u64::from(rem)) as f64 / 10.0
}

/// Convert a decimal `W.B` value to a legal ball count.
///
/// The tenths digit is read as a ball count. Canonical input never has a
/// digit above 5; if one appears it is carried into the next over. Values
/// too large for a `u32` ball count clamp to `u32::MAX`.
pub fn overs_to_balls(overs: f64) -> u32 {
    if !overs.is_finite() || overs <= 0.0 {
        return 0;
    }
    // Float-to-int `as` saturates, so huge input lands on u64::MAX.
    let tenths = (overs * 10.0).round() as u64;
    let balls = (tenths / 10)
        .saturating_mul(u64::from(BALLS_PER_OVER))
        .saturating_add(tenths % 10);
    u32::try_from(balls).unwrap_or(u32::MAX)
}

/// Add two decimal over values through their ball counts, so that totals
/// straddling an over boundary come out right (10.4 + 0.3 = 11.1).
pub fn add_overs(a: f64, b: f64) -> f64 {
    balls_to_overs(overs_to_balls(a).saturating_add(overs_to_balls(b)))
}

/// Render a decimal over value for display, e.g. `"11.1"`.
pub fn format_overs(overs: f64) -> String {
    Overs::from_decimal(overs).to_string()
}

// ---------------------------------------------------------------------------
// Overs value type
// ---------------------------------------------------------------------------

/// A count of legal deliveries, serialized as the decimal `W.B` number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Overs {
    balls: u32,
}

impl Overs {
    pub const ZERO: Overs = Overs { balls: 0 };

    pub fn from_balls(balls: u32) -> Self {
        Overs { balls }
    }

    /// Whole overs with no balls into the next one. Saturates at the
    /// largest representable count.
    pub fn from_whole(overs: u32) -> Self {
        Overs {
            balls: overs.saturating_mul(BALLS_PER_OVER),
        }
    }

    pub fn from_decimal(overs: f64) -> Self {
        Overs {
            balls: overs_to_balls(overs),
        }
    }

    pub fn balls(&self) -> u32 {
        self.balls
    }

    /// Completed overs (the `W` of `W.B`).
    pub fn whole_overs(&self) -> u32 {
        self.balls / BALLS_PER_OVER
    }

    /// Legal balls bowled in the current over (the `B` of `W.B`, 0-5).
    pub fn balls_in_over(&self) -> u32 {
        self.balls % BALLS_PER_OVER
    }

    pub fn as_decimal(&self) -> f64 {
        balls_to_overs(self.balls)
    }

    /// Overs as a true fraction (10.3 -> 10.5), for rate calculations.
    pub fn true_overs(&self) -> f64 {
        f64::from(self.balls) / f64::from(BALLS_PER_OVER)
    }

    /// Advance by one legal ball. Returns `true` when this ball completed an
    /// over (the decimal rolled from `.5` to the next whole number).
    pub fn add_ball(&mut self) -> bool {
        self.balls = self.balls.saturating_add(1);
        self.balls % BALLS_PER_OVER == 0
    }

    /// Step back one legal ball. Returns `true` when the step crossed an over
    /// boundary backwards (`.0` back to `.5` of the previous over). A zero
    /// count is left untouched.
    pub fn remove_ball(&mut self) -> bool {
        if self.balls == 0 {
            return false;
        }
        let crossed = self.balls % BALLS_PER_OVER == 0;
        self.balls -= 1;
        crossed
    }
}

impl Add for Overs {
    type Output = Overs;

    fn add(self, rhs: Overs) -> Overs {
        Overs {
            balls: self.balls.saturating_add(rhs.balls),
        }
    }
}

impl fmt::Display for Overs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.whole_overs(), self.balls_in_over())
    }
}

impl Serialize for Overs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Overs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let decimal = f64::deserialize(deserializer)?;
        Ok(Overs::from_decimal(decimal))
    }
}
