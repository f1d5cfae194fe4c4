//! Client-side speed rating from measured round-trip latency.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound (exclusive) for a `Fast` rating, in milliseconds.
pub const FAST_BELOW_MS: f64 = 200.0;
/// Upper bound (exclusive) for a `Medium` rating, in milliseconds.
pub const MEDIUM_BELOW_MS: f64 = 800.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedRating {
    Fast,
    Medium,
    Slow,
}

impl SpeedRating {
    pub fn from_latency_ms(latency_ms: f64) -> Self {
        if latency_ms < FAST_BELOW_MS {
            SpeedRating::Fast
        } else if latency_ms < MEDIUM_BELOW_MS {
            SpeedRating::Medium
        } else {
            SpeedRating::Slow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedRating::Fast => "fast",
            SpeedRating::Medium => "medium",
            SpeedRating::Slow => "slow",
        }
    }
}

impl fmt::Display for SpeedRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
