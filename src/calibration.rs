//! Confidence bands and the response policy they drive.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Inclusive lower bound of [`ConfidenceBand::High`].
pub const HIGH_THRESHOLD: f32 = 0.8;
/// Inclusive lower bound of [`ConfidenceBand::Medium`].
pub const MEDIUM_THRESHOLD: f32 = 0.6;
/// Inclusive lower bound of [`ConfidenceBand::Low`].
pub const LOW_THRESHOLD: f32 = 0.4;
/// Category replies are only looked up above this confidence.
pub const DEFAULT_LOOKUP_MIN_CONFIDENCE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    VeryLow,
    Low,
    Medium,
    High,
}

impl ConfidenceBand {
    /// Band for a probability. Non-finite input is `VeryLow`.
    pub fn from_confidence(confidence: f32) -> Self {
        if !confidence.is_finite() {
            return ConfidenceBand::VeryLow;
        }
        if confidence >= HIGH_THRESHOLD {
            ConfidenceBand::High
        } else if confidence >= MEDIUM_THRESHOLD {
            ConfidenceBand::Medium
        } else if confidence >= LOW_THRESHOLD {
            ConfidenceBand::Low
        } else {
            ConfidenceBand::VeryLow
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::Low => "low",
            ConfidenceBand::VeryLow => "very_low",
        }
    }

    /// Low enough that a canned reply should be hedged.
    pub fn is_uncertain(self) -> bool {
        matches!(self, ConfidenceBand::Low | ConfidenceBand::VeryLow)
    }

    /// Low enough to hand the reply to a generative fallback.
    pub fn wants_fallback(self) -> bool {
        self == ConfidenceBand::VeryLow
    }
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the user-facing text for a prediction should be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseAction {
    /// Replace the reply with the fallback service's output.
    Fallback,
    /// Prefix the reply with an uncertainty hedge.
    Hedge,
    /// Present the reply as is.
    Answer,
}

/// Decide the response action for a band.
pub fn response_action(band: ConfidenceBand, fallback_configured: bool) -> ResponseAction {
    if band.wants_fallback() && fallback_configured {
        ResponseAction::Fallback
    } else if band.is_uncertain() && !fallback_configured {
        ResponseAction::Hedge
    } else {
        ResponseAction::Answer
    }
}
