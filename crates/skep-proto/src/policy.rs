//! Fill-level alert policy.
//!
//! Maps a receptacle's storage percent onto a status tier and an
//! optional alert message. Total over 0..=100 and monotonic in
//! severity; the thresholds come from the endpoint's operator display
//! rules.

use serde::{Deserialize, Serialize};

use crate::types::FillPercent;

/// Status tier of a receptacle's fill level.
///
/// Tiers are ordered by severity: `Empty < Normal < Elevated < Full <
/// Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillTier {
    /// 0%: nothing deposited.
    Empty,
    /// 1..=50%: plenty of room.
    Normal,
    /// 51..=80%: filling up.
    Elevated,
    /// 81..=95%: effectively full, should be emptied soon.
    Full,
    /// 96..=100%: overfull, needs immediate attention.
    Critical,
}

impl FillTier {
    /// Classify a storage percent into its tier.
    #[must_use]
    pub const fn from_percent(percent: FillPercent) -> Self {
        match percent.value() {
            0 => Self::Empty,
            1..=50 => Self::Normal,
            51..=80 => Self::Elevated,
            81..=95 => Self::Full,
            _ => Self::Critical,
        }
    }

    /// Returns the tier as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Normal => "normal",
            Self::Elevated => "elevated",
            Self::Full => "full",
            Self::Critical => "critical",
        }
    }

    /// Alert message for tiers that require operator action.
    #[must_use]
    pub const fn alert(self) -> Option<&'static str> {
        match self {
            Self::Full => Some("clean soon"),
            Self::Critical => Some("clean immediately"),
            _ => None,
        }
    }

    /// Whether this tier raises an alert.
    #[must_use]
    pub const fn is_alerting(self) -> bool {
        self.alert().is_some()
    }
}

impl std::fmt::Display for FillTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
