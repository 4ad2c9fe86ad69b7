//! Operator-facing result of one deposit exchange.

use std::fmt;

use serde::{Deserialize, Serialize};

use skep_proto::{Category, FillPercent, FillTier};

/// What the endpoint learned from one exchange with the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReport {
    /// Resolved waste category; `None` when the server replied with
    /// the sentinel.
    pub category: Option<Category>,
    /// Reported fill level; `None` when the exchange terminated before
    /// the storage reply (two-phase sentinel).
    pub storage: Option<FillPercent>,
}

impl DepositReport {
    /// Report for a completed exchange.
    #[must_use]
    pub const fn new(category: Option<Category>, storage: FillPercent) -> Self {
        Self {
            category,
            storage: Some(storage),
        }
    }

    /// Report for a two-phase exchange the server terminated with the
    /// sentinel after round one.
    #[must_use]
    pub const fn rejected() -> Self {
        Self {
            category: None,
            storage: None,
        }
    }

    /// Fill tier derived from the storage reply, if one arrived.
    #[must_use]
    pub fn tier(&self) -> Option<FillTier> {
        self.storage.map(FillTier::from_percent)
    }

    /// Whether the receptacle needs attention.
    #[must_use]
    pub fn is_alerting(&self) -> bool {
        self.tier().is_some_and(FillTier::is_alerting)
    }
}

impl fmt::Display for DepositReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category {
            Some(category) => {
                let name = category.name().unwrap_or("unknown kind");
                writeln!(f, "waste category: {category} ({name})")?;
            }
            None => writeln!(f, "waste category: unrecognized (no matching receptacle or waste item)")?,
        }
        match self.storage {
            Some(percent) => {
                let tier = FillTier::from_percent(percent);
                write!(f, "storage: {percent}% ({tier})")?;
                if let Some(alert) = tier.alert() {
                    write!(f, "\nalert: {alert}")?;
                }
                Ok(())
            }
            None => write!(f, "storage: not reported (exchange terminated)"),
        }
    }
}
