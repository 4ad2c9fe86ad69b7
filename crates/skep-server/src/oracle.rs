//! Vision-oracle port.
//!
//! Early deployments solicited the waste name and the observed fill
//! level from a human operator at the console. Here that upstream is an
//! injected port: production deployments put a model or rule engine
//! behind it, tests script it. Oracle failures map onto the protocol's
//! sentinel paths and never crash a handler.

use std::collections::VecDeque;

use parking_lot::Mutex;
use thiserror::Error;

use skep_proto::FillPercent;

/// Errors from the classification upstream.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    /// The oracle could not produce an answer for this request.
    #[error("oracle unavailable: {reason}")]
    Unavailable {
        /// What went wrong upstream.
        reason: String,
    },
}

/// Result type for oracle calls.
pub type OracleResult<T> = Result<T, OracleError>;

/// Upstream that inspects deposit imagery.
///
/// Both calls may block the session that issued them; the peer-facing
/// receive timeout does not cover oracle latency.
pub trait VisionOracle: Send + Sync + std::fmt::Debug {
    /// Name the waste item shown in a deposit image.
    fn identify_waste(&self, image_path: &str) -> OracleResult<String>;

    /// Assess the fill level shown in a bin-interior image, given the
    /// last value the store held for that receptacle.
    fn assess_fill(&self, image_path: &str, current: FillPercent) -> OracleResult<FillPercent>;
}

/// Oracle that always answers with the same name and fill level.
///
/// Used by the demo binary, where no real classifier is wired in.
#[derive(Debug, Clone)]
pub struct FixedOracle {
    waste_name: String,
    fill: FillPercent,
}

impl FixedOracle {
    /// Create an oracle with fixed answers.
    #[must_use]
    pub fn new(waste_name: impl Into<String>, fill: FillPercent) -> Self {
        Self {
            waste_name: waste_name.into(),
            fill,
        }
    }
}

impl VisionOracle for FixedOracle {
    fn identify_waste(&self, _image_path: &str) -> OracleResult<String> {
        Ok(self.waste_name.clone())
    }

    fn assess_fill(&self, _image_path: &str, _current: FillPercent) -> OracleResult<FillPercent> {
        Ok(self.fill)
    }
}

/// Oracle that answers from pre-loaded queues, one entry per call.
///
/// An exhausted queue yields `OracleError::Unavailable`, which lets
/// tests exercise the oracle-failure paths as well.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    names: Mutex<VecDeque<String>>,
    fills: Mutex<VecDeque<FillPercent>>,
}

impl ScriptedOracle {
    /// Create an oracle with empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a waste-name answer (builder form).
    #[must_use]
    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.names.lock().push_back(name.into());
        self
    }

    /// Queue a fill-level answer (builder form).
    #[must_use]
    pub fn with_fill(self, fill: FillPercent) -> Self {
        self.fills.lock().push_back(fill);
        self
    }

    /// Queue a waste-name answer.
    pub fn push_name(&self, name: impl Into<String>) {
        self.names.lock().push_back(name.into());
    }

    /// Queue a fill-level answer.
    pub fn push_fill(&self, fill: FillPercent) {
        self.fills.lock().push_back(fill);
    }
}

impl VisionOracle for ScriptedOracle {
    fn identify_waste(&self, _image_path: &str) -> OracleResult<String> {
        self.names.lock().pop_front().ok_or(OracleError::Unavailable {
            reason: "no scripted waste name left".to_string(),
        })
    }

    fn assess_fill(&self, _image_path: &str, _current: FillPercent) -> OracleResult<FillPercent> {
        self.fills.lock().pop_front().ok_or(OracleError::Unavailable {
            reason: "no scripted fill level left".to_string(),
        })
    }
}
