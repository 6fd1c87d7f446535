//! Gate decision types.

use std::fmt;

/// Which policy admitted the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitPath {
    /// Full base threshold battery.
    Base,
    /// Sustained-trend override over the modified battery.
    StrongBreak,
    /// Extreme single-period expansion, direct admit.
    MegaBreakout,
}

impl AdmitPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmitPath::Base => "base",
            AdmitPath::StrongBreak => "strong_break",
            AdmitPath::MegaBreakout => "mega_breakout",
        }
    }
}

impl fmt::Display for AdmitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Admit { path: AdmitPath },
    Reject { reason: String },
}

impl GateDecision {
    pub fn is_admit(&self) -> bool {
        matches!(self, GateDecision::Admit { .. })
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        GateDecision::Reject { reason: reason.into() }
    }
}
