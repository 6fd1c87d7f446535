//! Ignition records.

use surge_core::Instrument;

/// An active ignition for one instrument.
///
/// At most one record exists per instrument at a time; a new ignition
/// cannot be raised until the active record is consumed or expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnitionRecord {
    pub instrument: Instrument,
    /// When the ignition was detected (Unix ms).
    pub detected_at_ms: i64,
    /// When the record expires unconsumed (Unix ms).
    pub expires_at_ms: i64,
}

impl IgnitionRecord {
    pub fn new(instrument: Instrument, detected_at_ms: i64, ttl_ms: i64) -> Self {
        Self {
            instrument,
            detected_at_ms,
            expires_at_ms: detected_at_ms + ttl_ms,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

/// Terminal outcome of an ignition record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnitionOutcome {
    /// Consumed by a successful entry gate pass.
    Consumed,
    /// TTL elapsed without an entry.
    Expired,
}

impl std::fmt::Display for IgnitionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Consumed => write!(f, "CONSUMED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let record = IgnitionRecord::new(Instrument::parse("KRW-BTC").unwrap(), 1000, 500);
        assert!(!record.is_expired(1499));
        assert!(record.is_expired(1500));
    }
}
