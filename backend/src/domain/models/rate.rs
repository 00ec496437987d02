//! Process-local currency rate state. Never persisted.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time USD -> display-currency rate.
///
/// Operations that move money take an `Option<RateSnapshot>` and must reject
/// `None` explicitly; there is no ambient global rate they could silently
/// fall back to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub rate: f64,
    pub fetched_at: DateTime<Utc>,
    /// True when this is the configured fallback, not a live quote
    pub is_fallback: bool,
}

impl RateSnapshot {
    pub fn display_to_usd(&self, amount_display: f64) -> f64 {
        amount_display / self.rate
    }

    pub fn usd_to_display(&self, amount_usd: f64) -> f64 {
        amount_usd * self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_currencies() {
        let snapshot = RateSnapshot {
            rate: 32.0,
            fetched_at: Utc::now(),
            is_fallback: false,
        };
        assert_eq!(snapshot.display_to_usd(1000.0), 31.25);
        assert_eq!(snapshot.usd_to_display(31.25), 1000.0);
    }
}
