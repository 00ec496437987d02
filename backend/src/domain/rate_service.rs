//! Currency rate collaborator.
//!
//! Stored amounts are always USD; the rate only affects presentation and the
//! conversion of operator-entered display amounts. The rate lives in process
//! memory and is never persisted: on failure the last-known rate is kept, and
//! the configured fallback is installed only when no rate has ever been
//! fetched. Operations receive an explicit `Option<RateSnapshot>` and must
//! reject `None` themselves.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::models::RateSnapshot;

#[derive(Debug, Deserialize)]
struct RatesPayload {
    rates: HashMap<String, f64>,
}

#[derive(Debug, Default)]
struct RateState {
    current: Option<RateSnapshot>,
    previous: Option<f64>,
}

#[derive(Clone)]
pub struct RateService {
    client: reqwest::Client,
    url: String,
    currency: String,
    fallback_rate: f64,
    state: Arc<RwLock<RateState>>,
}

impl RateService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.rate_url.clone(),
            currency: config.display_currency.clone(),
            fallback_rate: config.fallback_rate,
            state: Arc::new(RwLock::new(RateState::default())),
        }
    }

    /// The snapshot financial operations convert with, if any is known.
    pub async fn current(&self) -> Option<RateSnapshot> {
        self.state.read().await.current
    }

    pub async fn current_rate(&self) -> Option<f64> {
        self.current().await.map(|s| s.rate)
    }

    /// Fetch the latest quote. On failure the last-known rate is kept; with
    /// no rate ever known, the configured fallback is installed instead.
    pub async fn refresh(&self) -> shared::RateResponse {
        match self.fetch().await {
            Ok(rate) => {
                let mut state = self.state.write().await;
                state.previous = state.current.map(|s| s.rate);
                state.current = Some(RateSnapshot {
                    rate,
                    fetched_at: Utc::now(),
                    is_fallback: false,
                });
                info!(rate, currency = %self.currency, "refreshed currency rate");
                Self::response(&self.currency, &state)
            }
            Err(e) => {
                warn!("currency rate fetch failed: {e:#}");
                let mut state = self.state.write().await;
                if state.current.is_none() {
                    state.current = Some(RateSnapshot {
                        rate: self.fallback_rate,
                        fetched_at: Utc::now(),
                        is_fallback: true,
                    });
                    warn!(rate = self.fallback_rate, "installed fallback currency rate");
                }
                Self::response(&self.currency, &state)
            }
        }
    }

    /// The current rate and its delta against the previous fetch, without
    /// contacting the rate source.
    pub async fn snapshot(&self) -> shared::RateResponse {
        let state = self.state.read().await;
        Self::response(&self.currency, &state)
    }

    fn response(currency: &str, state: &RateState) -> shared::RateResponse {
        let change = match (state.current, state.previous) {
            (Some(current), Some(previous)) => Some(current.rate - previous),
            _ => None,
        };
        let change_percent = match (change, state.previous) {
            (Some(delta), Some(previous)) if previous != 0.0 => {
                Some(delta / previous * 100.0)
            }
            _ => None,
        };
        shared::RateResponse {
            rate: state.current.map(|s| s.rate),
            currency: currency.to_string(),
            previous_rate: state.previous,
            change,
            change_percent,
            is_fallback: state.current.map(|s| s.is_fallback).unwrap_or(false),
            fetched_at: state.current.map(|s| s.fetched_at.to_rfc3339()),
        }
    }

    async fn fetch(&self) -> anyhow::Result<f64> {
        let payload: RatesPayload = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        payload
            .rates
            .get(&self.currency)
            .copied()
            .filter(|rate| *rate > 0.0)
            .ok_or_else(|| anyhow::anyhow!("rate source has no usable {} rate", self.currency))
    }

    /// Refresh immediately, then keep the rate fresh on the configured
    /// interval for the lifetime of the process.
    pub fn spawn_poller(&self, refresh_secs: u64) {
        let service = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(refresh_secs.max(1)));
            loop {
                interval.tick().await;
                service.refresh().await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with_unreachable_source() -> RateService {
        let config = Config {
            // nothing listens on the discard port; the fetch fails fast
            rate_url: "http://127.0.0.1:9/latest/USD".to_string(),
            ..Config::default()
        };
        RateService::new(&config)
    }

    #[tokio::test]
    async fn no_rate_is_known_before_the_first_refresh() {
        let service = service_with_unreachable_source();
        assert!(service.current().await.is_none());
        let snapshot = service.snapshot().await;
        assert!(snapshot.rate.is_none());
        assert!(!snapshot.is_fallback);
    }

    #[tokio::test]
    async fn failed_refresh_installs_the_fallback_once() {
        let service = service_with_unreachable_source();

        let response = service.refresh().await;
        assert_eq!(response.rate, Some(32.0));
        assert!(response.is_fallback);
        assert!(response.previous_rate.is_none());

        let current = service.current().await.unwrap();
        assert!(current.is_fallback);

        // a second failure keeps the fallback without resetting it
        let again = service.refresh().await;
        assert_eq!(again.rate, Some(32.0));
        assert!(again.is_fallback);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_a_previously_fetched_rate() {
        let service = service_with_unreachable_source();
        {
            let mut state = service.state.write().await;
            state.current = Some(RateSnapshot {
                rate: 33.5,
                fetched_at: Utc::now(),
                is_fallback: false,
            });
        }

        let response = service.refresh().await;
        assert_eq!(response.rate, Some(33.5));
        assert!(!response.is_fallback);
    }

    #[tokio::test]
    async fn deltas_compare_against_the_previous_fetch() {
        let service = service_with_unreachable_source();
        {
            let mut state = service.state.write().await;
            state.previous = Some(32.0);
            state.current = Some(RateSnapshot {
                rate: 33.6,
                fetched_at: Utc::now(),
                is_fallback: false,
            });
        }

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.previous_rate, Some(32.0));
        let change = snapshot.change.unwrap();
        assert!((change - 1.6).abs() < 1e-9);
        let percent = snapshot.change_percent.unwrap();
        assert!((percent - 5.0).abs() < 1e-9);
    }
}
