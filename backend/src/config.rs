use std::net::SocketAddr;

const DEFAULT_DATABASE_URL: &str = "sqlite:condo_ledger.db";
const DEFAULT_RATE_URL: &str = "https://open.er-api.com/v6/latest/USD";
const DEFAULT_CURRENCY: &str = "TRY";
const DEFAULT_FALLBACK_RATE: f64 = 32.0;
const DEFAULT_RATE_REFRESH_SECS: u64 = 5 * 60;

/// Runtime configuration, read from the environment with hardcoded defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Currency code the UI displays amounts in (stored amounts are USD)
    pub display_currency: String,
    /// Public endpoint returning current USD exchange rates
    pub rate_url: String,
    /// Rate used when the remote source has never answered
    pub fallback_rate: f64,
    pub rate_refresh_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("BIND_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));

        Self {
            bind_addr,
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            display_currency: std::env::var("DISPLAY_CURRENCY")
                .unwrap_or_else(|_| DEFAULT_CURRENCY.to_string()),
            rate_url: std::env::var("RATE_URL").unwrap_or_else(|_| DEFAULT_RATE_URL.to_string()),
            fallback_rate: std::env::var("FALLBACK_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_FALLBACK_RATE),
            rate_refresh_secs: std::env::var("RATE_REFRESH_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RATE_REFRESH_SECS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            display_currency: DEFAULT_CURRENCY.to_string(),
            rate_url: DEFAULT_RATE_URL.to_string(),
            fallback_rate: DEFAULT_FALLBACK_RATE,
            rate_refresh_secs: DEFAULT_RATE_REFRESH_SECS,
        }
    }
}
