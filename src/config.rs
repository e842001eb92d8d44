use crate::error::{AppError, Result};

pub const FEED_API_URL: &str = "https://api.dexscreener.com/latest/dex/tokens";

/// Addresses seeded into an empty watch-list.
pub const DEFAULT_ADDRESSES: &[&str] = &[
    "0x52b5fb4b0f6572b8c44d0251cc224513ac5eb7e7",
    "0xcf3232b85b43bca90e51d38cc06cc8bb8c8a3e36",
    "0x0e63b9c287e32a05e6b9ab8ee8df88a2760225a9",
    "0x0e4f6209ed984b21edea43ace6e09559ed051d48",
    "0x81a7da4074b8e0ed51bea40f9dcbdf4d9d4832b4",
    "0xe6df05ce8c8301223373cf5b969afcb1498c5528",
];

/// The token endpoint accepts at most this many comma-separated addresses.
pub const FEED_MAX_ADDRESSES_PER_REQUEST: usize = 30;

/// Feed request timeout (seconds).
pub const FEED_TIMEOUT_SECS: u64 = 15;

/// Default watch-list refresh interval (seconds).
pub const REFRESH_INTERVAL_SECS: u64 = 15;

/// Length of the post-creation boost window (days).
pub const BOOST_WINDOW_DAYS: i64 = 30;

/// Strategy band offsets relative to the current price.
pub mod strategy_offsets {
    pub const BUY_MULTIPLIER: f64 = 1.01;
    pub const SELL_MULTIPLIER: f64 = 0.997;
}

/// Stability scoring thresholds. Liquidity in USD, everything else in percent
/// except turnover, which is a plain ratio.
pub mod stability_thresholds {
    pub const LIQUIDITY_CRITICAL: f64 = 20_000.0;
    pub const LIQUIDITY_LOW: f64 = 100_000.0;
    pub const LIQUIDITY_MODEST: f64 = 500_000.0;

    pub const DEVIATION_SEVERE: f64 = 10.0;
    pub const DEVIATION_HIGH: f64 = 5.0;
    pub const DEVIATION_MILD: f64 = 2.0;

    pub const H1_CRASH: f64 = -3.0;
    pub const H1_PUMP: f64 = 15.0;

    pub const TURNOVER_STAGNANT: f64 = 0.05;

    pub const ABNORMAL_DEVIATION: f64 = 15.0;
    pub const ABNORMAL_TURNOVER: f64 = 20.0;

    pub const STATUS_VOLATILE_MIN: u8 = 40;
    pub const STATUS_MODERATE_MIN: u8 = 60;
    pub const STATUS_STABLE_MIN: u8 = 80;

    pub const VOLATILITY_HIGH: f64 = 3.0;
    pub const VOLATILITY_MEDIUM: f64 = 1.0;
    pub const TURNOVER_SPIKE: f64 = 5.0;
    pub const LIQUIDITY_THIN: f64 = 50_000.0;
    pub const TREND_BAND: f64 = 0.5;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub feed_api_url: String,
    /// Optional HTTP(S) proxy for feed requests (PROXY_URL).
    pub proxy_url: Option<String>,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Watch-list poll interval (REFRESH_INTERVAL_SECS)
    pub refresh_interval_secs: u64,
    /// Addresses inserted when the watch-list is empty (SEED_ADDRESSES, comma-separated).
    pub seed_addresses: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let seed_addresses = match std::env::var("SEED_ADDRESSES") {
            Ok(raw) => split_list(&raw),
            Err(_) => DEFAULT_ADDRESSES.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            feed_api_url: std::env::var("FEED_API_URL")
                .unwrap_or_else(|_| FEED_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            proxy_url: std::env::var("PROXY_URL")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "scanner.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            refresh_interval_secs: std::env::var("REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|_| REFRESH_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    AppError::Config("REFRESH_INTERVAL_SECS must be a positive integer".to_string())
                })?,
            seed_addresses,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
