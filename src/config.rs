use crate::error::{AppError, Result};

pub const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";
pub const DATA_API_URL: &str = "https://data-api.polymarket.com";

/// Any trade at or above this size counts as a whale trade.
pub const WHALE_TRADE_SIZE: f64 = 10_000.0;

/// Minimum 24h volume for a market to be considered during training collection.
pub const TRAINING_MIN_VOLUME: f64 = 100_000.0;

/// Training refuses to fit a model below this many collected samples.
pub const MIN_TRAINING_SAMPLES: usize = 50;

/// Scan pass interval for the realtime agent (seconds).
pub const SCAN_INTERVAL_SECS: u64 = 60;

/// How far back the agent looks for snapshots and trades (hours).
pub const LOOKBACK_HOURS: i64 = 20;

/// Max retry attempts for exchange API calls.
pub const FETCH_MAX_RETRIES: u32 = 3;

/// Fixed backoff between retries (milliseconds).
pub const FETCH_RETRY_BACKOFF_MS: u64 = 2_000;

/// Longer wait after an HTTP 429 (milliseconds).
pub const RATE_LIMIT_BACKOFF_MS: u64 = 5_000;

/// Delay between markets during training collection (milliseconds).
pub const TRAINING_FETCH_DELAY_MS: u64 = 3_000;

/// Confidence a scorer can emit is clamped to this range.
pub const CONFIDENCE_FLOOR: f64 = 0.05;
pub const CONFIDENCE_CEIL: f64 = 0.95;

/// Undervalued band: an outcome price strictly usable for entry.
pub const UNDERVALUED_MIN: f64 = 0.1;
pub const UNDERVALUED_MAX: f64 = 0.4;

/// Risk tier thresholds on 24h volume (USD).
pub mod risk_thresholds {
    pub const HIGH_BELOW: f64 = 200_000.0;
    pub const MEDIUM_BELOW: f64 = 500_000.0;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gamma_api_url: String,
    pub data_api_url: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Path to the trained model artifact (AGENT_MODEL_PATH). Loaded by main
    /// and injected into the scorer; absent file means heuristic-only scoring.
    pub model_path: String,
    /// Max opportunities returned per scan pass (AGENT_MAX_OPPORTUNITIES).
    pub max_opportunities: usize,
    /// Markets fetched per scan pass (AGENT_SCAN_MARKETS).
    pub scan_max_markets: usize,
    /// Markets to collect during training (TRAINER_NUM_MARKETS).
    pub trainer_num_markets: usize,
    /// Days of simulated history per training market (TRAINER_DAYS_BACK).
    pub trainer_days_back: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            gamma_api_url: std::env::var("GAMMA_API_URL")
                .unwrap_or_else(|_| GAMMA_API_URL.to_string()),
            data_api_url: std::env::var("DATA_API_URL")
                .unwrap_or_else(|_| DATA_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "harpoon.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            model_path: std::env::var("AGENT_MODEL_PATH")
                .unwrap_or_else(|_| "weighted_buy_model.json".to_string()),
            max_opportunities: std::env::var("AGENT_MAX_OPPORTUNITIES")
                .unwrap_or_else(|_| "20".to_string())
                .parse::<usize>()
                .unwrap_or(20),
            scan_max_markets: std::env::var("AGENT_SCAN_MARKETS")
                .unwrap_or_else(|_| "50".to_string())
                .parse::<usize>()
                .unwrap_or(50),
            trainer_num_markets: std::env::var("TRAINER_NUM_MARKETS")
                .unwrap_or_else(|_| "100".to_string())
                .parse::<usize>()
                .unwrap_or(100),
            trainer_days_back: std::env::var("TRAINER_DAYS_BACK")
                .unwrap_or_else(|_| "7".to_string())
                .parse::<u32>()
                .unwrap_or(7),
        })
    }
}
