use serde::{Deserialize, Serialize};

use crate::config::WHALE_TRADE_SIZE;

// ---------------------------------------------------------------------------
// Raw inputs
// ---------------------------------------------------------------------------

/// One point of a per-market price/volume time series. Insertion order is
/// chronological order; `price` is the YES-outcome quote in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceSample {
    pub price: f64,
    pub volume: f64,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Latest known state of one market. Immutable once produced by the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub market_id: String,
    pub question: String,
    pub yes_price: f64,
    pub volume_24h: f64,
    /// Unix seconds.
    pub snapshot_time: i64,
    pub no_price: Option<f64>,
    pub spread: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub market_id: String,
    pub size: f64,
    /// Unix seconds.
    pub timestamp: i64,
}

impl TradeRecord {
    pub fn is_whale(&self) -> bool {
        self.size >= WHALE_TRADE_SIZE
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        };
        write!(f, "{s}")
    }
}

/// Output of the heuristic scorer for one market. `confidence` is always
/// inside [0.05, 0.95]; `signals` are ordered by rule evaluation order.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub action: Action,
    pub confidence: f64,
    pub signals: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Yes,
    No,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Yes => write!(f, "YES"),
            Outcome::No => write!(f, "NO"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_volume(volume_24h: f64) -> Self {
        use crate::config::risk_thresholds::*;
        if volume_24h < HIGH_BELOW {
            RiskLevel::High
        } else if volume_24h < MEDIUM_BELOW {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        };
        write!(f, "{s}")
    }
}

/// A market that cleared the ranking filters. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    pub market_id: String,
    pub question: String,
    pub outcome: Outcome,
    pub buy_price: f64,
    pub confidence: f64,
    pub expected_return: f64,
    pub risk_level: RiskLevel,
    pub signals: Vec<String>,
    /// Unix seconds of the snapshot the decision was made from.
    pub last_updated: i64,
    pub volume_24h: f64,
    pub whale_activity: usize,
}

// ---------------------------------------------------------------------------
// Training
// ---------------------------------------------------------------------------

/// One supervised sample: fixed-length feature vector, binary BUY label, and
/// the labeler's confidence kept as the evaluation weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSample {
    pub features: Vec<f64>,
    /// 1 = BUY, 0 = NO-BUY.
    pub label: u8,
    pub confidence_weight: f64,
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MarketSummary {
    pub total_markets: usize,
    pub total_volume_24h: f64,
    pub average_price: f64,
    pub recent_trades: usize,
    pub whale_trades: usize,
    pub low_price_markets: usize,
    pub high_price_markets: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

/// Confidence-weighted sentiment across all scored markets.
#[derive(Debug, Clone, Serialize)]
pub struct SentimentReport {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub score: f64,
    pub total_markets: usize,
}
