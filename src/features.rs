use crate::flow::FlowMetrics;
use crate::types::{MarketSnapshot, TradeRecord};

/// Realtime pipeline vector length. The realtime layout produces 32 semantic
/// slots and truncates to 30; the tail (acceleration, data-quality) falls
/// off. Changing either length invalidates previously trained models.
pub const REALTIME_FEATURES: usize = 30;
/// Buy-only training pipeline vector length.
pub const TRAINING_FEATURES: usize = 32;

/// Neutral values substituted for inputs the snapshot may omit. Scoring
/// degrades gracefully instead of failing when the source drops a field.
#[derive(Debug, Clone, Copy)]
pub struct FeatureDefaults {
    pub spread: f64,
}

impl Default for FeatureDefaults {
    fn default() -> Self {
        Self { spread: 0.02 }
    }
}

/// Which fixed schema to emit. The two layouts differ in volume scaling,
/// recency encoding, and the flow tail; they feed differently trained
/// models and must not be mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    Realtime,
    Training,
}

impl Pipeline {
    pub fn feature_count(self) -> usize {
        match self {
            Pipeline::Realtime => REALTIME_FEATURES,
            Pipeline::Training => TRAINING_FEATURES,
        }
    }
}

/// Keyword sets for the five topic-flag slots, matched case-insensitively as
/// substrings of the market question.
const TOPIC_FED_RATE: &[&str] = &["fed", "rate"];
const TOPIC_ELECTION: &[&str] = &["election", "trump", "biden"];
const TOPIC_AI: &[&str] = &["ai", "artificial intelligence"];
const TOPIC_CRYPTO: &[&str] = &["crypto", "bitcoin", "ethereum"];
const TOPIC_ECONOMY: &[&str] = &["recession", "economy"];

pub(crate) fn matches_any(question_lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| question_lower.contains(k))
}

pub(crate) fn is_fed_rate(question_lower: &str) -> bool {
    matches_any(question_lower, TOPIC_FED_RATE)
}

pub(crate) fn is_ai(question_lower: &str) -> bool {
    matches_any(question_lower, TOPIC_AI)
}

pub(crate) fn is_election(question_lower: &str) -> bool {
    matches_any(question_lower, TOPIC_ELECTION)
}

/// Deterministic mapping of one market's state to a fixed-length numeric
/// vector. Position encodes meaning; absent inputs become zeros (or the
/// configured defaults), and the output is always exactly
/// `pipeline.feature_count()` long.
#[derive(Debug, Clone)]
pub struct FeatureVectorBuilder {
    pipeline: Pipeline,
    defaults: FeatureDefaults,
}

impl FeatureVectorBuilder {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline, defaults: FeatureDefaults::default() }
    }

    pub fn with_defaults(pipeline: Pipeline, defaults: FeatureDefaults) -> Self {
        Self { pipeline, defaults }
    }

    pub fn feature_count(&self) -> usize {
        self.pipeline.feature_count()
    }

    /// `trades` may span all markets; only records matching the snapshot's
    /// market_id contribute. `now_secs` drives the recency slots in the
    /// realtime layout.
    pub fn build(
        &self,
        snapshot: &MarketSnapshot,
        trades: &[TradeRecord],
        flow: Option<&FlowMetrics>,
        now_secs: i64,
    ) -> Vec<f64> {
        let mut f = Vec::with_capacity(self.feature_count() + 2);

        let price = snapshot.yes_price;
        let volume = snapshot.volume_24h;

        // Slots 0-3: basics.
        f.push(price);
        match self.pipeline {
            Pipeline::Realtime => f.push(volume),
            Pipeline::Training => f.push(volume / 1_000_000.0),
        }
        f.push(snapshot.no_price.unwrap_or(1.0 - price));
        f.push(snapshot.spread.unwrap_or(self.defaults.spread));

        // Slots 4-8: one-hot price bucket.
        f.push(flag(price < 0.2));
        f.push(flag((0.2..0.4).contains(&price)));
        f.push(flag((0.4..0.6).contains(&price)));
        f.push(flag((0.6..0.8).contains(&price)));
        f.push(flag(price >= 0.8));

        // Slots 9-12: raw volume + tier flags.
        f.push(volume);
        f.push(flag(volume > 1_000_000.0));
        f.push(flag(volume > 500_000.0));
        f.push(flag(volume < 100_000.0));

        // Slots 13-16: trade activity for this market.
        let mut trade_count = 0usize;
        let mut whale_count = 0usize;
        let mut total_size = 0.0;
        let mut whale_size = 0.0;
        for t in trades.iter().filter(|t| t.market_id == snapshot.market_id) {
            trade_count += 1;
            total_size += t.size;
            if t.is_whale() {
                whale_count += 1;
                whale_size += t.size;
            }
        }
        f.push(trade_count as f64);
        f.push(whale_count as f64);
        f.push(total_size);
        f.push(whale_size);

        // Recency. Training data is synthesized fresh, so its layout carries
        // fixed recent/very-recent/not-stale flags instead of elapsed hours.
        match self.pipeline {
            Pipeline::Realtime => {
                let hours = hours_since(snapshot.snapshot_time, now_secs);
                f.push(hours);
                f.push(flag(hours < 1.0));
                f.push(flag(hours < 6.0));
                f.push(flag(hours > 12.0));
            }
            Pipeline::Training => {
                f.push(1.0);
                f.push(1.0);
                f.push(0.0);
            }
        }

        // Topic flags.
        let q = snapshot.question.to_lowercase();
        f.push(flag(matches_any(&q, TOPIC_FED_RATE)));
        f.push(flag(matches_any(&q, TOPIC_ELECTION)));
        f.push(flag(matches_any(&q, TOPIC_AI)));
        f.push(flag(matches_any(&q, TOPIC_CRYPTO)));
        f.push(flag(matches_any(&q, TOPIC_ECONOMY)));

        // Flow tail, zeros when no metrics are available.
        match flow {
            Some(m) => {
                f.push(m.price_change_pct);
                f.push(m.volume_spike_pct);
                f.push(m.price_volatility);
                f.push(m.trend_slope);
                f.push(m.acceleration);
                f.push(m.data_points as f64 / 100.0);
                if self.pipeline == Pipeline::Training {
                    f.push(m.price_range);
                }
            }
            None => {
                let tail = match self.pipeline {
                    Pipeline::Realtime => 6,
                    Pipeline::Training => 7,
                };
                f.extend(std::iter::repeat(0.0).take(tail));
            }
        }

        // Fix the length: truncate excess, zero-pad shortfall.
        let target = self.feature_count();
        f.truncate(target);
        f.resize(target, 0.0);
        f
    }
}

fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn hours_since(snapshot_time: i64, now_secs: i64) -> f64 {
    ((now_secs - snapshot_time) as f64 / 3600.0).max(0.0)
}
