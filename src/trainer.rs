use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::{Config, MIN_TRAINING_SAMPLES, TRAINING_FETCH_DELAY_MS};
use crate::error::{AppError, Result};
use crate::eval::{self, WeightedAccuracyReport};
use crate::features::{FeatureVectorBuilder, Pipeline};
use crate::fetcher::ExchangeFetcher;
use crate::flow;
use crate::history;
use crate::labeler::TrainingLabeler;
use crate::ml::{ForestClassifier, ForestConfig, LabelScheme, ModelArtifact, StandardScaler};
use crate::types::{MarketSnapshot, TradeRecord, TrainingSample};

/// Collects labelled training samples from live markets. Each market's
/// recent price path is simulated from its current price (the exchange
/// exposes no hourly candles), trades come from the data API, and the
/// buy-target labeler assigns label and weight. Markets that fail to fetch
/// are skipped, not fatal.
pub async fn collect_training_data(
    fetcher: &ExchangeFetcher,
    cfg: &Config,
) -> Result<Vec<TrainingSample>> {
    let (markets, _) = fetcher.fetch_markets(cfg.trainer_num_markets).await?;
    info!("collecting training data from {} markets", markets.len());

    let builder = FeatureVectorBuilder::new(Pipeline::Training);
    let mut samples = Vec::new();

    for (i, snapshot) in markets.iter().enumerate() {
        let trades = match fetcher.fetch_trades(&snapshot.market_id, 200).await {
            Ok(t) => t,
            Err(e) => {
                warn!(market_id = %snapshot.market_id, "trade fetch failed, skipping: {e}");
                continue;
            }
        };

        if let Some(sample) = build_sample(&builder, snapshot, &trades, cfg.trainer_days_back) {
            samples.push(sample);
        }

        if i + 1 < markets.len() {
            tokio::time::sleep(Duration::from_millis(TRAINING_FETCH_DELAY_MS)).await;
        }
    }

    info!(
        "collected {} samples ({} buy targets)",
        samples.len(),
        samples.iter().filter(|s| s.label == 1).count()
    );
    Ok(samples)
}

fn build_sample(
    builder: &FeatureVectorBuilder,
    snapshot: &MarketSnapshot,
    trades: &[TradeRecord],
    days_back: u32,
) -> Option<TrainingSample> {
    let prices = history::simulate_price_history(
        snapshot.yes_price,
        days_back,
        market_seed(&snapshot.market_id),
    );
    let metrics = match flow::compute(&prices) {
        Some(m) => m,
        None => {
            debug!(market_id = %snapshot.market_id, "insufficient price history");
            return None;
        }
    };

    let (label, confidence_weight) =
        TrainingLabeler::create_buy_target(&metrics, trades, snapshot.yes_price);
    let features = builder.build(snapshot, trades, Some(&metrics), snapshot.snapshot_time);

    Some(TrainingSample { features, label, confidence_weight })
}

fn market_seed(market_id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    market_id.hash(&mut hasher);
    hasher.finish()
}

/// Trains the buy-target forest on collected samples and evaluates it on a
/// held-out split. Fails below the sample floor rather than fitting a model
/// that would only memorize noise.
pub fn train_and_evaluate(
    samples: &[TrainingSample],
    seed: u64,
) -> Result<(ModelArtifact, WeightedAccuracyReport)> {
    if samples.len() < MIN_TRAINING_SAMPLES {
        return Err(AppError::Training(format!(
            "{} samples collected, need at least {MIN_TRAINING_SAMPLES}",
            samples.len()
        )));
    }

    let mut indices: Vec<usize> = (0..samples.len()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let split = (samples.len() as f64 * 0.8) as usize;
    let (train_idx, test_idx) = indices.split_at(split);

    let train_rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| samples[i].features.clone()).collect();
    let train_labels: Vec<usize> = train_idx.iter().map(|&i| samples[i].label as usize).collect();

    let scaler = StandardScaler::fit(&train_rows)?;
    let scaled_train = scaler.transform_all(&train_rows)?;

    let config = ForestConfig { seed, ..ForestConfig::default() };
    let mut forest = ForestClassifier::new(config);
    forest.fit(&scaled_train, &train_labels);

    let mut y_true = Vec::with_capacity(test_idx.len());
    let mut y_pred = Vec::with_capacity(test_idx.len());
    let mut weights = Vec::with_capacity(test_idx.len());
    for &i in test_idx {
        let scaled = scaler.transform(&samples[i].features)?;
        y_true.push(samples[i].label);
        y_pred.push(forest.predict(&scaled) as u8);
        weights.push(samples[i].confidence_weight);
    }
    let report = eval::evaluate(&y_true, &y_pred, &weights);

    let feature_count = samples[0].features.len();
    let trained_at = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    let artifact = ModelArtifact {
        scaler,
        forest,
        feature_count,
        label_scheme: LabelScheme::BuyOnly,
        trained_at,
    };

    Ok((artifact, report))
}
