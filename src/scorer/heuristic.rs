use std::sync::Arc;

use tracing::debug;

use crate::config::{CONFIDENCE_CEIL, CONFIDENCE_FLOOR};
use crate::features::{self, FeatureVectorBuilder, Pipeline};
use crate::flow::FlowMetrics;
use crate::ml::ClassifierAdapter;
use crate::scorer::rules::{self, first_match};
use crate::types::{Action, Decision, MarketSnapshot, TradeRecord};

/// Rule-based confidence accumulator. Confidence starts at zero; each
/// category's tier table is folded in order (first match wins within a
/// category, categories are independent), then the optional classifier blend
/// is applied and the result is clamped to [0.05, 0.95].
///
/// The decision is buy-only: SELL is never emitted heuristically.
pub struct HeuristicScorer {
    builder: FeatureVectorBuilder,
    adapter: Option<Arc<ClassifierAdapter>>,
}

impl HeuristicScorer {
    pub fn new() -> Self {
        Self { builder: FeatureVectorBuilder::new(Pipeline::Realtime), adapter: None }
    }

    /// Scorer with a classifier blended in. The adapter is injected by the
    /// caller; the scorer never touches the filesystem.
    pub fn with_classifier(adapter: Arc<ClassifierAdapter>) -> Self {
        Self {
            builder: FeatureVectorBuilder::new(Pipeline::Realtime),
            adapter: Some(adapter),
        }
    }

    pub fn score(
        &self,
        snapshot: &MarketSnapshot,
        trades: &[TradeRecord],
        flow: Option<&FlowMetrics>,
        now_secs: i64,
    ) -> Decision {
        let mut confidence = 0.0;
        let mut signals = Vec::new();

        let apply = |tier: Option<&rules::Tier>, conf: &mut f64, sigs: &mut Vec<String>| {
            if let Some(t) = tier {
                *conf += t.delta;
                sigs.push(t.label.to_string());
            }
        };

        apply(first_match(rules::PRICE_LEVEL, snapshot.yes_price), &mut confidence, &mut signals);
        apply(first_match(rules::VOLUME, snapshot.volume_24h), &mut confidence, &mut signals);

        // Whale tiers only apply when trade data was supplied at all; an
        // empty feed says nothing about whale absence.
        if !trades.is_empty() {
            let whales = trades
                .iter()
                .filter(|t| t.market_id == snapshot.market_id && t.is_whale())
                .count();
            apply(first_match(rules::WHALE_ACTIVITY, whales as f64), &mut confidence, &mut signals);
        }

        let hours = ((now_secs - snapshot.snapshot_time) as f64 / 3600.0).max(0.0);
        apply(first_match(rules::RECENCY, hours), &mut confidence, &mut signals);

        // Topic bonuses are independent, not tiered.
        let q = snapshot.question.to_lowercase();
        if features::is_fed_rate(&q) {
            confidence += 0.1;
            signals.push("Fed market - high volatility".to_string());
        }
        if features::is_ai(&q) {
            confidence += 0.1;
            signals.push("AI market - trending".to_string());
        }
        if features::is_election(&q) {
            confidence += 0.1;
            signals.push("Election market - high interest".to_string());
        }

        if let Some(m) = flow {
            self.apply_flow_rules(m, &mut confidence, &mut signals);
        }

        if let Some(adapter) = &self.adapter {
            self.blend_classifier(adapter, snapshot, trades, flow, now_secs, &mut confidence, &mut signals);
        }

        let confidence = confidence.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEIL);
        let action = decide(confidence, snapshot.yes_price);

        Decision { action, confidence, signals }
    }

    fn apply_flow_rules(&self, m: &FlowMetrics, confidence: &mut f64, signals: &mut Vec<String>) {
        if let Some(t) = first_match(rules::MOMENTUM, m.price_change_pct) {
            *confidence += t.delta;
            signals.push(format!("{} ({:+.1}%)", t.label, m.price_change_pct * 100.0));
        }

        if let Some(t) = first_match(rules::VOLUME_SPIKE, m.volume_spike_pct) {
            *confidence += t.delta;
            signals.push(format!("{} (+{:.0}%)", t.label, m.volume_spike_pct * 100.0));
        }

        // Trend and acceleration are a joint rule, not a single-value tier.
        if m.trend_slope > 0.002 && m.acceleration > 0.001 {
            *confidence += 0.25;
            signals.push("Accelerating trend".to_string());
        } else if m.trend_slope > 0.001 {
            *confidence += 0.15;
            signals.push("Upward trend".to_string());
        } else if m.trend_slope < -0.001 {
            *confidence -= 0.10;
            signals.push("Downward trend".to_string());
        }

        if m.price_volatility > 0.08 {
            *confidence += 0.10;
            signals.push("High volatility".to_string());
        }

        if m.data_points >= 10 {
            *confidence += 0.05;
            signals.push("Strong data history".to_string());
        }
    }

    /// "Not available" and "failed" both degrade to heuristic-only scoring,
    /// but failures are visible in the logs instead of silently swallowed.
    #[allow(clippy::too_many_arguments)]
    fn blend_classifier(
        &self,
        adapter: &ClassifierAdapter,
        snapshot: &MarketSnapshot,
        trades: &[TradeRecord],
        flow: Option<&FlowMetrics>,
        now_secs: i64,
        confidence: &mut f64,
        signals: &mut Vec<String>,
    ) {
        let features = self.builder.build(snapshot, trades, flow, now_secs);
        match adapter.predict(&features) {
            Ok(pred) => {
                let p = pred.top_probability();
                if p > 0.7 {
                    *confidence += p * 0.3;
                    signals.push(format!(
                        "ML prediction: {} ({:.1}%)",
                        adapter.action_label(pred.class),
                        p * 100.0
                    ));
                }
            }
            Err(e) => {
                debug!(market_id = %snapshot.market_id, "classifier unavailable: {e}");
            }
        }
    }
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Buy-only decision bands: high confidence allows the wider undervalued
/// range, moderate confidence only the conservative one.
fn decide(confidence: f64, price: f64) -> Action {
    if confidence > 0.7 && (0.1..=0.4).contains(&price) {
        Action::Buy
    } else if confidence > 0.6 && (0.15..=0.35).contains(&price) {
        Action::Buy
    } else {
        Action::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow;
    use crate::types::PriceSample;

    const NOW: i64 = 1_700_000_000;

    fn snapshot(price: f64, volume: f64, age_secs: i64) -> MarketSnapshot {
        MarketSnapshot {
            market_id: "m1".to_string(),
            question: "Will something happen?".to_string(),
            yes_price: price,
            volume_24h: volume,
            snapshot_time: NOW - age_secs,
            no_price: None,
            spread: None,
        }
    }

    fn whale_trades(n: usize) -> Vec<TradeRecord> {
        (0..n)
            .map(|i| TradeRecord {
                market_id: "m1".to_string(),
                size: 20_000.0,
                timestamp: NOW - i as i64,
            })
            .collect()
    }

    #[test]
    fn confidence_is_always_clamped() {
        let scorer = HeuristicScorer::new();

        // Every positive category stacked: would exceed 0.95 raw.
        let mut snap = snapshot(0.05, 3_000_000.0, 600);
        snap.question = "Will the Fed cut rates before the election and boost AI?".to_string();
        let samples: Vec<PriceSample> = (0..12)
            .map(|i| PriceSample {
                price: 0.05 + i as f64 * 0.02,
                volume: if i == 11 { 10_000.0 } else { 1_000.0 },
                timestamp: NOW - (12 - i) * 3600,
            })
            .collect();
        let metrics = flow::compute(&samples).unwrap();
        let d = scorer.score(&snap, &whale_trades(12), Some(&metrics), NOW);
        assert!(d.confidence <= 0.95);

        // Every negative category stacked: would go below 0.05 raw.
        let snap = snapshot(0.5, 50_000.0, 24 * 3600);
        let d = scorer.score(&snap, &[], None, NOW);
        assert!(d.confidence >= 0.05);
    }

    #[test]
    fn price_and_volume_tiers_are_exclusive_within_category() {
        let scorer = HeuristicScorer::new();
        // price 0.05 matches both <0.1 and <0.2 tiers; only the first fires.
        let d = scorer.score(&snapshot(0.05, 300_000.0, 2 * 3600), &[], None, NOW);
        let undervalued: Vec<_> = d
            .signals
            .iter()
            .filter(|s| s.contains("undervalued") || s.contains("Undervalued"))
            .collect();
        assert_eq!(undervalued.len(), 1);
        assert_eq!(undervalued[0], "Extremely undervalued");
    }

    #[test]
    fn empty_trade_feed_skips_whale_category() {
        let scorer = HeuristicScorer::new();
        let d = scorer.score(&snapshot(0.5, 300_000.0, 2 * 3600), &[], None, NOW);
        assert!(!d.signals.iter().any(|s| s.contains("whale activity")));

        // Any trade feed at all, even without whales for this market,
        // triggers the category (penalty tier).
        let other = vec![TradeRecord { market_id: "other".to_string(), size: 5.0, timestamp: NOW }];
        let d = scorer.score(&snapshot(0.5, 300_000.0, 2 * 3600), &other, None, NOW);
        assert!(d.signals.iter().any(|s| s == "No whale activity"));
    }

    #[test]
    fn topic_bonuses_stack_independently() {
        let scorer = HeuristicScorer::new();
        let mut base = snapshot(0.5, 300_000.0, 2 * 3600);
        base.question = "Neutral question".to_string();
        let base_conf = scorer.score(&base, &[], None, NOW).confidence;

        let mut multi = base.clone();
        multi.question = "Will the Fed rate decision before the election affect AI?".to_string();
        let d = scorer.score(&multi, &[], None, NOW);
        assert!((d.confidence - (base_conf + 0.3)).abs() < 1e-9);
        assert!(d.signals.iter().any(|s| s.starts_with("Fed market")));
        assert!(d.signals.iter().any(|s| s.starts_with("AI market")));
        assert!(d.signals.iter().any(|s| s.starts_with("Election market")));
    }

    #[test]
    fn buy_requires_band_and_confidence() {
        // conf > 0.7 inside [0.1, 0.4] buys.
        assert_eq!(decide(0.75, 0.25), Action::Buy);
        assert_eq!(decide(0.75, 0.12), Action::Buy);
        // conf in (0.6, 0.7] needs the conservative band.
        assert_eq!(decide(0.65, 0.25), Action::Buy);
        assert_eq!(decide(0.65, 0.12), Action::Hold);
        // High confidence outside any band holds.
        assert_eq!(decide(0.9, 0.55), Action::Hold);
        // Low confidence always holds.
        assert_eq!(decide(0.5, 0.25), Action::Hold);
    }

    #[test]
    fn sell_is_never_emitted() {
        let scorer = HeuristicScorer::new();
        // Extremely overvalued market with every bearish flow input.
        let samples: Vec<PriceSample> = (0..8)
            .map(|i| PriceSample {
                price: 0.95 - i as f64 * 0.03,
                volume: 1_000.0,
                timestamp: NOW - (8 - i) * 3600,
            })
            .collect();
        let metrics = flow::compute(&samples).unwrap();
        let d = scorer.score(&snapshot(0.92, 2_500_000.0, 600), &[], Some(&metrics), NOW);
        assert_ne!(d.action, Action::Sell);
    }

    #[test]
    fn classifier_shape_mismatch_degrades_to_heuristic() {
        use crate::ml::{
            ClassifierAdapter, ForestClassifier, ForestConfig, LabelScheme, ModelArtifact,
            StandardScaler,
        };

        // A 5-feature artifact can never score the 30-slot realtime vectors;
        // the blend must fail per prediction and leave the decision untouched.
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| (0..5).map(|j| i as f64 + j as f64 * 0.1).collect())
            .collect();
        let labels: Vec<usize> = (0..20).map(|i| i % 2).collect();
        let scaler = StandardScaler::fit(&rows).unwrap();
        let scaled = scaler.transform_all(&rows).unwrap();
        let mut forest = ForestClassifier::new(ForestConfig {
            n_trees: 5,
            max_depth: 3,
            ..ForestConfig::default()
        });
        forest.fit(&scaled, &labels);
        let artifact = ModelArtifact {
            scaler,
            forest,
            feature_count: 5,
            label_scheme: LabelScheme::BuyOnly,
            trained_at: 0,
        };
        let adapter = Arc::new(ClassifierAdapter::new(artifact).unwrap());

        let snap = snapshot(0.25, 300_000.0, 2 * 3600);
        let plain = HeuristicScorer::new().score(&snap, &[], None, NOW);
        let blended =
            HeuristicScorer::with_classifier(adapter).score(&snap, &[], None, NOW);
        assert_eq!(plain.confidence, blended.confidence);
        assert!(!blended.signals.iter().any(|s| s.starts_with("ML prediction")));
    }

    #[test]
    fn absent_flow_contributes_nothing() {
        let scorer = HeuristicScorer::new();
        let snap = snapshot(0.5, 300_000.0, 2 * 3600);
        let without = scorer.score(&snap, &[], None, NOW);
        assert!(!without.signals.iter().any(|s| s.contains("momentum") || s.contains("trend")));
    }

    #[test]
    fn flow_momentum_signal_carries_the_observed_value() {
        let scorer = HeuristicScorer::new();
        let samples: Vec<PriceSample> = [0.20, 0.22, 0.25, 0.30]
            .iter()
            .enumerate()
            .map(|(i, &p)| PriceSample { price: p, volume: 1_000.0, timestamp: NOW + i as i64 })
            .collect();
        let metrics = flow::compute(&samples).unwrap();
        let d = scorer.score(&snapshot(0.30, 300_000.0, 2 * 3600), &[], Some(&metrics), NOW);
        assert!(d.signals.iter().any(|s| s.starts_with("Strong momentum (+50.0%)")), "{:?}", d.signals);
    }
}
