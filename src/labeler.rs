use crate::flow::FlowMetrics;
use crate::types::TradeRecord;

/// Labels historical market states for supervised training.
///
/// The rule is deliberately independent of the live scorer: it accumulates
/// its own confidence in [0, 1] and emits a buy-only label. The confidence
/// itself survives as the sample's weight so the evaluator can favour
/// high-conviction labels.
pub struct TrainingLabeler;

impl TrainingLabeler {
    /// Returns (label, confidence_weight). label = 1 means buy-target.
    pub fn create_buy_target(
        flow: &FlowMetrics,
        trades: &[TradeRecord],
        current_price: f64,
    ) -> (u8, f64) {
        let mut confidence: f64 = 0.0;

        confidence += match flow.price_change_pct {
            c if c > 0.15 => 0.3,
            c if c > 0.08 => 0.2,
            c if c > 0.03 => 0.1,
            _ => 0.0,
        };

        confidence += match flow.volume_spike_pct {
            s if s > 1.0 => 0.25,
            s if s > 0.5 => 0.15,
            s if s > 0.2 => 0.1,
            _ => 0.0,
        };

        confidence += match flow.price_volatility {
            v if v > 0.1 => 0.1,
            v if v > 0.05 => 0.05,
            _ => 0.0,
        };

        confidence += match current_price {
            p if p < 0.2 => 0.2,
            p if p < 0.3 => 0.15,
            p if p < 0.4 => 0.1,
            _ => 0.0,
        };

        let whales = trades.iter().filter(|t| t.is_whale()).count();
        confidence += match whales {
            w if w > 5 => 0.15,
            w if w > 2 => 0.1,
            w if w > 0 => 0.05,
            _ => 0.0,
        };

        let confidence = confidence.min(1.0);
        let label = u8::from(confidence > 0.4);
        (label, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(change: f64, spike: f64, volatility: f64) -> FlowMetrics {
        FlowMetrics {
            current_price: 0.5,
            price_change_pct: change,
            volume_spike_pct: spike,
            price_volatility: volatility,
            trend_slope: 0.0,
            acceleration: 0.0,
            data_points: 5,
            max_price: 0.6,
            min_price: 0.4,
            price_range: 0.2,
        }
    }

    fn whales(n: usize) -> Vec<TradeRecord> {
        (0..n)
            .map(|i| TradeRecord {
                market_id: "m".to_string(),
                size: 15_000.0,
                timestamp: i as i64,
            })
            .collect()
    }

    #[test]
    fn quiet_market_is_not_a_buy_target() {
        let (label, weight) = TrainingLabeler::create_buy_target(&metrics(0.0, 0.0, 0.0), &[], 0.5);
        assert_eq!(label, 0);
        assert_eq!(weight, 0.0);
    }

    #[test]
    fn strong_momentum_and_cheap_price_cross_the_threshold() {
        // +0.3 momentum, +0.2 price: 0.5 > 0.4.
        let (label, weight) =
            TrainingLabeler::create_buy_target(&metrics(0.2, 0.0, 0.0), &[], 0.15);
        assert_eq!(label, 1);
        assert!((weight - 0.5).abs() < 1e-12);
    }

    #[test]
    fn weight_is_capped_at_one() {
        // Every tier maxed: 0.3 + 0.25 + 0.1 + 0.2 + 0.15 = 1.0, whales > 5.
        let (label, weight) =
            TrainingLabeler::create_buy_target(&metrics(0.2, 1.5, 0.15), &whales(6), 0.15);
        assert_eq!(label, 1);
        assert!(weight <= 1.0);
    }

    #[test]
    fn moderate_signals_stay_below_the_threshold() {
        // +0.1 momentum + 0.1 price = 0.2: not a buy.
        let (label, weight) =
            TrainingLabeler::create_buy_target(&metrics(0.05, 0.0, 0.0), &[], 0.35);
        assert_eq!(label, 0);
        assert!(weight < 0.4);
    }

    #[test]
    fn whale_tiers_accumulate() {
        let base = TrainingLabeler::create_buy_target(&metrics(0.0, 0.0, 0.0), &[], 0.5).1;
        let one = TrainingLabeler::create_buy_target(&metrics(0.0, 0.0, 0.0), &whales(1), 0.5).1;
        let four = TrainingLabeler::create_buy_target(&metrics(0.0, 0.0, 0.0), &whales(4), 0.5).1;
        let six = TrainingLabeler::create_buy_target(&metrics(0.0, 0.0, 0.0), &whales(6), 0.5).1;
        assert!((one - base - 0.05).abs() < 1e-12);
        assert!((four - base - 0.1).abs() < 1e-12);
        assert!((six - base - 0.15).abs() < 1e-12);
    }
}
