use tracing::{debug, warn};

use crate::config::{UNDERVALUED_MAX, UNDERVALUED_MIN};
use crate::flow::FlowMetrics;
use crate::scorer::HeuristicScorer;
use crate::types::{Action, MarketSnapshot, Opportunity, Outcome, RiskLevel, TradeRecord};

/// Turns scored markets into a ranked list of buy opportunities.
///
/// A market qualifies only when the scorer did not hold, confidence is above
/// 0.6, and exactly one side sits in the undervalued band. Both sides cheap
/// (or neither) means the market is ambiguous and is skipped.
pub struct OpportunityRanker {
    scorer: HeuristicScorer,
    limit: usize,
}

impl OpportunityRanker {
    pub fn new(scorer: HeuristicScorer, limit: usize) -> Self {
        Self { scorer, limit }
    }

    pub fn scorer(&self) -> &HeuristicScorer {
        &self.scorer
    }

    pub fn rank(
        &self,
        markets: &[(MarketSnapshot, Option<FlowMetrics>)],
        trades: &[TradeRecord],
        now_secs: i64,
    ) -> Vec<Opportunity> {
        let mut opportunities = Vec::new();

        for (snapshot, flow) in markets {
            match self.evaluate(snapshot, flow.as_ref(), trades, now_secs) {
                Some(op) => opportunities.push(op),
                None => debug!(market_id = %snapshot.market_id, "no opportunity"),
            }
        }

        opportunities.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(b.expected_return.total_cmp(&a.expected_return))
        });
        opportunities.truncate(self.limit);
        opportunities
    }

    fn evaluate(
        &self,
        snapshot: &MarketSnapshot,
        flow: Option<&FlowMetrics>,
        trades: &[TradeRecord],
        now_secs: i64,
    ) -> Option<Opportunity> {
        let decision = self.scorer.score(snapshot, trades, flow, now_secs);
        if decision.action == Action::Hold || decision.confidence <= 0.6 {
            return None;
        }

        let yes_price = snapshot.yes_price;
        let no_price = snapshot.no_price.unwrap_or(1.0 - yes_price);
        if !(0.0..=1.0).contains(&no_price) {
            warn!(market_id = %snapshot.market_id, no_price, "implied NO price out of range");
            return None;
        }

        let yes_cheap = is_undervalued(yes_price);
        let no_cheap = is_undervalued(no_price);
        let (outcome, buy_price) = match (yes_cheap, no_cheap) {
            (true, false) => (Outcome::Yes, yes_price),
            (false, true) => (Outcome::No, no_price),
            _ => return None,
        };

        let whale_activity = trades
            .iter()
            .filter(|t| t.market_id == snapshot.market_id && t.is_whale())
            .count();

        Some(Opportunity {
            market_id: snapshot.market_id.clone(),
            question: snapshot.question.clone(),
            outcome,
            buy_price,
            confidence: decision.confidence,
            expected_return: (1.0 - buy_price) / buy_price,
            risk_level: RiskLevel::from_volume(snapshot.volume_24h),
            signals: decision.signals,
            last_updated: snapshot.snapshot_time,
            volume_24h: snapshot.volume_24h,
            whale_activity,
        })
    }
}

fn is_undervalued(price: f64) -> bool {
    (UNDERVALUED_MIN..=UNDERVALUED_MAX).contains(&price)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn snapshot(id: &str, price: f64, volume: f64) -> MarketSnapshot {
        MarketSnapshot {
            market_id: id.to_string(),
            question: "Will the election outcome surprise markets?".to_string(),
            yes_price: price,
            volume_24h: volume,
            snapshot_time: NOW - 600,
            no_price: None,
            spread: None,
        }
    }

    fn whale_trades(id: &str, n: usize) -> Vec<TradeRecord> {
        (0..n)
            .map(|i| TradeRecord {
                market_id: id.to_string(),
                size: 25_000.0,
                timestamp: NOW - i as i64,
            })
            .collect()
    }

    fn ranker() -> OpportunityRanker {
        OpportunityRanker::new(HeuristicScorer::new(), 20)
    }

    #[test]
    fn cheap_yes_side_becomes_a_yes_opportunity() {
        // Undervalued price, big volume, whales, recent data, election topic:
        // confidence clears 0.7 and price 0.25 sits in the wide band.
        let markets = vec![(snapshot("m1", 0.25, 2_500_000.0), None)];
        let trades = whale_trades("m1", 12);
        let ops = ranker().rank(&markets, &trades, NOW);
        assert_eq!(ops.len(), 1);
        let op = &ops[0];
        assert_eq!(op.outcome, Outcome::Yes);
        assert!((op.buy_price - 0.25).abs() < 1e-12);
        assert!((op.expected_return - 3.0).abs() < 1e-12);
        assert_eq!(op.risk_level, RiskLevel::Low);
        assert_eq!(op.whale_activity, 12);
    }

    #[test]
    fn opportunity_carries_the_snapshot_time() {
        let snap = snapshot("m1", 0.25, 2_500_000.0);
        let snapshot_time = snap.snapshot_time;
        let trades = whale_trades("m1", 12);
        let ops = ranker().rank(&[(snap, None)], &trades, NOW);
        assert_eq!(ops[0].last_updated, snapshot_time);
        assert_ne!(ops[0].last_updated, NOW);
    }

    #[test]
    fn midpoint_market_has_no_undervalued_side() {
        // yes = 0.5 puts both sides at 0.5, outside [0.1, 0.4].
        let markets = vec![(snapshot("m1", 0.5, 2_500_000.0), None)];
        let trades = whale_trades("m1", 12);
        assert!(ranker().rank(&markets, &trades, NOW).is_empty());
    }

    #[test]
    fn both_sides_cheap_is_ambiguous() {
        // yes = 0.35 implies no = 0.65: only one side cheap, qualifies.
        // Force both cheap via an explicit quoted no price.
        let mut snap = snapshot("m1", 0.35, 2_500_000.0);
        snap.no_price = Some(0.35);
        let trades = whale_trades("m1", 12);
        assert!(ranker().rank(&[(snap, None)], &trades, NOW).is_empty());
    }

    #[test]
    fn expensive_market_never_qualifies() {
        // yes = 0.75 puts the NO side in the undervalued band, but the
        // buy-only decision holds outside it, so nothing is emitted.
        let markets = vec![(snapshot("m1", 0.75, 2_500_000.0), None)];
        let trades = whale_trades("m1", 12);
        assert!(ranker().rank(&markets, &trades, NOW).is_empty());
    }

    #[test]
    fn ranking_orders_by_confidence_then_return() {
        // m1: undervalued + whales + topic -> higher confidence than m2.
        let markets = vec![
            (snapshot("m2", 0.30, 2_500_000.0), None),
            (snapshot("m1", 0.20, 2_500_000.0), None),
        ];
        let mut trades = whale_trades("m1", 12);
        trades.extend(whale_trades("m2", 12));
        let ops = ranker().rank(&markets, &trades, NOW);
        assert_eq!(ops.len(), 2);
        assert!(ops[0].confidence >= ops[1].confidence);
        assert_eq!(ops[0].market_id, "m1");
    }

    #[test]
    fn limit_truncates_the_list() {
        let markets: Vec<_> = (0..5)
            .map(|i| (snapshot(&format!("m{i}"), 0.25, 2_500_000.0), None))
            .collect();
        let mut trades = Vec::new();
        for i in 0..5 {
            trades.extend(whale_trades(&format!("m{i}"), 12));
        }
        let ranker = OpportunityRanker::new(HeuristicScorer::new(), 3);
        assert_eq!(ranker.rank(&markets, &trades, NOW).len(), 3);
    }
}
