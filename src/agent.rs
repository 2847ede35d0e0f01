use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{error, info, warn};

use crate::config::{Config, LOOKBACK_HOURS, SCAN_INTERVAL_SECS, WHALE_TRADE_SIZE};
use crate::db::SignalDb;
use crate::error::Result;
use crate::fetcher::ExchangeFetcher;
use crate::flow;
use crate::ranker::OpportunityRanker;
use crate::state::{ScanReport, SignalStore};
use crate::types::{MarketSnapshot, MarketSummary, Sentiment, SentimentReport, TradeRecord};

/// Periodic scan loop: hydrate fresh market/trade state from the exchange,
/// compute flow metrics over the stored snapshot series, rank opportunities,
/// and publish the results to the in-memory store.
pub struct ScanAgent {
    cfg: Config,
    db: SignalDb,
    fetcher: ExchangeFetcher,
    ranker: OpportunityRanker,
    store: Arc<SignalStore>,
}

impl ScanAgent {
    pub fn new(
        cfg: Config,
        db: SignalDb,
        fetcher: ExchangeFetcher,
        ranker: OpportunityRanker,
        store: Arc<SignalStore>,
    ) -> Self {
        Self { cfg, db, fetcher, ranker, store }
    }

    pub async fn run(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(SCAN_INTERVAL_SECS));
        loop {
            interval.tick().await;
            if let Err(e) = self.scan_once().await {
                error!("scan pass failed: {e}");
            }
        }
    }

    pub async fn scan_once(&self) -> Result<()> {
        let now = now_secs();

        // Hydrate: fresh snapshots plus trades for the highest-volume markets.
        let (snapshots, _) = self.fetcher.fetch_markets(self.cfg.scan_max_markets).await?;
        for snapshot in &snapshots {
            self.db.insert_snapshot(snapshot).await?;
            match self.fetcher.fetch_trades(&snapshot.market_id, 100).await {
                Ok(trades) => self.db.insert_trades(&trades).await?,
                Err(e) => warn!(market_id = %snapshot.market_id, "trade hydration failed: {e}"),
            }
        }

        let cutoff = now - LOOKBACK_HOURS * 3600;
        let latest = self.db.latest_snapshots().await?;
        let trades = self.db.recent_trades(cutoff).await?;

        let mut markets = Vec::with_capacity(latest.len());
        for snapshot in latest {
            let series = self.db.price_series(&snapshot.market_id, cutoff).await?;
            let metrics = flow::compute(&series);
            markets.push((snapshot, metrics));
        }

        let opportunities = self.ranker.rank(&markets, &trades, now);
        info!(
            markets = markets.len(),
            opportunities = opportunities.len(),
            "scan pass complete"
        );

        let snapshots_only: Vec<&MarketSnapshot> = markets.iter().map(|(s, _)| s).collect();
        let summary = market_summary(&snapshots_only, &trades, now);
        let sentiment = market_sentiment(&markets, &trades, now, &self.ranker);

        self.store.replace_opportunities(opportunities);
        self.store.set_report(ScanReport {
            summary: Some(summary),
            sentiment: Some(sentiment),
            last_scan: now,
        });

        self.db.prune_before(now - 2 * LOOKBACK_HOURS * 3600).await?;
        Ok(())
    }
}

/// Aggregate view over the latest snapshots: totals, average price, whale
/// counts, and the cheap/expensive tails.
pub fn market_summary(
    snapshots: &[&MarketSnapshot],
    trades: &[TradeRecord],
    now_secs: i64,
) -> MarketSummary {
    let total_markets = snapshots.len();
    let total_volume_24h: f64 = snapshots.iter().map(|s| s.volume_24h).sum();
    let average_price = if total_markets > 0 {
        snapshots.iter().map(|s| s.yes_price).sum::<f64>() / total_markets as f64
    } else {
        0.0
    };

    let hour_ago = now_secs - 3600;
    let recent_trades = trades.iter().filter(|t| t.timestamp >= hour_ago).count();
    let whale_trades = trades.iter().filter(|t| t.size >= WHALE_TRADE_SIZE).count();

    MarketSummary {
        total_markets,
        total_volume_24h,
        average_price,
        recent_trades,
        whale_trades,
        low_price_markets: snapshots.iter().filter(|s| s.yes_price < 0.2).count(),
        high_price_markets: snapshots.iter().filter(|s| s.yes_price > 0.8).count(),
    }
}

/// Confidence-weighted sentiment over all scored markets: BUY votes +1,
/// SELL −1, HOLD 0, each weighted by the decision's confidence.
pub fn market_sentiment(
    markets: &[(MarketSnapshot, Option<flow::FlowMetrics>)],
    trades: &[TradeRecord],
    now_secs: i64,
    ranker: &OpportunityRanker,
) -> SentimentReport {
    let mut score = 0.0;
    let mut weight = 0.0;

    for (snapshot, metrics) in markets {
        let decision = ranker.scorer().score(snapshot, trades, metrics.as_ref(), now_secs);
        let vote = match decision.action {
            crate::types::Action::Buy => 1.0,
            crate::types::Action::Sell => -1.0,
            crate::types::Action::Hold => 0.0,
        };
        score += vote * decision.confidence;
        weight += decision.confidence;
    }

    let normalized = if weight > 0.0 { score / weight } else { 0.0 };
    let sentiment = if normalized > 0.2 {
        Sentiment::Bullish
    } else if normalized < -0.2 {
        Sentiment::Bearish
    } else {
        Sentiment::Neutral
    };

    SentimentReport {
        sentiment,
        confidence: normalized.abs(),
        score: normalized,
        total_markets: markets.len(),
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::HeuristicScorer;

    const NOW: i64 = 1_700_000_000;

    fn snapshot(id: &str, price: f64, volume: f64) -> MarketSnapshot {
        MarketSnapshot {
            market_id: id.to_string(),
            question: "Will the election matter?".to_string(),
            yes_price: price,
            volume_24h: volume,
            snapshot_time: NOW - 600,
            no_price: None,
            spread: None,
        }
    }

    #[test]
    fn summary_counts_tails_and_whales() {
        let snaps = [
            snapshot("a", 0.1, 100_000.0),
            snapshot("b", 0.5, 200_000.0),
            snapshot("c", 0.9, 300_000.0),
        ];
        let refs: Vec<&MarketSnapshot> = snaps.iter().collect();
        let trades = vec![
            TradeRecord { market_id: "a".to_string(), size: 15_000.0, timestamp: NOW - 100 },
            TradeRecord { market_id: "b".to_string(), size: 50.0, timestamp: NOW - 100 },
            TradeRecord { market_id: "c".to_string(), size: 50.0, timestamp: NOW - 7200 },
        ];
        let summary = market_summary(&refs, &trades, NOW);
        assert_eq!(summary.total_markets, 3);
        assert!((summary.total_volume_24h - 600_000.0).abs() < 1e-9);
        assert!((summary.average_price - 0.5).abs() < 1e-12);
        assert_eq!(summary.recent_trades, 2);
        assert_eq!(summary.whale_trades, 1);
        assert_eq!(summary.low_price_markets, 1);
        assert_eq!(summary.high_price_markets, 1);
    }

    #[test]
    fn empty_scan_is_neutral() {
        let ranker = OpportunityRanker::new(HeuristicScorer::new(), 20);
        let report = market_sentiment(&[], &[], NOW, &ranker);
        assert_eq!(report.sentiment, Sentiment::Neutral);
        assert_eq!(report.score, 0.0);
        assert_eq!(report.total_markets, 0);
    }

    #[test]
    fn buy_heavy_scan_reads_bullish() {
        let ranker = OpportunityRanker::new(HeuristicScorer::new(), 20);
        // Cheap, high-volume, whale-backed election markets all score BUY.
        let markets: Vec<(MarketSnapshot, Option<flow::FlowMetrics>)> = (0..3)
            .map(|i| (snapshot(&format!("m{i}"), 0.25, 2_500_000.0), None))
            .collect();
        let trades: Vec<TradeRecord> = (0..3)
            .flat_map(|i| {
                (0..12).map(move |j| TradeRecord {
                    market_id: format!("m{i}"),
                    size: 25_000.0,
                    timestamp: NOW - j,
                })
            })
            .collect();
        let report = market_sentiment(&markets, &trades, NOW, &ranker);
        assert_eq!(report.sentiment, Sentiment::Bullish);
        assert!(report.score > 0.2);
    }
}
