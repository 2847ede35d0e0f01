use tracing::debug;

use crate::db::models::{SnapshotRow, TradeRow};
use crate::error::Result;
use crate::types::{MarketSnapshot, PriceSample, TradeRecord};

/// SQLite-backed store for market snapshots and trades. The agent appends on
/// every scan and reads back per-market series to compute flow metrics.
#[derive(Clone)]
pub struct SignalDb {
    pool: sqlx::SqlitePool,
}

impl SignalDb {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert_snapshot(&self, s: &MarketSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO snapshots (market_id, question, yes_price, no_price, spread, volume_24h, snapshot_time)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&s.market_id)
        .bind(&s.question)
        .bind(s.yes_price)
        .bind(s.no_price)
        .bind(s.spread)
        .bind(s.volume_24h)
        .bind(s.snapshot_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_trades(&self, trades: &[TradeRecord]) -> Result<()> {
        for t in trades {
            sqlx::query(
                "INSERT OR IGNORE INTO trades (market_id, size, timestamp) VALUES (?, ?, ?)",
            )
            .bind(&t.market_id)
            .bind(t.size)
            .bind(t.timestamp)
            .execute(&self.pool)
            .await?;
        }
        debug!(count = trades.len(), "persisted trades");
        Ok(())
    }

    /// Latest snapshot per market, across all tracked markets.
    pub async fn latest_snapshots(&self) -> Result<Vec<MarketSnapshot>> {
        let rows: Vec<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT s.market_id, s.question, s.yes_price, s.no_price, s.spread, s.volume_24h, s.snapshot_time
            FROM snapshots s
            JOIN (
                SELECT market_id, MAX(snapshot_time) AS latest
                FROM snapshots
                GROUP BY market_id
            ) m ON s.market_id = m.market_id AND s.snapshot_time = m.latest
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(snapshot_from_row).collect())
    }

    /// Chronological price series for one market within the lookback window.
    pub async fn price_series(&self, market_id: &str, since: i64) -> Result<Vec<PriceSample>> {
        let rows: Vec<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT market_id, question, yes_price, no_price, spread, volume_24h, snapshot_time
            FROM snapshots
            WHERE market_id = ? AND snapshot_time >= ?
            ORDER BY snapshot_time ASC
            "#,
        )
        .bind(market_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| PriceSample {
                price: r.yes_price,
                volume: r.volume_24h,
                timestamp: r.snapshot_time,
            })
            .collect())
    }

    /// All trades newer than the cutoff, across markets.
    pub async fn recent_trades(&self, since: i64) -> Result<Vec<TradeRecord>> {
        let rows: Vec<TradeRow> = sqlx::query_as(
            "SELECT market_id, size, timestamp FROM trades WHERE timestamp >= ? ORDER BY timestamp DESC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TradeRecord {
                market_id: r.market_id,
                size: r.size,
                timestamp: r.timestamp,
            })
            .collect())
    }

    /// Drops snapshot and trade rows older than the cutoff.
    pub async fn prune_before(&self, cutoff: i64) -> Result<u64> {
        let snaps = sqlx::query("DELETE FROM snapshots WHERE snapshot_time < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();
        let trades = sqlx::query("DELETE FROM trades WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(snaps + trades)
    }
}

fn snapshot_from_row(r: SnapshotRow) -> MarketSnapshot {
    MarketSnapshot {
        market_id: r.market_id,
        question: r.question,
        yes_price: r.yes_price,
        volume_24h: r.volume_24h,
        snapshot_time: r.snapshot_time,
        no_price: r.no_price,
        spread: r.spread,
    }
}
