use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct SnapshotRow {
    pub market_id: String,
    pub question: String,
    pub yes_price: f64,
    pub no_price: Option<f64>,
    pub spread: Option<f64>,
    pub volume_24h: f64,
    pub snapshot_time: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct TradeRow {
    pub market_id: String,
    pub size: f64,
    pub timestamp: i64,
}
