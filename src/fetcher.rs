use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::config::{
    Config, FETCH_MAX_RETRIES, FETCH_RETRY_BACKOFF_MS, RATE_LIMIT_BACKOFF_MS,
    TRAINING_MIN_VOLUME,
};
use crate::error::{AppError, Result};
use crate::types::{MarketSnapshot, TradeRecord};

#[derive(Debug, Default)]
pub struct FetchStats {
    pub api_total: usize,
    pub rejected_no_id: usize,
    pub rejected_closed: usize,
    pub rejected_low_volume: usize,
    pub rejected_degenerate_price: usize,
    pub qualified: usize,
}

pub struct ExchangeFetcher {
    client: reqwest::Client,
    gamma_api_url: String,
    data_api_url: String,
}

impl ExchangeFetcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            gamma_api_url: cfg.gamma_api_url.clone(),
            data_api_url: cfg.data_api_url.clone(),
        })
    }

    /// Fetch active markets ordered by 24h volume, applying quality filters.
    /// Pages until `max_markets` qualified markets are collected or the API
    /// runs out. Used both for agent hydration and training collection.
    pub async fn fetch_markets(&self, max_markets: usize) -> Result<(Vec<MarketSnapshot>, FetchStats)> {
        let now = now_secs();
        let mut markets = Vec::new();
        let mut stats = FetchStats::default();
        let mut offset = 0usize;
        let page_size = 100usize;

        'outer: loop {
            let url = format!(
                "{}/markets?active=true&closed=false&limit={}&offset={}&order=volume24hr&ascending=false",
                self.gamma_api_url, page_size, offset
            );

            let resp = self.get_with_retry(&url).await?;
            let items = match resp.as_array() {
                Some(a) => a.clone(),
                None => {
                    return Err(AppError::Exchange(
                        "markets response was not an array".to_string(),
                    ))
                }
            };

            if items.is_empty() {
                break;
            }
            stats.api_total += items.len();

            for item in &items {
                match parse_market_checked(item, now) {
                    Ok(snapshot) => {
                        markets.push(snapshot);
                        if markets.len() >= max_markets {
                            break 'outer;
                        }
                    }
                    Err(rejection) => match rejection {
                        Rejection::NoId => stats.rejected_no_id += 1,
                        Rejection::Closed => stats.rejected_closed += 1,
                        Rejection::LowVolume => stats.rejected_low_volume += 1,
                        Rejection::DegeneratePrice => stats.rejected_degenerate_price += 1,
                    },
                }
            }

            if items.len() < page_size {
                break;
            }
            offset += page_size;
        }

        stats.qualified = markets.len();
        info!(
            "fetched {} markets ({} seen, {} low-volume, {} degenerate)",
            stats.qualified, stats.api_total, stats.rejected_low_volume,
            stats.rejected_degenerate_price
        );
        Ok((markets, stats))
    }

    /// Fetch a single market snapshot by id.
    pub async fn fetch_market(&self, market_id: &str) -> Result<MarketSnapshot> {
        let url = format!("{}/markets/{}", self.gamma_api_url, market_id);
        let resp = self.get_with_retry(&url).await?;
        parse_market_checked(&resp, now_secs())
            .map_err(|_| AppError::Exchange(format!("market {market_id} failed validation")))
    }

    /// Fetch recent trades for a market from the data API.
    pub async fn fetch_trades(&self, market_id: &str, limit: usize) -> Result<Vec<TradeRecord>> {
        let url = format!(
            "{}/trades?market={}&limit={}",
            self.data_api_url, market_id, limit
        );
        let resp = self.get_with_retry(&url).await?;

        let items = match resp.as_array() {
            Some(a) => a,
            None => return Ok(Vec::new()),
        };

        let trades = items
            .iter()
            .filter_map(|t| parse_trade(t, market_id))
            .collect::<Vec<_>>();
        debug!(market_id, count = trades.len(), "fetched trades");
        Ok(trades)
    }

    /// GET with bounded retries: 429 waits the rate-limit backoff, transport
    /// errors wait the shorter retry backoff. The last error propagates.
    async fn get_with_retry(&self, url: &str) -> Result<serde_json::Value> {
        let mut last_err: Option<AppError> = None;

        for attempt in 0..FETCH_MAX_RETRIES {
            match self.client.get(url).send().await {
                Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    warn!(url, attempt, "rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(RATE_LIMIT_BACKOFF_MS)).await;
                    last_err = Some(AppError::Exchange("rate limited".to_string()));
                }
                Ok(resp) => match resp.error_for_status() {
                    Ok(resp) => return Ok(resp.json().await?),
                    Err(e) => {
                        debug!(url, attempt, "http status error: {e}");
                        tokio::time::sleep(Duration::from_millis(FETCH_RETRY_BACKOFF_MS)).await;
                        last_err = Some(e.into());
                    }
                },
                Err(e) => {
                    debug!(url, attempt, "transport error: {e}");
                    tokio::time::sleep(Duration::from_millis(FETCH_RETRY_BACKOFF_MS)).await;
                    last_err = Some(e.into());
                }
            }
        }

        Err(last_err.unwrap_or_else(|| AppError::Exchange("request failed".to_string())))
    }
}

#[derive(Debug)]
enum Rejection {
    NoId,
    Closed,
    LowVolume,
    DegeneratePrice,
}

fn parse_market_checked(
    v: &serde_json::Value,
    now_secs: i64,
) -> std::result::Result<MarketSnapshot, Rejection> {
    let id = v
        .get("conditionId")
        .or_else(|| v.get("id"))
        .and_then(|s| s.as_str().map(str::to_string).or_else(|| s.as_u64().map(|n| n.to_string())))
        .unwrap_or_default();
    if id.is_empty() {
        return Err(Rejection::NoId);
    }

    if v.get("closed").and_then(|c| c.as_bool()).unwrap_or(false) {
        return Err(Rejection::Closed);
    }

    let volume_24h = num_field(v, "volume24hr").unwrap_or(0.0);
    if volume_24h < TRAINING_MIN_VOLUME {
        return Err(Rejection::LowVolume);
    }

    let yes_price = outcome_prices(v)
        .and_then(|p| p.first().copied())
        .or_else(|| num_field(v, "lastTradePrice"))
        .unwrap_or(0.0);
    // Resolved or unpriced markets carry nothing to score.
    if yes_price <= 0.0 || yes_price >= 1.0 {
        return Err(Rejection::DegeneratePrice);
    }

    let no_price = outcome_prices(v).and_then(|p| p.get(1).copied());
    let spread = num_field(v, "spread");

    let question = v
        .get("question")
        .and_then(|q| q.as_str())
        .unwrap_or("")
        .to_string();

    Ok(MarketSnapshot {
        market_id: id,
        question,
        yes_price,
        volume_24h,
        snapshot_time: now_secs,
        no_price,
        spread,
    })
}

/// Gamma serves `outcomePrices` as a JSON-encoded string array.
fn outcome_prices(v: &serde_json::Value) -> Option<Vec<f64>> {
    let raw = v.get("outcomePrices")?.as_str()?;
    let strings: Vec<String> = serde_json::from_str(raw).ok()?;
    Some(strings.iter().filter_map(|s| s.parse().ok()).collect())
}

fn num_field(v: &serde_json::Value, key: &str) -> Option<f64> {
    v.get(key)
        .and_then(|x| x.as_f64().or_else(|| x.as_str().and_then(|s| s.parse().ok())))
}

fn parse_trade(v: &serde_json::Value, market_id: &str) -> Option<TradeRecord> {
    let size = num_field(v, "size")?;
    let price = num_field(v, "price").unwrap_or(1.0);
    let timestamp = v
        .get("timestamp")
        .and_then(|t| t.as_i64().or_else(|| t.as_str().and_then(|s| s.parse().ok())))?;
    Some(TradeRecord {
        market_id: market_id.to_string(),
        size: size * price,
        timestamp,
    })
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
    use serde_json::json;

    fn market_json(price: &str, volume: f64) -> serde_json::Value {
        json!({
            "conditionId": "0xabc",
            "question": "Will it happen?",
            "volume24hr": volume,
            "closed": false,
            "outcomePrices": format!("[\"{price}\", \"0.7\"]"),
            "spread": 0.02,
        })
    }

    #[test]
    fn parses_a_qualified_market() {
        let snap = parse_market_checked(&market_json("0.3", 250_000.0), 1000).expect("qualified");
        assert_eq!(snap.market_id, "0xabc");
        assert!((snap.yes_price - 0.3).abs() < 1e-12);
        assert_eq!(snap.no_price, Some(0.7));
        assert_eq!(snap.snapshot_time, 1000);
    }

    #[test]
    fn rejects_low_volume() {
        assert!(parse_market_checked(&market_json("0.3", 10_000.0), 1000).is_err());
    }

    #[test]
    fn rejects_resolved_prices() {
        assert!(parse_market_checked(&market_json("0.0", 250_000.0), 1000).is_err());
        assert!(parse_market_checked(&market_json("1.0", 250_000.0), 1000).is_err());
    }

    #[test]
    fn rejects_closed_markets() {
        let mut v = market_json("0.3", 250_000.0);
        v["closed"] = json!(true);
        assert!(parse_market_checked(&v, 1000).is_err());
    }

    #[test]
    fn trade_size_is_notional() {
        let v = json!({"size": 100.0, "price": 0.25, "timestamp": 1700000000});
        let t = parse_trade(&v, "m1").expect("trade");
        assert!((t.size - 25.0).abs() < 1e-12);
        assert_eq!(t.market_id, "m1");
    }

    #[test]
    fn stringified_numbers_parse() {
        let v = json!({
            "conditionId": "0xdef",
            "question": "q",
            "volume24hr": "300000",
            "closed": false,
            "outcomePrices": "[\"0.25\", \"0.75\"]",
        });
        let snap = parse_market_checked(&v, 0).expect("qualified");
        assert!((snap.volume_24h - 300_000.0).abs() < 1e-12);
    }
}
