use serde::Serialize;

use crate::types::PriceSample;

/// Momentum/volatility/trend statistics derived from a short, possibly noisy
/// price series for one market. Computed fresh each scoring pass, never
/// mutated. Closed-form statistics only, robust down to a handful of samples.
#[derive(Debug, Clone, Serialize)]
pub struct FlowMetrics {
    pub current_price: f64,
    pub price_change_pct: f64,
    pub volume_spike_pct: f64,
    pub price_volatility: f64,
    pub trend_slope: f64,
    pub acceleration: f64,
    pub data_points: usize,
    pub max_price: f64,
    pub min_price: f64,
    pub price_range: f64,
}

/// Compute flow metrics from a chronological price/volume series.
/// Returns None for fewer than 2 samples; downstream treats an absent
/// result as "contribute nothing".
pub fn compute(samples: &[PriceSample]) -> Option<FlowMetrics> {
    if samples.len() < 2 {
        return None;
    }

    let prices: Vec<f64> = samples.iter().map(|s| s.price).collect();
    let volumes: Vec<f64> = samples.iter().map(|s| s.volume).collect();

    let current_price = prices[prices.len() - 1];
    let initial_price = prices[0];
    let price_change_pct = if initial_price > 0.0 {
        (current_price - initial_price) / initial_price
    } else {
        0.0
    };

    // Last volume vs mean of all prior volumes.
    let last_volume = volumes[volumes.len() - 1];
    let prior = &volumes[..volumes.len() - 1];
    let prior_mean = prior.iter().sum::<f64>() / prior.len() as f64;
    let volume_spike_pct = if prior_mean > 0.0 {
        (last_volume - prior_mean) / prior_mean
    } else {
        0.0
    };

    let price_volatility = population_std_dev(&prices);
    let trend_slope = if prices.len() >= 3 { least_squares_slope(&prices) } else { 0.0 };

    // Second difference over the last three prices.
    let acceleration = if prices.len() >= 4 {
        let tail = &prices[prices.len() - 3..];
        let d1 = tail[1] - tail[0];
        let d2 = tail[2] - tail[1];
        d2 - d1
    } else {
        0.0
    };

    let max_price = prices.iter().cloned().fold(f64::MIN, f64::max);
    let min_price = prices.iter().cloned().fold(f64::MAX, f64::min);

    Some(FlowMetrics {
        current_price,
        price_change_pct,
        volume_spike_pct,
        price_volatility,
        trend_slope,
        acceleration,
        data_points: prices.len(),
        max_price,
        min_price,
        price_range: max_price - min_price,
    })
}

/// Population standard deviation (divides by n, not n-1).
fn population_std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

/// Slope of the least-squares line of `values` against their index.
fn least_squares_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den > 0.0 { num / den } else { 0.0 }
}
