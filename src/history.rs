use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::types::PriceSample;

/// Generates a plausible hourly price history ending at `current_price`'s
/// neighbourhood, for training data collection when the exchange exposes no
/// historical candles. Seeded so a given (market, window) replays identically.
///
/// The walk is mean-reverting towards 0.5 with mild momentum carry-over and
/// gaussian shocks; prices stay inside [0.01, 0.99].
pub fn simulate_price_history(current_price: f64, days_back: u32, seed: u64) -> Vec<PriceSample> {
    let hours = days_back as i64 * 24;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let mut samples = Vec::with_capacity(hours as usize);
    let mut prev = current_price.clamp(0.01, 0.99);
    let mut prev2 = prev;

    for i in 0..hours {
        let reversion = (0.5 - prev) * 0.005;
        let momentum = (prev - prev2) * 0.1;
        let shock = gaussian(&mut rng) * 0.015;
        let next = (prev + reversion + momentum + shock).clamp(0.01, 0.99);

        // Exponentially distributed hourly volume, mean 1000.
        let u: f64 = rng.gen_range(f64::EPSILON..1.0);
        let volume = -u.ln() * 1000.0;

        samples.push(PriceSample {
            price: next,
            volume,
            timestamp: now - (hours - i) * 3600,
        });
        prev2 = prev;
        prev = next;
    }

    samples
}

/// Standard normal via Box-Muller.
fn gaussian(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
