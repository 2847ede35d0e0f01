//! Ordered tier tables for the heuristic scorer. Each category is a slice
//! evaluated top to bottom with first-match-wins semantics, so the policy is
//! data and every category is testable on its own.

/// Single-sided threshold predicate.
#[derive(Debug, Clone, Copy)]
pub enum Cond {
    Below(f64),
    Above(f64),
}

impl Cond {
    pub fn matches(self, value: f64) -> bool {
        match self {
            Cond::Below(t) => value < t,
            Cond::Above(t) => value > t,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Tier {
    pub cond: Cond,
    pub delta: f64,
    pub label: &'static str,
}

const fn tier(cond: Cond, delta: f64, label: &'static str) -> Tier {
    Tier { cond, delta, label }
}

/// First tier whose predicate matches, or None.
pub fn first_match(tiers: &[Tier], value: f64) -> Option<&Tier> {
    tiers.iter().find(|t| t.cond.matches(value))
}

/// Price-level tiers on the YES price. Most extreme bands first.
pub const PRICE_LEVEL: &[Tier] = &[
    tier(Cond::Below(0.1), 0.5, "Extremely undervalued"),
    tier(Cond::Below(0.2), 0.4, "Very undervalued"),
    tier(Cond::Below(0.3), 0.3, "Undervalued"),
    tier(Cond::Above(0.9), 0.5, "Extremely overvalued"),
    tier(Cond::Above(0.8), 0.4, "Very overvalued"),
    tier(Cond::Above(0.7), 0.3, "Overvalued"),
];

/// 24h volume tiers (USD).
pub const VOLUME: &[Tier] = &[
    tier(Cond::Above(2_000_000.0), 0.3, "Exceptional volume"),
    tier(Cond::Above(1_000_000.0), 0.2, "Very high volume"),
    tier(Cond::Above(500_000.0), 0.1, "High volume"),
    tier(Cond::Below(100_000.0), -0.1, "Low volume"),
];

/// Whale-trade count tiers. The final tier catches a count of zero.
pub const WHALE_ACTIVITY: &[Tier] = &[
    tier(Cond::Above(10.0), 0.3, "Very high whale activity"),
    tier(Cond::Above(5.0), 0.2, "High whale activity"),
    tier(Cond::Above(0.0), 0.1, "Some whale activity"),
    tier(Cond::Below(1.0), -0.1, "No whale activity"),
];

/// Snapshot age tiers (hours since last update).
pub const RECENCY: &[Tier] = &[
    tier(Cond::Below(1.0), 0.2, "Very recent data"),
    tier(Cond::Below(6.0), 0.1, "Recent data"),
    tier(Cond::Above(12.0), -0.2, "Stale data"),
];

/// Flow momentum tiers on price_change_pct. Labels get the observed value
/// appended by the scorer.
pub const MOMENTUM: &[Tier] = &[
    tier(Cond::Above(0.15), 0.3, "Strong momentum"),
    tier(Cond::Above(0.08), 0.2, "Upward momentum"),
    tier(Cond::Above(0.03), 0.1, "Rising price"),
    tier(Cond::Below(-0.10), -0.15, "Price decline"),
];

/// Flow volume-spike tiers on volume_spike_pct.
pub const VOLUME_SPIKE: &[Tier] = &[
    tier(Cond::Above(2.0), 0.25, "Massive volume surge"),
    tier(Cond::Above(1.0), 0.20, "Volume spike"),
    tier(Cond::Above(0.5), 0.15, "Rising volume"),
];
