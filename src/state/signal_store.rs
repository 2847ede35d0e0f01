use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use crate::types::{MarketSummary, Opportunity, SentimentReport};

/// Result of the most recent scan pass, served by the HTTP API.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub summary: Option<MarketSummary>,
    pub sentiment: Option<SentimentReport>,
    pub last_scan: i64,
}

/// In-memory view of the latest scan: ranked opportunities keyed by market,
/// plus the aggregate report. Writers replace the whole opportunity set each
/// scan so stale markets fall out.
pub struct SignalStore {
    opportunities: DashMap<String, Opportunity>,
    report: RwLock<ScanReport>,
}

impl SignalStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            opportunities: DashMap::new(),
            report: RwLock::new(ScanReport::default()),
        })
    }

    pub fn replace_opportunities(&self, opportunities: Vec<Opportunity>) {
        self.opportunities.clear();
        for op in opportunities {
            self.opportunities.insert(op.market_id.clone(), op);
        }
    }

    /// Opportunities sorted the way the ranker orders them, descending by
    /// (confidence, expected_return).
    pub fn ranked(&self, limit: usize) -> Vec<Opportunity> {
        let mut ops: Vec<Opportunity> =
            self.opportunities.iter().map(|e| e.value().clone()).collect();
        ops.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(b.expected_return.total_cmp(&a.expected_return))
        });
        ops.truncate(limit);
        ops
    }

    pub fn opportunity_count(&self) -> usize {
        self.opportunities.len()
    }

    pub fn set_report(&self, report: ScanReport) {
        if let Ok(mut guard) = self.report.write() {
            *guard = report;
        }
    }

    pub fn report(&self) -> ScanReport {
        self.report.read().map(|g| g.clone()).unwrap_or_default()
    }
}
