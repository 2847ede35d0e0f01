use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::state::SignalStore;
use crate::types::{MarketSummary, Opportunity, SentimentReport};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<SignalStore>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/opportunities", get(get_opportunities))
        .route("/summary", get(get_summary))
        .route("/sentiment", get(get_sentiment))
        .route("/health", get(get_health))
        .with_state(state)
}

#[derive(Deserialize)]
pub struct OpportunitiesQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub summary: Option<MarketSummary>,
    pub opportunity_count: usize,
    pub last_scan: i64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub last_scan: i64,
    pub opportunity_count: usize,
}

async fn get_opportunities(
    State(state): State<ApiState>,
    Query(params): Query<OpportunitiesQuery>,
) -> Json<Vec<Opportunity>> {
    let limit = params.limit.unwrap_or(20);
    Json(state.store.ranked(limit))
}

async fn get_summary(State(state): State<ApiState>) -> Json<SummaryResponse> {
    let report = state.store.report();
    Json(SummaryResponse {
        summary: report.summary,
        opportunity_count: state.store.opportunity_count(),
        last_scan: report.last_scan,
    })
}

async fn get_sentiment(State(state): State<ApiState>) -> Json<Option<SentimentReport>> {
    Json(state.store.report().sentiment)
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let report = state.store.report();
    Json(HealthResponse {
        status: "ok",
        last_scan: report.last_scan,
        opportunity_count: state.store.opportunity_count(),
    })
}
