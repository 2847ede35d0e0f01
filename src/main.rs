use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use harpoon_signals::agent::ScanAgent;
use harpoon_signals::api::routes::{router, ApiState};
use harpoon_signals::config::Config;
use harpoon_signals::db::SignalDb;
use harpoon_signals::error::Result;
use harpoon_signals::features::REALTIME_FEATURES;
use harpoon_signals::fetcher::ExchangeFetcher;
use harpoon_signals::ml::{ClassifierAdapter, ModelArtifact};
use harpoon_signals::ranker::OpportunityRanker;
use harpoon_signals::scorer::HeuristicScorer;
use harpoon_signals::state::SignalStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", cfg.db_path)).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    let scorer = match load_classifier(&cfg.model_path) {
        Some(adapter) => {
            info!("classifier loaded from {}", cfg.model_path);
            HeuristicScorer::with_classifier(adapter)
        }
        None => {
            warn!("no usable model at {}, running heuristic-only", cfg.model_path);
            HeuristicScorer::new()
        }
    };

    let db = SignalDb::new(pool);
    let fetcher = ExchangeFetcher::new(&cfg)?;
    let ranker = OpportunityRanker::new(scorer, cfg.max_opportunities);
    let store = SignalStore::new();

    let agent = ScanAgent::new(cfg.clone(), db, fetcher, ranker, Arc::clone(&store));
    tokio::spawn(async move { agent.run().await });

    let api_state = ApiState { store };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Loads the model artifact from disk if present and shaped for the realtime
/// pipeline. A missing or mismatched artifact is non-fatal.
fn load_classifier(path: &str) -> Option<Arc<ClassifierAdapter>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let artifact: ModelArtifact = match serde_json::from_str(&raw) {
        Ok(a) => a,
        Err(e) => {
            warn!("model artifact at {path} failed to parse: {e}");
            return None;
        }
    };
    let adapter = match ClassifierAdapter::new(artifact) {
        Ok(a) => a,
        Err(e) => {
            warn!("model artifact at {path} is inconsistent: {e}");
            return None;
        }
    };
    if adapter.feature_count() != REALTIME_FEATURES {
        warn!(
            "model at {path} expects {} features, realtime pipeline emits {REALTIME_FEATURES}",
            adapter.feature_count()
        );
        return None;
    }
    Some(Arc::new(adapter))
}
