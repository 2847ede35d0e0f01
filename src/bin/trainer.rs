use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use harpoon_signals::config::Config;
use harpoon_signals::error::Result;
use harpoon_signals::fetcher::ExchangeFetcher;
use harpoon_signals::trainer;

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
        error!("Training failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let fetcher = ExchangeFetcher::new(&cfg)?;

    info!(
        "collecting training data ({} markets, {} days of history each)",
        cfg.trainer_num_markets, cfg.trainer_days_back
    );
    let samples = trainer::collect_training_data(&fetcher, &cfg).await?;

    let (artifact, report) = trainer::train_and_evaluate(&samples, 42)?;

    info!(
        "evaluation | accuracy: {:.3} | weighted: {:.3} | precision: {:.3} | recall: {:.3} | f1: {:.3}",
        report.basic_accuracy,
        report.weighted_accuracy,
        report.precision,
        report.recall,
        report.f1_score,
    );
    info!(
        "evaluation | avg weight correct: {:.3} | incorrect: {:.3} | buy targets: {}/{}",
        report.avg_confidence_correct,
        report.avg_confidence_incorrect,
        report.total_buy_opportunities,
        report.total_predictions,
    );

    // Last model wins: the artifact file is simply overwritten.
    let json = serde_json::to_string(&artifact)?;
    std::fs::write(&cfg.model_path, json)?;
    info!("model artifact written to {}", cfg.model_path);

    Ok(())
}
