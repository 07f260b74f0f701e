//! post-aggregator binary
//!
//! Usage: `POST_AGGREGATOR_BASE_URL=http://host:9999 post-aggregator`
//!
//! Prints the aggregated posts as JSON on stdout. Logging goes to stderr and
//! is controlled through `RUST_LOG`.

use post_aggregator::{Aggregator, Config, ReqwestTransport, cancel_on_signal};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,post_aggregator=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, code = e.error_code(), "post-aggregator failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> post_aggregator::Result<()> {
    let config = Config::from_env()?;
    tracing::info!(
        base_url = %config.base_url,
        deadline = ?config.deadline,
        comment_authors = ?config.comment_authors,
        "starting aggregation"
    );

    let transport = Arc::new(ReqwestTransport::new(&config)?);
    let aggregator = Aggregator::from_config(&config, transport)?;

    let cancel = CancellationToken::new();
    let signals = tokio::spawn(cancel_on_signal(cancel.clone()));

    let result = aggregator.aggregate_within(config.deadline, &cancel).await;
    cancel.cancel();
    signals.await.ok();

    let aggregates = result?;
    let json = serde_json::to_string_pretty(&aggregates)?;
    println!("{json}");
    Ok(())
}
