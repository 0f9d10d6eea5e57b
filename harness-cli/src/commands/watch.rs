//! Tail logs from several hosts and save them.

use anyhow::{Context, Result};
use harness_client::{LogAggregator, SourceHealth, SshSessionProvider};
use harness_core::TopologyStore;
use harness_types::Role;
use std::time::Duration;

use crate::config::Config;

/// Run the watch command.
///
/// Runs until `duration` elapses or Ctrl-C is pressed, then stops the
/// aggregator and writes one file per role.
pub async fn run(
    config: &Config,
    store: &TopologyStore,
    roles: &[Role],
    duration: Option<Duration>,
    prefix: &str,
) -> Result<()> {
    let provider = SshSessionProvider::new(config.ssh_options());
    let mut aggregator = LogAggregator::new(provider, config.aggregator_config());

    aggregator
        .start(store, roles)
        .await
        .context("Failed to start log aggregation")?;

    println!("Watching {} source(s):", aggregator.sources().len());
    for source in aggregator.sources() {
        println!("  {:<6} {}", source.role(), source.host());
    }
    match duration {
        Some(limit) => println!("Stopping after {}s (or Ctrl-C).", limit.as_secs()),
        None => println!("Press Ctrl-C to stop."),
    }

    let waited = wait_for_stop(duration).await;

    aggregator.stop().await.context("Failed to stop log aggregation")?;
    waited?;

    let paths = aggregator.save(prefix).await.context("Failed to save logs")?;

    println!();
    println!("Saved:");
    for (source, path) in aggregator.sources().iter().zip(&paths) {
        let health = match source.health().await {
            SourceHealth::Healthy => "ok".to_string(),
            SourceHealth::Broken { reason } => format!("BROKEN: {}", reason),
        };
        println!(
            "  {:<6} {:>10} bytes  {}  [{}]",
            source.role(),
            source.len().await,
            path.display(),
            health
        );
    }

    Ok(())
}

async fn wait_for_stop(duration: Option<Duration>) -> Result<()> {
    match duration {
        Some(limit) => {
            tokio::select! {
                _ = tokio::time::sleep(limit) => {}
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to listen for Ctrl-C")?;
                    tracing::info!("interrupted");
                }
            }
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            tracing::info!("interrupted");
        }
    }
    Ok(())
}
