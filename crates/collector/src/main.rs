use std::sync::Arc;

use collector::{Collector, RestGithubClient};
use common::{init_logging, AppConfig, AppError, Result};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging);
    config.validate()?;

    let client = Arc::new(RestGithubClient::new(&config.github).map_err(AppError::github)?);
    let collector = Collector::new(
        config.collector.clone(),
        config.normalizer.clone(),
        client,
    );
    info!(
        usernames = config.collector.usernames.len(),
        repositories = config.collector.repositories.len(),
        organizations = config.collector.organizations.len(),
        limit = config.collector.concurrency_limit,
        "collector started"
    );

    let report = collector.run_once().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
