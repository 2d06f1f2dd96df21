//! Comment microservice process.
//!
//! Run from repo root: `cargo run -p comment_server`
//! Reads `appsettings.json` from the working directory (or `APPSETTINGS_PATH`) plus env overrides.

use comments_microservice::{config, run};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("comments_microservice=info,comment_server=info")
            }),
        )
        .init();

    let settings_path = std::env::var("APPSETTINGS_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("appsettings.json"));
    let config = config::load(&settings_path)?;
    tracing::info!(service = %config.service_name, "starting");

    run(config).await?;
    Ok(())
}
