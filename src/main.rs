// Batch entry point for the moderation tagger.
//
// This file's job is to:
// 1. Load configuration from the environment
// 2. Load and validate the rule set (once, at startup)
// 3. Stream submissions through the tagger and print verdicts
//
// Environment:
// - MODERATION_RULES_FILE: path to the JSON rule config (required)
// - MODERATION_INPUT: JSON-lines submissions file (defaults to stdin)
// - RUST_LOG: log filter, logs go to stderr

use anyhow::{Context, Result};
use content_moderation::infra::moderation::JsonRuleStore;
use content_moderation::intake::run_batch;
use content_moderation::ModerationService;
use std::env::VarError;
use tokio::io::{self, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // stdout carries the verdicts, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let rules_path = std::env::var("MODERATION_RULES_FILE")
        .context("Missing MODERATION_RULES_FILE environment variable")?;
    let store = JsonRuleStore::new(rules_path);
    let service = ModerationService::load(&store)
        .await
        .with_context(|| format!("Failed to load rules from {}", store.path().display()))?;

    let stdout = io::stdout();
    let summary = match input_path(std::env::var("MODERATION_INPUT"))? {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open input {}", path))?;
            run_batch(&service, BufReader::new(file), stdout).await?
        }
        None => run_batch(&service, BufReader::new(io::stdin()), stdout).await?,
    };

    if summary.rejected > 0 {
        tracing::warn!("{} of {} submissions were rejected", summary.rejected, summary.total);
    }

    Ok(())
}

/// Input file from `MODERATION_INPUT`. Unset means stdin; a value that is not
/// valid unicode is an error rather than a silent fallback.
fn input_path(var: Result<String, VarError>) -> Result<Option<String>> {
    match var {
        Ok(path) => Ok(Some(path)),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).context("Invalid MODERATION_INPUT environment variable"),
    }
}
