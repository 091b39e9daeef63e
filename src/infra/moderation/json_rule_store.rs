// JSON-file backed moderation config.
//
// The file holds a single `ModerationConfig` object:
// { "hold_threshold": 5, "rules": [ ... ] }

use crate::core::moderation::{ModerationConfig, RuleConfigStore, RuleSetError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct JsonRuleStore {
    path: PathBuf,
}

impl JsonRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RuleConfigStore for JsonRuleStore {
    async fn load_config(&self) -> Result<ModerationConfig, RuleSetError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            RuleSetError::Storage(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        serde_json::from_str(&raw).map_err(|e| {
            RuleSetError::Parse(format!("invalid config in {}: {}", self.path.display(), e))
        })
    }
}
