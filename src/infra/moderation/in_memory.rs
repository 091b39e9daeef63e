// In-memory moderation config, for embedding callers and tests.

use crate::core::moderation::{ModerationConfig, RuleConfigStore, RuleSetError};
use async_trait::async_trait;

/// Hands out a fixed config.
pub struct InMemoryRuleStore {
    config: ModerationConfig,
}

impl InMemoryRuleStore {
    pub fn new(config: ModerationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RuleConfigStore for InMemoryRuleStore {
    async fn load_config(&self) -> Result<ModerationConfig, RuleSetError> {
        Ok(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{CheckConfig, ModerationService, RuleConfig};

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryRuleStore::new(ModerationConfig {
            hold_threshold: 2,
            rules: vec![RuleConfig {
                id: "shouting".to_string(),
                categories: None,
                field: "title".to_string(),
                weight: 1,
                check: CheckConfig::MatchesPattern {
                    pattern: r"^[A-Z !]{10,}$".to_string(),
                },
            }],
        });

        let service = ModerationService::load(&store).await.unwrap();
        assert_eq!(service.rules().len(), 1);
        assert_eq!(service.rules().hold_threshold(), 2);
    }

    #[tokio::test]
    async fn test_invalid_rules_fail_to_load() {
        let store = InMemoryRuleStore::new(ModerationConfig {
            hold_threshold: 0,
            rules: vec![],
        });

        assert!(matches!(
            ModerationService::load(&store).await.unwrap_err(),
            RuleSetError::InvalidThreshold
        ));
    }
}
