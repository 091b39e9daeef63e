// Moderation configuration - the declarative form of a rule set.
//
// Thresholds, weights and word lists are configuration data. Nothing here
// ships a default rule list; the process supplies one at startup.

use super::moderation_models::{ContentCategory, FieldRef, TextField};
use super::moderation_rules::{Check, Rule, RuleSet, RuleSetError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Rule set as it is written in a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Score at or above which content is held for review
    pub hold_threshold: u32,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub id: String,
    /// Omitted means every category that carries `field`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<ContentCategory>>,
    pub field: String,
    pub weight: u32,
    pub check: CheckConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckConfig {
    ContainsAny {
        words: Vec<String>,
    },
    MatchesPattern {
        pattern: String,
    },
    OutOfRange {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    RequiredIfPriced {
        fields: Vec<String>,
    },
}

impl RuleConfig {
    fn to_rule(&self) -> Result<Rule, RuleSetError> {
        let invalid = |reason: String| RuleSetError::InvalidRule {
            rule_id: self.id.clone(),
            reason,
        };

        let field = FieldRef::parse(&self.field)
            .ok_or_else(|| invalid(format!("unknown field '{}'", self.field)))?;

        let check = match &self.check {
            CheckConfig::ContainsAny { words } => Check::contains_any(words),
            CheckConfig::MatchesPattern { pattern } => Check::matches_pattern(pattern)
                .map_err(|e| invalid(format!("bad pattern: {}", e)))?,
            CheckConfig::OutOfRange { min, max } => Check::OutOfRange {
                min: *min,
                max: *max,
            },
            CheckConfig::RequiredIfPriced { fields } => {
                let fields = fields
                    .iter()
                    .map(|name| match FieldRef::parse(name) {
                        Some(FieldRef::Text(f)) => Ok(f),
                        _ => Err(invalid(format!("'{}' is not a text field", name))),
                    })
                    .collect::<Result<Vec<TextField>, _>>()?;
                Check::RequiredIfPriced { fields }
            }
        };

        let rule = Rule::new(self.id.clone(), field, self.weight, check);
        Ok(match &self.categories {
            Some(categories) if categories.is_empty() => {
                return Err(invalid("category list is empty".to_string()))
            }
            Some(categories) => rule.for_categories(categories.iter().copied()),
            None => rule,
        })
    }
}

impl RuleSet {
    /// Build a rule set from configuration, validating every rule.
    pub fn from_config(config: &ModerationConfig) -> Result<RuleSet, RuleSetError> {
        let mut builder = RuleSet::builder(config.hold_threshold);
        for rule in &config.rules {
            builder.register(rule.to_rule()?)?;
        }
        builder.build()
    }
}

/// Source of moderation configuration.
///
/// Read once at startup; implementations live in infra.
#[async_trait]
pub trait RuleConfigStore: Send + Sync {
    async fn load_config(&self) -> Result<ModerationConfig, RuleSetError>;
}
