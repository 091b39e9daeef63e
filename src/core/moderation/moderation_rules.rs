// Moderation rules - weighted heuristic checks and the immutable rule set.
//
// A rule names one field, the categories it applies to, a weight and a check.
// All structural validation happens when a rule is registered, so evaluating
// a built `RuleSet` never has to second-guess its rules.

use super::moderation_models::{ContentCategory, FieldRef, FieldValue, Submission, TextField};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("Invalid rule '{rule_id}': {reason}")]
    InvalidRule { rule_id: String, reason: String },

    #[error("Hold threshold must be at least 1")]
    InvalidThreshold,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl RuleSetError {
    fn invalid(rule_id: &str, reason: impl Into<String>) -> Self {
        RuleSetError::InvalidRule {
            rule_id: rule_id.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// CHECKS
// ============================================================================

/// Extension point for rules defined in code rather than configuration.
///
/// Only called with a present, non-blank value of the rule's field.
pub trait Predicate: Send + Sync + fmt::Debug {
    fn matches(&self, value: FieldValue<'_>, submission: &Submission) -> bool;

    /// Field kind this predicate understands.
    fn accepts(&self, field: FieldRef) -> bool;
}

/// The condition a rule tests.
#[derive(Debug, Clone)]
pub enum Check {
    /// Text contains any of the words, case-insensitively
    ContainsAny { words: Vec<String> },
    /// Text matches a regular expression
    MatchesPattern { pattern: Regex },
    /// Number lies outside `[min, max]`
    OutOfRange { min: Option<f64>, max: Option<f64> },
    /// Number is positive while one of the listed text fields is blank
    RequiredIfPriced { fields: Vec<TextField> },
    Custom(Arc<dyn Predicate>),
}

impl Check {
    /// Build a word-list check.
    pub fn contains_any<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Check::ContainsAny {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    pub fn matches_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Check::MatchesPattern {
            pattern: Regex::new(pattern)?,
        })
    }

    fn accepts(&self, field: FieldRef) -> bool {
        match self {
            Check::ContainsAny { .. } | Check::MatchesPattern { .. } => {
                matches!(field, FieldRef::Text(_))
            }
            Check::OutOfRange { .. } | Check::RequiredIfPriced { .. } => {
                matches!(field, FieldRef::Numeric(_))
            }
            Check::Custom(predicate) => predicate.accepts(field),
        }
    }

    fn validate(&self, rule_id: &str) -> Result<(), RuleSetError> {
        match self {
            Check::ContainsAny { words } => {
                if words.is_empty() || words.iter().any(|w| w.is_empty()) {
                    return Err(RuleSetError::invalid(
                        rule_id,
                        "word list is empty or has blank entries",
                    ));
                }
            }
            Check::OutOfRange { min, max } => match (min, max) {
                (None, None) => {
                    return Err(RuleSetError::invalid(rule_id, "range needs a min or a max"))
                }
                (Some(lo), Some(hi)) if lo > hi => {
                    return Err(RuleSetError::invalid(rule_id, "range min exceeds max"))
                }
                _ if min.map_or(false, f64::is_nan) || max.map_or(false, f64::is_nan) => {
                    return Err(RuleSetError::invalid(rule_id, "range bound is NaN"))
                }
                _ => {}
            },
            Check::RequiredIfPriced { fields } if fields.is_empty() => {
                return Err(RuleSetError::invalid(rule_id, "no required fields listed"))
            }
            _ => {}
        }
        Ok(())
    }

    /// Test a resolved field value.
    pub fn matches(&self, value: FieldValue<'_>, submission: &Submission) -> bool {
        match (self, value) {
            (Check::ContainsAny { words }, FieldValue::Text(text)) => {
                let text = text.to_lowercase();
                words.iter().any(|w| text.contains(w.as_str()))
            }
            (Check::MatchesPattern { pattern }, FieldValue::Text(text)) => pattern.is_match(text),
            (Check::OutOfRange { min, max }, FieldValue::Number(n)) => {
                n.is_nan() || min.map_or(false, |lo| n < lo) || max.map_or(false, |hi| n > hi)
            }
            (Check::RequiredIfPriced { fields }, FieldValue::Number(n)) => {
                n > 0.0 && fields.iter().any(|f| submission.is_blank(*f))
            }
            (Check::Custom(predicate), value) => predicate.matches(value, submission),
            _ => false,
        }
    }
}

// ============================================================================
// RULES
// ============================================================================

/// A named, weighted heuristic over one field of a submission.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    /// Categories the rule applies to. Left empty, registration fills in every
    /// category carrying the field; an unregistered rule with no categories applies nowhere.
    pub categories: Vec<ContentCategory>,
    pub field: FieldRef,
    pub weight: u32,
    pub check: Check,
}

impl Rule {
    pub fn new(id: impl Into<String>, field: FieldRef, weight: u32, check: Check) -> Self {
        Self {
            id: id.into(),
            categories: Vec::new(),
            field,
            weight,
            check,
        }
    }

    /// Restrict the rule to the given categories.
    pub fn for_categories(
        mut self,
        categories: impl IntoIterator<Item = ContentCategory>,
    ) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    pub fn applies_to(&self, category: ContentCategory) -> bool {
        self.categories.contains(&category)
    }
}

// ============================================================================
// RULE SET
// ============================================================================

/// Immutable, ordered rules plus the hold threshold.
///
/// Built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    hold_threshold: u32,
}

impl RuleSet {
    pub fn builder(hold_threshold: u32) -> RuleSetBuilder {
        RuleSetBuilder::new(hold_threshold)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn hold_threshold(&self) -> u32 {
        self.hold_threshold
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Validates rules as they are registered.
#[derive(Debug)]
pub struct RuleSetBuilder {
    rules: Vec<Rule>,
    ids: HashSet<String>,
    hold_threshold: u32,
}

impl RuleSetBuilder {
    pub fn new(hold_threshold: u32) -> Self {
        Self {
            rules: Vec::new(),
            ids: HashSet::new(),
            hold_threshold,
        }
    }

    /// Register a rule after checking it against the submission model.
    pub fn register(&mut self, mut rule: Rule) -> Result<&mut Self, RuleSetError> {
        if rule.id.trim().is_empty() {
            return Err(RuleSetError::invalid(&rule.id, "id is empty"));
        }
        if self.ids.contains(&rule.id) {
            return Err(RuleSetError::invalid(&rule.id, "duplicate id"));
        }
        if rule.weight == 0 {
            return Err(RuleSetError::invalid(&rule.id, "weight must be positive"));
        }

        if rule.categories.is_empty() {
            rule.categories = ContentCategory::all()
                .into_iter()
                .filter(|c| c.carries(rule.field))
                .collect();
        } else {
            let mut seen = HashSet::new();
            rule.categories.retain(|c| seen.insert(*c));
        }
        if let Some(category) = rule.categories.iter().find(|c| !c.carries(rule.field)) {
            return Err(RuleSetError::invalid(
                &rule.id,
                format!("{} has no field '{}'", category, rule.field),
            ));
        }

        if !rule.check.accepts(rule.field) {
            return Err(RuleSetError::invalid(
                &rule.id,
                format!("check cannot inspect field '{}'", rule.field),
            ));
        }
        if let Check::ContainsAny { words } = &mut rule.check {
            for word in words.iter_mut() {
                *word = word.trim().to_lowercase();
            }
        }
        rule.check.validate(&rule.id)?;

        self.ids.insert(rule.id.clone());
        self.rules.push(rule);
        Ok(self)
    }

    pub fn build(self) -> Result<RuleSet, RuleSetError> {
        if self.hold_threshold == 0 {
            return Err(RuleSetError::InvalidThreshold);
        }
        Ok(RuleSet {
            rules: self.rules,
            hold_threshold: self.hold_threshold,
        })
    }
}
