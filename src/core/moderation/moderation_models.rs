// Moderation domain models - submissions and verdicts.
//
// These are pure domain types with no transport or storage dependencies.
// The API layer converts its loosely-shaped payloads into a `Submission`
// before anything is evaluated.

use super::moderation_service::SubmissionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

// ============================================================================
// CATEGORIES AND FIELDS
// ============================================================================

/// Kind of user content being created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentCategory {
    Post,
    #[serde(alias = "catalog_entry")]
    CatalogEntry,
    Giveaway,
}

impl ContentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Post => "post",
            ContentCategory::CatalogEntry => "catalog-entry",
            ContentCategory::Giveaway => "giveaway",
        }
    }

    /// Parse a category name. Accepts the snake_case spelling as well.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "post" => Some(ContentCategory::Post),
            "catalog-entry" | "catalog_entry" => Some(ContentCategory::CatalogEntry),
            "giveaway" => Some(ContentCategory::Giveaway),
            _ => None,
        }
    }

    pub fn all() -> Vec<ContentCategory> {
        vec![
            ContentCategory::Post,
            ContentCategory::CatalogEntry,
            ContentCategory::Giveaway,
        ]
    }

    /// Whether submissions of this category carry the given field.
    pub fn carries(&self, field: FieldRef) -> bool {
        match field {
            FieldRef::Text(_) => true,
            FieldRef::Numeric(NumericField::Price) => *self == ContentCategory::CatalogEntry,
            FieldRef::Numeric(NumericField::PrizeValue) => *self == ContentCategory::Giveaway,
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text fields a submission can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextField {
    Title,
    Description,
}

/// Numeric fields a submission can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumericField {
    Price,
    #[serde(alias = "prize_value")]
    PrizeValue,
}

/// Reference to a single named field, text or numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRef {
    Text(TextField),
    Numeric(NumericField),
}

impl FieldRef {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldRef::Text(TextField::Title) => "title",
            FieldRef::Text(TextField::Description) => "description",
            FieldRef::Numeric(NumericField::Price) => "price",
            FieldRef::Numeric(NumericField::PrizeValue) => "prize-value",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "title" => Some(FieldRef::Text(TextField::Title)),
            "description" => Some(FieldRef::Text(TextField::Description)),
            "price" => Some(FieldRef::Numeric(NumericField::Price)),
            "prize-value" | "prize_value" => Some(FieldRef::Numeric(NumericField::PrizeValue)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved, non-empty field value handed to a predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
}

// ============================================================================
// SUBMISSIONS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostContent {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntryContent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GiveawayContent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub prize_value: Option<f64>,
}

/// User-authored content awaiting classification, one variant per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "kebab-case")]
pub enum Submission {
    Post(PostContent),
    CatalogEntry(CatalogEntryContent),
    Giveaway(GiveawayContent),
}

impl Submission {
    pub fn category(&self) -> ContentCategory {
        match self {
            Submission::Post(_) => ContentCategory::Post,
            Submission::CatalogEntry(_) => ContentCategory::CatalogEntry,
            Submission::Giveaway(_) => ContentCategory::Giveaway,
        }
    }

    /// Raw text of a text field, if the submission has one.
    pub fn text(&self, field: TextField) -> Option<&str> {
        let (title, description) = match self {
            Submission::Post(c) => (&c.title, &c.description),
            Submission::CatalogEntry(c) => (&c.title, &c.description),
            Submission::Giveaway(c) => (&c.title, &c.description),
        };
        match field {
            TextField::Title => title.as_deref(),
            TextField::Description => description.as_deref(),
        }
    }

    pub fn number(&self, field: NumericField) -> Option<f64> {
        match (self, field) {
            (Submission::CatalogEntry(c), NumericField::Price) => c.price,
            (Submission::Giveaway(c), NumericField::PrizeValue) => c.prize_value,
            _ => None,
        }
    }

    /// Resolve a field to a value a predicate can inspect.
    ///
    /// Absent fields and whitespace-only text resolve to `None`.
    pub fn value(&self, field: FieldRef) -> Option<FieldValue<'_>> {
        match field {
            FieldRef::Text(f) => self
                .text(f)
                .filter(|t| !t.trim().is_empty())
                .map(FieldValue::Text),
            FieldRef::Numeric(f) => self.number(f).map(FieldValue::Number),
        }
    }

    /// Whether a text field is absent or whitespace-only.
    pub fn is_blank(&self, field: TextField) -> bool {
        self.text(field).map_or(true, |t| t.trim().is_empty())
    }
}

/// Loosely-shaped submission as it arrives from the API layer.
///
/// A `null` value is an absent field. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSubmission {
    pub category: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub numbers: BTreeMap<String, Option<f64>>,
}

impl RawSubmission {
    /// Decode a JSON payload, reporting any shape mismatch as `InvalidSubmission`.
    pub fn from_json(value: Value) -> Result<Self, SubmissionError> {
        serde_json::from_value(value)
            .map_err(|e| SubmissionError::InvalidSubmission(e.to_string()))
    }
}

impl TryFrom<RawSubmission> for Submission {
    type Error = SubmissionError;

    fn try_from(raw: RawSubmission) -> Result<Self, Self::Error> {
        let category = ContentCategory::parse(&raw.category).ok_or_else(|| {
            SubmissionError::InvalidSubmission(format!("unknown category '{}'", raw.category))
        })?;

        // Aliases resolve to the same field, so each field may be given once.
        let mut seen = HashSet::new();
        let mut claim = |field: FieldRef, name: &str| {
            if seen.insert(field) {
                Ok(())
            } else {
                Err(SubmissionError::InvalidSubmission(format!(
                    "field '{}' given more than once",
                    name
                )))
            }
        };

        let mut title = None;
        let mut description = None;
        for (name, value) in raw.fields {
            let field = match FieldRef::parse(&name) {
                Some(field @ FieldRef::Text(_)) => field,
                _ => {
                    return Err(SubmissionError::InvalidSubmission(format!(
                        "{} has no text field '{}'",
                        category, name
                    )))
                }
            };
            claim(field, &name)?;
            match field {
                FieldRef::Text(TextField::Title) => title = value,
                _ => description = value,
            }
        }

        let mut price = None;
        let mut prize_value = None;
        for (name, value) in raw.numbers {
            let field = match FieldRef::parse(&name) {
                Some(field @ FieldRef::Numeric(_)) if category.carries(field) => field,
                _ => {
                    return Err(SubmissionError::InvalidSubmission(format!(
                        "{} has no numeric field '{}'",
                        category, name
                    )))
                }
            };
            claim(field, &name)?;
            if value.map_or(false, |v| !v.is_finite()) {
                return Err(SubmissionError::InvalidSubmission(format!(
                    "field '{}' is not a finite number",
                    name
                )));
            }
            match field {
                FieldRef::Numeric(NumericField::Price) => price = value,
                _ => prize_value = value,
            }
        }

        Ok(match category {
            ContentCategory::Post => Submission::Post(PostContent { title, description }),
            ContentCategory::CatalogEntry => Submission::CatalogEntry(CatalogEntryContent {
                title,
                description,
                price,
            }),
            ContentCategory::Giveaway => Submission::Giveaway(GiveawayContent {
                title,
                description,
                prize_value,
            }),
        })
    }
}

// ============================================================================
// VERDICT
// ============================================================================

/// Recommended downstream handling of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModerationAction {
    /// Nothing triggered
    Allow,
    /// Stay visible, but add a non-blocking review queue entry
    AllowAndQueueForReview,
    /// Withhold from normal visibility until a human reviews it
    HoldForReview,
}

impl ModerationAction {
    /// Pick the action for an aggregate score.
    pub fn for_score(score: u32, hold_threshold: u32) -> Self {
        if score == 0 {
            ModerationAction::Allow
        } else if score < hold_threshold {
            ModerationAction::AllowAndQueueForReview
        } else {
            ModerationAction::HoldForReview
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Allow => "allow",
            ModerationAction::AllowAndQueueForReview => "allow-and-queue-for-review",
            ModerationAction::HoldForReview => "hold-for-review",
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating one submission against a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub flagged: bool,
    /// Triggered rule ids in evaluation order
    pub triggered: Vec<String>,
    /// Sum of triggered rule weights
    pub score: u32,
    pub action: ModerationAction,
}

impl Verdict {
    /// A verdict for content that triggered nothing.
    pub fn clean() -> Self {
        Self {
            flagged: false,
            triggered: Vec::new(),
            score: 0,
            action: ModerationAction::Allow,
        }
    }
}
