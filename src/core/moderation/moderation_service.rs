// Moderation tagger - core business logic for flagging content.
//
// This handles:
// - Evaluating a submission against an ordered rule set
// - Aggregating triggered rule weights into a score
// - Mapping the score to a recommended action
//
// Flagging never blocks a write. Bad content is expressed as a verdict, and
// the only error is a submission whose shape is not understood.

use super::moderation_config::RuleConfigStore;
use super::moderation_models::{ModerationAction, RawSubmission, Submission, Verdict};
use super::moderation_rules::{RuleSet, RuleSetError};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Evaluate a submission against a rule set.
///
/// Pure and total: the same submission and rule set always produce the same
/// verdict. Rules run in registration order. A rule whose field is absent or
/// blank does not trigger and its check is never called.
pub fn evaluate(rules: &RuleSet, submission: &Submission) -> Verdict {
    let category = submission.category();
    let mut triggered = Vec::new();
    let mut score: u32 = 0;

    for rule in rules.rules() {
        if !rule.applies_to(category) {
            continue;
        }
        let Some(value) = submission.value(rule.field) else {
            continue;
        };
        if rule.check.matches(value, submission) {
            triggered.push(rule.id.clone());
            score = score.saturating_add(rule.weight);
        }
    }

    Verdict {
        flagged: score > 0,
        triggered,
        score,
        action: ModerationAction::for_score(score, rules.hold_threshold()),
    }
}

/// Convert a loosely-shaped submission and evaluate it.
///
/// A structurally invalid submission fails before any rule runs.
pub fn evaluate_raw(rules: &RuleSet, raw: RawSubmission) -> Result<Verdict, SubmissionError> {
    let submission = Submission::try_from(raw)?;
    Ok(evaluate(rules, &submission))
}

// ============================================================================
// SERVICE
// ============================================================================

/// Shared handle to a loaded rule set, for request handlers.
///
/// Cloning is cheap; every clone evaluates against the same rules.
#[derive(Debug, Clone)]
pub struct ModerationService {
    rules: Arc<RuleSet>,
}

impl ModerationService {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    /// Load and validate the rule set from a config store.
    pub async fn load<S: RuleConfigStore + ?Sized>(store: &S) -> Result<Self, RuleSetError> {
        let config = store.load_config().await?;
        let rules = RuleSet::from_config(&config)?;
        tracing::info!(
            rules = rules.len(),
            hold_threshold = rules.hold_threshold(),
            "Moderation rules loaded"
        );
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Tag an already-typed submission.
    pub fn tag(&self, submission: &Submission) -> Verdict {
        let verdict = evaluate(&self.rules, submission);
        Self::trace_verdict(submission, &verdict);
        verdict
    }

    /// Tag a submission straight from the API payload.
    pub fn tag_raw(&self, raw: RawSubmission) -> Result<Verdict, SubmissionError> {
        let submission = Submission::try_from(raw).map_err(|e| {
            tracing::warn!("Rejected submission: {}", e);
            e
        })?;
        Ok(self.tag(&submission))
    }

    fn trace_verdict(submission: &Submission, verdict: &Verdict) {
        if verdict.flagged {
            tracing::info!(
                category = %submission.category(),
                score = verdict.score,
                action = %verdict.action,
                triggered = ?verdict.triggered,
                "Submission flagged for review"
            );
        } else {
            tracing::debug!(category = %submission.category(), "Submission passed moderation");
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::moderation_models::{
        CatalogEntryContent, ContentCategory, FieldRef, FieldValue, GiveawayContent, NumericField,
        PostContent, TextField,
    };
    use crate::core::moderation::moderation_rules::{Check, Predicate, Rule};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn description() -> FieldRef {
        FieldRef::Text(TextField::Description)
    }

    fn post(description: &str) -> Submission {
        Submission::Post(PostContent {
            title: None,
            description: Some(description.to_string()),
        })
    }

    /// The single bad-word rule with a threshold of 5.
    fn scam_rules() -> RuleSet {
        let mut builder = RuleSet::builder(5);
        builder
            .register(
                Rule::new("bad-word", description(), 5, Check::contains_any(["scam"]))
                    .for_categories([ContentCategory::Post]),
            )
            .unwrap();
        builder.build().unwrap()
    }

    /// Counts how often it is asked; matches every value.
    #[derive(Debug, Default)]
    struct CountingPredicate {
        calls: AtomicUsize,
    }

    impl Predicate for CountingPredicate {
        fn matches(&self, _value: FieldValue<'_>, _submission: &Submission) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            true
        }

        fn accepts(&self, _field: FieldRef) -> bool {
            true
        }
    }

    #[test]
    fn test_scam_post_is_held() {
        let verdict = evaluate(&scam_rules(), &post("this is a scam"));

        assert_eq!(
            verdict,
            Verdict {
                flagged: true,
                triggered: vec!["bad-word".to_string()],
                score: 5,
                action: ModerationAction::HoldForReview,
            }
        );
    }

    #[test]
    fn test_legit_post_is_allowed() {
        let verdict = evaluate(&scam_rules(), &post("legit post"));
        assert_eq!(verdict, Verdict::clean());
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let rules = scam_rules();
        let submission = post("a SCAM and another scam");
        assert_eq!(evaluate(&rules, &submission), evaluate(&rules, &submission));
    }

    #[test]
    fn test_empty_submission_is_clean() {
        let rules = scam_rules();
        for submission in [
            Submission::Post(PostContent::default()),
            Submission::CatalogEntry(CatalogEntryContent::default()),
            Submission::Giveaway(GiveawayContent::default()),
            post(""),
        ] {
            assert_eq!(evaluate(&rules, &submission), Verdict::clean());
        }
    }

    #[test]
    fn test_blank_field_never_reaches_check() {
        let counter = Arc::new(CountingPredicate::default());
        let mut builder = RuleSet::builder(5);
        builder
            .register(Rule::new("count", description(), 1, Check::Custom(counter.clone())))
            .unwrap();
        let rules = builder.build().unwrap();

        let verdict = evaluate(&rules, &post("   "));
        assert!(!verdict.flagged);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_threshold_boundary() {
        let mut builder = RuleSet::builder(5);
        builder
            .register(Rule::new("four", description(), 4, Check::contains_any(["spam"])))
            .unwrap()
            .register(Rule::new("one", description(), 1, Check::contains_any(["cheap"])))
            .unwrap();
        let rules = builder.build().unwrap();

        let below = evaluate(&rules, &post("spam"));
        assert_eq!(below.score, 4);
        assert_eq!(below.action, ModerationAction::AllowAndQueueForReview);
        assert!(below.flagged);

        let at = evaluate(&rules, &post("cheap spam"));
        assert_eq!(at.score, 5);
        assert_eq!(at.action, ModerationAction::HoldForReview);
        assert_eq!(at.triggered, vec!["four".to_string(), "one".to_string()]);
    }

    #[test]
    fn test_adding_rule_never_lowers_score() {
        let submission = post("cheap scam");
        let before = evaluate(&scam_rules(), &submission);

        let mut builder = RuleSet::builder(5);
        builder
            .register(
                Rule::new("bad-word", description(), 5, Check::contains_any(["scam"]))
                    .for_categories([ContentCategory::Post]),
            )
            .unwrap()
            .register(Rule::new("cheap", description(), 2, Check::contains_any(["cheap"])))
            .unwrap();
        let after = evaluate(&builder.build().unwrap(), &submission);

        assert!(after.score >= before.score);
        assert_eq!(after.score, 7);
        assert_eq!(&after.triggered[..1], &before.triggered[..]);
    }

    #[test]
    fn test_rules_respect_categories() {
        let rules = scam_rules();
        let giveaway = Submission::Giveaway(GiveawayContent {
            title: None,
            description: Some("a scam giveaway".to_string()),
            prize_value: None,
        });
        assert!(!evaluate(&rules, &giveaway).flagged);
    }

    #[test]
    fn test_catalog_rules() {
        let price = FieldRef::Numeric(NumericField::Price);
        let mut builder = RuleSet::builder(3);
        builder
            .register(Rule::new(
                "price-range",
                price,
                2,
                Check::OutOfRange {
                    min: Some(0.0),
                    max: Some(10_000.0),
                },
            ))
            .unwrap()
            .register(Rule::new(
                "paid-listing-details",
                price,
                1,
                Check::RequiredIfPriced {
                    fields: vec![TextField::Description],
                },
            ))
            .unwrap();
        let rules = builder.build().unwrap();

        let listing = Submission::CatalogEntry(CatalogEntryContent {
            title: Some("Gold watch".to_string()),
            description: None,
            price: Some(250_000.0),
        });
        let verdict = evaluate(&rules, &listing);
        assert_eq!(
            verdict.triggered,
            vec!["price-range".to_string(), "paid-listing-details".to_string()]
        );
        assert_eq!(verdict.action, ModerationAction::HoldForReview);

        let free = Submission::CatalogEntry(CatalogEntryContent {
            title: Some("Free couch".to_string()),
            description: None,
            price: Some(0.0),
        });
        assert_eq!(evaluate(&rules, &free), Verdict::clean());
    }

    #[test]
    fn test_invalid_category_runs_no_rules() {
        let counter = Arc::new(CountingPredicate::default());
        let mut builder = RuleSet::builder(1);
        builder
            .register(Rule::new("count", description(), 1, Check::Custom(counter.clone())))
            .unwrap();
        let rules = builder.build().unwrap();

        let mut raw = RawSubmission {
            category: "auction".to_string(),
            ..Default::default()
        };
        raw.fields
            .insert("description".to_string(), Some("anything".to_string()));

        let err = evaluate_raw(&rules, raw).unwrap_err();
        assert!(matches!(err, SubmissionError::InvalidSubmission(_)));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_service_tags_raw_submission() {
        let service = ModerationService::new(scam_rules());
        let mut raw = RawSubmission {
            category: "post".to_string(),
            ..Default::default()
        };
        raw.fields
            .insert("description".to_string(), Some("this is a scam".to_string()));

        let verdict = service.tag_raw(raw).unwrap();
        assert_eq!(verdict.action, ModerationAction::HoldForReview);
    }

    #[tokio::test]
    async fn test_concurrent_tagging() {
        let service = ModerationService::new(scam_rules());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    let text = if i % 2 == 0 { "scam" } else { "hello" };
                    service.tag(&post(text))
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let verdict = handle.await.unwrap();
            assert_eq!(verdict.flagged, i % 2 == 0);
        }
    }
}
