// Content moderation tagger.
//
// **Architecture Overview:**
// - `core/` = Business logic (submissions, rules, verdicts)
// - `infra/` = Implementations of core traits (config stores)
// - `intake/` = Callers that feed submissions in (batch runner)

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;
#[path = "intake/intake_layer.rs"]
pub mod intake;

pub use crate::core::moderation::{
    evaluate, evaluate_raw, ModerationAction, ModerationService, RawSubmission, RuleSet,
    Submission, SubmissionError, Verdict,
};
