// Core moderation module - content tagging business logic.
// Rules and config are plain data; the tagger is a pure function over them.

pub mod moderation_config;
pub mod moderation_models;
pub mod moderation_rules;
pub mod moderation_service;

pub use moderation_config::*;
pub use moderation_models::*;
pub use moderation_rules::*;
pub use moderation_service::*;
