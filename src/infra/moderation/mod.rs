// Implementations of the moderation config store.

pub mod in_memory;
pub mod json_rule_store;

pub use in_memory::InMemoryRuleStore;
pub use json_rule_store::JsonRuleStore;
