//! Model routing: tenant preferences and priority-driven selection.

pub mod preference;
pub mod selector;

pub use preference::{CachedPreferences, NoPreferences, PreferenceProvider, StaticPreferences};
pub use selector::{K_COST, K_LATENCY, ModelSelector, balanced_score, rank};
