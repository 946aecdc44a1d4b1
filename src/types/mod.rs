//! Public types for the Huginn API.

mod message;
mod model;
mod options;
mod response;
mod usage;

pub use message::{Message, Role};
pub use model::{ModelDescriptor, Provider};
pub use options::{Priority, RequestConfig, RequestDefaults, ResolvedConfig};
pub use response::{AiResponse, Completion, TokenUsage, Usage};
pub use usage::{Breakdown, Operation, UsageRecord, UsageStats};
