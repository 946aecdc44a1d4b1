//! Usage accounting: cost computation, background persistence and
//! aggregation.

pub mod recorder;
pub mod sink;
pub mod stats;

pub use recorder::{UsageRecorder, cost};
pub use sink::{JsonlUsageSink, MemoryUsageSink, UsageSink};
pub use stats::aggregate;
