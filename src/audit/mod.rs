pub mod cost;
pub mod sink;

pub use cost::CostSink;
pub use sink::{AuditEntry, AuditSink};
