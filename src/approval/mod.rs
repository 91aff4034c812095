pub mod coordinator;
pub mod types;

pub use coordinator::ApprovalCoordinator;
pub use types::{ApprovalKind, ApprovalResolution};
