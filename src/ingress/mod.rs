pub mod dispatch;
pub mod http;

pub use dispatch::AppState;
pub use http::router;
