pub mod traits;

#[cfg(feature = "tmux")]
pub mod tmux;

pub use traits::{MultiplexerAdapter, PaneInfo};

#[cfg(feature = "tmux")]
pub use tmux::TmuxAdapter;
