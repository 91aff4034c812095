pub mod traits;

#[cfg(feature = "telegram")]
pub mod telegram;

pub use traits::ChatAdapter;

#[cfg(feature = "telegram")]
pub use telegram::TelegramChatAdapter;
