pub mod format;
pub mod reader;
pub mod summarizer;
pub mod types;

pub use format::{extract_recent_tools, format_recent_activity};
pub use reader::read_transcript;
pub use summarizer::TranscriptSummarizer;
pub use types::TranscriptExcerpt;
