pub mod jsonl;
pub mod text;

pub use jsonl::JsonlFormatter;
pub use text::{LineMode, TextFormatter, TextFormatterConfig};
