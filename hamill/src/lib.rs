pub mod document;
pub mod line;
pub mod parser;

pub use document::Document;
pub use parser::{ParseError, Parser};

/// Languages that may follow a code fence or open an inline code span.
///
/// A leading word that is not in this list is treated as code content.
pub const LANGUAGES: &[&str] = &["bnf", "json", "lua", "python", "ruby", "text"];

pub fn is_language(word: &str) -> bool {
    LANGUAGES.contains(&word)
}
