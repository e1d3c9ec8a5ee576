mod escape;
pub mod error;
mod header;
pub mod highlight;
pub mod include;
mod render;

pub use error::RenderError;
pub use escape::escape_text;
pub use highlight::{Highlighter, PlainHighlighter, RegexHighlighter};
pub use include::{FileReader, FsReader};
pub use render::{render, RenderOptions, RenderReport, Rendered, Renderer};
