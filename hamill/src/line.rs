use std::fmt;
use std::ops::Range;

use log::{debug, warn};

use crate::document::ListKind;
use crate::parser::error::{ParseError, ParseErrorKind};

/// The role of one physical line, decided from its leading tokens and the
/// block the tagger is currently inside.
#[derive(Debug, Clone, PartialEq)]
pub enum LineTag {
    Empty,
    Separator,
    Title { level: u8 },
    ListItem { kind: ListKind, level: usize },
    Var,
    Const,
    Include,
    Require,
    Css,
    Html,
    Comment,
    /// `@@@lang` opening a free code block.
    CodeFence { language: Option<String> },
    /// A line inside a code block, either free or `@@`-prefixed.
    CodeLine { prefixed: bool },
    /// `>>>` opening a free quote block. The text holds its markup.
    QuoteFence,
    QuoteLine { prefixed: bool },
    Label,
    Div,
    Detail,
    Row,
    DefinitionHeader,
    DefinitionContent,
    Text,
}

impl fmt::Display for LineTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineTag::Empty => write!(f, "empty"),
            LineTag::Separator => write!(f, "separator"),
            LineTag::Title { level } => write!(f, "title({})", level),
            LineTag::ListItem { kind, level } => write!(f, "{}-list({})", kind, level),
            LineTag::Var => write!(f, "var"),
            LineTag::Const => write!(f, "const"),
            LineTag::Include => write!(f, "include"),
            LineTag::Require => write!(f, "require"),
            LineTag::Css => write!(f, "css"),
            LineTag::Html => write!(f, "html"),
            LineTag::Comment => write!(f, "comment"),
            LineTag::CodeFence { language } => {
                write!(f, "code-fence({})", language.as_deref().unwrap_or("-"))
            }
            LineTag::CodeLine { prefixed: true } => write!(f, "code(prefixed)"),
            LineTag::CodeLine { prefixed: false } => write!(f, "code"),
            LineTag::QuoteFence => write!(f, "quote-fence"),
            LineTag::QuoteLine { prefixed: true } => write!(f, "quote(prefixed)"),
            LineTag::QuoteLine { prefixed: false } => write!(f, "quote"),
            LineTag::Label => write!(f, "label"),
            LineTag::Div => write!(f, "div"),
            LineTag::Detail => write!(f, "detail"),
            LineTag::Row => write!(f, "row"),
            LineTag::DefinitionHeader => write!(f, "definition-header"),
            LineTag::DefinitionContent => write!(f, "definition-content"),
            LineTag::Text => write!(f, "text"),
        }
    }
}

/// A line with its tag. `text` is the line's payload with the tag's own
/// tokens removed; `span` covers the whole physical line in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedLine {
    pub text: String,
    pub tag: LineTag,
    pub span: Range<usize>,
}

impl fmt::Display for TaggedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6}  {:<22} {}", self.span.start, self.tag.to_string(), self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Block {
    None,
    FreeCode,
    PrefixedCode,
    FreeQuote,
}

/// Split `source` into lines and tag each one.
pub fn tag_lines(source: &str, file_id: usize) -> Result<Vec<TaggedLine>, ParseError> {
    let mut tagger = Tagger {
        block: Block::None,
        expect_definition: false,
        lines: Vec::new(),
    };

    let mut offset = 0;
    for raw in source.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let span = offset..offset + line.len();
        offset += raw.len() + 1;
        tagger
            .tag(line, span.clone())
            .map_err(|kind| ParseError::new(kind, span, file_id))?;
    }

    match tagger.block {
        Block::FreeCode => warn!("code block still open at end of input, closing it"),
        Block::FreeQuote => warn!("quote block still open at end of input, closing it"),
        Block::None | Block::PrefixedCode => {}
    }

    // `split` yields a trailing empty line after the final newline.
    if source.ends_with('\n') {
        if let Some(last) = tagger.lines.last() {
            if last.tag == LineTag::Empty && last.span.is_empty() && last.span.start == source.len() {
                tagger.lines.pop();
            }
        }
    }

    for line in &tagger.lines {
        debug!("{}", line);
    }
    Ok(tagger.lines)
}

struct Tagger {
    block: Block,
    expect_definition: bool,
    lines: Vec<TaggedLine>,
}

impl Tagger {
    fn emit(&mut self, tag: LineTag, text: &str, span: Range<usize>) {
        self.lines.push(TaggedLine {
            text: text.to_string(),
            tag,
            span,
        });
    }

    fn tag(&mut self, value: &str, span: Range<usize>) -> Result<(), ParseErrorKind> {
        let trimmed = value.trim();

        // Leaving a block: closing fences are swallowed, a prefixed block
        // simply stops at the first line without its prefix.
        match self.block {
            Block::PrefixedCode if !trimmed.starts_with("@@") => self.block = Block::None,
            Block::FreeCode if trimmed == "@@@" => {
                self.block = Block::None;
                return Ok(());
            }
            Block::FreeQuote if trimmed == ">>>" => {
                self.block = Block::None;
                return Ok(());
            }
            _ => {}
        }

        match self.block {
            Block::FreeCode => {
                self.emit(LineTag::CodeLine { prefixed: false }, value, span);
                return Ok(());
            }
            Block::PrefixedCode => {
                let content = &value.trim_start()[2..];
                self.emit(LineTag::CodeLine { prefixed: true }, content, span);
                return Ok(());
            }
            Block::FreeQuote => {
                self.emit(LineTag::QuoteLine { prefixed: false }, value, span);
                return Ok(());
            }
            Block::None => {}
        }

        let expect_definition = std::mem::take(&mut self.expect_definition);

        if trimmed.is_empty() {
            self.emit(LineTag::Empty, "", span);
        } else if let Some(rest) = trimmed.strip_prefix('#') {
            let level = 1 + rest.chars().take_while(|&c| c == '#').count();
            let text = trimmed.trim_start_matches('#').trim();
            self.emit(LineTag::Title { level: level.min(6) as u8 }, text, span);
        } else if trimmed.chars().all(|c| c == '-') {
            self.emit(LineTag::Separator, trimmed, span);
        } else if let Some((kind, level, text)) = list_item(value, trimmed)? {
            self.emit(LineTag::ListItem { kind, level }, text, span);
        } else if let Some(arg) = trimmed.strip_prefix("!var ") {
            self.emit(LineTag::Var, arg.trim(), span);
        } else if let Some(arg) = trimmed.strip_prefix("!const ") {
            self.emit(LineTag::Const, arg.trim(), span);
        } else if let Some(arg) = trimmed.strip_prefix("!include ") {
            self.emit(LineTag::Include, arg.trim(), span);
        } else if let Some(arg) = trimmed.strip_prefix("!require ") {
            self.emit(LineTag::Require, arg.trim(), span);
        } else if let Some(arg) = trimmed.strip_prefix("!css ") {
            self.emit(LineTag::Css, arg.trim(), span);
        } else if let Some(arg) = trimmed.strip_prefix("!html") {
            let arg = arg.strip_prefix(' ').unwrap_or(arg);
            self.emit(LineTag::Html, arg, span);
        } else if let Some(text) = trimmed
            .strip_prefix("!rem")
            .or_else(|| trimmed.strip_prefix("§§"))
        {
            self.emit(LineTag::Comment, text, span);
        } else if let Some(language) = trimmed.strip_prefix("@@@") {
            let language = language.trim();
            let language = (!language.is_empty()).then(|| language.to_string());
            self.block = Block::FreeCode;
            self.emit(LineTag::CodeFence { language }, "", span);
        } else if trimmed.starts_with("@@") && !trimmed[2..].contains("@@") {
            self.block = Block::PrefixedCode;
            self.emit(LineTag::CodeLine { prefixed: true }, &trimmed[2..], span);
        } else if let Some(markup) = trimmed.strip_prefix(">>>") {
            self.block = Block::FreeQuote;
            self.emit(LineTag::QuoteFence, markup.trim(), span);
        } else if let Some(text) = trimmed.strip_prefix(">>") {
            let text = text.strip_prefix(' ').unwrap_or(text);
            self.emit(LineTag::QuoteLine { prefixed: true }, text, span);
        } else if trimmed.starts_with("::") {
            self.emit(LineTag::Label, trimmed, span);
        } else if let Some(inner) = enclosed(trimmed, "{{", "}}") {
            self.emit(LineTag::Div, inner, span);
        } else if let Some(inner) = enclosed(trimmed, "<<", ">>") {
            self.emit(LineTag::Detail, inner, span);
        } else if trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|') {
            self.emit(LineTag::Row, trimmed, span);
        } else if let Some(header) = trimmed.strip_prefix("$ ") {
            self.expect_definition = true;
            self.emit(LineTag::DefinitionHeader, header.trim(), span);
        } else if expect_definition {
            self.emit(LineTag::DefinitionContent, trimmed, span);
        } else {
            self.emit(LineTag::Text, trimmed, span);
        }
        Ok(())
    }
}

/// `{{...}}` and `<<...>>` lines: the opener must be the only one on the line.
fn enclosed<'a>(trimmed: &'a str, open: &str, close: &str) -> Option<&'a str> {
    if trimmed.len() < open.len() + close.len()
        || !trimmed.starts_with(open)
        || !trimmed.ends_with(close)
        || trimmed.rfind(open) != Some(0)
    {
        return None;
    }
    Some(trimmed[open.len()..trimmed.len() - close.len()].trim())
}

/// Recognise a list item. Depth comes from the marker's column (two
/// columns per level) plus any repetition of the marker itself.
fn list_item<'a>(
    value: &str,
    trimmed: &'a str,
) -> Result<Option<(ListKind, usize, &'a str)>, ParseErrorKind> {
    let mut chars = trimmed.chars();
    let (Some(marker), Some(' ')) = (chars.next(), chars.next()) else {
        return Ok(None);
    };
    let Some(kind) = ListKind::from_marker(marker) else {
        return Ok(None);
    };

    let column = value.len() - value.trim_start().len();
    if column % 2 != 0 {
        return Err(ParseErrorKind::MalformedIndentation);
    }

    let token = [marker as u8, b' '];
    let mut rest = trimmed;
    let mut repeated = 0;
    while rest.as_bytes().starts_with(&token) {
        repeated += 1;
        rest = &rest[2..];
    }

    Ok(Some((kind, column / 2 + repeated, rest.trim())))
}
