use crate::document::{Document, Inline, Style};
use crate::is_language;
use crate::parser::error::ParseErrorKind;
use crate::parser::markup::parse_markup;

/// Characters that lose their markup meaning when preceded by a backslash.
const ESCAPABLE: &[char] = &[
    '@', '(', ')', '[', ']', '{', '}', '$', '*', '!', '\'', '/', '_', '^', '%', '-', '#', '\\',
    '|', '<', '>', ':',
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse the inline content of one line.
///
/// Ids found on pictures, spans and paragraph markers are registered in
/// `doc` as they are met.
pub fn parse_inline(text: &str, doc: &mut Document) -> Result<Vec<Inline>, ParseErrorKind> {
    InlineParser::new(text, doc).parse()
}

/// Split `text` on every `separator` that is not preceded by a backslash.
/// The backslash of an escaped separator is dropped; other escapes are kept.
pub fn escaped_split(text: &str, separator: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        if let Some(after) = rest.strip_prefix('\\') {
            if after.starts_with(separator) {
                current.push_str(separator);
                i += 1 + separator.len();
                continue;
            }
        }
        if rest.starts_with(separator) {
            parts.push(std::mem::take(&mut current));
            i += separator.len();
            continue;
        }
        let Some(c) = rest.chars().next() else { break };
        current.push(c);
        i += c.len_utf8();
    }
    parts.push(current);
    parts
}

/// Byte index of the first `pattern` at or after `from` that is not
/// backslash-escaped.
pub fn find_unescaped(text: &str, from: usize, pattern: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let pattern = pattern.as_bytes();
    let mut j = from;
    while j + pattern.len() <= bytes.len() {
        if bytes[j] == b'\\' {
            j += 2;
            continue;
        }
        if bytes[j..].starts_with(pattern) {
            return Some(j);
        }
        j += 1;
    }
    None
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct InlineParser<'a> {
    text: &'a str,
    pos: usize,
    doc: &'a mut Document,
    nodes: Vec<Inline>,
    word: String,
    open: Vec<Style>,
}

impl<'a> InlineParser<'a> {
    fn new(text: &'a str, doc: &'a mut Document) -> Self {
        InlineParser {
            text,
            pos: 0,
            doc,
            nodes: Vec::new(),
            word: String::new(),
            open: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<Inline>, ParseErrorKind> {
        let text = self.text;
        while self.pos < text.len() {
            let rest = &text[self.pos..];

            if let Some(after) = rest.strip_prefix('\\') {
                match after.chars().next() {
                    Some(c) if ESCAPABLE.contains(&c) => {
                        self.word.push(c);
                        self.pos += 1 + c.len_utf8();
                    }
                    _ => {
                        self.word.push('\\');
                        self.pos += 1;
                    }
                }
                continue;
            }

            if rest.starts_with("##") {
                self.line_break();
                continue;
            }

            let pair = rest.get(..2).unwrap_or("");
            match pair {
                "@@" => self.code()?,
                "((" => self.picture()?,
                "[[" => self.link()?,
                "{{" => self.markup()?,
                "$$" => self.variable()?,
                _ => match Style::from_delimiter(pair) {
                    Some(style) => self.style(style)?,
                    None => {
                        let Some(c) = rest.chars().next() else { break };
                        self.word.push(c);
                        self.pos += c.len_utf8();
                    }
                },
            }
        }

        self.flush();
        if let Some(&style) = self.open.last() {
            return Err(ParseErrorKind::UnclosedStyle {
                style,
                text: self.text.to_string(),
            });
        }
        Ok(self.nodes)
    }

    fn flush(&mut self) {
        if !self.word.is_empty() {
            self.nodes.push(Inline::Text(std::mem::take(&mut self.word)));
        }
    }

    /// Find the closer of the construct starting at `self.pos` and return
    /// its content, leaving `self.pos` after the closer.
    fn enclosed(&mut self, closer: &str, construct: &'static str) -> Result<&'a str, ParseErrorKind> {
        let start = self.pos + 2;
        let end = find_unescaped(self.text, start, closer).ok_or_else(|| ParseErrorKind::Unclosed {
            construct,
            text: self.text.to_string(),
        })?;
        self.pos = end + closer.len();
        self.flush();
        let text = self.text;
        Ok(&text[start..end])
    }

    fn line_break(&mut self) {
        let kept = self.word.trim_end().len();
        self.word.truncate(kept);
        self.flush();
        self.nodes.push(Inline::LineBreak);
        self.pos += 2;
        if self.text[self.pos..].starts_with(' ') {
            self.pos += 1;
        }
    }

    fn code(&mut self) -> Result<(), ParseErrorKind> {
        let raw = self.enclosed("@@", "inline code")?;
        let (language, content) = match raw.split_once(' ') {
            Some((first, rest)) if is_language(first) => (Some(first.to_string()), rest),
            _ => (None, raw),
        };
        self.nodes.push(Inline::Code {
            content: unescape_code(content),
            language,
        });
        Ok(())
    }

    fn picture(&mut self) -> Result<(), ParseErrorKind> {
        let raw = self.enclosed("))", "image")?;
        let parts = escaped_split(raw, "->");
        let picture = match parts.as_slice() {
            [caption, url] => {
                let markup = parse_markup(caption.trim());
                if let Some(id) = &markup.id {
                    self.doc.register_id(id)?;
                }
                Inline::Picture {
                    url: url.trim().to_string(),
                    caption: markup.text,
                    id: markup.id,
                    class: markup.class,
                }
            }
            [url] => Inline::Picture {
                url: url.trim().to_string(),
                caption: None,
                id: None,
                class: None,
            },
            _ => return Err(ParseErrorKind::MalformedLink(raw.to_string())),
        };
        self.nodes.push(picture);
        Ok(())
    }

    fn link(&mut self) -> Result<(), ParseErrorKind> {
        let raw = self.enclosed("]]", "link")?;
        let parts = escaped_split(raw, "->");
        let link = match parts.as_slice() {
            [url] => Inline::Link {
                url: url.trim().to_string(),
                display: None,
            },
            [display, url] => Inline::Link {
                url: url.trim().to_string(),
                display: Some(parse_inline(display.trim(), self.doc)?),
            },
            _ => return Err(ParseErrorKind::MalformedLink(raw.to_string())),
        };
        self.nodes.push(link);
        Ok(())
    }

    fn markup(&mut self) -> Result<(), ParseErrorKind> {
        let raw = self.enclosed("}}", "quick markup")?;
        let markup = parse_markup(raw);
        if let Some(id) = &markup.id {
            self.doc.register_id(id)?;
        }
        let node = match markup.text {
            Some(text) => Inline::Span {
                content: parse_inline(&text, self.doc)?,
                id: markup.id,
                class: markup.class,
            },
            None => Inline::ParagraphMarker {
                id: markup.id,
                class: markup.class,
            },
        };
        self.nodes.push(node);
        Ok(())
    }

    fn variable(&mut self) -> Result<(), ParseErrorKind> {
        let name = self.enclosed("$$", "variable display")?;
        self.nodes.push(Inline::GetVariable(name.trim().to_string()));
        Ok(())
    }

    fn style(&mut self, style: Style) -> Result<(), ParseErrorKind> {
        let delimiter = style.delimiter();
        if self.open.contains(&style) {
            let innermost = self.open.pop().unwrap_or(style);
            if innermost != style {
                return Err(ParseErrorKind::IncoherentStyle {
                    closing: style,
                    open: innermost,
                    text: self.text.to_string(),
                });
            }
            self.flush();
            self.nodes.push(Inline::StyleStop(style));
        } else if find_unescaped(self.text, self.pos + 2, delimiter).is_some() {
            self.flush();
            self.open.push(style);
            self.nodes.push(Inline::StyleStart(style));
        } else {
            self.word.push_str(delimiter);
        }
        self.pos += 2;
        Ok(())
    }
}

/// Inline code only honours escapes of its own fence character.
fn unescape_code(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next @ ('@' | '\\')) = chars.peek() {
                out.push(next);
                chars.next();
                continue;
            }
        }
        out.push(c);
    }
    out
}
