use std::ops::Range;

use log::debug;

use crate::document::{
    make_anchor, plain_text, Align, Cell, CellSpan, Document, Inline, ListKind, Node, Value,
    VariableError,
};
use crate::is_language;
use crate::line::{LineTag, TaggedLine};
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::inline::{escaped_split, parse_inline};
use crate::parser::list::ListBuilder;
use crate::parser::markup::parse_markup;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Assemble tagged lines into a document.
///
/// Stops at the first error; no partial document is returned.
pub fn build_document(
    lines: &[TaggedLine],
    file_id: usize,
    name: Option<String>,
) -> Result<Document, ParseError> {
    let mut state = BuildState {
        lines,
        doc: Document::new(name),
        list: None,
        definition: None,
    };

    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];

        if let Some(pending) = &state.definition {
            if line.tag != LineTag::DefinitionContent {
                return Err(ParseError::new(
                    ParseErrorKind::DefinitionWithoutContent(pending.text.clone()),
                    pending.span.clone(),
                    file_id,
                ));
            }
        }

        i = state
            .step(i)
            .map_err(|kind| ParseError::new(kind, line.span.clone(), file_id))?;
    }

    state.flush_list();
    if let Some(pending) = state.definition {
        return Err(ParseError::new(
            ParseErrorKind::DefinitionWithoutContent(pending.text),
            pending.span,
            file_id,
        ));
    }

    debug!(
        "built {} top-level nodes, {} ids, {} labels",
        state.doc.nodes.len(),
        state.doc.ids().count(),
        state.doc.labels().count()
    );
    Ok(state.doc)
}

// ---------------------------------------------------------------------------
// Build state
// ---------------------------------------------------------------------------

struct PendingDefinition {
    header: Vec<Inline>,
    text: String,
    span: Range<usize>,
}

struct BuildState<'a> {
    lines: &'a [TaggedLine],
    doc: Document,
    /// The list currently being grown by consecutive list items.
    list: Option<ListBuilder>,
    /// A definition header waiting for its content line.
    definition: Option<PendingDefinition>,
}

impl<'a> BuildState<'a> {
    /// Handle the line at `i` and return the index of the next line to read.
    fn step(&mut self, i: usize) -> Result<usize, ParseErrorKind> {
        let lines = self.lines;
        let line = &lines[i];
        let text = line.text.as_str();

        if !matches!(line.tag, LineTag::ListItem { .. }) {
            self.flush_list();
        }

        match &line.tag {
            LineTag::Empty => self.doc.push(Node::Empty),
            LineTag::Separator => self.doc.push(Node::HorizontalRule),
            LineTag::Title { level } => self.title(*level, text)?,
            LineTag::ListItem { kind, level } => self.list_item(*kind, *level, text)?,
            LineTag::Var => {
                let (name, value) = assignment(text)?;
                if self.doc.variables.is_constant(name) {
                    return Err(VariableError::ConstantCollision(name.to_string()).into());
                }
                self.doc.push(Node::SetVariable {
                    name: name.to_string(),
                    value,
                });
            }
            LineTag::Const => {
                let (name, value) = assignment(text)?;
                self.doc.variables.set(name, value, true)?;
            }
            LineTag::Include => self.doc.push(Node::Include(text.to_string())),
            LineTag::Require => self.doc.required.push(text.to_string()),
            LineTag::Css => self.doc.css.push(text.to_string()),
            LineTag::Html => self.doc.push(Node::RawHtml(text.trim_end().to_string())),
            LineTag::Comment => self.doc.push(Node::Comment(text.to_string())),
            LineTag::CodeFence { language } => {
                let (content, next) = self.collect(i + 1, LineTag::CodeLine { prefixed: false });
                self.doc.push(Node::Code {
                    content,
                    language: language.clone(),
                });
                return Ok(next);
            }
            LineTag::CodeLine { prefixed } => {
                let mut start = i;
                let mut language = None;
                if *prefixed && is_language(text.trim()) {
                    language = Some(text.trim().to_string());
                    start += 1;
                }
                let (content, next) = self.collect(start, line.tag.clone());
                self.doc.push(Node::Code { content, language });
                return Ok(next.max(i + 1));
            }
            LineTag::QuoteFence => {
                let markup = parse_markup(text);
                if let Some(extra) = markup.text {
                    return Err(ParseErrorKind::QuoteOpenerWithText(extra));
                }
                if let Some(id) = &markup.id {
                    self.doc.register_id(id)?;
                }
                let (text, next) = self.collect(i + 1, LineTag::QuoteLine { prefixed: false });
                self.doc.push(Node::Quote {
                    text,
                    id: markup.id,
                    class: markup.class,
                });
                return Ok(next);
            }
            LineTag::QuoteLine { .. } => {
                let (text, next) = self.collect(i, line.tag.clone());
                self.doc.push(Node::Quote {
                    text,
                    id: None,
                    class: None,
                });
                return Ok(next);
            }
            LineTag::Label => {
                let (label, url) = text
                    .strip_prefix("::")
                    .and_then(|rest| rest.split_once("::"))
                    .ok_or_else(|| ParseErrorKind::MalformedDirective(text.to_string()))?;
                self.doc.add_label(label.trim(), url.trim());
            }
            LineTag::Div => self.div(text)?,
            LineTag::Detail => self.detail(text)?,
            LineTag::Row => self.row(text)?,
            LineTag::DefinitionHeader => {
                let header = parse_inline(text, &mut self.doc)?;
                self.definition = Some(PendingDefinition {
                    header,
                    text: text.to_string(),
                    span: line.span.clone(),
                });
            }
            LineTag::DefinitionContent => {
                let pending = self
                    .definition
                    .take()
                    .ok_or_else(|| ParseErrorKind::DefinitionWithoutHeader(text.to_string()))?;
                let content = parse_inline(text, &mut self.doc)?;
                self.doc.push(Node::Definition {
                    header: pending.header,
                    content,
                });
            }
            LineTag::Text => {
                let content = parse_inline(text, &mut self.doc)?;
                let misplaced = content
                    .iter()
                    .skip(1)
                    .any(|n| matches!(n, Inline::ParagraphMarker { .. }));
                if misplaced {
                    return Err(ParseErrorKind::MisplacedParagraphMarker);
                }
                self.doc.push(Node::TextLine(content));
            }
        }

        Ok(i + 1)
    }

    fn flush_list(&mut self) {
        if let Some(list) = self.list.take() {
            self.doc.push(Node::List(list.finish()));
        }
    }

    /// Join the text of the consecutive lines tagged `tag` from `start`,
    /// one `\n` after each. Returns the text and the index after the run.
    fn collect(&self, start: usize, tag: LineTag) -> (String, usize) {
        let mut content = String::new();
        let mut next = start;
        while let Some(line) = self.lines.get(next) {
            if line.tag != tag {
                break;
            }
            content.push_str(&line.text);
            content.push('\n');
            next += 1;
        }
        (content, next)
    }

    fn title(&mut self, level: u8, text: &str) -> Result<(), ParseErrorKind> {
        let content = parse_inline(text, &mut self.doc)?;
        let id = make_anchor(&plain_text(&content));
        self.doc.register_id(&id)?;
        self.doc.add_label(id.clone(), format!("#{}", id));
        self.doc.push(Node::Title { level, content, id });
        Ok(())
    }

    fn list_item(&mut self, kind: ListKind, level: usize, text: &str) -> Result<(), ParseErrorKind> {
        let content = parse_inline(text, &mut self.doc)?;
        let list = self
            .list
            .get_or_insert_with(|| ListBuilder::new(kind, level));
        list.push(kind, level, content)
    }

    fn div(&mut self, text: &str) -> Result<(), ParseErrorKind> {
        let markup = parse_markup(text);
        match markup.text.as_deref() {
            Some("end") if markup.has_only_text() => self.doc.push(Node::EndDiv),
            None | Some("begin") => {
                if let Some(id) = &markup.id {
                    self.doc.register_id(id)?;
                }
                self.doc.push(Node::StartDiv {
                    id: markup.id,
                    class: markup.class,
                });
            }
            Some(_) => return Err(ParseErrorKind::UnknownQuickMarkup(text.to_string())),
        }
        Ok(())
    }

    fn detail(&mut self, text: &str) -> Result<(), ParseErrorKind> {
        if text == "end" {
            self.doc.push(Node::EndDetail);
            return Ok(());
        }
        let parts = escaped_split(text, "->");
        let markup = parse_markup(parts[0].trim());
        let body = Some(parts[1..].join("->").trim().to_string()).filter(|b| !b.is_empty());
        if let Some(id) = &markup.id {
            self.doc.register_id(id)?;
        }
        self.doc.push(Node::Detail {
            summary: markup.text.unwrap_or_default(),
            body,
            id: markup.id,
            class: markup.class,
        });
        Ok(())
    }

    fn row(&mut self, text: &str) -> Result<(), ParseErrorKind> {
        let content = &text[1..text.len() - 1];

        // A row made only of dashes and pipes turns the rows above into headers.
        if content.contains('-') && content.chars().all(|c| c == '-' || c == '|') {
            for node in self.doc.nodes.iter_mut().rev() {
                match node {
                    Node::Row { header, .. } => *header = true,
                    _ => break,
                }
            }
            return Ok(());
        }

        let cells = escaped_split(content, "|")
            .iter()
            .map(|raw| self.cell(raw))
            .collect::<Result<Vec<_>, _>>()?;
        self.doc.push(Node::Row {
            cells,
            header: false,
        });
        Ok(())
    }

    fn cell(&mut self, raw: &str) -> Result<Cell, ParseErrorKind> {
        let trimmed = raw.trim_start();
        let (align, rest) = if let Some(rest) = trimmed.strip_prefix('=') {
            (Some(Align::Center), rest)
        } else if let Some(rest) = trimmed.strip_prefix('>') {
            (Some(Align::Right), rest)
        } else {
            (None, raw)
        };
        let (span, rest) = match cell_span(rest) {
            Some((span, rest)) => (Some(span), rest),
            None => (None, rest),
        };
        Ok(Cell {
            content: parse_inline(rest, &mut self.doc)?,
            align,
            span,
        })
    }
}

/// `#c2#` or `#r3#` at the start of a cell.
fn cell_span(text: &str) -> Option<(CellSpan, &str)> {
    let rest = text.strip_prefix('#')?;
    let axis = rest.chars().next()?;
    let (count, rest) = rest[axis.len_utf8()..].split_once('#')?;
    let count: u32 = count.parse().ok()?;
    let span = match axis {
        'c' => CellSpan::Columns(count),
        'r' => CellSpan::Rows(count),
        _ => return None,
    };
    Some((span, rest))
}

/// Split `NAME=VALUE` from a `!var` or `!const` line.
fn assignment(text: &str) -> Result<(&str, Value), ParseErrorKind> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| ParseErrorKind::MalformedDirective(text.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ParseErrorKind::MalformedDirective(text.to_string()));
    }
    Ok((name, Value::parse(value.trim())))
}
