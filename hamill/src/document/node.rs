use std::fmt;

use crate::document::Value;

/// Paired inline text modifiers. Each one opens and closes on the same
/// two-character delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Bold,
    Italic,
    Stroke,
    Underline,
    Sup,
    Sub,
    Strong,
    Em,
}

impl Style {
    pub const ALL: [Style; 8] = [
        Style::Bold,
        Style::Strong,
        Style::Italic,
        Style::Em,
        Style::Underline,
        Style::Sup,
        Style::Sub,
        Style::Stroke,
    ];

    pub fn delimiter(self) -> &'static str {
        match self {
            Style::Bold => "**",
            Style::Italic => "''",
            Style::Stroke => "--",
            Style::Underline => "__",
            Style::Sup => "^^",
            Style::Sub => "%%",
            Style::Strong => "!!",
            Style::Em => "//",
        }
    }

    /// The HTML element this modifier renders to.
    pub fn tag(self) -> &'static str {
        match self {
            Style::Bold => "b",
            Style::Italic => "i",
            Style::Stroke => "s",
            Style::Underline => "u",
            Style::Sup => "sup",
            Style::Sub => "sub",
            Style::Strong => "strong",
            Style::Em => "em",
        }
    }

    pub fn from_delimiter(delimiter: &str) -> Option<Style> {
        Style::ALL.into_iter().find(|s| s.delimiter() == delimiter)
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Style::Bold => "bold",
            Style::Italic => "italic",
            Style::Stroke => "stroke",
            Style::Underline => "underline",
            Style::Sup => "superscript",
            Style::Sub => "subscript",
            Style::Strong => "strong",
            Style::Em => "emphasis",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered,
    Reversed,
}

impl ListKind {
    pub fn from_marker(marker: char) -> Option<ListKind> {
        match marker {
            '*' => Some(ListKind::Unordered),
            '+' => Some(ListKind::Ordered),
            '-' => Some(ListKind::Reversed),
            _ => None,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListKind::Unordered => "unordered",
            ListKind::Ordered => "ordered",
            ListKind::Reversed => "reversed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellSpan {
    Columns(u32),
    Rows(u32),
}

/// One table cell with its optional presentation prefixes already removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub content: Vec<Inline>,
    pub align: Option<Align>,
    pub span: Option<CellSpan>,
}

/// A list and its items. An item is either a `TextLine` or a `Composite`
/// holding the item's text followed by a nested list.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementList {
    pub kind: ListKind,
    pub items: Vec<Node>,
}

/// Content of a single line of text.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    StyleStart(Style),
    StyleStop(Style),
    Link {
        url: String,
        display: Option<Vec<Inline>>,
    },
    Picture {
        url: String,
        caption: Option<String>,
        id: Option<String>,
        class: Option<String>,
    },
    Span {
        content: Vec<Inline>,
        id: Option<String>,
        class: Option<String>,
    },
    /// `{{#id .class}}` with no text: decorates the paragraph it opens.
    ParagraphMarker {
        id: Option<String>,
        class: Option<String>,
    },
    LineBreak,
    GetVariable(String),
    Code {
        content: String,
        language: Option<String>,
    },
}

/// A block-level node of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Title {
        level: u8,
        content: Vec<Inline>,
        id: String,
    },
    HorizontalRule,
    RawHtml(String),
    Include(String),
    Comment(String),
    SetVariable {
        name: String,
        value: Value,
    },
    TextLine(Vec<Inline>),
    List(ElementList),
    Composite(Vec<Node>),
    Row {
        cells: Vec<Cell>,
        header: bool,
    },
    Quote {
        text: String,
        id: Option<String>,
        class: Option<String>,
    },
    Code {
        content: String,
        language: Option<String>,
    },
    Detail {
        summary: String,
        body: Option<String>,
        id: Option<String>,
        class: Option<String>,
    },
    EndDetail,
    StartDiv {
        id: Option<String>,
        class: Option<String>,
    },
    EndDiv,
    Definition {
        header: Vec<Inline>,
        content: Vec<Inline>,
    },
    Empty,
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Title { .. } => "title",
            Node::HorizontalRule => "horizontal rule",
            Node::RawHtml(_) => "raw html",
            Node::Include(_) => "include",
            Node::Comment(_) => "comment",
            Node::SetVariable { .. } => "set variable",
            Node::TextLine(_) => "text line",
            Node::List(_) => "list",
            Node::Composite(_) => "composite",
            Node::Row { .. } => "row",
            Node::Quote { .. } => "quote",
            Node::Code { .. } => "code",
            Node::Detail { .. } => "detail",
            Node::EndDetail => "end detail",
            Node::StartDiv { .. } => "start div",
            Node::EndDiv => "end div",
            Node::Definition { .. } => "definition",
            Node::Empty => "empty",
        }
    }
}

/// Flatten inline content to the text a reader would see, without markup.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    collect_plain_text(inlines, &mut out);
    out
}

fn collect_plain_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(text),
            Inline::Span { content, .. } => collect_plain_text(content, out),
            Inline::Link { display, url } => match display {
                Some(display) => collect_plain_text(display, out),
                None => out.push_str(url),
            },
            Inline::Picture { caption, .. } => {
                if let Some(caption) = caption {
                    out.push_str(caption);
                }
            }
            Inline::Code { content, .. } => out.push_str(content),
            Inline::GetVariable(name) => out.push_str(name),
            Inline::LineBreak => out.push(' '),
            Inline::StyleStart(_) | Inline::StyleStop(_) | Inline::ParagraphMarker { .. } => {}
        }
    }
}
