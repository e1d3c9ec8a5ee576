use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

use crate::document::{ListKind, Style, VariableError};

/// Everything that can stop the construction of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// A list marker sits on an odd column.
    MalformedIndentation,
    /// A list item is shallower than the first item of its list.
    ListBelowStart { level: usize, start: usize },
    IncoherentListKind { expected: ListKind, found: ListKind },
    /// An item jumps more than one level below the previous item.
    OrphanSublist,
    /// Leaving a nested list did not land on an enclosing list.
    ListAscent,
    UnclosedStyle { style: Style, text: String },
    IncoherentStyle { closing: Style, open: Style, text: String },
    /// A bracketed inline construct has no closer.
    Unclosed { construct: &'static str, text: String },
    MalformedLink(String),
    DuplicateId(String),
    Variable(VariableError),
    DefinitionWithoutHeader(String),
    DefinitionWithoutContent(String),
    MalformedDirective(String),
    UnknownQuickMarkup(String),
    QuoteOpenerWithText(String),
    MisplacedParagraphMarker,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::MalformedIndentation => {
                write!(f, "list items must be indented by a multiple of two columns")
            }
            ParseErrorKind::ListBelowStart { level, start } => write!(
                f,
                "list item at level {} is shallower than the first item of its list (level {})",
                level, start
            ),
            ParseErrorKind::IncoherentListKind { expected, found } => write!(
                f,
                "incoherent list: expected {} item, found {} item",
                expected, found
            ),
            ParseErrorKind::OrphanSublist => {
                write!(f, "list item is nested more than one level below the previous item")
            }
            ParseErrorKind::ListAscent => {
                write!(f, "incoherent list: leaving a nested list did not reach its parent list")
            }
            ParseErrorKind::UnclosedStyle { style, text } => {
                write!(f, "unclosed {} text mode in `{}`", style, text)
            }
            ParseErrorKind::IncoherentStyle {
                closing,
                open,
                text,
            } => write!(
                f,
                "incoherent stacking of modifiers: finishing {} but {} should be closed first in `{}`",
                closing, open, text
            ),
            ParseErrorKind::Unclosed { construct, text } => {
                write!(f, "unclosed {} in `{}`", construct, text)
            }
            ParseErrorKind::MalformedLink(text) => {
                write!(f, "malformed link `{}`: more than one `->`", text)
            }
            ParseErrorKind::DuplicateId(id) => {
                write!(f, "two elements are defined with the same id `{}`", id)
            }
            ParseErrorKind::Variable(err) => write!(f, "{}", err),
            ParseErrorKind::DefinitionWithoutHeader(text) => {
                write!(f, "definition content without header: `{}`", text)
            }
            ParseErrorKind::DefinitionWithoutContent(text) => {
                write!(f, "definition header without content: `{}`", text)
            }
            ParseErrorKind::MalformedDirective(text) => {
                write!(f, "malformed directive `{}`: expected NAME=VALUE", text)
            }
            ParseErrorKind::UnknownQuickMarkup(text) => {
                write!(f, "unknown quick markup `{}`", text)
            }
            ParseErrorKind::QuoteOpenerWithText(text) => {
                write!(f, "a quote opener only accepts a class and an id, found text `{}`", text)
            }
            ParseErrorKind::MisplacedParagraphMarker => {
                write!(f, "a paragraph marker must start its line")
            }
        }
    }
}

impl std::error::Error for ParseErrorKind {}

impl From<VariableError> for ParseErrorKind {
    fn from(err: VariableError) -> Self {
        ParseErrorKind::Variable(err)
    }
}

/// Parse errors with source location information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Range<usize>,
    pub file_id: usize,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Range<usize>, file_id: usize) -> Self {
        ParseError {
            kind,
            span,
            file_id,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(Severity::Error)
            .with_message(self.kind.to_string())
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for ParseError {}
