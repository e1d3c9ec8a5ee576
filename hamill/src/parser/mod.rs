mod builder;
pub mod error;
pub mod inline;
mod list;
pub mod markup;

pub use error::{ParseError, ParseErrorKind};

use crate::document::Document;
use crate::line::tag_lines;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
    name: Option<String>,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser {
            source,
            file_id,
            name: None,
        }
    }

    /// Name recorded on the document, usually the source path.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Tag every line of the source, then build the document from them.
    pub fn parse(&self) -> Result<Document, ParseError> {
        let lines = tag_lines(&self.source, self.file_id)?;
        builder::build_document(&lines, self.file_id, self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Align, CellSpan, Inline, ListKind, Node, Value, VariableError};

    fn parse(source: &str) -> Document {
        Parser::new(source.to_string(), 0)
            .parse()
            .expect("parse failed")
    }

    fn parse_err(source: &str) -> ParseError {
        Parser::new(source.to_string(), 0)
            .parse()
            .expect_err("parse should fail")
    }

    #[test]
    fn titles_register_anchor_and_label() {
        let doc = parse("## Big **news** today");
        assert!(doc.has_id("big-news-today"));
        assert_eq!(doc.label("big-news-today"), Some("#big-news-today"));
        assert!(matches!(&doc.nodes[0], Node::Title { level: 2, id, .. } if id == "big-news-today"));
    }

    #[test]
    fn same_title_twice_is_a_duplicate_id() {
        let err = parse_err("# Intro\n# Intro");
        assert_eq!(err.kind, ParseErrorKind::DuplicateId("intro".into()));
        assert_eq!(err.span, 8..15);
    }

    #[test]
    fn list_is_flushed_by_other_lines() {
        let doc = parse("* a\n* b\ntext");
        assert_eq!(doc.nodes.len(), 2);
        assert!(matches!(&doc.nodes[0], Node::List(list) if list.items.len() == 2));
        assert!(matches!(&doc.nodes[1], Node::TextLine(_)));
    }

    #[test]
    fn mixed_list_kinds_at_same_depth() {
        let err = parse_err("* a\n+ b");
        assert!(matches!(
            err.kind,
            ParseErrorKind::IncoherentListKind {
                expected: ListKind::Unordered,
                found: ListKind::Ordered
            }
        ));
    }

    #[test]
    fn constants_apply_while_parsing() {
        let doc = parse("!const TITLE=Home\n!var COLOR=red");
        assert_eq!(doc.variables.get_string("TITLE").as_deref(), Some("Home"));
        assert_eq!(
            doc.nodes,
            vec![Node::SetVariable {
                name: "COLOR".into(),
                value: Value::String("red".into()),
            }]
        );
    }

    #[test]
    fn constant_set_twice() {
        let err = parse_err("!const NAME=a\n!const NAME=b");
        assert!(matches!(
            err.kind,
            ParseErrorKind::Variable(VariableError::ConstantAlreadySet { .. })
        ));
        assert_eq!(err.span, 14..27);
    }

    #[test]
    fn variable_named_like_constant() {
        let err = parse_err("!var VERSION=3");
        assert_eq!(
            err.kind,
            ParseErrorKind::Variable(VariableError::ConstantCollision("VERSION".into()))
        );
    }

    #[test]
    fn table_header_rows() {
        let doc = parse("|a|b|\n|---|---|\n|c|d|");
        let headers: Vec<bool> = doc
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Row { header, .. } => Some(*header),
                _ => None,
            })
            .collect();
        assert_eq!(headers, vec![true, false]);
    }

    #[test]
    fn cell_prefixes() {
        let doc = parse("|=mid|>#c2#right|");
        let Node::Row { cells, .. } = &doc.nodes[0] else {
            panic!("expected a row");
        };
        assert_eq!(cells[0].align, Some(Align::Center));
        assert_eq!(cells[0].content, vec![Inline::Text("mid".into())]);
        assert_eq!(cells[1].align, Some(Align::Right));
        assert_eq!(cells[1].span, Some(CellSpan::Columns(2)));
        assert_eq!(cells[1].content, vec![Inline::Text("right".into())]);
    }

    #[test]
    fn definitions() {
        let doc = parse("$ term\nmeaning");
        assert_eq!(
            doc.nodes,
            vec![Node::Definition {
                header: vec![Inline::Text("term".into())],
                content: vec![Inline::Text("meaning".into())],
            }]
        );
        let err = parse_err("$ term\n\nlater");
        assert_eq!(err.kind, ParseErrorKind::DefinitionWithoutContent("term".into()));
        assert_eq!(err.span, 0..6);
        assert!(matches!(
            parse_err("$ term").kind,
            ParseErrorKind::DefinitionWithoutContent(_)
        ));
    }

    #[test]
    fn code_blocks() {
        let doc = parse("@@@python\nx = 1\n  y\n@@@");
        assert_eq!(
            doc.nodes,
            vec![Node::Code {
                content: "x = 1\n  y\n".into(),
                language: Some("python".into()),
            }]
        );

        let doc = parse("@@ruby\n@@puts 1\n@@  puts 2");
        assert_eq!(
            doc.nodes,
            vec![Node::Code {
                content: "puts 1\n  puts 2\n".into(),
                language: Some("ruby".into()),
            }]
        );

        let doc = parse("@@plain\n@@more");
        assert_eq!(
            doc.nodes,
            vec![Node::Code {
                content: "plain\nmore\n".into(),
                language: None,
            }]
        );
    }

    #[test]
    fn quotes() {
        let doc = parse(">>> #q .wise\nfirst\nsecond\n>>>\n>>solo");
        assert_eq!(
            doc.nodes,
            vec![
                Node::Quote {
                    text: "first\nsecond\n".into(),
                    id: Some("q".into()),
                    class: Some("wise".into()),
                },
                Node::Quote {
                    text: "solo\n".into(),
                    id: None,
                    class: None,
                },
            ]
        );
        assert!(matches!(
            parse_err(">>> .c words\nx\n>>>").kind,
            ParseErrorKind::QuoteOpenerWithText(_)
        ));
    }

    #[test]
    fn divs_and_details() {
        let doc = parse("{{#box .wide}}\n{{end}}\n<<Hint -> Answer>>\n<<.c More>>\n<<end>>");
        assert_eq!(
            doc.nodes,
            vec![
                Node::StartDiv {
                    id: Some("box".into()),
                    class: Some("wide".into()),
                },
                Node::EndDiv,
                Node::Detail {
                    summary: "Hint".into(),
                    body: Some("Answer".into()),
                    id: None,
                    class: None,
                },
                Node::Detail {
                    summary: "More".into(),
                    body: None,
                    id: None,
                    class: Some("c".into()),
                },
                Node::EndDetail,
            ]
        );
        assert!(matches!(
            parse_err("{{what}}").kind,
            ParseErrorKind::UnknownQuickMarkup(_)
        ));
    }

    #[test]
    fn labels() {
        let doc = parse("::home:: https://example.org");
        assert_eq!(doc.label("home"), Some("https://example.org"));
    }

    #[test]
    fn directives() {
        let doc = parse("!require style.css\n!css p { color: red; }\n!include part.html\n!html <hr/>\n!rem note");
        assert_eq!(doc.required, vec!["style.css"]);
        assert_eq!(doc.css, vec!["p { color: red; }"]);
        assert_eq!(
            doc.nodes,
            vec![
                Node::Include("part.html".into()),
                Node::RawHtml("<hr/>".into()),
                Node::Comment(" note".into()),
            ]
        );
    }

    #[test]
    fn paragraph_marker_must_lead() {
        assert_eq!(
            parse_err("text {{#late}}").kind,
            ParseErrorKind::MisplacedParagraphMarker
        );
    }

    #[test]
    fn empty_lines_collapse() {
        let doc = parse("a\n\n\n\nb");
        assert_eq!(doc.nodes.len(), 3);
    }

    #[test]
    fn errors_become_diagnostics() {
        let err = parse_err("ok\na [[b");
        let diagnostic = err.to_diagnostic();
        assert_eq!(diagnostic.labels[0].range, 3..8);
    }
}
