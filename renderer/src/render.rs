use std::collections::BTreeMap;
use std::fmt::Write;
use std::mem;
use std::time::Instant;

use html_escape::{encode_double_quoted_attribute, encode_text};
use log::{debug, info, warn};

use hamill::document::{
    make_anchor, plain_text, Align, Cell, CellSpan, Document, ElementList, Inline, ListKind, Node,
    VariableLookup, VariableStore,
};

use crate::error::RenderError;
use crate::escape::{attribute, escape_text};
use crate::header::{page_header, PAGE_FOOTER};
use crate::highlight::{Highlighter, RegexHighlighter};
use crate::include::{FileReader, FsReader};

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Wrap the body in a complete HTML page.
    pub full_document: bool,
    /// Drop top-level nodes that fail to render instead of aborting.
    pub skip_errors: bool,
}

/// What happened during a render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    /// Number of top-level nodes visited.
    pub processed: usize,
    /// Nodes dropped in tolerant mode, counted by kind.
    pub skipped: BTreeMap<&'static str, usize>,
}

impl RenderReport {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct Rendered {
    pub html: String,
    pub report: RenderReport,
}

/// Turns documents into HTML using a code highlighter and a file reader.
pub struct Renderer {
    options: RenderOptions,
    highlighter: Box<dyn Highlighter>,
    reader: Box<dyn FileReader>,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Renderer {
            options,
            highlighter: Box::new(RegexHighlighter),
            reader: Box::new(FsReader::default()),
        }
    }

    pub fn with_highlighter(mut self, highlighter: impl Highlighter + 'static) -> Self {
        self.highlighter = Box::new(highlighter);
        self
    }

    pub fn with_reader(mut self, reader: impl FileReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    /// Render `doc`. `!var` directives are applied to the document's
    /// variables as they are met, so the store reflects the end of the
    /// document afterwards.
    pub fn render(&self, doc: &mut Document) -> Result<Rendered, RenderError> {
        let mut variables = mem::take(&mut doc.variables);
        let result = RenderState {
            doc: &*doc,
            variables: &mut variables,
            highlighter: self.highlighter.as_ref(),
            reader: self.reader.as_ref(),
            options: &self.options,
            out: String::new(),
            in_paragraph: false,
            in_table: false,
            in_definition: false,
            report: RenderReport::default(),
        }
        .run();
        doc.variables = variables;
        result
    }
}

/// Render with the built-in highlighter, reading includes from the
/// current directory.
pub fn render(doc: &mut Document, options: &RenderOptions) -> Result<Rendered, RenderError> {
    Renderer::new(options.clone()).render(doc)
}

// ---------------------------------------------------------------------------

struct RenderState<'r> {
    doc: &'r Document,
    variables: &'r mut VariableStore,
    highlighter: &'r dyn Highlighter,
    reader: &'r dyn FileReader,
    options: &'r RenderOptions,
    out: String,
    in_paragraph: bool,
    in_table: bool,
    in_definition: bool,
    report: RenderReport,
}

impl RenderState<'_> {
    fn run(mut self) -> Result<Rendered, RenderError> {
        let started = Instant::now();
        let doc = self.doc;

        for node in &doc.nodes {
            debug!("rendering {}", node.kind_name());
            self.report.processed += 1;

            if !self.options.skip_errors {
                self.node(node)?;
                continue;
            }

            let mark = (self.out.len(), self.in_paragraph, self.in_table, self.in_definition);
            if let Err(err) = self.node(node) {
                warn!("skipping {}: {}", node.kind_name(), err);
                self.out.truncate(mark.0);
                self.in_paragraph = mark.1;
                self.in_table = mark.2;
                self.in_definition = mark.3;
                *self.report.skipped.entry(node.kind_name()).or_insert(0) += 1;
            }
        }
        self.close_blocks(None);

        let html = if self.options.full_document {
            let mut page = page_header(self.doc, &*self.variables)?;
            page.push_str(&self.out);
            page.push_str(PAGE_FOOTER);
            page
        } else {
            self.out
        };

        info!(
            "rendered {} root nodes ({} skipped) in {:?}",
            self.report.processed,
            self.report.skipped_total(),
            started.elapsed()
        );
        Ok(Rendered {
            html,
            report: self.report,
        })
    }

    /// Close the paragraph, definition list or table that `next` does not
    /// continue. `None` closes everything.
    fn close_blocks(&mut self, next: Option<&Node>) {
        if self.in_paragraph && !matches!(next, Some(Node::TextLine(_))) {
            self.out.push_str("</p>\n");
            self.in_paragraph = false;
        }
        if self.in_definition && !matches!(next, Some(Node::Definition { .. })) {
            self.out.push_str("</dl>\n");
            self.in_definition = false;
        }
        if self.in_table && !matches!(next, Some(Node::Row { .. })) {
            self.out.push_str("</table>\n");
            self.in_table = false;
        }
    }

    fn node(&mut self, node: &Node) -> Result<(), RenderError> {
        self.close_blocks(Some(node));

        match node {
            Node::Empty => {}
            Node::Title { level, content, id } => {
                let html = self.inlines(content)?;
                writeln!(
                    self.out,
                    "<h{level} id=\"{}\">{html}</h{level}>",
                    encode_double_quoted_attribute(id)
                )?;
            }
            Node::HorizontalRule => self.out.push_str("<hr>\n"),
            Node::RawHtml(html) => writeln!(self.out, "{}", html)?,
            Node::Include(path) => {
                let content = self.reader.read(path).map_err(|source| RenderError::Include {
                    path: path.clone(),
                    source,
                })?;
                writeln!(self.out, "{}", content)?;
            }
            Node::Comment(text) => {
                if self.variables.is_set_true("EXPORT_COMMENT") {
                    writeln!(self.out, "<!--{} -->", text)?;
                }
            }
            Node::SetVariable { name, value } => {
                self.variables.set(name, value.clone(), false)?;
            }
            Node::TextLine(content) => self.text_line(content)?,
            Node::List(list) => {
                let html = self.list(list, 0)?;
                self.out.push_str(&html);
            }
            Node::Composite(children) => {
                for child in children {
                    self.node(child)?;
                }
            }
            Node::Row { cells, header } => self.row(cells, *header)?,
            Node::Quote { text, id, class } => {
                writeln!(
                    self.out,
                    "<blockquote{}{}>",
                    attribute("id", id.as_deref()),
                    attribute("class", class.as_deref())
                )?;
                self.out.push_str(&escape_text(text).replace('\n', "<br>\n"));
                self.out.push_str("</blockquote>\n");
            }
            Node::Code { content, language } => {
                let id = self.variables.take_string("NEXT_CODE_ID");
                let class = self.variables.take_string("NEXT_CODE_CLASS");
                let code = self.code(content, language.as_deref());
                writeln!(
                    self.out,
                    "<pre{}{}>",
                    attribute("id", id.as_deref()),
                    attribute("class", class.as_deref())
                )?;
                self.out.push_str(&code);
                self.out.push_str("</pre>\n");
            }
            Node::Detail {
                summary,
                body,
                id,
                class,
            } => {
                write!(
                    self.out,
                    "<details{}{}><summary>{}</summary>",
                    attribute("id", id.as_deref()),
                    attribute("class", class.as_deref()),
                    escape_text(summary)
                )?;
                match body {
                    Some(body) => writeln!(self.out, "{}</details>", escape_text(body))?,
                    None => self.out.push('\n'),
                }
            }
            Node::EndDetail => self.out.push_str("</details>\n"),
            Node::StartDiv { id, class } => {
                writeln!(
                    self.out,
                    "<div{}{}>",
                    attribute("id", id.as_deref()),
                    attribute("class", class.as_deref())
                )?;
            }
            Node::EndDiv => self.out.push_str("</div>\n"),
            Node::Definition { header, content } => {
                if !self.in_definition {
                    self.out.push_str("<dl>\n");
                    self.in_definition = true;
                }
                let header = self.inlines(header)?;
                let content = self.inlines(content)?;
                writeln!(self.out, "<dt>{}</dt>", header)?;
                if self.variables.is_set_true("PARAGRAPH_DEFINITION") {
                    writeln!(self.out, "<dd><p>{}</p></dd>", content)?;
                } else {
                    writeln!(self.out, "<dd>{}</dd>", content)?;
                }
            }
        }
        Ok(())
    }

    fn text_line(&mut self, content: &[Inline]) -> Result<(), RenderError> {
        let marker = matches!(content.first(), Some(Inline::ParagraphMarker { .. }));
        if marker && self.in_paragraph {
            self.out.push_str("</p>\n");
            self.in_paragraph = false;
        }

        if self.in_paragraph {
            self.out.push_str("<br>\n");
        } else {
            self.in_paragraph = true;
            // A leading marker opens the paragraph itself.
            if !marker {
                let class = self.variables.get_string("DEFAULT_PARAGRAPH_CLASS");
                write!(self.out, "<p{}>", attribute("class", class.as_deref()))?;
            }
        }

        let html = self.inlines(content)?;
        self.out.push_str(&html);
        Ok(())
    }

    fn list(&self, list: &ElementList, level: usize) -> Result<String, RenderError> {
        let indent = "    ".repeat(level);
        let (open, close) = match list.kind {
            ListKind::Unordered => ("<ul>", "</ul>"),
            ListKind::Ordered => ("<ol>", "</ol>"),
            ListKind::Reversed => ("<ol reversed>", "</ol>"),
        };

        let mut out = format!("{}{}\n", indent, open);
        for item in &list.items {
            out.push_str(&indent);
            out.push_str("  <li>");
            match item {
                Node::TextLine(content) => {
                    out.push_str(&self.inlines(content)?);
                    out.push_str("</li>\n");
                }
                Node::List(sublist) => {
                    out.push('\n');
                    out.push_str(&self.list(sublist, level + 1)?);
                    writeln!(out, "{}  </li>", indent)?;
                }
                Node::Composite(children) => {
                    for child in children {
                        match child {
                            Node::TextLine(content) => out.push_str(&self.inlines(content)?),
                            Node::List(sublist) => {
                                out.push('\n');
                                out.push_str(&self.list(sublist, level + 1)?);
                            }
                            _ => {}
                        }
                    }
                    writeln!(out, "{}  </li>", indent)?;
                }
                // Lists only ever hold lines, sub-lists and composites.
                _ => out.push_str("</li>\n"),
            }
        }
        writeln!(out, "{}{}", indent, close)?;
        Ok(out)
    }

    fn row(&mut self, cells: &[Cell], header: bool) -> Result<(), RenderError> {
        if !self.in_table {
            self.in_table = true;
            let id = self.variables.take_string("NEXT_TABLE_ID");
            let class = self
                .variables
                .take_string("NEXT_TABLE_CLASS")
                .or_else(|| self.variables.get_string("DEFAULT_TABLE_CLASS"));
            writeln!(
                self.out,
                "<table{}{}>",
                attribute("id", id.as_deref()),
                attribute("class", class.as_deref())
            )?;
        }

        let tag = if header { "th" } else { "td" };
        self.out.push_str("<tr>");
        for cell in cells {
            let style = match cell.align {
                Some(Align::Center) => " style=\"text-align: center\"",
                Some(Align::Right) => " style=\"text-align: right\"",
                None => "",
            };
            let span = match cell.span {
                Some(CellSpan::Columns(n)) => format!(" colspan=\"{}\"", n),
                Some(CellSpan::Rows(n)) => format!(" rowspan=\"{}\"", n),
                None => String::new(),
            };
            let content = self.inlines(&cell.content)?;
            write!(self.out, "<{tag}{style}{span}>{content}</{tag}>")?;
        }
        self.out.push_str("</tr>\n");
        Ok(())
    }

    fn code(&self, content: &str, language: Option<&str>) -> String {
        let fallback = self.variables.get_string("DEFAULT_CODE");
        let language = language
            .filter(|l| self.highlighter.supports(l))
            .or(fallback.as_deref());
        self.highlighter.highlight(content, language)
    }

    // ---- Inline content ----

    fn inlines(&self, inlines: &[Inline]) -> Result<String, RenderError> {
        let mut out = String::new();
        for inline in inlines {
            match inline {
                Inline::Text(text) => out.push_str(&escape_text(text)),
                Inline::StyleStart(style) => write!(out, "<{}>", style.tag())?,
                Inline::StyleStop(style) => write!(out, "</{}>", style.tag())?,
                Inline::LineBreak => out.push_str("<br>"),
                Inline::GetVariable(name) => match self.variables.lookup(name) {
                    VariableLookup::Found(value) => out.push_str(&encode_text(&value.to_string())),
                    VariableLookup::Unset => return Err(RenderError::UnsetVariable(name.clone())),
                    VariableLookup::NotFound => {
                        return Err(RenderError::UnknownVariable(name.clone()));
                    }
                },
                Inline::Code { content, language } => {
                    write!(out, "<code>{}</code>", self.code(content, language.as_deref()))?;
                }
                Inline::Span { content, id, class } => {
                    write!(
                        out,
                        "<span{}{}>{}</span>",
                        attribute("id", id.as_deref()),
                        attribute("class", class.as_deref()),
                        self.inlines(content)?
                    )?;
                }
                Inline::ParagraphMarker { id, class } => {
                    write!(
                        out,
                        "<p{}{}>",
                        attribute("id", id.as_deref()),
                        attribute("class", class.as_deref())
                    )?;
                }
                Inline::Link { url, display } => {
                    let href = self.resolve_link(url, display.as_deref())?;
                    let shown = match display {
                        Some(display) => self.inlines(display)?,
                        None => encode_text(&href).into_owned(),
                    };
                    write!(
                        out,
                        "<a href=\"{}\">{}</a>",
                        encode_double_quoted_attribute(&href),
                        shown
                    )?;
                }
                Inline::Picture {
                    url,
                    caption,
                    id,
                    class,
                } => out.push_str(&self.picture(
                    url,
                    caption.as_deref(),
                    id.as_deref(),
                    class.as_deref(),
                )),
            }
        }
        Ok(out)
    }

    fn resolve_link(&self, url: &str, display: Option<&[Inline]>) -> Result<String, RenderError> {
        if is_absolute(url) {
            return Ok(url.to_string());
        }
        if url == "#" {
            // Same text a title's anchor is built from.
            let anchor = make_anchor(&plain_text(display.unwrap_or_default()));
            return self
                .doc
                .label(&anchor)
                .map(str::to_string)
                .ok_or(RenderError::UnknownLabel(anchor));
        }
        if let Some(id) = url.strip_prefix('#') {
            if !self.doc.has_id(id) {
                return Err(RenderError::UnknownId(id.to_string()));
            }
            return Ok(url.to_string());
        }
        self.doc
            .label(url)
            .map(str::to_string)
            .ok_or_else(|| RenderError::UnknownLabel(url.to_string()))
    }

    fn picture(
        &self,
        url: &str,
        caption: Option<&str>,
        id: Option<&str>,
        class: Option<&str>,
    ) -> String {
        let src = match self.variables.get_string("DEFAULT_FIND_IMAGE") {
            Some(dir) if !is_absolute(url) => format!("{}/{}", dir.trim_end_matches('/'), url),
            _ => url.to_string(),
        };
        let attrs = format!(
            "{}{} src=\"{}\"",
            attribute("id", id),
            attribute("class", class),
            encode_double_quoted_attribute(&src)
        );
        match caption {
            Some(caption) => format!(
                "<figure><img{} alt=\"{}\"/><figcaption>{}</figcaption></figure>",
                attrs,
                encode_double_quoted_attribute(caption),
                escape_text(caption)
            ),
            None => format!("<img{}/>", attrs),
        }
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with("www.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamill::Parser;

    fn render_source(source: &str) -> Result<String, RenderError> {
        let mut doc = Parser::new(source.to_string(), 0)
            .parse()
            .expect("parse failed");
        render(&mut doc, &RenderOptions::default()).map(|r| r.html)
    }

    #[test]
    fn paragraphs_join_lines_with_breaks() {
        assert_eq!(render_source("a\nb\n\nc").unwrap(), "<p>a<br>\nb</p>\n<p>c</p>\n");
    }

    #[test]
    fn marker_line_closes_open_paragraph() {
        assert_eq!(
            render_source("a\n{{.x}}b").unwrap(),
            "<p>a</p>\n<p class=\"x\">b</p>\n"
        );
    }

    #[test]
    fn blocks_close_on_transition() {
        assert_eq!(
            render_source("|a|\ntext\n$ t\nd\n---").unwrap(),
            "<table>\n<tr><td>a</td></tr>\n</table>\n<p>text</p>\n<dl>\n<dt>t</dt>\n<dd>d</dd>\n</dl>\n<hr>\n"
        );
    }

    #[test]
    fn header_rows_use_th() {
        assert_eq!(
            render_source("|a|b|\n|---|---|\n|c|d|").unwrap(),
            "<table>\n<tr><th>a</th><th>b</th></tr>\n<tr><td>c</td><td>d</td></tr>\n</table>\n"
        );
    }

    #[test]
    fn cell_spans() {
        assert_eq!(
            render_source("|#c2#wide|").unwrap(),
            "<table>\n<tr><td colspan=\"2\">wide</td></tr>\n</table>\n"
        );
    }

    #[test]
    fn reversed_and_ordered_lists() {
        assert_eq!(
            render_source("- a\n- b").unwrap(),
            "<ol reversed>\n  <li>a</li>\n  <li>b</li>\n</ol>\n"
        );
        assert_eq!(
            render_source("+ a").unwrap(),
            "<ol>\n  <li>a</li>\n</ol>\n"
        );
    }

    #[test]
    fn link_to_heading_by_display_anchor() {
        assert_eq!(
            render_source("# Big Day\n[[Big Day->#]]").unwrap(),
            "<h1 id=\"big-day\">Big Day</h1>\n<p><a href=\"#big-day\">Big Day</a></p>\n"
        );
        assert_eq!(
            render_source("# Q&A\n[[Q&A->#]]").unwrap(),
            "<h1 id=\"q&amp;a\">Q&amp;A</h1>\n<p><a href=\"#q&amp;a\">Q&amp;A</a></p>\n"
        );
        assert_eq!(
            render_source("# Wait...\n[[Wait...->#]]").unwrap(),
            "<h1 id=\"wait...\">Wait…</h1>\n<p><a href=\"#wait...\">Wait…</a></p>\n"
        );
        assert_eq!(
            render_source("[[**Big** day->#]]\n# Big day").unwrap(),
            "<p><a href=\"#big-day\"><b>Big</b> day</a></p>\n<h1 id=\"big-day\">Big day</h1>\n"
        );
    }

    #[test]
    fn link_errors() {
        assert!(matches!(
            render_source("[[x->nowhere]]"),
            Err(RenderError::UnknownLabel(label)) if label == "nowhere"
        ));
        assert!(matches!(
            render_source("[[x->#ghost]]"),
            Err(RenderError::UnknownId(id)) if id == "ghost"
        ));
    }

    #[test]
    fn unset_predefined_variable() {
        assert!(matches!(
            render_source("$$TITLE$$"),
            Err(RenderError::UnsetVariable(name)) if name == "TITLE"
        ));
    }

    #[test]
    fn picture_with_caption() {
        assert_eq!(
            render_source("((A cat->cat.png))").unwrap(),
            "<p><figure><img src=\"cat.png\" alt=\"A cat\"/><figcaption>A cat</figcaption></figure></p>\n"
        );
    }

    #[test]
    fn variable_values_are_escaped() {
        assert_eq!(
            render_source("!var X=<b>\n$$X$$").unwrap(),
            "<p>&lt;b&gt;</p>\n"
        );
    }

    #[test]
    fn detail_with_body() {
        assert_eq!(
            render_source("<<.red small -> petit>>").unwrap(),
            "<details class=\"red\"><summary>small</summary>petit</details>\n"
        );
    }

    #[test]
    fn render_applies_variables_to_the_document() {
        let mut doc = Parser::new("!var NEXT_TABLE_ID=t\n!var EXPORT_COMMENT=true".to_string(), 0)
            .parse()
            .unwrap();
        render(&mut doc, &RenderOptions::default()).unwrap();
        assert!(doc.variables.is_set_true("EXPORT_COMMENT"));
        assert_eq!(doc.variables.get_string("NEXT_TABLE_ID").as_deref(), Some("t"));
    }
}
