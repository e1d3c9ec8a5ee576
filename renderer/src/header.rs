use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};
use log::warn;

use hamill::document::{Document, VariableStore};

use crate::escape::attribute;

pub const PAGE_FOOTER: &str = "</body>\n</html>\n";

/// Everything from the doctype to the opening `<body>` tag.
pub fn page_header(doc: &Document, variables: &VariableStore) -> Result<String, std::fmt::Error> {
    let lang = variables.get_string("LANG").unwrap_or_else(|| "en".into());
    let encoding = variables
        .get_string("ENCODING")
        .unwrap_or_else(|| "utf-8".into());
    let title = variables
        .get_string("TITLE")
        .unwrap_or_else(|| "Undefined title".into());

    let mut out = String::new();
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"{}\">", encode_double_quoted_attribute(&lang))?;
    writeln!(out, "<head>")?;
    writeln!(out, "  <meta charset=\"{}\">", encode_double_quoted_attribute(&encoding))?;
    writeln!(
        out,
        "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">"
    )?;
    writeln!(out, "  <title>{}</title>", encode_text(&title))?;
    if let Some(icon) = variables.get_string("ICON") {
        writeln!(
            out,
            "  <link rel=\"icon\" href=\"{}\" type=\"image/x-icon\">",
            encode_double_quoted_attribute(&icon)
        )?;
    }

    for required in &doc.required {
        let href = encode_double_quoted_attribute(required);
        if required.ends_with(".css") {
            writeln!(out, "  <link href=\"{}\" rel=\"stylesheet\">", href)?;
        } else if required.ends_with(".js") {
            writeln!(out, "  <script src=\"{}\"></script>", href)?;
        } else if required.ends_with(".mjs") {
            writeln!(out, "  <script type=\"module\" src=\"{}\"></script>", href)?;
        } else {
            warn!("ignoring required file of unknown type: {}", required);
        }
    }

    if !doc.css.is_empty() {
        writeln!(out, "  <style type=\"text/css\">")?;
        for rule in &doc.css {
            writeln!(out, "    {}", rule)?;
        }
        writeln!(out, "  </style>")?;
    }

    writeln!(out, "</head>")?;
    writeln!(
        out,
        "<body{}{}>",
        attribute("id", variables.get_string("BODY_ID").as_deref()),
        attribute("class", variables.get_string("BODY_CLASS").as_deref())
    )?;
    Ok(out)
}
