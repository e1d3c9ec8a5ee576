use html_escape::{encode_double_quoted_attribute, encode_text};

/// Character sequences shown as typographic glyphs. Longer sequences
/// come before their prefixes.
const GLYPHS: &[(&str, &str)] = &[
    ("...", "…"),
    ("==>", "&DoubleRightArrow;"),
    ("<==", "&DoubleLeftArrow;"),
    ("->", "&ShortRightArrow;"),
    ("<-", "&ShortLeftArrow;"),
    ("==", "&Equal;"),
    ("!=", "&NotEqual;"),
    (">=", "&GreaterSlantEqual;"),
    ("<=", "&LessSlantEqual;"),
];

/// Escape document text for HTML and substitute glyphs.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut segment = 0;
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        match GLYPHS.iter().find(|(seq, _)| rest.starts_with(seq)) {
            Some((seq, glyph)) => {
                out.push_str(&encode_text(&text[segment..i]));
                out.push_str(glyph);
                i += seq.len();
                segment = i;
            }
            None => i += rest.chars().next().map_or(1, char::len_utf8),
        }
    }
    out.push_str(&encode_text(&text[segment..]));
    out
}

/// ` name="value"` when a value is present, nothing otherwise.
pub fn attribute(name: &str, value: Option<&str>) -> String {
    match value {
        Some(value) if !value.is_empty() => {
            format!(" {}=\"{}\"", name, encode_double_quoted_attribute(value))
        }
        _ => String::new(),
    }
}
