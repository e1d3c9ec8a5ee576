use std::collections::HashMap;
use std::sync::OnceLock;

use html_escape::encode_text;
use regex::Regex;

/// Turns source code into HTML markup.
///
/// Implementations must HTML-escape every character of `code` exactly once.
pub trait Highlighter {
    fn supports(&self, language: &str) -> bool;

    /// Highlight `code` written in `language`. An absent or unsupported
    /// language yields the escaped code unchanged.
    fn highlight(&self, code: &str, language: Option<&str>) -> String;
}

/// No highlighting at all: every language renders as escaped text.
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn supports(&self, _language: &str) -> bool {
        false
    }

    fn highlight(&self, code: &str, _language: Option<&str>) -> String {
        encode_text(code).into_owned()
    }
}

// ---------------------------------------------------------------------------
// Token tables
// ---------------------------------------------------------------------------

const FLOAT: &str = r"\d+\.\d+";
const INTEGER: &str = r"\d+";
const STRING: &str = r#""(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'"#;
const IDENTIFIER: &str = r"[A-Za-z_][A-Za-z0-9_]*";
const SEPARATOR: &str = r"[()\[\]{}:,;]";

/// Kinds that are emitted without a wrapping span.
const BARE: &[&str] = &["blank", "newline"];

const TABLES: &[(&str, &[(&str, &str)])] = &[
    (
        "python",
        &[
            ("comment", r"#[^\n]*"),
            (
                "keyword",
                r"\b(?:and|as|assert|break|class|continue|def|del|elif|else|except|finally|for|from|global|if|import|in|is|lambda|nonlocal|not|or|pass|raise|return|try|while|with|yield)\b",
            ),
            ("boolean", r"\b(?:True|False|None)\b"),
            ("float", FLOAT),
            ("integer", INTEGER),
            ("string", STRING),
            ("identifier", IDENTIFIER),
            ("operator", r"[-+*/%=<>!&|^~.]+"),
            ("separator", SEPARATOR),
        ],
    ),
    (
        "ruby",
        &[
            ("comment", r"#[^\n]*"),
            (
                "keyword",
                r"\b(?:alias|and|begin|break|case|class|def|do|else|elsif|end|ensure|for|if|in|module|next|not|or|redo|rescue|retry|return|self|super|then|undef|unless|until|when|while|yield)\b",
            ),
            ("boolean", r"\b(?:true|false|nil)\b"),
            ("symbol", r":[A-Za-z_][A-Za-z0-9_]*"),
            ("float", FLOAT),
            ("integer", INTEGER),
            ("string", STRING),
            ("identifier", IDENTIFIER),
            ("operator", r"[-+*/%=<>!&|^~.]+"),
            ("separator", SEPARATOR),
        ],
    ),
    (
        "lua",
        &[
            ("comment", r"--[^\n]*"),
            (
                "keyword",
                r"\b(?:and|break|do|else|elseif|end|for|function|goto|if|in|local|not|or|repeat|return|then|until|while)\b",
            ),
            ("boolean", r"\b(?:true|false|nil)\b"),
            ("float", FLOAT),
            ("integer", INTEGER),
            ("string", STRING),
            ("identifier", IDENTIFIER),
            ("operator", r"\.\.|[-+*/%^#=<>~.]+"),
            ("separator", SEPARATOR),
        ],
    ),
    (
        "json",
        &[
            ("string", r#""(?:[^"\\\n]|\\.)*""#),
            ("number", r"-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?"),
            ("boolean", r"\b(?:true|false|null)\b"),
            ("separator", r"[{}\[\]:,]"),
        ],
    ),
    (
        "bnf",
        &[
            ("keyword", r"<[^>\n]+>"),
            ("operator", r"::=|\|"),
            ("string", STRING),
            ("separator", r"[()\[\]{}*+?]"),
        ],
    ),
    ("text", &[]),
];

struct TokenRule {
    kind: &'static str,
    regex: Regex,
}

fn anchored(pattern: &str) -> Regex {
    Regex::new(&format!("^(?:{})", pattern)).expect("invalid built-in token pattern")
}

fn tables() -> &'static HashMap<&'static str, Vec<TokenRule>> {
    static TABLES_CELL: OnceLock<HashMap<&'static str, Vec<TokenRule>>> = OnceLock::new();
    TABLES_CELL.get_or_init(|| {
        TABLES
            .iter()
            .map(|(language, rules)| {
                let mut compiled = vec![
                    TokenRule {
                        kind: "blank",
                        regex: anchored(r"[ \t]+"),
                    },
                    TokenRule {
                        kind: "newline",
                        regex: anchored(r"\r?\n"),
                    },
                ];
                compiled.extend(rules.iter().map(|(kind, pattern)| TokenRule {
                    kind: *kind,
                    regex: anchored(pattern),
                }));
                (*language, compiled)
            })
            .collect()
    })
}

// ---------------------------------------------------------------------------
// Highlighter
// ---------------------------------------------------------------------------

/// Regex-table highlighter for the languages in [`hamill::LANGUAGES`].
///
/// Tokens are wrapped in `<span class="{language}-{kind}">`. At each
/// position the longest match wins; on a tie the earlier rule wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexHighlighter;

impl Highlighter for RegexHighlighter {
    fn supports(&self, language: &str) -> bool {
        tables().contains_key(language)
    }

    fn highlight(&self, code: &str, language: Option<&str>) -> String {
        let Some((language, rules)) =
            language.and_then(|l| tables().get_key_value(l).map(|(k, v)| (*k, v)))
        else {
            return encode_text(code).into_owned();
        };

        let mut out = String::with_capacity(code.len() * 2);
        let mut unmatched = 0;
        let mut i = 0;
        while i < code.len() {
            let rest = &code[i..];
            let best = rules
                .iter()
                .filter_map(|rule| rule.regex.find(rest).map(|m| (rule.kind, m.end())))
                .filter(|(_, len)| *len > 0)
                .fold(None, |best: Option<(&str, usize)>, (kind, len)| match best {
                    Some((_, best_len)) if best_len >= len => best,
                    _ => Some((kind, len)),
                });

            match best {
                Some((kind, len)) => {
                    out.push_str(&encode_text(&code[unmatched..i]));
                    let token = encode_text(&rest[..len]);
                    if BARE.contains(&kind) {
                        out.push_str(&token);
                    } else {
                        out.push_str(&format!(
                            "<span class=\"{}-{}\">{}</span>",
                            language, kind, token
                        ));
                    }
                    i += len;
                    unmatched = i;
                }
                None => i += rest.chars().next().map_or(1, char::len_utf8),
            }
        }
        out.push_str(&encode_text(&code[unmatched..]));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_language_is_supported() {
        for language in hamill::LANGUAGES {
            assert!(RegexHighlighter.supports(language), "{}", language);
        }
        assert!(!RegexHighlighter.supports("cobol"));
    }

    #[test]
    fn keywords_beat_identifiers() {
        let html = RegexHighlighter.highlight("def define", Some("python"));
        assert_eq!(
            html,
            "<span class=\"python-keyword\">def</span> <span class=\"python-identifier\">define</span>"
        );
    }

    #[test]
    fn code_is_escaped_once() {
        let html = RegexHighlighter.highlight("a < \"<b>\"", Some("python"));
        assert_eq!(
            html,
            "<span class=\"python-identifier\">a</span> <span class=\"python-operator\">&lt;</span> <span class=\"python-string\">\"&lt;b&gt;\"</span>"
        );
    }

    #[test]
    fn unknown_characters_pass_through_escaped() {
        assert_eq!(
            RegexHighlighter.highlight("@&", Some("json")),
            "@&amp;"
        );
    }

    #[test]
    fn plain_text_and_missing_language() {
        assert_eq!(RegexHighlighter.highlight("x < y", Some("text")), "x &lt; y");
        assert_eq!(RegexHighlighter.highlight("x < y", None), "x &lt; y");
        assert_eq!(RegexHighlighter.highlight("x < y", Some("cobol")), "x &lt; y");
    }

    #[test]
    fn bnf_rules() {
        assert_eq!(
            RegexHighlighter.highlight("<rule> ::= 'a'", Some("bnf")),
            "<span class=\"bnf-keyword\">&lt;rule&gt;</span> <span class=\"bnf-operator\">::=</span> <span class=\"bnf-string\">'a'</span>"
        );
    }
}
