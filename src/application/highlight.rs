//! Regex token highlighting for code blocks in the HTML-based exports.
//!
//! Lightweight by design: strings, numbers, comments and a per-language
//! keyword set wrapped in `tok-*` spans that the export style sheets color.
//! Not a parser; mis-highlighting odd code is acceptable.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn string_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""[^"\n]*"|'[^'\n]*'|`[^`\n]*`"#).unwrap_or_else(|_| unreachable!())
    })
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d+(?:\.\d+)?)\b").unwrap_or_else(|_| unreachable!()))
}

fn hash_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(^|\s)(#.*)$").unwrap_or_else(|_| unreachable!()))
}

fn slash_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(//.*)$").unwrap_or_else(|_| unreachable!()))
}

const JS_KEYWORDS: &[&str] = &[
    "const", "let", "var", "function", "return", "if", "else", "for", "while", "class", "new",
    "await", "async", "try", "catch",
];
const TS_EXTRA: &[&str] = &["interface", "type"];
const PY_KEYWORDS: &[&str] = &[
    "def", "return", "if", "elif", "else", "for", "while", "class", "import", "from", "as", "try",
    "except", "with", "lambda",
];
const BASH_KEYWORDS: &[&str] = &[
    "if", "then", "else", "fi", "for", "do", "done", "echo", "export",
];
const RUST_KEYWORDS: &[&str] = &[
    "fn", "let", "mut", "pub", "return", "if", "else", "for", "while", "match", "struct", "enum",
    "impl", "use", "mod", "async", "await",
];

fn keywords_for(language: &str) -> Vec<&'static str> {
    match language {
        "typescript" => JS_KEYWORDS.iter().chain(TS_EXTRA).copied().collect(),
        "python" => PY_KEYWORDS.to_vec(),
        "bash" | "shell" => BASH_KEYWORDS.to_vec(),
        "rust" => RUST_KEYWORDS.to_vec(),
        "json" => Vec::new(),
        _ => JS_KEYWORDS.to_vec(),
    }
}

fn uses_hash_comments(language: &str) -> bool {
    matches!(language, "python" | "bash" | "shell")
}

/// Escape code text and wrap recognized tokens in highlight spans.
///
/// Matched tokens are stashed behind placeholders until every pass has run,
/// so a later pass can never rewrite the markup an earlier pass injected
/// (the keyword pass would otherwise match `class` inside a span tag).
///
/// Returns escaped-but-unhighlighted text when highlighting is disabled.
#[must_use]
pub fn highlight_code(code: &str, language: &str, enabled: bool) -> String {
    let mut text = escape_code(code);
    if !enabled || text.is_empty() {
        return text;
    }

    let mut stash: Vec<String> = Vec::new();

    text = string_re()
        .replace_all(&text, |caps: &Captures<'_>| {
            stash_token(&mut stash, "tok-str", &caps[0])
        })
        .into_owned();

    if uses_hash_comments(language) {
        text = hash_comment_re()
            .replace_all(&text, |caps: &Captures<'_>| {
                format!("{}{}", &caps[1], stash_token(&mut stash, "tok-com", &caps[2]))
            })
            .into_owned();
    } else {
        text = slash_comment_re()
            .replace_all(&text, |caps: &Captures<'_>| {
                stash_token(&mut stash, "tok-com", &caps[1])
            })
            .into_owned();
    }

    text = number_re()
        .replace_all(&text, |caps: &Captures<'_>| {
            stash_token(&mut stash, "tok-num", &caps[1])
        })
        .into_owned();

    let keywords = keywords_for(language);
    if !keywords.is_empty() {
        let pattern = format!(r"\b({})\b", keywords.join("|"));
        if let Ok(re) = Regex::new(&pattern) {
            text = re
                .replace_all(&text, r#"<span class="tok-kw">$1</span>"#)
                .into_owned();
        }
    }

    for (i, token) in stash.iter().enumerate() {
        text = text.replace(&placeholder(i), token);
    }
    text
}

/// Replace a matched token with an opaque placeholder, keeping the rendered
/// span for the restore pass.
fn stash_token(stash: &mut Vec<String>, class: &str, token: &str) -> String {
    let key = placeholder(stash.len());
    stash.push(format!("<span class=\"{class}\">{token}</span>"));
    key
}

/// Control-delimited uppercase key that no token regex can match into.
fn placeholder(index: usize) -> String {
    let mut n = index;
    let mut key = String::from('\u{1}');
    loop {
        key.push(char::from(b'A' + u8::try_from(n % 26).unwrap_or(0)));
        n /= 26;
        if n == 0 {
            break;
        }
    }
    key.push('\u{2}');
    key
}

/// Escape only the characters that would break out of a text node. Quotes
/// stay literal so the string regex still matches.
fn escape_code(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    for ch in code.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_highlighted() {
        let out = highlight_code("const x = 1;", "javascript", true);
        assert!(out.contains(r#"<span class="tok-kw">const</span>"#));
        assert!(out.contains(r#"<span class="tok-num">1</span>"#));
    }

    #[test]
    fn test_python_hash_comments() {
        let out = highlight_code("x = 1  # note", "python", true);
        assert!(out.contains(r#"<span class="tok-com"># note</span>"#));
    }

    #[test]
    fn test_disabled_still_escapes() {
        let out = highlight_code("a < b", "javascript", false);
        assert_eq!(out, "a &lt; b");
        assert!(!out.contains("tok-"));
    }

    #[test]
    fn test_strings_highlighted() {
        let out = highlight_code(r#"x = "hello""#, "python", true);
        assert!(out.contains(r#"<span class="tok-str">"hello"</span>"#));
    }

    #[test]
    fn test_injected_markup_survives_keyword_pass() {
        // `class` is a keyword in both sets; it must never match inside the
        // span tags injected by the earlier token passes.
        let out = highlight_code("x = 1", "python", true);
        assert_eq!(out, r#"x = <span class="tok-num">1</span>"#);

        let out = highlight_code(r#"const s = "hi";"#, "javascript", true);
        assert_eq!(
            out,
            r#"<span class="tok-kw">const</span> s = <span class="tok-str">"hi"</span>;"#
        );
        assert!(!out.contains("<span <span"));
    }
}
