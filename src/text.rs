//! Text normalization and keyword extraction for stored rich-text fields
//!
//! Ticket descriptions and reply contents arrive as HTML fragments from the
//! original helpdesk export. Everything downstream (search, context
//! assembly, embedding documents) works on plain text produced here.

/// Placeholder emitted where an `<img>` tag was found
pub const IMAGE_PLACEHOLDER: &str = "[图片]";

/// Delimiters recognized by [`extract_keywords`]: Western sentence
/// punctuation plus the full-width CJK equivalents.
const KEYWORD_DELIMITERS: &[char] = &[
    ',', '.', '!', '?', ':', ';', '、', '。', '，', '！', '？', '：', '；',
];

/// Strip HTML markup, preserving line structure.
///
/// - `<img ...>` becomes [`IMAGE_PLACEHOLDER`]
/// - `<br>` / `<br/>` becomes a newline
/// - every other tag is removed
/// - the common entities (`&nbsp;` `&lt;` `&gt;` `&quot;` `&amp;`) are decoded
/// - runs of blank lines collapse to a single newline
///
/// Empty input yields an empty string.
pub fn strip_html(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        match after_open.find('>') {
            Some(close) => {
                if let Some(replacement) = tag_replacement(&after_open[..close]) {
                    out.push_str(replacement);
                }
                rest = &after_open[close + 1..];
            }
            None => {
                // Unterminated tag, keep the remainder literally
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    let decoded = decode_entities(&out);
    collapse_blank_lines(&decoded).trim().to_string()
}

/// Strip HTML markup and flatten all whitespace to single spaces.
///
/// Variant used when building embedding documents, where line structure
/// carries no signal. Images are dropped rather than replaced.
pub fn strip_html_flat(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        match after_open.find('>') {
            Some(close) => rest = &after_open[close + 1..],
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    decode_entities(&out)
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Tokenize free text into candidate search keywords.
///
/// Splits on whitespace and [`KEYWORD_DELIMITERS`], discards tokens shorter
/// than two characters, and truncates to `cap` tokens in first-occurrence
/// order. Identical input always yields the identical sequence.
pub fn extract_keywords(text: &str, cap: usize) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || KEYWORD_DELIMITERS.contains(&c))
        .filter(|token| token.chars().count() >= 2)
        .take(cap)
        .map(str::to_string)
        .collect()
}

/// Replacement text for a tag body (the part between `<` and `>`)
fn tag_replacement(tag: &str) -> Option<&'static str> {
    let name: String = tag
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    match name.as_str() {
        "img" => Some(IMAGE_PLACEHOLDER),
        "br" => Some("\n"),
        _ => None,
    }
}

fn decode_entities(input: &str) -> String {
    // &amp; must decode last so "&amp;lt;" does not turn into "<"
    input
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Collapse every whitespace run containing two or more newlines into a
/// single newline, keeping trailing indentation after the last newline.
fn collapse_blank_lines(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            let mut tail = String::new();
            while let Some(&next) = chars.peek() {
                if next == '\n' {
                    chars.next();
                    tail.clear();
                } else if next.is_whitespace() {
                    tail.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            out.push('\n');
            out.push_str(&tail);
        } else {
            out.push(c);
        }
    }

    out
}
