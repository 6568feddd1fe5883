//! Whitespace normalization for editable text content
//!
//! Multi-line text stored in an editable representation (e.g. an XML
//! document) is conventionally indented to match the surrounding markup.
//! [`trim_text`] strips that editing indentation back off when text moves
//! into the entity model; [`format_text`] re-applies it going the other
//! way. `format_text` is a pretty-printer, not a strict inverse: it
//! always re-indents, even when `trim_text` had nothing to strip.

/// Indentation inserted for content lines (under a `<text>` element).
const CONTENT_INDENT: &str = "          ";

/// Indentation for the closing tag's own line.
const CLOSING_INDENT: &str = "      ";

/// Strips editing indentation from multi-line text content.
///
/// The content is treated as an indented block when its first line is
/// entirely whitespace: that line is dropped (and the last line too, if
/// also blank), then the longest common leading-whitespace run is removed
/// from every remaining line and lines are rejoined with `\n`. Content
/// whose first line is not blank only gets its line endings normalized to
/// `\n`.
pub fn trim_text(content: &str) -> String {
    let lines = split_lines(content);

    let Some(first) = lines.first() else {
        return String::new();
    };

    if !is_blank(first) {
        // Not an indented block: just normalize line endings
        return lines.join("\n");
    }

    let mut start = 1;
    let mut end = lines.len();
    if end > start && is_blank(lines[end - 1]) {
        end -= 1;
    }
    if start > end {
        start = end;
    }
    let block = &lines[start..end];

    // How much leading whitespace to strip: the first non-whitespace
    // column of any line, capped by the shortest line
    let mut trim_count = usize::MAX;
    for line in block {
        let char_len = line.chars().count();
        if char_len < trim_count {
            trim_count = char_len;
        }
        if is_blank(line) {
            continue;
        }
        for (j, c) in line.chars().take(trim_count).enumerate() {
            if !c.is_whitespace() {
                trim_count = j;
                break;
            }
        }
    }
    if trim_count == usize::MAX {
        trim_count = 0;
    }

    block
        .iter()
        .map(|line| skip_chars(line, trim_count))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Re-indents text content for storage in the editable representation:
/// ten spaces after every newline, a leading newline-plus-ten-spaces run,
/// and a trailing newline indented for the closing tag. Empty content is
/// returned unchanged.
pub fn format_text(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }

    let mut formatted = String::with_capacity(content.len() + 32);
    formatted.push('\n');
    formatted.push_str(CONTENT_INDENT);
    formatted.push_str(&content.replace('\n', &format!("\n{CONTENT_INDENT}")));
    formatted.push('\n');
    formatted.push_str(CLOSING_INDENT);
    formatted
}

/// Splits on `\r\n`, `\r`, or `\n`, keeping blank lines.
fn split_lines(content: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = content;
    loop {
        match rest.find(['\r', '\n']) {
            Some(i) => {
                lines.push(&rest[..i]);
                let mut next = i + 1;
                if rest.as_bytes()[i] == b'\r' && rest.as_bytes().get(next) == Some(&b'\n') {
                    next += 1;
                }
                rest = &rest[next..];
            }
            None => {
                lines.push(rest);
                return lines;
            }
        }
    }
}

fn is_blank(line: &str) -> bool {
    line.chars().all(char::is_whitespace)
}

fn skip_chars(line: &str, count: usize) -> &str {
    match line.char_indices().nth(count) {
        Some((i, _)) => &line[i..],
        None => "",
    }
}
