//! Anchor lookup and line-aware insertion helpers.
//!
//! Anchors are literal strings. The last occurrence wins, so nested or
//! repeated closing tags resolve to the outermost one.

/// One nesting level.
pub(crate) const INDENT: &str = "  ";

/// Byte offset of the last occurrence of `pattern`.
pub(crate) fn find_last(text: &str, pattern: &str) -> Option<usize> {
    if pattern.is_empty() {
        return None;
    }
    text.rfind(pattern)
}

/// Byte offset of the start of the line containing `pos`.
pub(crate) fn line_start(text: &str, pos: usize) -> usize {
    text[..pos].rfind('\n').map_or(0, |i| i + 1)
}

/// Leading whitespace of the line containing `pos`.
pub(crate) fn indent_at(text: &str, pos: usize) -> &str {
    let start = line_start(text, pos);
    let line = &text[start..];
    let width = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..width.min(pos - start)]
}

/// Prefix every line of `block` with `indent`.
pub(crate) fn indent_lines(block: &str, indent: &str) -> String {
    block
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Insert already-indented `block` just before the anchor at `pos`.
///
/// When the anchor opens its line the block goes on its own line(s) above
/// it; otherwise it is spliced inline right before the anchor.
pub(crate) fn insert_before(text: &str, pos: usize, block: &str) -> String {
    let start = line_start(text, pos);
    let mut out = String::with_capacity(text.len() + block.len() + 1);

    if text[start..pos].trim().is_empty() {
        out.push_str(&text[..start]);
        out.push_str(block);
        out.push('\n');
        out.push_str(&text[start..]);
    } else {
        out.push_str(&text[..pos]);
        out.push_str(block.trim_start());
        out.push_str(&text[pos..]);
    }
    out
}

/// Insert already-indented `block` on a new line right after `end`.
pub(crate) fn insert_after(text: &str, end: usize, block: &str) -> String {
    let mut out = String::with_capacity(text.len() + block.len() + 1);
    out.push_str(&text[..end]);
    out.push('\n');
    out.push_str(block);
    out.push_str(&text[end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_last_prefers_outermost_closing_tag() {
        let text = "<main><main></main>\n</main>";
        assert_eq!(find_last(text, "</main>"), Some(20));
        assert_eq!(find_last(text, "</footer>"), None);
        assert_eq!(find_last(text, ""), None);
    }

    #[test]
    fn indent_is_measured_from_the_anchor_line() {
        let text = "<div>\n      </main>\n";
        let pos = find_last(text, "</main>").unwrap();
        assert_eq!(indent_at(text, pos), "      ");
        assert_eq!(indent_at("</main>", 0), "");
    }

    #[test]
    fn insert_before_own_line() {
        let text = "<main>\n    <p>x</p>\n  </main>\n";
        let pos = find_last(text, "</main>").unwrap();
        let out = insert_before(text, pos, "    <Footer />");
        assert_eq!(out, "<main>\n    <p>x</p>\n    <Footer />\n  </main>\n");
    }

    #[test]
    fn insert_before_inline() {
        let text = "<main><p>x</p></main>";
        let pos = find_last(text, "</main>").unwrap();
        let out = insert_before(text, pos, "  <Footer />");
        assert_eq!(out, "<main><p>x</p><Footer /></main>");
    }

    #[test]
    fn insert_after_adds_sibling_line() {
        let text = "    </main>\n  );";
        let end = find_last(text, "</main>").unwrap() + "</main>".len();
        let out = insert_after(text, end, "    <Footer />");
        assert_eq!(out, "    </main>\n    <Footer />\n  );");
    }

    #[test]
    fn indent_lines_skips_blank_lines() {
        assert_eq!(indent_lines("<a>\n\n</a>", "  "), "  <a>\n\n  </a>");
    }
}
