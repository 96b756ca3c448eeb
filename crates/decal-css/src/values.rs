//! Small tokenizing helpers for CSS value strings.

/// Split `input` on `delim`, ignoring delimiters nested inside parentheses.
///
/// CSS functional values (`rgba(…)`, `var(…)`) embed the same separators the
/// outer list uses, so a plain `str::split` mangles them. Empty chunks are
/// dropped.
pub fn split_top_level(input: &str, delim: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, ch) in input.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == delim && depth == 0 => {
                let chunk = input[start..i].trim();
                if !chunk.is_empty() {
                    parts.push(chunk);
                }
                start = i + ch.len_utf8();
            }
            _ => {}
        }
    }
    let tail = input[start..].trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts
}

/// Parse a pixel length (`"12px"` or a bare number). Returns `None` for
/// anything else; relative units cannot be resolved away from the rendered
/// layout, so callers fall back instead.
pub fn parse_px(value: &str) -> Option<f32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(stripped) = trimmed.strip_suffix("px") {
        return stripped.trim().parse().ok();
    }
    trimmed.parse().ok()
}
