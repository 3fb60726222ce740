//! Text helpers for log output.

/// Single-line preview of `text`, at most `max_chars` characters, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_flattens_whitespace() {
        assert_eq!(preview("a\n\nb   c", 10), "a b c");
        assert_eq!(preview("abcdef", 3), "abc…");
        assert_eq!(preview("héllo wörld", 5), "héllo…");
    }
}
