use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Display width in terminal cells. Tabs count as 4 cells.
pub fn display_width(s: &str) -> usize {
    s.split('\t')
        .enumerate()
        .map(|(i, part)| {
            let w = UnicodeWidthStr::width(part);
            if i > 0 { w + 4 } else { w }
        })
        .sum()
}

/// Truncate a string to fit within `max_cells` terminal cells, appending `…` if truncated.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if max_cells == 0 {
        return String::new();
    }
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells == 1 {
        return "\u{2026}".to_string();
    }
    let budget = max_cells - 1; // reserve 1 cell for '…'
    let mut width = 0;
    let mut result = String::new();
    for grapheme in s.graphemes(true) {
        let gw = grapheme_display_width(grapheme);
        if width + gw > budget {
            break;
        }
        width += gw;
        result.push_str(grapheme);
    }
    result.push('\u{2026}');
    result
}

/// Next grapheme boundary after `byte_offset`. Returns None if at end.
pub fn next_grapheme_boundary(s: &str, byte_offset: usize) -> Option<usize> {
    if byte_offset >= s.len() {
        return None;
    }
    match s[byte_offset..].grapheme_indices(true).nth(1) {
        Some((i, _)) => Some(byte_offset + i),
        None => Some(s.len()),
    }
}

/// Previous grapheme boundary before `byte_offset`. Returns None if at start.
pub fn prev_grapheme_boundary(s: &str, byte_offset: usize) -> Option<usize> {
    if byte_offset == 0 {
        return None;
    }
    s[..byte_offset]
        .grapheme_indices(true)
        .last()
        .map(|(i, _)| i)
}

/// Convert byte offset to display column (terminal cells).
pub fn byte_offset_to_display_col(s: &str, byte_offset: usize) -> usize {
    let clamped = byte_offset.min(s.len());
    display_width(&s[..clamped])
}

/// Whitespace and token commas both end a word
fn is_separator(g: &str) -> bool {
    g.chars().all(|c| c.is_whitespace() || c == ',')
}

/// Start of the word left of `byte_offset`, skipping separators first
pub fn word_boundary_left(s: &str, byte_offset: usize) -> usize {
    let graphemes: Vec<(usize, &str)> = s[..byte_offset.min(s.len())]
        .grapheme_indices(true)
        .collect();
    let mut idx = graphemes.len();
    while idx > 0 && is_separator(graphemes[idx - 1].1) {
        idx -= 1;
    }
    while idx > 0 && !is_separator(graphemes[idx - 1].1) {
        idx -= 1;
    }
    graphemes.get(idx).map_or(0, |(i, _)| *i)
}

/// Start of the next word right of `byte_offset`
pub fn word_boundary_right(s: &str, byte_offset: usize) -> usize {
    if byte_offset >= s.len() {
        return s.len();
    }
    let mut graphemes = s[byte_offset..].grapheme_indices(true).peekable();
    while graphemes.next_if(|(_, g)| !is_separator(g)).is_some() {}
    while graphemes.next_if(|(_, g)| is_separator(g)).is_some() {}
    graphemes.peek().map_or(s.len(), |(i, _)| byte_offset + i)
}

/// Display width of a grapheme cluster.
fn grapheme_display_width(g: &str) -> usize {
    if g == "\t" {
        return 4;
    }
    UnicodeWidthStr::width(g)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_width_mixed() {
        assert_eq!(display_width("hello"), 5);
        assert_eq!(display_width("hello你好"), 9);
        assert_eq!(display_width("🎉"), 2);
        assert_eq!(display_width("cafe\u{0301}"), 4);
        assert_eq!(display_width("a\tb"), 6); // 1 + 4 + 1
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_to_width("hi", 10), "hi");
        assert_eq!(truncate_to_width("hello", 5), "hello");
        assert_eq!(truncate_to_width("hello world", 8), "hello w\u{2026}");
    }

    #[test]
    fn truncate_wide_chars() {
        // "你好世界" is 8 cells. Truncating to 5: "你好" = 4 + "…" = 1
        assert_eq!(truncate_to_width("你好世界", 5), "你好\u{2026}");
        assert_eq!(truncate_to_width("🎉🚀💫", 4), "🎉\u{2026}");
    }

    #[test]
    fn truncate_tiny_budgets() {
        assert_eq!(truncate_to_width("hello", 0), "");
        assert_eq!(truncate_to_width("hello", 1), "\u{2026}");
    }

    #[test]
    fn grapheme_boundaries() {
        assert_eq!(next_grapheme_boundary("hello", 4), Some(5));
        assert_eq!(next_grapheme_boundary("hello", 5), None);
        assert_eq!(prev_grapheme_boundary("hello", 1), Some(0));
        assert_eq!(prev_grapheme_boundary("hello", 0), None);

        let s = "a🎉b";
        assert_eq!(next_grapheme_boundary(s, 1), Some(5));
        assert_eq!(prev_grapheme_boundary(s, 5), Some(1));
    }

    #[test]
    fn combining_marks_stay_together() {
        let s = "cafe\u{0301}!";
        assert_eq!(next_grapheme_boundary(s, 3), Some(6));
        assert_eq!(prev_grapheme_boundary(s, 6), Some(3));
    }

    #[test]
    fn byte_to_display_col() {
        assert_eq!(byte_offset_to_display_col("hello", 3), 3);
        assert_eq!(byte_offset_to_display_col("你好", 3), 2);
        assert_eq!(byte_offset_to_display_col("你好", 99), 4);
    }

    #[test]
    fn word_boundaries_stop_at_commas() {
        let s = "greet, buy,shoes";
        assert_eq!(word_boundary_left(s, s.len()), 11);
        assert_eq!(word_boundary_left(s, 11), 7);
        assert_eq!(word_boundary_left(s, 7), 0);
        assert_eq!(word_boundary_left(s, 0), 0);

        assert_eq!(word_boundary_right(s, 0), 7);
        assert_eq!(word_boundary_right(s, 7), 11);
        assert_eq!(word_boundary_right(s, 11), s.len());
    }

    #[test]
    fn word_boundaries_wide_chars() {
        let s = "hello 你好";
        assert_eq!(word_boundary_left(s, s.len()), 6);
        assert_eq!(word_boundary_right(s, 0), 6);
    }
}
