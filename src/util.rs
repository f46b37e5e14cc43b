//! Text layout helpers for command replies.

/// Lay `items` out in columns of at most `max_rows` entries, filled top to
/// bottom then left to right. Every column but the last is padded to its
/// widest entry plus `spacing` spaces. Trailing whitespace is trimmed.
///
/// ```
/// use snowcmd::util::snap_format;
///
/// assert_eq!(snap_format(&["a", "b"], 7, 2), "a\nb");
/// assert_eq!(snap_format(&["one", "two", "six"], 2, 1), "one six\ntwo");
/// ```
pub fn snap_format<S: AsRef<str>>(items: &[S], max_rows: usize, spacing: usize) -> String {
    if items.is_empty() {
        return String::new();
    }
    let max_rows = max_rows.max(1);
    let rows = items.len().min(max_rows);
    let mut lines = vec![String::new(); rows];

    let columns: Vec<&[S]> = items.chunks(max_rows).collect();
    let last = columns.len() - 1;

    for (col, column) in columns.iter().enumerate() {
        let width = column
            .iter()
            .map(|s| s.as_ref().chars().count())
            .max()
            .unwrap_or(0)
            + spacing;

        for (row, item) in column.iter().enumerate() {
            let item = item.as_ref();
            lines[row].push_str(item);
            if col != last {
                let pad = width - item.chars().count();
                lines[row].extend(std::iter::repeat_n(' ', pad));
            }
        }
    }

    lines
        .iter()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap text in a fenced code block.
pub fn monospace(text: &str) -> String {
    format!("```\n{text}\n```")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_column_when_items_fit() {
        let items = ["echo", "help", "stop"];
        assert_eq!(snap_format(&items, 7, 2), "echo\nhelp\nstop");
    }

    #[test]
    fn empty_input_is_empty() {
        let items: [&str; 0] = [];
        assert_eq!(snap_format(&items, 7, 2), "");
    }

    #[test]
    fn overflow_spills_into_padded_columns() {
        let items = ["a", "bbb", "cc", "d", "e"];
        assert_eq!(snap_format(&items, 2, 2), "a    cc  e\nbbb  d");
    }

    #[test]
    fn exact_multiple_of_rows() {
        let items = ["aa", "b", "c", "dd"];
        assert_eq!(snap_format(&items, 2, 1), "aa c\nb  dd");
    }

    #[test]
    fn padding_counts_characters_not_bytes() {
        let items = ["é", "x", "y"];
        assert_eq!(snap_format(&items, 2, 1), "é y\nx");
    }

    #[test]
    fn zero_rows_is_treated_as_one() {
        assert_eq!(snap_format(&["a", "b"], 0, 1), "a b");
    }

    #[test]
    fn monospace_fences_text() {
        assert_eq!(monospace("x"), "```\nx\n```");
    }
}
