/// Separators tried in priority order: blank line, line break, space.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Split plain text into pieces of at most `limit` characters.
///
/// Each cut prefers the last blank line inside the window, then the last line
/// break, then the last space. Whitespace around a separator cut is dropped.
/// Without any separator the text is cut hard at `limit`. A `limit` of zero is
/// treated as one.
#[must_use]
pub fn split_plain(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut parts = Vec::new();
    let mut remaining = text;

    while let Some(hard_end) = char_offset(remaining, limit) {
        let window_end = char_offset(remaining, limit + 1).unwrap_or(remaining.len());
        let window = &remaining[..window_end];

        match separator_cut(window) {
            Some(cut) => {
                let chunk = remaining[..cut].trim_end();
                if !chunk.is_empty() {
                    parts.push(chunk.to_string());
                }
                remaining = remaining[cut..].trim_start();
            }
            None => {
                parts.push(remaining[..hard_end].to_string());
                remaining = &remaining[hard_end..];
            }
        }
    }

    if !remaining.is_empty() {
        parts.push(remaining.to_string());
    }

    parts
}

fn separator_cut(window: &str) -> Option<usize> {
    SEPARATORS
        .iter()
        .find_map(|sep| window.rfind(sep).filter(|&idx| idx > 0))
}

/// Byte offset of the `n`-th character, or `None` when `s` is not longer than `n`.
pub(crate) fn char_offset(s: &str, n: usize) -> Option<usize> {
    s.char_indices().nth(n).map(|(idx, _)| idx)
}
