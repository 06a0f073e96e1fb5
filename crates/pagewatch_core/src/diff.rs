//! Line-level diff rendering for notification bodies.

pub const ADDED_PREFIX: &str = "➕ ";
pub const REMOVED_PREFIX: &str = "➖ ";

/// Caps applied when turning a change into notification text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffLimits {
    /// Maximum number of differing lines rendered.
    pub max_lines: usize,
    /// Hard cap on the rendered body, in characters.
    pub max_chars: usize,
    /// Length of the verbatim excerpt sent for a first observation.
    pub excerpt_chars: usize,
}

impl Default for DiffLimits {
    fn default() -> Self {
        Self {
            max_lines: 30,
            max_chars: 3000,
            excerpt_chars: 500,
        }
    }
}

/// Lines per side aligned with the LCS table. Past this, the rest of the
/// changed region is reported as removed and added, which keeps the table
/// at a few megabytes however large the page.
const MAX_ALIGNED_LINES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange<'a> {
    Removed(&'a str),
    Added(&'a str),
}

/// Renders `old` → `new` with the default limits.
pub fn render_diff(old: &str, new: &str) -> String {
    render_diff_with(old, new, &DiffLimits::default())
}

/// Renders only the removed and inserted lines, at most `limits.max_lines`.
///
/// With no previous text there is nothing to diff against, so the start of
/// `new` is returned verbatim instead. The same excerpt is used when the texts
/// differ without any line-level change (line ending changes, for instance).
pub fn render_diff_with(old: &str, new: &str, limits: &DiffLimits) -> String {
    if old.is_empty() {
        return truncate_chars(new, limits.excerpt_chars).to_string();
    }

    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let changes = diff_lines(&old_lines, &new_lines);
    if changes.is_empty() {
        return truncate_chars(new, limits.excerpt_chars).to_string();
    }

    changes
        .iter()
        .take(limits.max_lines)
        .map(|change| match change {
            LineChange::Removed(line) => format!("{REMOVED_PREFIX}{line}"),
            LineChange::Added(line) => format!("{ADDED_PREFIX}{line}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// LCS-based line diff. Within a hunk, removals are emitted before insertions.
///
/// Only the first `MAX_ALIGNED_LINES` lines of each side of the changed region
/// are aligned; anything after that is emitted as plain removals and
/// insertions.
pub fn diff_lines<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<LineChange<'a>> {
    // Shared head and tail never show up in the output; keep them out of the table.
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let (old, new) = (&old[prefix..], &new[prefix..]);
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let (old, new) = (&old[..old.len() - suffix], &new[..new.len() - suffix]);

    let (n, m) = (old.len().min(MAX_ALIGNED_LINES), new.len().min(MAX_ALIGNED_LINES));
    let width = m + 1;
    // lcs[i * width + j] = LCS length of old[i..n] and new[j..m]
    let mut lcs = vec![0usize; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if old[i] == new[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut changes = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            changes.push(LineChange::Removed(old[i]));
            i += 1;
        } else {
            changes.push(LineChange::Added(new[j]));
            j += 1;
        }
    }
    changes.extend(old[i..].iter().map(|line| LineChange::Removed(line)));
    changes.extend(new[j..].iter().map(|line| LineChange::Added(line)));
    changes
}

/// Returns at most `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
