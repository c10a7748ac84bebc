//! Word counting: front-matter stripping and whitespace-run counting.

use crate::DocumentId;

/// Line that opens and closes a front-matter block.
const FENCE: &str = "---";

fn is_fence(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']).trim_end_matches([' ', '\t']) == FENCE
}

/// Return the document body with a leading front-matter block removed.
///
/// A block starts when the first line is exactly `---` and ends at the next
/// line that is exactly `---`. If the block is never closed the whole
/// content is returned unchanged.
#[must_use]
pub fn strip_front_matter(content: &str) -> &str {
    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return content;
    };
    if !is_fence(first) {
        return content;
    }

    let mut offset = first.len();
    for line in lines {
        offset += line.len();
        if is_fence(line) {
            return &content[offset..];
        }
    }
    content
}

/// Count maximal non-whitespace runs in the document body.
///
/// # Examples
///
/// ```
/// use wordcache::count_words;
///
/// assert_eq!(count_words("---\ntitle: X\n---\nHello world foo"), 3);
/// assert_eq!(count_words("one  two\n\nthree"), 3);
/// assert_eq!(count_words("   \n\t"), 0);
/// ```
#[must_use]
pub fn count_words(content: &str) -> u64 {
    strip_front_matter(content).split_whitespace().count() as u64
}

/// True when the document's extension is one of `extensions` (case-insensitive).
pub fn is_countable(id: &DocumentId, extensions: &[String]) -> bool {
    id.extension()
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}
