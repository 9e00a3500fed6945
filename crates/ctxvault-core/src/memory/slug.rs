//! Filesystem-safe slugs derived from note summaries.

/// Maximum slug length in characters.
pub const MAX_SLUG_LEN: usize = 80;

/// Slug used when a summary has no ASCII alphanumerics at all.
pub const FALLBACK_SLUG: &str = "note";

/// Generate a slug from a summary.
///
/// `"useEffect Infinite Loop with objects"` becomes
/// `"useeffect-infinite-loop-with-objects"`. Anything outside `[a-z0-9]`,
/// whitespace and `-` is dropped, so the mapping is lossy.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();

    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;
    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
    }
    // Truncation can expose a trailing dash.
    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}
