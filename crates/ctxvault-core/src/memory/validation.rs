//! Input validation for note creation and updates.
//!
//! Violations are surfaced as [`Error::Validation`]; nothing is silently
//! corrected apart from dropping duplicate tags and surrounding whitespace.

use crate::error::{Error, Result};
use crate::types::CreateNoteInput;

/// Maximum summary length in characters.
pub const MAX_SUMMARY_LEN: usize = 200;

/// Validate a summary line.
pub fn validate_summary(summary: &str) -> Result<()> {
    if summary.trim().is_empty() {
        return Err(Error::validation("summary is required"));
    }
    let len = summary.chars().count();
    if len > MAX_SUMMARY_LEN {
        return Err(Error::validation(format!(
            "summary must be {} characters or less (got {})",
            MAX_SUMMARY_LEN, len
        )));
    }
    if summary.contains('\n') {
        return Err(Error::validation("summary must be a single line"));
    }
    Ok(())
}

/// Validate and normalize a note body. Leading and trailing whitespace is
/// not significant and is removed.
pub fn normalize_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("content must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Normalize a string set: trim entries, reject empty ones, drop duplicates
/// while keeping first-seen order.
pub fn normalize_set(field: &str, values: Vec<String>) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::validation(format!("{} must not contain empty entries", field)));
        }
        if !out.iter().any(|existing| existing == value) {
            out.push(value.to_string());
        }
    }
    Ok(out)
}

/// Validate a creation request, returning the normalized input.
pub fn validate_create(input: CreateNoteInput) -> Result<CreateNoteInput> {
    validate_summary(&input.summary)?;
    let content = normalize_content(&input.content)?;
    let tags = normalize_set("tags", input.tags)?;
    let related_files = normalize_set("related_files", input.related_files)?;

    Ok(CreateNoteInput {
        content,
        tags,
        related_files,
        ..input
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemoryType;

    #[test]
    fn test_summary_limits() {
        assert!(validate_summary("ok").is_ok());
        assert!(validate_summary(&"a".repeat(MAX_SUMMARY_LEN)).is_ok());
        assert!(validate_summary(&"a".repeat(MAX_SUMMARY_LEN + 1)).is_err());
        assert!(validate_summary("   ").is_err());
        assert!(validate_summary("two\nlines").is_err());
    }

    #[test]
    fn test_summary_length_counts_chars_not_bytes() {
        assert!(validate_summary(&"é".repeat(MAX_SUMMARY_LEN)).is_ok());
    }

    #[test]
    fn test_empty_content_rejected() {
        assert!(normalize_content("").is_err());
        assert!(normalize_content(" \n\t").is_err());
        assert_eq!(normalize_content("  body \n").unwrap(), "body");
    }

    #[test]
    fn test_tags_deduplicated_in_order() {
        let tags = vec!["b".to_string(), "a".to_string(), " b ".to_string()];
        assert_eq!(normalize_set("tags", tags).unwrap(), vec!["b", "a"]);
        assert!(normalize_set("tags", vec!["".to_string()]).is_err());
    }

    #[test]
    fn test_validate_create() {
        let input = CreateNoteInput::new(MemoryType::Gotcha, "Summary", "  Body  ").with_tags(["x", "x"]);
        let validated = validate_create(input).unwrap();
        assert_eq!(validated.content, "Body");
        assert_eq!(validated.tags, vec!["x"]);

        let bad = CreateNoteInput::new(MemoryType::Gotcha, "", "Body");
        assert!(validate_create(bad).unwrap_err().is_validation());
    }
}
