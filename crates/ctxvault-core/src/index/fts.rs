//! FTS5 query construction.
//!
//! User input never reaches `MATCH` verbatim: it is split into word terms
//! the same way the `unicode61` tokenizer splits text, and every term is
//! double-quoted so FTS5 operators and punctuation lose their meaning.

/// A sanitized full-text query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtsQuery {
    terms: Vec<String>,
}

impl FtsQuery {
    /// Parse free text into quoted terms. `None` when nothing searchable
    /// remains.
    pub fn parse(input: &str) -> Option<Self> {
        let terms: Vec<String> = input
            .split(|c: char| !is_word_char(c))
            .filter(|term| !term.is_empty())
            .map(|term| format!("\"{}\"", term))
            .collect();

        if terms.is_empty() {
            None
        } else {
            Some(Self { terms })
        }
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Expression matching rows that contain every term.
    pub fn all_terms(&self) -> String {
        self.terms.join(" ")
    }

    /// Expression matching rows that contain at least one term.
    pub fn any_term(&self) -> String {
        self.terms.join(" OR ")
    }
}

/// Sanitize free text into a conjunctive FTS5 expression.
pub fn sanitize_query(input: &str) -> Option<String> {
    FtsQuery::parse(input).map(|q| q.all_terms())
}

/// Build the loose "anything like this?" query used by dedup and defrag:
/// punctuation becomes whitespace, the first `max_words` words are joined
/// with ` OR `. Words are not quoted, so a summary made of FTS5 keywords can
/// still produce an expression the engine rejects; callers recover from that.
pub fn build_disjunctive_query(summary: &str, max_words: usize) -> Option<String> {
    let cleaned: String = summary
        .chars()
        .map(|c| if is_word_char(c) || c.is_whitespace() { c } else { ' ' })
        .collect();

    let words: Vec<&str> = cleaned.split_whitespace().take(max_words).collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" OR "))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
