//! Agent session transcripts stored as JSON lines.
//!
//! Each line is one event; only `user` and `assistant` events with text
//! content are kept. Malformed lines are skipped.

use serde::Deserialize;

/// Agent label recorded on notes extracted from a JSONL transcript.
pub const TRANSCRIPT_AGENT: &str = "claude-code";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptMessage {
    pub role: String,
    pub content: String,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSession {
    pub session_id: String,
    pub agent: String,
    pub project_path: Option<String>,
    pub messages: Vec<TranscriptMessage>,
}

impl TranscriptSession {
    /// Flatten to `[role]: content` blocks separated by blank lines.
    pub fn to_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("[{}]: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Deserialize)]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    message: Option<EventMessage>,
    timestamp: Option<String>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    cwd: Option<String>,
}

#[derive(Deserialize)]
struct EventMessage {
    content: MessageContent,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl MessageContent {
    fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter(|b| b.kind == "text")
                .filter_map(|b| b.text.as_deref())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Parse a JSONL transcript. `fallback_id` names the session when no event
/// carries one. Returns `None` when there are no usable messages.
pub fn parse_jsonl_transcript(raw: &str, fallback_id: &str) -> Option<TranscriptSession> {
    let mut session_id: Option<String> = None;
    let mut project_path: Option<String> = None;
    let mut messages = Vec::new();

    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        let Ok(event) = serde_json::from_str::<Event>(line) else {
            continue;
        };
        if event.kind != "user" && event.kind != "assistant" {
            continue;
        }
        if session_id.is_none() {
            session_id = event.session_id.filter(|s| !s.is_empty());
        }
        if project_path.is_none() {
            project_path = event.cwd.filter(|s| !s.is_empty());
        }

        let content = event.message.map(|m| m.content.text()).unwrap_or_default();
        let content = content.trim();
        if !content.is_empty() {
            messages.push(TranscriptMessage {
                role: event.kind,
                content: content.to_string(),
                timestamp: event.timestamp,
            });
        }
    }

    if messages.is_empty() {
        return None;
    }

    Some(TranscriptSession {
        session_id: session_id.unwrap_or_else(|| fallback_id.to_string()),
        agent: TRANSCRIPT_AGENT.to_string(),
        project_path,
        messages,
    })
}
