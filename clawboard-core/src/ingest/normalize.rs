//! Message normalization
//!
//! Turns a raw [`MessageEvent`] into a [`NormalizedMessage`] under one of two
//! profiles:
//!
//! | Profile | Roles kept | Dropped text | Truncation |
//! |---------|------------|--------------|------------|
//! | [`Profile::Log`] | `user`, `assistant` | empty, `HEARTBEAT…`, `NO_REPLY`, `{…` | none |
//! | [`Profile::History`] | any | empty, `HEARTBEAT…` | `max_chars` + `...` |
//!
//! Timestamps are tracked separately by [`TimestampSpan`], which callers
//! update *before* the drop decision so a session's span covers filtered
//! messages too.

use super::record::{Content, ContentPart, MessageEvent};
use crate::types::NormalizedMessage;

/// Prefix of the agent's periodic keep-alive prompts and replies
pub const HEARTBEAT_PREFIX: &str = "HEARTBEAT";

/// Sentinel reply the agent emits when it has nothing to say
pub const NO_REPLY: &str = "NO_REPLY";

/// Marker appended to truncated history text
pub const ELLIPSIS: &str = "...";

/// Normalization profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Full session logs: conversational roles only, noise removed
    Log,
    /// Chat history: any role, long text truncated to `max_chars` characters
    History { max_chars: usize },
}

/// Concatenate the extractable text of a message.
///
/// Plain string parts contribute verbatim, `text`-tagged blocks contribute
/// their `text`, everything else contributes nothing. Contributions are
/// joined with `\n` and the result is trimmed.
pub fn extract_text(content: &Content) -> String {
    let joined = match content {
        Content::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(s) => Some(s.as_str()),
                ContentPart::Block(block) => block.text_contribution(),
                ContentPart::Other(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Content::Text(s) => s.clone(),
        Content::Other(_) => String::new(),
    };
    joined.trim().to_string()
}

/// Apply `profile` to one message event.
///
/// Returns `None` when the message is dropped.
pub fn normalize(event: &MessageEvent, profile: Profile) -> Option<NormalizedMessage> {
    let role = &event.message.role;
    let text = extract_text(&event.message.content);

    if text.is_empty() || text.starts_with(HEARTBEAT_PREFIX) {
        return None;
    }

    let text = match profile {
        Profile::Log => {
            if !role.is_conversational() || text == NO_REPLY || text.starts_with('{') {
                return None;
            }
            text
        }
        Profile::History { max_chars } => truncate_chars(text, max_chars),
    };

    Some(NormalizedMessage {
        role: role.clone(),
        text,
        timestamp: event.timestamp.clone(),
    })
}

/// Keep the first `max_chars` characters, appending [`ELLIPSIS`] if anything
/// was cut.
fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut truncated = text[..cut].to_string();
            truncated.push_str(ELLIPSIS);
            truncated
        }
        None => text,
    }
}

/// First and last non-empty timestamps seen in a transcript, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestampSpan {
    pub first: Option<String>,
    pub last: Option<String>,
}

impl TimestampSpan {
    pub fn observe(&mut self, timestamp: &str) {
        if timestamp.is_empty() {
            return;
        }
        if self.first.is_none() {
            self.first = Some(timestamp.to_string());
        }
        self.last = Some(timestamp.to_string());
    }
}
