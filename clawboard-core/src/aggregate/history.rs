//! Bounded multi-session chat history

use crate::types::{ChatHistoryEntry, SessionLog};

/// Turn a history-profile session log into a chat-history entry holding at
/// most the last `max_messages` messages.
///
/// Sessions with no surviving messages produce no entry.
pub fn history_entry(log: SessionLog, max_messages: usize) -> Option<ChatHistoryEntry> {
    if log.messages.is_empty() {
        return None;
    }

    let mut messages = log.messages;
    let keep_from = messages.len().saturating_sub(max_messages);
    messages.drain(..keep_from);

    Some(ChatHistoryEntry {
        id: log.summary.id,
        file: log.summary.file,
        message_count: messages.len(),
        messages,
        info: log.session_info,
    })
}

/// Build `chat-history.json` from session logs that are already ordered
/// most recently modified first and limited to the sessions to show.
pub fn chat_history<I>(logs: I, max_messages: usize) -> Vec<ChatHistoryEntry>
where
    I: IntoIterator<Item = SessionLog>,
{
    logs.into_iter()
        .filter_map(|log| history_entry(log, max_messages))
        .collect()
}
