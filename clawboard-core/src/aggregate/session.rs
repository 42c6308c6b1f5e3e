//! Per-transcript session fold

use crate::ingest::{normalize, Event, Profile, TimestampSpan, TranscriptFile};
use crate::types::{NormalizedMessage, SessionLog, SessionSummary};
use serde_json::Value;

/// Folds one transcript's events into a [`SessionLog`].
///
/// Feed events in file order with [`push`](Self::push), then call
/// [`finish`](Self::finish). Timestamps are observed before the profile's
/// drop filter runs, so `firstMessage`/`lastMessage` can point at messages
/// that were filtered out (heartbeats, empty turns).
#[derive(Debug, Clone)]
pub struct SessionAggregator {
    profile: Profile,
    span: TimestampSpan,
    session_info: Option<Value>,
    messages: Vec<NormalizedMessage>,
}

impl SessionAggregator {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            span: TimestampSpan::default(),
            session_info: None,
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, event: &Event) {
        match event {
            Event::Session(info) => self.session_info = Some(info.clone()),
            Event::Message(message) => {
                self.span.observe(&message.timestamp);
                if let Some(normalized) = normalize(message, self.profile) {
                    self.messages.push(normalized);
                }
            }
            Event::Other => {}
        }
    }

    pub fn finish(self, file: &TranscriptFile) -> SessionLog {
        SessionLog {
            summary: SessionSummary {
                id: file.id.clone(),
                file: file.file_name.clone(),
                size: file.size,
                modified: file.modified_secs(),
                first_message: self.span.first,
                last_message: self.span.last,
                message_count: self.messages.len(),
            },
            messages: self.messages,
            session_info: self.session_info,
        }
    }
}

/// Fold a complete event sequence into a session log.
pub fn fold_session<'a, I>(file: &TranscriptFile, events: I, profile: Profile) -> SessionLog
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut aggregator = SessionAggregator::new(profile);
    for event in events {
        aggregator.push(event);
    }
    aggregator.finish(file)
}

/// Index entries for a set of session logs, preserving their order.
pub fn summaries(logs: &[SessionLog]) -> Vec<SessionSummary> {
    logs.iter().map(SessionLog::summary).collect()
}
