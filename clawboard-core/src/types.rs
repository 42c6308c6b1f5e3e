//! Core domain types for clawboard
//!
//! These are the derived views the dashboard reads. Field names follow the
//! dashboard's JSON contract (camelCase), so every type here serializes
//! straight into its artifact.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Transcript** | Append-only `<session-id>.jsonl` event log written by the agent |
//! | **Normalized message** | Filtered role/text/timestamp view of a raw `message` event |
//! | **Rollup** | Aggregate keyed by a dimension (model, day) summing tokens/cost/calls |
//! | **Recent calls** | Bounded, timestamp-sorted window of the latest usage events |
//! | **Full rebuild** | A run that recomputes and overwrites every artifact from current inputs |

use serde::{Deserialize, Serialize};

// ============================================
// Roles
// ============================================

/// Author of a transcript message.
///
/// Anything other than `user`/`assistant` is kept verbatim so the chat
/// history can show tool or system turns with their original label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other(s) => s,
        }
    }

    /// True for the two conversational roles kept in session logs
    pub fn is_conversational(&self) -> bool {
        matches!(self, Role::User | Role::Assistant)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Other("unknown".to_string())
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other(s),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Sessions
// ============================================

/// A message that survived normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub role: Role,
    pub text: String,
    /// Raw record timestamp; empty when the record had none
    pub timestamp: String,
}

/// One entry of `sessions-index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// File stem of the transcript
    pub id: String,
    /// File name of the transcript
    pub file: String,
    /// Size in bytes, from file metadata
    pub size: u64,
    /// Modification time, seconds since the Unix epoch
    pub modified: f64,
    /// Timestamp of the first timestamped message event (before filtering)
    pub first_message: Option<String>,
    /// Timestamp of the last timestamped message event (before filtering)
    pub last_message: Option<String>,
    /// Number of normalized messages kept
    pub message_count: usize,
}

/// Full view of one session, written as `session-<id>.json`.
///
/// Produced by the same fold as [`SessionSummary`]; [`SessionLog::summary`]
/// derives the index entry without re-reading the transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionLog {
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub messages: Vec<NormalizedMessage>,
    /// Last `session` record seen, verbatim
    #[serde(skip)]
    pub session_info: Option<serde_json::Value>,
}

impl SessionLog {
    pub fn summary(&self) -> SessionSummary {
        self.summary.clone()
    }
}

/// One entry of `chat-history.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryEntry {
    pub id: String,
    pub file: String,
    /// Number of messages in this (trimmed) window
    pub message_count: usize,
    pub messages: Vec<NormalizedMessage>,
    pub info: Option<serde_json::Value>,
}

// ============================================
// Usage
// ============================================

/// `usage.json.totals`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
    /// Rounded to 4 decimal places
    pub total_cost: f64,
}

/// Per-model rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub model: String,
    /// Sum of input + output tokens
    pub tokens: u64,
    pub cost: f64,
    pub calls: u64,
}

/// Per-day rollup, keyed by the `YYYY-MM-DD` prefix of the timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayUsage {
    pub date: String,
    pub tokens: u64,
    pub cost: f64,
}

/// One entry of the recent-calls window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentCall {
    pub timestamp: String,
    pub model: String,
    pub tokens: u64,
    pub cost: f64,
}

/// Contents of `usage.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub generated: String,
    pub totals: UsageTotals,
    pub by_model: Vec<ModelUsage>,
    pub by_day: Vec<DayUsage>,
    pub recent_calls: Vec<RecentCall>,
}

// ============================================
// Metadata
// ============================================

/// Version of the artifact layout reported in `meta.json`
pub const SCHEMA_VERSION: &str = "1.0";

/// Contents of `meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub generated: String,
    pub version: String,
}

impl Meta {
    pub fn new(generated: String) -> Self {
        Self {
            generated,
            version: SCHEMA_VERSION.to_string(),
        }
    }
}

/// Format a generation timestamp the way the dashboard expects:
/// UTC, microsecond precision, `Z` suffix.
pub fn generated_stamp(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_role_roundtrip_keeps_unknown_labels() {
        let role: Role = serde_json::from_str("\"toolResult\"").unwrap();
        assert_eq!(role, Role::Other("toolResult".to_string()));
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"toolResult\"");

        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
        assert!(role.is_conversational());
    }

    #[test]
    fn test_default_role_is_unknown() {
        assert_eq!(Role::default().as_str(), "unknown");
        assert!(!Role::default().is_conversational());
    }

    #[test]
    fn test_session_log_serializes_flat() {
        let log = SessionLog {
            summary: SessionSummary {
                id: "abc".to_string(),
                file: "abc.jsonl".to_string(),
                size: 12,
                modified: 1.5,
                first_message: None,
                last_message: Some("2024-01-01T00:00:00Z".to_string()),
                message_count: 0,
            },
            messages: vec![],
            session_info: Some(serde_json::json!({"type": "session"})),
        };

        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["messageCount"], 0);
        assert!(value["firstMessage"].is_null());
        assert_eq!(value["messages"], serde_json::json!([]));
        assert!(value.get("session_info").is_none());
    }

    #[test]
    fn test_generated_stamp_format() {
        let ts = chrono::Utc
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .unwrap();
        assert_eq!(generated_stamp(ts), "2024-03-09T07:05:01.000000Z");
    }
}
