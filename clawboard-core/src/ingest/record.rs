//! Transcript record types
//!
//! Each transcript line is one JSON object discriminated by its `type` tag.
//! Only two tags carry meaning here:
//!
//! - `session`: opaque session metadata, kept verbatim
//! - `message`: one conversational turn, optionally with token usage
//!
//! Every other tag decodes to [`Event::Other`] so the union stays closed.
//!
//! Field access is tolerant. Missing or mistyped fields fall back to
//! defaults instead of failing the line; the defaulting rules for usage
//! counters, cost and model live in [`Usage`] and [`MessageBody::model`].

use crate::types::Role;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Model label used when a message carries usage but no model id
pub const UNKNOWN_MODEL: &str = "unknown";

/// One decoded transcript line.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Session metadata; the whole record, including its `type` tag
    Session(Value),
    /// A conversational turn
    Message(MessageEvent),
    /// Any other record type (tool state, model changes, ...)
    Other,
}

impl Event {
    /// Decode one already-parsed JSON value.
    ///
    /// Non-object values and unrecognized tags are [`Event::Other`]. A
    /// `message` record whose body cannot be decoded at all is an error, and
    /// the reader skips the line.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        match value.get("type").and_then(Value::as_str) {
            Some("session") => Ok(Event::Session(value)),
            Some("message") => serde_json::from_value(value).map(Event::Message),
            _ => Ok(Event::Other),
        }
    }

    /// Decode one raw transcript line.
    pub fn from_slice(line: &[u8]) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_slice(line)?;
        Self::from_value(value)
    }

    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            Event::Message(m) => Some(m),
            _ => None,
        }
    }
}

/// A `message` record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MessageEvent {
    /// ISO-8601 timestamp of the record; empty when absent or not a string
    #[serde(deserialize_with = "lenient_string")]
    pub timestamp: String,
    pub message: MessageBody,
}

/// The `message` object nested in a `message` record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MessageBody {
    #[serde(deserialize_with = "lenient_role")]
    pub role: Role,
    pub content: Content,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub model: Option<String>,
    pub usage: Option<Value>,
}

impl MessageBody {
    /// Model id, or [`UNKNOWN_MODEL`] when the record has none.
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(UNKNOWN_MODEL)
    }

    /// Usage counters, when the record carries a non-empty `usage` object.
    pub fn usage(&self) -> Option<Usage> {
        self.usage.as_ref().and_then(Usage::from_value)
    }
}

/// Message content: normally a list of parts, occasionally a bare string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Parts(Vec<ContentPart>),
    Text(String),
    /// `null` or anything else unusable
    Other(IgnoredAny),
}

impl Default for Content {
    fn default() -> Self {
        Content::Parts(Vec::new())
    }
}

/// One element of a content list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    Text(String),
    Block(ContentBlock),
    Other(IgnoredAny),
}

/// A tagged content object (`{"type": "text", "text": ...}`, tool calls, ...)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ContentBlock {
    /// Text contributed by this block: only `text`-tagged blocks count, and
    /// a missing `text` field contributes an empty string.
    pub fn text_contribution(&self) -> Option<&str> {
        match self.kind.as_deref() {
            Some("text") => Some(self.text.as_deref().unwrap_or("")),
            _ => None,
        }
    }
}

/// Token and cost counters for one model call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Usage {
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_write: u64,
    /// `cost.total`, 0 when absent
    pub cost: f64,
}

impl Usage {
    /// Read counters from a loosely-typed `usage` value.
    ///
    /// Returns `None` unless `usage` is a non-empty object. Each counter
    /// defaults to 0 when missing or not a non-negative number; the cost is
    /// `cost.total` when `cost` is an object, else 0.
    ///
    /// Fractional counters are truncated toward zero (`12.9` reads as 12) and
    /// values beyond `u64::MAX` clamp to `u64::MAX`.
    pub fn from_value(usage: &Value) -> Option<Self> {
        let fields = usage.as_object().filter(|m| !m.is_empty())?;
        let cost = fields
            .get("cost")
            .and_then(Value::as_object)
            .and_then(|c| c.get("total"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        Some(Self {
            input: counter(usage, "input"),
            output: counter(usage, "output"),
            cache_read: counter(usage, "cacheRead"),
            cache_write: counter(usage, "cacheWrite"),
            cost,
        })
    }

    /// Input plus output tokens; cache traffic is not counted
    pub fn tokens(&self) -> u64 {
        self.input.saturating_add(self.output)
    }
}

fn counter(usage: &Value, key: &str) -> u64 {
    match usage.get(key) {
        Some(v) => v
            .as_u64()
            .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        None => 0,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?
        .map(Role::from)
        .unwrap_or_default())
}
