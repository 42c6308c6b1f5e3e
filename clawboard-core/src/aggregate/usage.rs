//! Global token/cost aggregation
//!
//! Usage is folded in two stages so that a transcript which fails halfway
//! contributes nothing:
//!
//! 1. [`UsageCall::from_event`] extracts one call per usage-bearing message;
//!    the pipeline stages a transcript's calls in a `Vec`.
//! 2. Once the transcript has been read cleanly, the staged calls are
//!    applied in order with [`UsageAccumulator::record`].
//!
//! Applying calls one at a time (rather than merging partial sums) keeps
//! floating-point cost totals independent of how transcripts were staged.

use crate::ingest::{Event, MessageEvent, Usage};
use crate::types::{DayUsage, ModelUsage, RecentCall, UsageReport, UsageTotals};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Length of the `YYYY-MM-DD` prefix used as the day key
const DAY_KEY_CHARS: usize = 10;

/// One usage-bearing message.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageCall {
    pub timestamp: String,
    pub model: String,
    pub usage: Usage,
}

impl UsageCall {
    /// Extract the call carried by a message event, if it has usage.
    pub fn from_event(event: &MessageEvent) -> Option<Self> {
        let usage = event.message.usage()?;
        Some(Self {
            timestamp: event.timestamp.clone(),
            model: event.message.model().to_string(),
            usage,
        })
    }

    /// Convenience over [`Self::from_event`] for any event kind.
    pub fn from_any(event: &Event) -> Option<Self> {
        event.as_message().and_then(Self::from_event)
    }

    /// Date key for the per-day rollup, when the call has a timestamp
    pub fn day(&self) -> Option<String> {
        if self.timestamp.is_empty() {
            return None;
        }
        Some(self.timestamp.chars().take(DAY_KEY_CHARS).collect())
    }
}

/// Window sizes applied when the accumulator is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageWindows {
    pub recent_calls: usize,
    pub days: usize,
}

impl Default for UsageWindows {
    fn default() -> Self {
        Self {
            recent_calls: 50,
            days: 14,
        }
    }
}

/// Running usage totals for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct UsageAccumulator {
    input: u64,
    output: u64,
    cache_read: u64,
    cache_write: u64,
    cost: f64,
    calls: u64,
    /// Model buckets in first-seen order
    models: Vec<ModelUsage>,
    model_index: HashMap<String, usize>,
    days: BTreeMap<String, DayUsage>,
    /// Candidates for the recent-calls window, in encounter order
    recent: Vec<RecentCall>,
}

impl UsageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, call: &UsageCall) {
        let usage = &call.usage;
        let tokens = usage.tokens();

        self.input = self.input.saturating_add(usage.input);
        self.output = self.output.saturating_add(usage.output);
        self.cache_read = self.cache_read.saturating_add(usage.cache_read);
        self.cache_write = self.cache_write.saturating_add(usage.cache_write);
        self.cost += usage.cost;
        self.calls = self.calls.saturating_add(1);

        let idx = match self.model_index.get(&call.model) {
            Some(&idx) => idx,
            None => {
                self.models.push(ModelUsage {
                    model: call.model.clone(),
                    tokens: 0,
                    cost: 0.0,
                    calls: 0,
                });
                self.model_index
                    .insert(call.model.clone(), self.models.len() - 1);
                self.models.len() - 1
            }
        };
        let bucket = &mut self.models[idx];
        bucket.tokens = bucket.tokens.saturating_add(tokens);
        bucket.cost += usage.cost;
        bucket.calls = bucket.calls.saturating_add(1);

        if let Some(day) = call.day() {
            let bucket = self.days.entry(day.clone()).or_insert(DayUsage {
                date: day,
                tokens: 0,
                cost: 0.0,
            });
            bucket.tokens = bucket.tokens.saturating_add(tokens);
            bucket.cost += usage.cost;
        }

        if !call.timestamp.is_empty() && tokens > 0 {
            self.recent.push(RecentCall {
                timestamp: call.timestamp.clone(),
                model: call.model.clone(),
                tokens,
                cost: usage.cost,
            });
        }
    }

    /// Record every call in order.
    pub fn extend<'a, I>(&mut self, calls: I)
    where
        I: IntoIterator<Item = &'a UsageCall>,
    {
        for call in calls {
            self.record(call);
        }
    }

    /// Number of usage-bearing messages recorded
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Input plus output tokens across all calls
    pub fn tokens(&self) -> u64 {
        self.input.saturating_add(self.output)
    }

    /// Unrounded cost across all calls
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn totals(&self) -> UsageTotals {
        UsageTotals {
            input_tokens: self.input,
            output_tokens: self.output,
            cache_read_tokens: self.cache_read,
            cache_write_tokens: self.cache_write,
            total_cost: round_cost(self.cost),
        }
    }

    /// Model rollups, highest cost first; equal costs keep first-seen order.
    pub fn by_model(&self) -> Vec<ModelUsage> {
        let mut models = self.models.clone();
        models.sort_by(|a, b| b.cost.partial_cmp(&a.cost).unwrap_or(Ordering::Equal));
        models
    }

    /// Day rollups, most recent first, untruncated.
    pub fn by_day(&self) -> Vec<DayUsage> {
        self.days.values().rev().cloned().collect()
    }

    /// Recent calls, newest first; equal timestamps keep encounter order.
    pub fn recent_calls(&self, limit: usize) -> Vec<RecentCall> {
        let mut recent = self.recent.clone();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent.truncate(limit);
        recent
    }

    /// Build `usage.json`.
    pub fn report(&self, generated: String, windows: UsageWindows) -> UsageReport {
        let mut by_day = self.by_day();
        by_day.truncate(windows.days);

        UsageReport {
            generated,
            totals: self.totals(),
            by_model: self.by_model(),
            by_day,
            recent_calls: self.recent_calls(windows.recent_calls),
        }
    }
}

/// Round a cost to 4 decimal places for display totals
pub fn round_cost(cost: f64) -> f64 {
    (cost * 10_000.0).round() / 10_000.0
}
