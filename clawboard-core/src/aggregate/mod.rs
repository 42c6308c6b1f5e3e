//! Aggregation layer
//!
//! Folds transcript events (Layer 0) into the derived views (Layer 1):
//!
//! - [`session`]: one [`SessionLog`](crate::types::SessionLog) per transcript
//! - [`usage`]: global totals plus model/day rollups and recent calls
//! - [`history`]: bounded chat windows over the most recent sessions
//!
//! Aggregators hold their state in explicit values; nothing here is global,
//! so independent runs and tests never share totals.

pub mod history;
pub mod session;
pub mod usage;

pub use history::{chat_history, history_entry};
pub use session::{fold_session, summaries, SessionAggregator};
pub use usage::{round_cost, UsageAccumulator, UsageCall, UsageWindows};
