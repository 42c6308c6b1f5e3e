//! # clawboard-core
//!
//! Core library for clawboard - a read-only dashboard feed for a personal
//! AI agent.
//!
//! This library provides:
//! - A streaming reader and normalizer for the agent's JSONL transcripts
//! - Session, usage and chat-history aggregation
//! - An atomic snapshot writer for the dashboard's JSON artifacts
//! - Collaborator lookups (skills, memory notes, workspace docs, host probes)
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through two layers:
//! - **Layer 0 (Raw):** Transcripts on disk, written by the agent (never modified here)
//! - **Layer 1 (Derived):** JSON artifacts, fully rebuilt on every run
//!
//! ## Example
//!
//! ```rust,no_run
//! use clawboard_core::{Config, Pipeline};
//!
//! let config = Config::load().expect("failed to load config");
//! let report = Pipeline::new(config).run_all().expect("failed to run");
//! println!("{} transcripts read", report.transcripts);
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Failure, Pipeline, RunReport, Step, StepOutcome};
pub use snapshot::{Layout, SnapshotWriter};
pub use types::*;

// Public modules
pub mod aggregate;
pub mod collect;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod snapshot;
pub mod types;
