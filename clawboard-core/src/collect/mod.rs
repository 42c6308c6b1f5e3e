//! Collaborator views
//!
//! Stateless lookups that feed the dashboard alongside the transcript
//! aggregates: skills and their activation status, memory notes, workspace
//! configuration documents, and host resource probes. None of these order or
//! aggregate anything; each produces one artifact per run.

pub mod memory;
pub mod skills;
pub mod system;
pub mod workspace;

pub use memory::{main_memory, memory_files, MemoryFile};
pub use skills::{apply_status, discover_skills, CommandProbe, Skill, SkillStatus, WhichProbe};
pub use system::{probe_system, SystemInfo};
pub use workspace::config_documents;
