//! # BrandPulse Orchestrator
//!
//! The automation core of BrandPulse: polls user-defined recurring task
//! configurations, runs the due ones through a retry executor and a
//! per-type dispatch table, records execution history, deduplicates
//! derivative alerts, and advances each configuration's schedule.
//!
//! ## Architecture
//! ```text
//! Orchestrator::run_once(now)
//!   ├── OrchestratorDb::due_configs(now)          admission: enabled && next_run <= now
//!   └── per config (bounded workers):
//!         ├── Job created (running)
//!         ├── run_with_retry → DispatchTable[automation_type].execute(config)
//!         │     └── collaborator service (mentions / SEO / GEO / report / alerts)
//!         ├── Job finalized (completed | failed)
//!         └── schedule advanced via compute_next_run — success or failure alike
//! ```
//!
//! Two orchestrator invocations may overlap; the `next_run <= now` admission
//! predicate plus immediate schedule advancement is the only duplicate-run
//! guard, and it is best effort rather than transactional.

pub mod alerts;
pub mod dispatch;
pub mod engine;
pub mod model;
pub mod recurrence;
pub mod retry;
pub mod store;

pub use alerts::AlertDeduplicator;
pub use dispatch::DispatchTable;
pub use engine::{Orchestrator, RunOutcome, RunSummary};
pub use model::{Alert, AutomationConfig, AutomationType, Frequency, Job, JobStatus};
pub use recurrence::compute_next_run;
pub use retry::run_with_retry;
pub use store::OrchestratorDb;
