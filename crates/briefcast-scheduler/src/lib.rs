//! # Briefcast Scheduler
//!
//! Per-tenant recurring triggers and the timer loop that fires them.
//!
//! ## Architecture
//! ```text
//! ScheduleRegistry (typed (tenant, slot) keys, per-entry timezone)
//!   ├── upsert: atomic replace of a tenant's whole entry set
//!   ├── next_fire: calendar arithmetic against an injected Clock
//!   └── take_due: collect fired entries, recompute their next fire
//!
//! SchedulerEngine (tokio interval tick)
//!   └── due entry → AgentRuntime gate → on_fire callback
//!         (the pipeline crate supplies the callback; executions for
//!          different tenants run concurrently, per-tenant runs are
//!          serialized by the orchestrator's execution lock)
//! ```
//!
//! Next-fire times are derived state: recomputed after every fire and on
//! load, never persisted.

pub mod clock;
pub mod engine;
pub mod registry;
pub mod runtime;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{SchedulerEngine, spawn_scheduler};
pub use registry::{ScheduleEntry, ScheduleRegistry, parse_hhmm};
pub use runtime::AgentRuntime;
pub use store::ScheduleStore;
