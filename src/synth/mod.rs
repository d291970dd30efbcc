//! Dataset generators.
//!
//! Phases run in dependency order and share one random stream:
//! identity, teams and projects, memberships, the task graph, custom fields.
//! [`pipeline::run_generation`] wires them together.

pub mod custom_fields;
pub mod identity;
pub mod pipeline;
pub mod tasks;
pub mod teams;

pub use pipeline::{GenerationSummary, PHASES, PhaseObserver, run_generation};
