//! Conflict-aware content scheduling.

pub mod calendar;
pub mod conflicts;
pub mod engine;
pub mod optimal;
pub mod types;

pub use engine::{ScheduleUpdate, SchedulingEngine};
pub use types::{ScheduleStatus, ScheduledContent, SchedulingConflict, SchedulingRequest};
