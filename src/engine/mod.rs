//! Rules engine: day boundaries, experience curve, progression, tiers and
//! daily entry reconciliation.
//!
//! Everything here is synchronous and free of I/O.

pub mod difficulty;
pub mod progression;
pub mod reconciler;
pub mod tier;
pub mod timezone;

pub use difficulty::DifficultyModel;
pub use progression::{ProgressionEngine, ProgressionOutcome};
pub use reconciler::{DayPlan, DraftBuffer, EntryEdit, EntryState};
pub use tier::{evaluate as evaluate_tier, TierInputs};
pub use timezone::TimeZoneResolver;
