//! Input layer: action sources turn physical button state into action
//! trackers and events.
//!
//! The interaction layer consumes [`ActionEvent`]s, never raw button masks.
//!
//! # Invariants
//! - Each source keeps exactly one tracker per action index.
//! - A tracker's edge family (held or one-shot) always matches the mapping
//!   that last bound it; rebinding across families releases the old tracker.

pub mod action;
pub mod mapping;
pub mod source;

pub use action::{ActionEdge, ActionEvent, ActionKind, ActionSignal, ActionTracker};
pub use mapping::{ButtonMapping, InputError, MAX_BUTTONS};
pub use source::{ActionSource, SourceState};

pub fn crate_info() -> &'static str {
    "tactile-input v0.1.0"
}
