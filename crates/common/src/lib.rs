//! Shared vocabulary for the tactile interaction engine.
//!
//! # Invariants
//! - Modes, actions and interaction types are dense indices below 32.
//! - Names are resolved to indices once, when the registry is built; runtime
//!   code only ever compares integers.

pub mod mode;
pub mod registry;
pub mod types;

pub use mode::{Mode, ModeMask};
pub use registry::{NameTable, Registry, RegistryError};
pub use types::{
    ActionIndex, ActionSourceId, ColliderId, HandlerId, InstanceId, InteractionType,
    InteractorId, TouchId, TrackerId, Transform,
};

pub fn crate_info() -> &'static str {
    "tactile-common v0.1.0"
}
