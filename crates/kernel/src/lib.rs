//! Interaction kernel: interactors, touches, trackers and handler handshakes.
//!
//! # Invariants
//! - A logical touch exists between two interactors exactly while at least one
//!   side holds a positive touch count for the other.
//! - An interaction tracker is accepted by at most one handler per offer round.
//! - Releases are terminal and idempotent; a released record is removed before
//!   any listener runs.
//! - Every mutation is recorded as an [`InteractionEvent`].

pub mod collider;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler;
pub mod handlers;
pub mod interactor;
pub mod subscription;
pub mod touch;
pub mod tracker;
pub mod world;

pub use collider::{ColliderRecord, ModeFilter, ProximityPhase, ProximitySignal};
pub use error::KernelError;
pub use event::{HandlerEffect, InteractionEvent};
pub use handler::{HandlerContext, HandlerResponse, InteractionHandler};
pub use handlers::{AnimateHandler, GrabHandler, HighlightHandler, ScaleHandler};
pub use interactor::{HandlerRef, InteractionMapping, Interactor};
pub use touch::{PairKey, TouchRecord};
pub use tracker::{InteractionInstance, InteractionTracker, TrackerKind, TrackerValue};
pub use world::Simulation;

pub fn crate_info() -> &'static str {
    "tactile-kernel v0.1.0"
}
