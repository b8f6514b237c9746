use glam::Vec3;
use serde::{Deserialize, Serialize};
use tactile_common::{
    HandlerId, InstanceId, InteractionType, InteractorId, Mode, TouchId, TrackerId,
};

use crate::tracker::TrackerValue;

/// An event record produced by every mutation of the simulation.
///
/// Events are appended to the simulation's log in the order they happen and
/// queued for observers such as the interaction manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InteractionEvent {
    InteractorSpawned {
        interactor: InteractorId,
    },
    InteractorDespawned {
        interactor: InteractorId,
    },
    /// `interactor` began a logical touch with `other`. Raised once per side.
    TouchStarted {
        interactor: InteractorId,
        other: InteractorId,
        touch: TouchId,
    },
    /// `interactor` no longer touches `other`. Raised once per side.
    TouchStopped {
        interactor: InteractorId,
        other: InteractorId,
        touch: TouchId,
    },
    /// Neither side holds the shared touch record any more.
    TouchReleased {
        touch: TouchId,
        a: InteractorId,
        b: InteractorId,
    },
    ModeChanged {
        interactor: InteractorId,
        old: Mode,
        new: Mode,
    },
    /// An instance was accepted. Raised once for each participant, with
    /// `interactor` naming the participant the event is addressed to.
    InteractionStarted {
        interactor: InteractorId,
        other: InteractorId,
        instance: InstanceId,
        tracker: TrackerId,
        handler: HandlerId,
        interaction: InteractionType,
    },
    InteractionStopped {
        interactor: InteractorId,
        other: InteractorId,
        instance: InstanceId,
        tracker: TrackerId,
        handler: HandlerId,
        interaction: InteractionType,
    },
    TrackerAccepted {
        tracker: TrackerId,
        instance: InstanceId,
    },
    TrackerValueChanged {
        tracker: TrackerId,
        value: TrackerValue,
    },
    TrackerFired {
        tracker: TrackerId,
    },
    TrackerReleased {
        tracker: TrackerId,
    },
    /// A handler asked the host engine to perform an effect.
    Effect {
        handler: HandlerId,
        effect: HandlerEffect,
    },
    /// Frame step completed.
    Stepped {
        tick: u64,
    },
}

impl InteractionEvent {
    /// The interactor an event is addressed to, if any.
    pub fn interactor(&self) -> Option<InteractorId> {
        match self {
            Self::InteractorSpawned { interactor }
            | Self::InteractorDespawned { interactor }
            | Self::TouchStarted { interactor, .. }
            | Self::TouchStopped { interactor, .. }
            | Self::ModeChanged { interactor, .. }
            | Self::InteractionStarted { interactor, .. }
            | Self::InteractionStopped { interactor, .. } => Some(*interactor),
            _ => None,
        }
    }
}

/// Engine-side effects requested by handlers.
///
/// The kernel applies [`HandlerEffect::Scaled`] to the target transform; the
/// rest are left for the host (physics joints, materials, animation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HandlerEffect {
    Attached {
        holder: InteractorId,
        target: InteractorId,
    },
    Detached {
        holder: InteractorId,
        target: InteractorId,
    },
    Highlighted {
        target: InteractorId,
        color: [f32; 4],
    },
    Unhighlighted {
        target: InteractorId,
    },
    Scaled {
        target: InteractorId,
        scale: Vec3,
    },
    Animated {
        target: InteractorId,
        progress: f32,
    },
}
