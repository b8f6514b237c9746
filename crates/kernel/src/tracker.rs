use serde::{Deserialize, Serialize};
use tactile_common::{HandlerId, InstanceId, InteractionType, InteractorId, TrackerId};

/// Typed value carried by an interaction tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrackerValue {
    Bool(bool),
    Float(f32),
}

impl TrackerValue {
    /// Whether the value asks for the interaction to continue.
    pub fn is_active(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Float(f) => f != 0.0,
        }
    }
}

impl From<bool> for TrackerValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f32> for TrackerValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerKind {
    /// Lives until released; value changes are forwarded to accepted handlers.
    Held,
    /// Fires once and is then released.
    OneShot,
}

/// An input-driven interaction intent.
#[derive(Debug, Clone)]
pub struct InteractionTracker {
    pub id: TrackerId,
    pub interaction: InteractionType,
    pub kind: TrackerKind,
    pub(crate) value: TrackerValue,
    pub(crate) release_value: TrackerValue,
    pub(crate) change_value_on_release: bool,
    pub(crate) held: bool,
    pub(crate) instances: Vec<InstanceId>,
}

impl InteractionTracker {
    pub(crate) fn new(
        id: TrackerId,
        interaction: InteractionType,
        kind: TrackerKind,
        value: TrackerValue,
        release_value: TrackerValue,
        change_value_on_release: bool,
    ) -> Self {
        Self {
            id,
            interaction,
            kind,
            value,
            release_value,
            change_value_on_release,
            held: false,
            instances: Vec::new(),
        }
    }

    pub fn value(&self) -> TrackerValue {
        self.value
    }

    pub fn release_value(&self) -> TrackerValue {
        self.release_value
    }

    /// Set once any handler accepts the tracker; ends the offer round.
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Instances currently bound to this tracker.
    pub fn instances(&self) -> &[InstanceId] {
        &self.instances
    }
}

/// Accepted binding of a tracker to `(interactor, handler, other)`.
///
/// `interactor` owns the accepting handler; `other` is the peer it acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionInstance {
    pub id: InstanceId,
    pub tracker: TrackerId,
    pub interaction: InteractionType,
    pub interactor: InteractorId,
    pub handler: HandlerId,
    pub other: InteractorId,
}

impl InteractionInstance {
    pub fn involves(&self, interactor: InteractorId) -> bool {
        self.interactor == interactor || self.other == interactor
    }

    /// The participant opposite to `interactor`.
    pub fn counterpart(&self, interactor: InteractorId) -> Option<InteractorId> {
        if self.interactor == interactor {
            Some(self.other)
        } else if self.other == interactor {
            Some(self.interactor)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_of_values() {
        assert!(TrackerValue::Bool(true).is_active());
        assert!(!TrackerValue::Bool(false).is_active());
        assert!(TrackerValue::Float(0.3).is_active());
        assert!(!TrackerValue::Float(0.0).is_active());
    }

    #[test]
    fn counterpart_is_symmetric() {
        let instance = InteractionInstance {
            id: InstanceId(1),
            tracker: TrackerId(2),
            interaction: InteractionType::GRAB,
            interactor: InteractorId(3),
            handler: HandlerId(4),
            other: InteractorId(5),
        };
        assert_eq!(instance.counterpart(InteractorId(3)), Some(InteractorId(5)));
        assert_eq!(instance.counterpart(InteractorId(5)), Some(InteractorId(3)));
        assert_eq!(instance.counterpart(InteractorId(6)), None);
        assert!(instance.involves(InteractorId(5)));
    }
}
