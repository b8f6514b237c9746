use serde::{Deserialize, Serialize};
use tactile_common::{ActionIndex, ActionSourceId};

/// How a button edge drives an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionEdge {
    /// Active while the button is down.
    Momentary,
    /// Flips on press.
    ToggleLeading,
    /// Flips on release.
    ToggleTrailing,
    /// Fires on press.
    OneshotLeading,
    /// Fires on release.
    OneshotTrailing,
}

impl ActionEdge {
    pub fn kind(self) -> ActionKind {
        match self {
            Self::OneshotLeading | Self::OneshotTrailing => ActionKind::OneShot,
            Self::Momentary | Self::ToggleLeading | Self::ToggleTrailing => ActionKind::Held,
        }
    }

    pub fn is_toggle(self) -> bool {
        matches!(self, Self::ToggleLeading | Self::ToggleTrailing)
    }
}

/// Tracker family: a held boolean or a one-shot trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Held,
    OneShot,
}

/// State of one input action on one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTracker {
    pub source: ActionSourceId,
    pub action: ActionIndex,
    pub(crate) edge: ActionEdge,
    pub(crate) value: bool,
}

impl ActionTracker {
    pub(crate) fn new(source: ActionSourceId, action: ActionIndex, edge: ActionEdge) -> Self {
        Self {
            source,
            action,
            edge,
            value: false,
        }
    }

    pub fn edge(&self) -> ActionEdge {
        self.edge
    }

    pub fn kind(&self) -> ActionKind {
        self.edge.kind()
    }

    /// Held value; always false for one-shot trackers.
    pub fn value(&self) -> bool {
        self.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionSignal {
    /// A held action changed value.
    Value(bool),
    /// A one-shot action fired.
    Fired,
    /// The tracker was retired (source rebound or destroyed).
    Released,
}

/// What an action source reports to the interaction layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub source: ActionSourceId,
    pub action: ActionIndex,
    pub edge: ActionEdge,
    pub signal: ActionSignal,
}
