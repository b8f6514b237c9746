use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tactile_common::{ActionIndex, ActionSourceId, InteractorId, Mode};
use tactile_kernel::Simulation;

use crate::action::{ActionEdge, ActionEvent, ActionSignal, ActionTracker};
use crate::mapping::ButtonMapping;

/// Lifecycle notifications an action source reports to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceState {
    Started,
    Enabled,
    Disabled,
    Destroyed,
}

/// A controller or other input device.
///
/// Owns one action tracker per mapped action and a set of local interactors
/// that share the source's mode.
#[derive(Debug, Clone)]
pub struct ActionSource {
    pub id: ActionSourceId,
    pub name: String,
    mode: Mode,
    enabled: bool,
    mappings: Vec<ButtonMapping>,
    trackers: BTreeMap<ActionIndex, ActionTracker>,
    buttons: u64,
    interactors: Vec<InteractorId>,
}

impl ActionSource {
    pub fn new(id: ActionSourceId, name: impl Into<String>, mappings: Vec<ButtonMapping>) -> Self {
        let mut source = Self {
            id,
            name: name.into(),
            mode: Mode::DEFAULT,
            enabled: true,
            mappings: Vec::new(),
            trackers: BTreeMap::new(),
            buttons: 0,
            interactors: Vec::new(),
        };
        source.set_mappings(mappings);
        source
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn mappings(&self) -> &[ButtonMapping] {
        &self.mappings
    }

    pub fn tracker(&self, action: ActionIndex) -> Option<&ActionTracker> {
        self.trackers.get(&action)
    }

    pub fn local_interactors(&self) -> &[InteractorId] {
        &self.interactors
    }

    pub fn owns(&self, interactor: InteractorId) -> bool {
        self.interactors.contains(&interactor)
    }

    /// Replace the button mappings. A tracker whose edge family no longer
    /// matches its mapping is released and replaced; the release events are
    /// returned.
    pub fn set_mappings(&mut self, mappings: Vec<ButtonMapping>) -> Vec<ActionEvent> {
        let mut events = Vec::new();
        for mapping in &mappings {
            match self.trackers.get_mut(&mapping.action) {
                Some(tracker) if tracker.kind() == mapping.edge.kind() => {
                    tracker.edge = mapping.edge;
                }
                Some(tracker) => {
                    tracing::debug!(source = %self.id, action = mapping.action.0, "rebinding action tracker");
                    events.push(ActionEvent {
                        source: self.id,
                        action: tracker.action,
                        edge: tracker.edge,
                        signal: ActionSignal::Released,
                    });
                    *tracker = ActionTracker::new(self.id, mapping.action, mapping.edge);
                }
                None => {
                    self.trackers.insert(
                        mapping.action,
                        ActionTracker::new(self.id, mapping.action, mapping.edge),
                    );
                }
            }
        }
        self.mappings = mappings;
        events
    }

    /// Feed the current button state word. Returns the action events for
    /// every mapping active in the current mode whose button changed.
    pub fn update_buttons(&mut self, state: u64) -> Vec<ActionEvent> {
        if !self.enabled {
            return Vec::new();
        }
        let changed = state ^ self.buttons;
        let pressed = changed & state;
        let released = changed & self.buttons;
        self.buttons = state;
        if changed == 0 {
            return Vec::new();
        }

        let mut events = Vec::new();
        for mapping in &self.mappings {
            let is_pressed = pressed & mapping.bit() != 0;
            let is_released = released & mapping.bit() != 0;
            if !mapping.is_active_in(self.mode) || (!is_pressed && !is_released) {
                continue;
            }
            let Some(tracker) = self.trackers.get_mut(&mapping.action) else {
                continue;
            };
            let signal = match mapping.edge {
                ActionEdge::Momentary if tracker.value && is_released => {
                    Some(ActionSignal::Value(false))
                }
                ActionEdge::Momentary if !tracker.value && is_pressed => {
                    Some(ActionSignal::Value(true))
                }
                ActionEdge::ToggleLeading if is_pressed => {
                    Some(ActionSignal::Value(!tracker.value))
                }
                ActionEdge::ToggleTrailing if is_released => {
                    Some(ActionSignal::Value(!tracker.value))
                }
                ActionEdge::OneshotLeading if is_pressed => Some(ActionSignal::Fired),
                ActionEdge::OneshotTrailing if is_released => Some(ActionSignal::Fired),
                _ => None,
            };
            let Some(signal) = signal else {
                continue;
            };
            if let ActionSignal::Value(value) = signal {
                tracker.value = value;
            }
            tracing::trace!(source = %self.id, action = mapping.action.0, ?signal, "action");
            events.push(ActionEvent {
                source: self.id,
                action: mapping.action,
                edge: tracker.edge,
                signal,
            });
        }
        events
    }

    pub fn press(&mut self, button: u8) -> Vec<ActionEvent> {
        let bit = 1u64.checked_shl(u32::from(button)).unwrap_or(0);
        self.update_buttons(self.buttons | bit)
    }

    pub fn release(&mut self, button: u8) -> Vec<ActionEvent> {
        let bit = 1u64.checked_shl(u32::from(button)).unwrap_or(0);
        self.update_buttons(self.buttons & !bit)
    }

    /// Enable or disable the source. Button state is forgotten on both
    /// transitions.
    pub fn set_enabled(&mut self, enabled: bool) -> Option<SourceState> {
        if self.enabled == enabled {
            return None;
        }
        self.enabled = enabled;
        self.buttons = 0;
        Some(if enabled {
            SourceState::Enabled
        } else {
            SourceState::Disabled
        })
    }

    /// Retire every tracker. Used when the source is destroyed.
    pub fn release_trackers(&mut self) -> Vec<ActionEvent> {
        let trackers = std::mem::take(&mut self.trackers);
        trackers
            .into_values()
            .map(|t| ActionEvent {
                source: self.id,
                action: t.action,
                edge: t.edge,
                signal: ActionSignal::Released,
            })
            .collect()
    }

    pub fn add_interactor(&mut self, interactor: InteractorId) -> bool {
        if self.interactors.contains(&interactor) {
            return false;
        }
        self.interactors.push(interactor);
        true
    }

    pub fn remove_interactor(&mut self, interactor: InteractorId) -> bool {
        let before = self.interactors.len();
        self.interactors.retain(|i| *i != interactor);
        self.interactors.len() != before
    }

    /// Change the source's mode and push it to every local interactor.
    /// Returns false when unchanged.
    pub fn set_mode(&mut self, sim: &mut Simulation, mode: Mode) -> bool {
        if self.mode == mode {
            return false;
        }
        let old = self.mode;
        self.mode = mode;
        tracing::debug!(source = %self.id, %old, new = %mode, "source mode changed");
        for interactor in &self.interactors {
            sim.set_mode(*interactor, mode);
        }
        true
    }
}
