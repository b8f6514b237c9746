use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tactile_common::{ActionSourceId, InteractorId, Registry};
use tactile_input::{ActionEvent, ActionSource, ButtonMapping, SourceState};

/// Discovery notifications, drained by the interaction manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregatorEvent {
    Registered(ActionSourceId),
    Unregistered(ActionSourceId),
    StateChanged {
        source: ActionSourceId,
        state: SourceState,
    },
    InteractorAdded {
        source: ActionSourceId,
        interactor: InteractorId,
    },
    InteractorRemoved {
        source: ActionSourceId,
        interactor: InteractorId,
    },
}

/// Registry context plus every live action source.
///
/// One aggregator per simulation; nothing here is global.
#[derive(Debug, Clone)]
pub struct Aggregator {
    registry: Registry,
    sources: BTreeMap<ActionSourceId, ActionSource>,
    events: Vec<AggregatorEvent>,
    next_id: u64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(Registry::default())
    }
}

impl Aggregator {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            sources: BTreeMap::new(),
            events: Vec::new(),
            next_id: 0,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn register_source(
        &mut self,
        name: impl Into<String>,
        mappings: Vec<ButtonMapping>,
    ) -> ActionSourceId {
        self.next_id += 1;
        let id = ActionSourceId(self.next_id);
        let source = ActionSource::new(id, name, mappings);
        tracing::debug!(source = %id, name = %source.name, "action source registered");
        self.sources.insert(id, source);
        self.events.push(AggregatorEvent::Registered(id));
        id
    }

    /// Remove a source. Its trackers are retired and the release events
    /// returned; an unknown id yields nothing.
    pub fn unregister_source(&mut self, id: ActionSourceId) -> Vec<ActionEvent> {
        let Some(mut source) = self.sources.remove(&id) else {
            tracing::debug!(source = %id, "unregister of unknown action source");
            return Vec::new();
        };
        tracing::debug!(source = %id, "action source unregistered");
        self.events.push(AggregatorEvent::Unregistered(id));
        source.release_trackers()
    }

    /// Apply a lifecycle notification from a source. `Destroyed` unregisters
    /// it.
    pub fn set_source_state(&mut self, id: ActionSourceId, state: SourceState) -> Vec<ActionEvent> {
        let Some(source) = self.sources.get_mut(&id) else {
            tracing::warn!(source = %id, ?state, "state change on unknown action source");
            return Vec::new();
        };
        let changed = match state {
            SourceState::Enabled => source.set_enabled(true).is_some(),
            SourceState::Disabled => source.set_enabled(false).is_some(),
            SourceState::Started | SourceState::Destroyed => true,
        };
        if changed {
            self.events.push(AggregatorEvent::StateChanged { source: id, state });
        }
        if state == SourceState::Destroyed {
            return self.unregister_source(id);
        }
        Vec::new()
    }

    pub fn add_local_interactor(&mut self, id: ActionSourceId, interactor: InteractorId) -> bool {
        let added = self
            .sources
            .get_mut(&id)
            .is_some_and(|s| s.add_interactor(interactor));
        if added {
            self.events.push(AggregatorEvent::InteractorAdded {
                source: id,
                interactor,
            });
        }
        added
    }

    pub fn remove_local_interactor(&mut self, id: ActionSourceId, interactor: InteractorId) -> bool {
        let removed = self
            .sources
            .get_mut(&id)
            .is_some_and(|s| s.remove_interactor(interactor));
        if removed {
            self.events.push(AggregatorEvent::InteractorRemoved {
                source: id,
                interactor,
            });
        }
        removed
    }

    pub fn source(&self, id: ActionSourceId) -> Option<&ActionSource> {
        self.sources.get(&id)
    }

    pub fn source_mut(&mut self, id: ActionSourceId) -> Option<&mut ActionSource> {
        self.sources.get_mut(&id)
    }

    pub fn sources(&self) -> impl Iterator<Item = &ActionSource> {
        self.sources.values()
    }

    pub fn source_ids(&self) -> Vec<ActionSourceId> {
        self.sources.keys().copied().collect()
    }

    pub fn find_source(&self, name: &str) -> Option<ActionSourceId> {
        self.sources.values().find(|s| s.name == name).map(|s| s.id)
    }

    /// The source an interactor is local to, if any.
    pub fn source_of(&self, interactor: InteractorId) -> Option<ActionSourceId> {
        self.sources
            .values()
            .find(|s| s.owns(interactor))
            .map(|s| s.id)
    }

    pub fn is_local(&self, interactor: InteractorId) -> bool {
        self.source_of(interactor).is_some()
    }

    pub fn drain_events(&mut self) -> Vec<AggregatorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
