use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tactile_common::{InteractorId, Mode, ModeMask};
use tactile_kernel::InteractionEvent;

/// Colour shown while an interactor is in any mode of `mode_mask`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeHighlightMapping {
    pub mode_mask: ModeMask,
    pub color: [f32; 4],
}

/// A colour swap requested for one interactor. `None` restores the
/// original colours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightChange {
    pub interactor: InteractorId,
    pub color: Option<[f32; 4]>,
}

/// Tints interactors by mode. The first mapping whose mask contains the new
/// mode wins.
#[derive(Debug, Clone, Default)]
pub struct ModeHighlighter {
    mappings: Vec<ModeHighlightMapping>,
    shown: BTreeMap<InteractorId, Option<[f32; 4]>>,
}

impl ModeHighlighter {
    pub fn new(mappings: Vec<ModeHighlightMapping>) -> Self {
        Self {
            mappings,
            shown: BTreeMap::new(),
        }
    }

    /// Start watching an interactor. Watching twice is a no-op.
    pub fn watch(&mut self, interactor: InteractorId) -> bool {
        if self.shown.contains_key(&interactor) {
            return false;
        }
        self.shown.insert(interactor, None);
        true
    }

    pub fn unwatch(&mut self, interactor: InteractorId) -> bool {
        self.shown.remove(&interactor).is_some()
    }

    pub fn color_for(&self, mode: Mode) -> Option<[f32; 4]> {
        self.mappings
            .iter()
            .find(|m| m.mode_mask.contains(mode))
            .map(|m| m.color)
    }

    /// The colour currently shown for a watched interactor.
    pub fn shown(&self, interactor: InteractorId) -> Option<[f32; 4]> {
        self.shown.get(&interactor).copied().flatten()
    }

    /// React to one simulation event.
    pub fn observe(&mut self, event: &InteractionEvent) -> Option<HighlightChange> {
        match *event {
            InteractionEvent::ModeChanged {
                interactor, new, ..
            } => {
                let color = self.color_for(new);
                let shown = self.shown.get_mut(&interactor)?;
                if *shown == color {
                    return None;
                }
                *shown = color;
                tracing::trace!(%interactor, ?color, "mode highlight");
                Some(HighlightChange { interactor, color })
            }
            InteractionEvent::InteractorDespawned { interactor } => {
                self.shown.remove(&interactor);
                None
            }
            _ => None,
        }
    }

    pub fn observe_all<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a InteractionEvent>,
    ) -> Vec<HighlightChange> {
        events.into_iter().filter_map(|e| self.observe(e)).collect()
    }
}
