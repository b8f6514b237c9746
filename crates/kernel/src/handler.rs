use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use tactile_common::{HandlerId, InteractorId, Mode, Transform};

use crate::event::HandlerEffect;
use crate::interactor::Interactor;
use crate::tracker::{InteractionInstance, InteractionTracker, TrackerValue};

/// What a handler wants done with an instance after a tracker value change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerResponse {
    Keep,
    Release,
}

/// Read-only view of the simulation handed to handler callbacks, plus a sink
/// for the effects they request.
pub struct HandlerContext<'a> {
    owner: InteractorId,
    handler: HandlerId,
    interactors: &'a BTreeMap<InteractorId, Interactor>,
    effects: Vec<HandlerEffect>,
}

impl<'a> HandlerContext<'a> {
    pub(crate) fn new(
        owner: InteractorId,
        handler: HandlerId,
        interactors: &'a BTreeMap<InteractorId, Interactor>,
    ) -> Self {
        Self {
            owner,
            handler,
            interactors,
            effects: Vec::new(),
        }
    }

    /// The interactor hosting the handler.
    pub fn owner(&self) -> InteractorId {
        self.owner
    }

    pub fn handler(&self) -> HandlerId {
        self.handler
    }

    pub fn interactor(&self, id: InteractorId) -> Option<&'a Interactor> {
        self.interactors.get(&id)
    }

    pub fn mode(&self, id: InteractorId) -> Option<Mode> {
        self.interactors.get(&id).map(Interactor::mode)
    }

    pub fn transform(&self, id: InteractorId) -> Option<&'a Transform> {
        self.interactors.get(&id).map(Interactor::transform)
    }

    pub fn hosts_handler(&self, id: InteractorId, kind: &str) -> bool {
        self.interactors
            .get(&id)
            .is_some_and(|it| it.hosts_handler(kind))
    }

    pub fn emit(&mut self, effect: HandlerEffect) {
        self.effects.push(effect);
    }

    pub(crate) fn into_effects(self) -> Vec<HandlerEffect> {
        self.effects
    }
}

/// A capability hosted by an interactor that accepts interaction trackers.
///
/// Callbacks never mutate the simulation directly: they read through the
/// [`HandlerContext`] and return decisions or emit effects.
pub trait InteractionHandler: fmt::Debug {
    /// Kind name used by mappings to bind to this handler.
    fn kind(&self) -> &'static str;

    /// Persistent handlers keep their instances while disabled.
    fn is_persistent(&self) -> bool {
        false
    }

    fn on_registered(&mut self, _owner: InteractorId) {}

    fn on_unregistered(&mut self, _owner: InteractorId) {}

    fn can_interact(&self, _ctx: &HandlerContext<'_>, _other: InteractorId) -> bool {
        true
    }

    /// Attempt to start an interaction with `other`. Returning true accepts the
    /// tracker; the simulation then creates the instance.
    fn try_interact(
        &mut self,
        ctx: &mut HandlerContext<'_>,
        tracker: &InteractionTracker,
        other: InteractorId,
    ) -> bool;

    /// Called for each instance when its tracker's value changes. The default
    /// treats an inactive value as the stop signal.
    fn on_value_changed(
        &mut self,
        _ctx: &mut HandlerContext<'_>,
        _instance: &InteractionInstance,
        value: TrackerValue,
    ) -> HandlerResponse {
        if value.is_active() {
            HandlerResponse::Keep
        } else {
            HandlerResponse::Release
        }
    }

    fn on_fired(&mut self, _ctx: &mut HandlerContext<'_>, _instance: &InteractionInstance) {}

    /// Called once per instance after it has been removed.
    fn on_released(&mut self, _ctx: &mut HandlerContext<'_>, _instance: &InteractionInstance) {}

    /// Per-frame poll.
    fn update(&mut self, _ctx: &mut HandlerContext<'_>) {}

    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug)]
pub(crate) struct HandlerSlot {
    pub owner: InteractorId,
    pub kind: &'static str,
    pub enabled: bool,
    pub handler: Box<dyn InteractionHandler>,
}
