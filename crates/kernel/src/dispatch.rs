//! Tracker handshakes: offering trackers to handlers, accepting instances and
//! tearing them down.

use tactile_common::{HandlerId, InstanceId, InteractionType, InteractorId, TrackerId};

use crate::error::KernelError;
use crate::event::InteractionEvent;
use crate::handler::{HandlerContext, HandlerResponse, HandlerSlot, InteractionHandler};
use crate::tracker::{InteractionInstance, InteractionTracker, TrackerKind, TrackerValue};
use crate::world::Simulation;

impl Simulation {
    // ---- handlers ----

    pub fn register_handler(
        &mut self,
        owner: InteractorId,
        mut handler: Box<dyn InteractionHandler>,
    ) -> Result<HandlerId, KernelError> {
        if !self.interactors.contains_key(&owner) {
            return Err(KernelError::UnknownInteractor(owner));
        }
        let id = HandlerId(self.next_raw());
        let kind = handler.kind();
        handler.on_registered(owner);
        self.handlers.insert(
            id,
            HandlerSlot {
                owner,
                kind,
                enabled: true,
                handler,
            },
        );
        if let Some(it) = self.interactors.get_mut(&owner) {
            it.handlers.push((id, kind));
            it.rebind_mappings();
        }
        tracing::debug!(interactor = %owner, handler = %id, kind, "handler registered");
        self.refresh_neighbourhood(owner);
        Ok(id)
    }

    pub fn add_handler<H: InteractionHandler + 'static>(
        &mut self,
        owner: InteractorId,
        handler: H,
    ) -> Result<HandlerId, KernelError> {
        self.register_handler(owner, Box::new(handler))
    }

    /// Remove a handler, releasing every instance it holds first.
    pub fn unregister_handler(&mut self, id: HandlerId) -> bool {
        if !self.handlers.contains_key(&id) {
            tracing::debug!(handler = %id, "unregister of unknown handler");
            return false;
        }
        for instance in self.instances_of_handler(id) {
            self.release_instance(instance);
        }
        let Some(mut slot) = self.handlers.remove(&id) else {
            return false;
        };
        slot.handler.on_unregistered(slot.owner);
        if let Some(it) = self.interactors.get_mut(&slot.owner) {
            it.handlers.retain(|(h, _)| *h != id);
            it.rebind_mappings();
        }
        tracing::debug!(interactor = %slot.owner, handler = %id, "handler unregistered");
        self.refresh_neighbourhood(slot.owner);
        true
    }

    /// Disabled handlers accept nothing and take no part in resolution.
    /// Disabling a transient handler also releases its instances.
    pub fn set_handler_enabled(&mut self, id: HandlerId, enabled: bool) -> Result<bool, KernelError> {
        let slot = self
            .handlers
            .get_mut(&id)
            .ok_or(KernelError::UnknownHandler(id))?;
        if slot.enabled == enabled {
            return Ok(false);
        }
        slot.enabled = enabled;
        let owner = slot.owner;
        if !enabled && !slot.handler.is_persistent() {
            for instance in self.instances_of_handler(id) {
                self.release_instance(instance);
            }
        }
        self.refresh_neighbourhood(owner);
        Ok(true)
    }

    pub fn handler_enabled(&self, id: HandlerId) -> Option<bool> {
        self.handlers.get(&id).map(|s| s.enabled)
    }

    pub fn handler_kind(&self, id: HandlerId) -> Option<&'static str> {
        self.handlers.get(&id).map(|s| s.kind)
    }

    pub fn handler_owner(&self, id: HandlerId) -> Option<InteractorId> {
        self.handlers.get(&id).map(|s| s.owner)
    }

    /// Downcast a registered handler to its concrete type.
    pub fn handler_as<H: 'static>(&self, id: HandlerId) -> Option<&H> {
        self.handlers.get(&id)?.handler.as_any().downcast_ref::<H>()
    }

    pub fn instances_of_handler(&self, id: HandlerId) -> Vec<InstanceId> {
        self.instances
            .values()
            .filter(|i| i.handler == id)
            .map(|i| i.id)
            .collect()
    }

    /// Instances a handler holds for one interaction type.
    pub fn handler_instances_of_type(
        &self,
        id: HandlerId,
        interaction: InteractionType,
    ) -> Vec<InstanceId> {
        self.instances
            .values()
            .filter(|i| i.handler == id && i.interaction == interaction)
            .map(|i| i.id)
            .collect()
    }

    // ---- trackers ----

    /// Create a held tracker. With `change_value_on_release`, releasing first
    /// sets the value to `release_value` so handlers see the stop signal.
    pub fn create_tracker(
        &mut self,
        interaction: InteractionType,
        value: impl Into<TrackerValue>,
        release_value: impl Into<TrackerValue>,
        change_value_on_release: bool,
    ) -> TrackerId {
        let id = TrackerId(self.next_raw());
        self.trackers.insert(
            id,
            InteractionTracker::new(
                id,
                interaction,
                TrackerKind::Held,
                value.into(),
                release_value.into(),
                change_value_on_release,
            ),
        );
        id
    }

    /// Boolean tracker that resets to false on release.
    pub fn create_bool_tracker(&mut self, interaction: InteractionType, value: bool) -> TrackerId {
        self.create_tracker(interaction, value, false, true)
    }

    pub fn create_one_shot_tracker(&mut self, interaction: InteractionType) -> TrackerId {
        let id = TrackerId(self.next_raw());
        self.trackers.insert(
            id,
            InteractionTracker::new(
                id,
                interaction,
                TrackerKind::OneShot,
                TrackerValue::Bool(true),
                TrackerValue::Bool(false),
                false,
            ),
        );
        id
    }

    /// Live trackers only; released trackers are gone.
    pub fn tracker(&self, id: TrackerId) -> Option<&InteractionTracker> {
        self.trackers.get(&id)
    }

    pub fn instance(&self, id: InstanceId) -> Option<&InteractionInstance> {
        self.instances.get(&id)
    }

    pub fn instances(&self) -> impl Iterator<Item = &InteractionInstance> {
        self.instances.values()
    }

    /// Set a tracker's value and let each accepting handler react. Returns
    /// false when the value is unchanged or the tracker is gone.
    pub fn set_tracker_value(&mut self, id: TrackerId, value: impl Into<TrackerValue>) -> bool {
        let value = value.into();
        let Some(tracker) = self.trackers.get_mut(&id) else {
            tracing::debug!(tracker = %id, "value change on released tracker ignored");
            return false;
        };
        if tracker.value == value {
            return false;
        }
        tracker.value = value;
        let instances = tracker.instances.clone();
        self.emit(InteractionEvent::TrackerValueChanged { tracker: id, value });

        for instance_id in instances {
            let Some(instance) = self.instances.get(&instance_id).copied() else {
                continue;
            };
            let Some(slot) = self.handlers.get_mut(&instance.handler) else {
                continue;
            };
            let mut ctx = HandlerContext::new(slot.owner, instance.handler, &self.interactors);
            let response = slot.handler.on_value_changed(&mut ctx, &instance, value);
            let effects = ctx.into_effects();
            self.apply_effects(instance.handler, effects);
            if response == HandlerResponse::Release {
                self.release_instance(instance_id);
            }
        }
        true
    }

    /// Fire a one-shot tracker at its accepting handlers, then release it.
    pub fn fire_tracker(&mut self, id: TrackerId) -> bool {
        let Some(tracker) = self.trackers.get(&id) else {
            tracing::debug!(tracker = %id, "fire of released tracker ignored");
            return false;
        };
        if tracker.kind != TrackerKind::OneShot {
            tracing::warn!(tracker = %id, "fire on a held tracker ignored");
            return false;
        }
        let instances = tracker.instances.clone();
        self.emit(InteractionEvent::TrackerFired { tracker: id });
        for instance_id in instances {
            let Some(instance) = self.instances.get(&instance_id).copied() else {
                continue;
            };
            let Some(slot) = self.handlers.get_mut(&instance.handler) else {
                continue;
            };
            let mut ctx = HandlerContext::new(slot.owner, instance.handler, &self.interactors);
            slot.handler.on_fired(&mut ctx, &instance);
            let effects = ctx.into_effects();
            self.apply_effects(instance.handler, effects);
        }
        self.release_tracker(id)
    }

    /// Release a tracker and every instance bound to it. Releasing twice is a
    /// logged no-op.
    pub fn release_tracker(&mut self, id: TrackerId) -> bool {
        let Some(tracker) = self.trackers.get(&id) else {
            tracing::debug!(tracker = %id, "tracker already released");
            return false;
        };
        if tracker.change_value_on_release {
            let release_value = tracker.release_value;
            self.set_tracker_value(id, release_value);
        }
        let Some(mut tracker) = self.trackers.remove(&id) else {
            return false;
        };
        tracker.held = false;
        self.emit(InteractionEvent::TrackerReleased { tracker: id });
        for instance in tracker.instances {
            self.release_instance(instance);
        }
        true
    }

    /// End one accepted instance. The record is removed before its handler
    /// hears about it, so a second release is a no-op.
    pub fn release_instance(&mut self, id: InstanceId) -> bool {
        let Some(instance) = self.instances.remove(&id) else {
            tracing::debug!(instance = %id, "instance already released");
            return false;
        };
        for side in [instance.interactor, instance.other] {
            if let Some(it) = self.interactors.get_mut(&side) {
                it.active.remove(&id);
            }
        }
        if let Some(tracker) = self.trackers.get_mut(&instance.tracker) {
            tracker.instances.retain(|i| *i != id);
        }
        if let Some(slot) = self.handlers.get_mut(&instance.handler) {
            let mut ctx = HandlerContext::new(slot.owner, instance.handler, &self.interactors);
            slot.handler.on_released(&mut ctx, &instance);
            let effects = ctx.into_effects();
            self.apply_effects(instance.handler, effects);
        }
        tracing::debug!(
            %id,
            interactor = %instance.interactor,
            other = %instance.other,
            "interaction stopped"
        );
        for (interactor, other) in [
            (instance.interactor, instance.other),
            (instance.other, instance.interactor),
        ] {
            self.emit(InteractionEvent::InteractionStopped {
                interactor,
                other,
                instance: id,
                tracker: instance.tracker,
                handler: instance.handler,
                interaction: instance.interaction,
            });
        }
        true
    }

    // ---- dispatch ----

    /// Offer `tracker` to `id`'s handlers against `other`, in mapping order.
    /// The first accepting handler ends the round.
    pub fn dispatch(
        &mut self,
        tracker: TrackerId,
        id: InteractorId,
        other: InteractorId,
    ) -> Option<InstanceId> {
        let _span = tracing::debug_span!("dispatch", %tracker, interactor = %id, %other).entered();
        let Some(interaction) = self.trackers.get(&tracker).map(|t| t.interaction) else {
            tracing::debug!("dispatch of released tracker ignored");
            return None;
        };
        let mappings = self.interactors.get(&id)?.mappings.clone();
        for mapping in mappings {
            if self.trackers.get(&tracker).is_none_or(|t| t.held) {
                break;
            }
            let Some(handler) = mapping.bound else {
                continue;
            };
            let (Some(my_mode), Some(their_mode)) = (self.mode(id), self.mode(other)) else {
                break;
            };
            if mapping.interaction != interaction || !mapping.admits(my_mode, their_mode) {
                continue;
            }
            if self
                .instances
                .values()
                .any(|i| i.tracker == tracker && i.handler == handler && i.other == other)
            {
                tracing::warn!(%handler, "tracker already accepted by this handler");
                continue;
            }
            let Some(slot) = self.handlers.get_mut(&handler) else {
                continue;
            };
            if !slot.enabled {
                continue;
            }
            let Some(offered) = self.trackers.get(&tracker) else {
                break;
            };
            let mut ctx = HandlerContext::new(id, handler, &self.interactors);
            let accepted = slot.handler.try_interact(&mut ctx, offered, other);
            let effects = ctx.into_effects();
            self.apply_effects(handler, effects);
            if accepted {
                return Some(self.accept(tracker, id, handler, other, interaction));
            }
        }
        None
    }

    /// Offer in both directions between `id` and `other`.
    pub fn dispatch_binary(
        &mut self,
        tracker: TrackerId,
        id: InteractorId,
        other: InteractorId,
    ) -> Option<InstanceId> {
        self.dispatch(tracker, id, other)
            .or_else(|| self.dispatch(tracker, other, id))
    }

    /// Offer to every peer `id` touches, in both directions.
    pub fn dispatch_all(&mut self, tracker: TrackerId, id: InteractorId) -> Vec<InstanceId> {
        let mut accepted = Vec::new();
        for peer in self.touching(id) {
            accepted.extend(self.dispatch(tracker, id, peer));
            accepted.extend(self.dispatch(tracker, peer, id));
        }
        accepted
    }

    fn accept(
        &mut self,
        tracker: TrackerId,
        id: InteractorId,
        handler: HandlerId,
        other: InteractorId,
        interaction: InteractionType,
    ) -> InstanceId {
        let instance = InstanceId(self.next_raw());
        self.instances.insert(
            instance,
            InteractionInstance {
                id: instance,
                tracker,
                interaction,
                interactor: id,
                handler,
                other,
            },
        );
        if let Some(t) = self.trackers.get_mut(&tracker) {
            t.held = true;
            t.instances.push(instance);
        }
        for side in [id, other] {
            if let Some(it) = self.interactors.get_mut(&side) {
                it.active.insert(instance);
            }
        }
        tracing::debug!(%instance, interactor = %id, %other, %handler, "interaction started");
        self.emit(InteractionEvent::TrackerAccepted { tracker, instance });
        for (interactor, other) in [(id, other), (other, id)] {
            self.emit(InteractionEvent::InteractionStarted {
                interactor,
                other,
                instance,
                tracker,
                handler,
                interaction,
            });
        }
        instance
    }
}
