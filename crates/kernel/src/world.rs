use std::collections::{BTreeMap, VecDeque};

use tactile_common::{
    ColliderId, HandlerId, InstanceId, InteractionType, InteractorId, Mode, TouchId, TrackerId,
    Transform,
};
use uuid::Uuid;

use crate::collider::ColliderRecord;
use crate::error::KernelError;
use crate::event::{HandlerEffect, InteractionEvent};
use crate::handler::{HandlerContext, HandlerSlot};
use crate::interactor::{InteractionMapping, Interactor, TouchLink};
use crate::subscription::{SubscriptionTable, Watcher};
use crate::touch::{TouchRecord, TouchTable};
use crate::tracker::{InteractionInstance, InteractionTracker};

/// Upper bound on mode-inheritance propagation hops.
pub const MAX_INHERIT_DEPTH: usize = 64;

/// The authoritative interaction state for one scene.
///
/// All mutations go through explicit operations and are recorded in an
/// append-only event log. The same events are queued for observers, which
/// pull them with [`Simulation::poll_notification`] while holding `&mut`
/// access, so reactions never alias the state they react to.
///
/// Uses BTreeMap arenas for deterministic iteration order.
#[derive(Debug)]
pub struct Simulation {
    session: Uuid,
    tick: u64,
    next_id: u64,
    pub(crate) interactors: BTreeMap<InteractorId, Interactor>,
    pub(crate) handlers: BTreeMap<HandlerId, HandlerSlot>,
    pub(crate) colliders: BTreeMap<ColliderId, ColliderRecord>,
    pub(crate) touches: TouchTable,
    pub(crate) trackers: BTreeMap<TrackerId, InteractionTracker>,
    pub(crate) instances: BTreeMap<InstanceId, InteractionInstance>,
    pub(crate) subscriptions: SubscriptionTable,
    event_log: Vec<InteractionEvent>,
    pending: VecDeque<InteractionEvent>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            session: Uuid::new_v4(),
            tick: 0,
            next_id: 0,
            interactors: BTreeMap::new(),
            handlers: BTreeMap::new(),
            colliders: BTreeMap::new(),
            touches: TouchTable::default(),
            trackers: BTreeMap::new(),
            instances: BTreeMap::new(),
            subscriptions: SubscriptionTable::default(),
            event_log: Vec::new(),
            pending: VecDeque::new(),
        }
    }
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unique id of this simulation instance, attached to trace spans.
    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn next_raw(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn emit(&mut self, event: InteractionEvent) {
        self.pending.push_back(event.clone());
        self.event_log.push(event);
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[InteractionEvent] {
        &self.event_log
    }

    /// Next event not yet seen by observers, oldest first.
    pub fn poll_notification(&mut self) -> Option<InteractionEvent> {
        self.pending.pop_front()
    }

    pub fn pending_notifications(&self) -> usize {
        self.pending.len()
    }

    // ---- interactors ----

    pub fn spawn_interactor(&mut self, name: impl Into<String>) -> InteractorId {
        let id = InteractorId(self.next_raw());
        let name = name.into();
        tracing::debug!(interactor = %id, %name, "interactor spawned");
        self.interactors.insert(id, Interactor::new(id, name));
        self.emit(InteractionEvent::InteractorSpawned { interactor: id });
        id
    }

    pub fn interactor(&self, id: InteractorId) -> Option<&Interactor> {
        self.interactors.get(&id)
    }

    pub fn interactors(&self) -> impl Iterator<Item = &Interactor> {
        self.interactors.values()
    }

    pub fn find_interactor(&self, name: &str) -> Option<InteractorId> {
        self.interactors
            .values()
            .find(|it| it.name == name)
            .map(|it| it.id)
    }

    pub fn interactor_count(&self) -> usize {
        self.interactors.len()
    }

    pub fn mode(&self, id: InteractorId) -> Option<Mode> {
        self.interactors.get(&id).map(Interactor::mode)
    }

    pub fn has_interaction(&self, id: InteractorId, interaction: InteractionType) -> bool {
        self.interactors
            .get(&id)
            .is_some_and(|it| it.has_interaction(interaction))
    }

    pub fn touching(&self, id: InteractorId) -> Vec<InteractorId> {
        self.interactors
            .get(&id)
            .map(Interactor::touching)
            .unwrap_or_default()
    }

    pub fn touches(&self) -> &TouchTable {
        &self.touches
    }

    pub fn touch(&self, id: TouchId) -> Option<&TouchRecord> {
        self.touches.get(id)
    }

    pub fn set_transform(&mut self, id: InteractorId, transform: Transform) -> bool {
        match self.interactors.get_mut(&id) {
            Some(it) => {
                it.transform = transform;
                true
            }
            None => false,
        }
    }

    /// Replace the mapping table and re-resolve interactions on both sides of
    /// every current touch.
    pub fn set_mappings(
        &mut self,
        id: InteractorId,
        mappings: Vec<InteractionMapping>,
    ) -> Result<(), KernelError> {
        let it = self
            .interactors
            .get_mut(&id)
            .ok_or(KernelError::UnknownInteractor(id))?;
        it.mappings = mappings;
        it.rebind_mappings();
        self.refresh_neighbourhood(id);
        Ok(())
    }

    pub fn add_mapping(
        &mut self,
        id: InteractorId,
        mapping: InteractionMapping,
    ) -> Result<(), KernelError> {
        let it = self
            .interactors
            .get_mut(&id)
            .ok_or(KernelError::UnknownInteractor(id))?;
        it.mappings.push(mapping);
        it.rebind_mappings();
        self.refresh_neighbourhood(id);
        Ok(())
    }

    /// Set the structural scene parent. Used by mode policies, not by
    /// propagation.
    pub fn set_parent(
        &mut self,
        id: InteractorId,
        parent: Option<InteractorId>,
    ) -> Result<(), KernelError> {
        if let Some(p) = parent {
            if p == id {
                return Err(KernelError::CyclicInheritance { child: id, parent: p });
            }
            if !self.interactors.contains_key(&p) {
                return Err(KernelError::UnknownInteractor(p));
            }
        }
        let it = self
            .interactors
            .get_mut(&id)
            .ok_or(KernelError::UnknownInteractor(id))?;
        it.parent = parent;
        Ok(())
    }

    /// Make `child` copy `parent`'s mode now and on every later change.
    ///
    /// Chains that would loop back to `child` are rejected.
    pub fn set_inherit_mode_from(
        &mut self,
        child: InteractorId,
        parent: Option<InteractorId>,
    ) -> Result<(), KernelError> {
        if !self.interactors.contains_key(&child) {
            return Err(KernelError::UnknownInteractor(child));
        }
        if let Some(p) = parent {
            if !self.interactors.contains_key(&p) {
                return Err(KernelError::UnknownInteractor(p));
            }
            let mut cursor = Some(p);
            let mut hops = 0;
            while let Some(c) = cursor {
                if c == child || hops > self.interactors.len() {
                    tracing::warn!(%child, parent = %p, "rejected cyclic mode inheritance");
                    return Err(KernelError::CyclicInheritance { child, parent: p });
                }
                cursor = self.interactors.get(&c).and_then(|i| i.inherit_mode_from);
                hops += 1;
            }
        }

        let Some(it) = self.interactors.get_mut(&child) else {
            return Err(KernelError::UnknownInteractor(child));
        };
        if let Some(old) = it.inherit_watch.take() {
            tracing::trace!(%child, subscription = ?old.id(), "inheritance watch dropped");
        }
        it.inherit_mode_from = parent;
        if let Some(p) = parent {
            it.inherit_watch = Some(self.subscriptions.subscribe(p, Watcher::InheritMode(child)));
            if let Some(mode) = self.mode(p) {
                self.set_mode(child, mode);
            }
        }
        Ok(())
    }

    /// Remove an interactor: its instances are released, handlers
    /// unregistered, colliders dropped and every touch stopped on both sides.
    pub fn despawn_interactor(&mut self, id: InteractorId) -> bool {
        let Some(it) = self.interactors.get(&id) else {
            return false;
        };
        let _span = tracing::debug_span!("despawn", interactor = %id).entered();
        let active: Vec<InstanceId> = it.active.iter().copied().collect();
        let handlers: Vec<HandlerId> = it.handlers.iter().map(|(h, _)| *h).collect();
        let colliders = it.colliders.clone();

        for instance in active {
            self.release_instance(instance);
        }
        for handler in handlers {
            self.unregister_handler(handler);
        }
        for collider in colliders {
            self.despawn_collider(collider);
        }
        for peer in self.touching(id) {
            self.force_stop_touching(id, peer);
        }
        let watchers: Vec<InteractorId> = self
            .interactors
            .values()
            .filter(|other| other.is_touching(id))
            .map(|other| other.id)
            .collect();
        for peer in watchers {
            self.force_stop_touching(peer, id);
        }

        for other in self.interactors.values_mut() {
            if other.inherit_mode_from == Some(id) {
                other.inherit_mode_from = None;
                other.inherit_watch = None;
            }
            if other.parent == Some(id) {
                other.parent = None;
            }
        }
        self.interactors.remove(&id);
        self.subscriptions.prune();
        tracing::debug!(interactor = %id, "interactor despawned");
        self.emit(InteractionEvent::InteractorDespawned { interactor: id });
        true
    }

    // ---- touch ----

    /// Add one touch reference from `id` to `other`. Returns true on the
    /// 0→1 transition, which is the only one that raises an event.
    pub fn started_touching(&mut self, id: InteractorId, other: InteractorId) -> bool {
        if id == other || !self.interactors.contains_key(&other) {
            tracing::warn!(interactor = %id, %other, "touch with invalid peer ignored");
            return false;
        }
        let Some(me) = self.interactors.get_mut(&id) else {
            tracing::warn!(interactor = %id, "touch on unknown interactor ignored");
            return false;
        };
        if let Some(link) = me.touching.get_mut(&other) {
            link.count += 1;
            return false;
        }

        let next_id = &mut self.next_id;
        let (touch, _) = self.touches.acquire(id, other, || {
            *next_id += 1;
            TouchId(*next_id)
        });
        let watch = self
            .subscriptions
            .subscribe(other, Watcher::PeerMappings(id));
        me.touching.insert(
            other,
            TouchLink {
                count: 1,
                touch,
                _watch: watch,
            },
        );
        self.update_interactions(id);
        tracing::debug!(interactor = %id, %other, %touch, "touch started");
        self.emit(InteractionEvent::TouchStarted {
            interactor: id,
            other,
            touch,
        });
        true
    }

    /// Drop one touch reference. Returns true on the 1→0 transition. A call
    /// with no outstanding reference is logged and ignored.
    pub fn stopped_touching(&mut self, id: InteractorId, other: InteractorId) -> bool {
        let Some(me) = self.interactors.get_mut(&id) else {
            tracing::warn!(interactor = %id, "stop-touch on unknown interactor ignored");
            return false;
        };
        let Some(link) = me.touching.get_mut(&other) else {
            tracing::warn!(interactor = %id, %other, "stop-touch without matching start");
            return false;
        };
        if link.count > 1 {
            link.count -= 1;
            return false;
        }
        let touch = link.touch;
        me.touching.remove(&other);
        self.update_interactions(id);
        tracing::debug!(interactor = %id, %other, %touch, "touch stopped");
        self.emit(InteractionEvent::TouchStopped {
            interactor: id,
            other,
            touch,
        });
        if let Some(record) = self.touches.release(id, other) {
            self.emit(InteractionEvent::TouchReleased {
                touch: record.id,
                a: record.a,
                b: record.b,
            });
        }
        true
    }

    fn force_stop_touching(&mut self, id: InteractorId, other: InteractorId) {
        if let Some(link) = self
            .interactors
            .get_mut(&id)
            .and_then(|it| it.touching.get_mut(&other))
        {
            link.count = 1;
        }
        self.stopped_touching(id, other);
    }

    // ---- mode ----

    /// Change an interactor's mode. Returns false when unchanged or unknown.
    ///
    /// Available interactions are recomputed before the change is announced,
    /// then colliders, touching peers and inheriting children react.
    pub fn set_mode(&mut self, id: InteractorId, mode: Mode) -> bool {
        self.set_mode_at_depth(id, mode, 0)
    }

    fn set_mode_at_depth(&mut self, id: InteractorId, mode: Mode, depth: usize) -> bool {
        if depth > MAX_INHERIT_DEPTH {
            tracing::warn!(interactor = %id, depth, "mode propagation depth exceeded");
            return false;
        }
        let Some(it) = self.interactors.get_mut(&id) else {
            tracing::warn!(interactor = %id, "mode change on unknown interactor ignored");
            return false;
        };
        if it.mode == mode {
            return false;
        }
        let old = it.mode;
        it.mode = mode;
        let colliders = it.colliders.clone();

        self.update_interactions(id);
        tracing::debug!(interactor = %id, %old, new = %mode, "mode changed");
        self.emit(InteractionEvent::ModeChanged {
            interactor: id,
            old,
            new: mode,
        });

        for collider in colliders {
            self.refilter_own(collider);
        }
        let mut refiltered = Vec::new();
        for (sub, watcher) in self.subscriptions.watchers_of(id) {
            if !self.subscriptions.is_live(sub) {
                continue;
            }
            match watcher {
                Watcher::PeerMappings(peer) => self.update_interactions(peer),
                Watcher::ColliderFilter(collider) => {
                    if !refiltered.contains(&collider) {
                        refiltered.push(collider);
                        self.refilter_peer(collider, id);
                    }
                }
                Watcher::InheritMode(child) => {
                    self.set_mode_at_depth(child, mode, depth + 1);
                }
            }
        }
        true
    }

    // ---- mapping resolution ----

    /// Recompute the interaction-type → peers cache of `id`.
    pub(crate) fn update_interactions(&mut self, id: InteractorId) {
        let Some(me) = self.interactors.get(&id) else {
            return;
        };
        let mut found: BTreeMap<InteractionType, Vec<InteractorId>> = BTreeMap::new();
        for mapping in &me.mappings {
            if mapping.interaction.is_touch() || !mapping.local.contains(me.mode) {
                continue;
            }
            for peer in me.touching.keys() {
                if found
                    .get(&mapping.interaction)
                    .is_some_and(|peers| peers.contains(peer))
                {
                    continue;
                }
                let Some(other) = self.interactors.get(peer) else {
                    continue;
                };
                if self.pair_matches(me, mapping, other) {
                    found.entry(mapping.interaction).or_default().push(*peer);
                    break;
                }
            }
        }
        if let Some(me) = self.interactors.get_mut(&id) {
            me.available = found;
        }
    }

    /// Both sides' masks must cross-satisfy the current modes, and at least
    /// one side's handler must be willing.
    fn pair_matches(&self, me: &Interactor, mapping: &InteractionMapping, other: &Interactor) -> bool {
        if !mapping.remote.contains(other.mode) {
            return false;
        }
        other.mappings.iter().any(|theirs| {
            theirs.interaction == mapping.interaction
                && theirs.admits(other.mode, me.mode)
                && (self.handler_can_interact(mapping.bound, other.id)
                    || self.handler_can_interact(theirs.bound, me.id))
        })
    }

    fn handler_can_interact(&self, handler: Option<HandlerId>, other: InteractorId) -> bool {
        let Some(id) = handler else {
            return false;
        };
        let Some(slot) = self.handlers.get(&id) else {
            return false;
        };
        if !slot.enabled {
            return false;
        }
        let ctx = HandlerContext::new(slot.owner, id, &self.interactors);
        slot.handler.can_interact(&ctx, other)
    }

    /// Re-resolve `id` and everything it touches.
    pub(crate) fn refresh_neighbourhood(&mut self, id: InteractorId) {
        self.update_interactions(id);
        for peer in self.touching(id) {
            self.update_interactions(peer);
        }
        let watchers: Vec<InteractorId> = self
            .interactors
            .values()
            .filter(|other| other.id != id && other.is_touching(id))
            .map(|other| other.id)
            .collect();
        for peer in watchers {
            self.update_interactions(peer);
        }
    }

    // ---- frame ----

    /// Advance one frame: poll every enabled handler and apply the effects
    /// it reports.
    pub fn step(&mut self) {
        self.tick += 1;
        let _span = tracing::debug_span!("step", session = %self.session, tick = self.tick).entered();
        let ids: Vec<HandlerId> = self.handlers.keys().copied().collect();
        for id in ids {
            let Some(slot) = self.handlers.get_mut(&id) else {
                continue;
            };
            if !slot.enabled {
                continue;
            }
            let mut ctx = HandlerContext::new(slot.owner, id, &self.interactors);
            slot.handler.update(&mut ctx);
            let effects = ctx.into_effects();
            self.apply_effects(id, effects);
        }
        self.emit(InteractionEvent::Stepped { tick: self.tick });
    }

    pub(crate) fn apply_effects(&mut self, handler: HandlerId, effects: Vec<HandlerEffect>) {
        for effect in effects {
            if let HandlerEffect::Scaled { target, scale } = &effect {
                if let Some(it) = self.interactors.get_mut(target) {
                    it.transform.scale = *scale;
                }
            }
            tracing::trace!(%handler, ?effect, "handler effect");
            self.emit(InteractionEvent::Effect { handler, effect });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{GrabHandler, HighlightHandler};
    use tactile_common::ModeMask;

    fn count(sim: &Simulation, pred: impl Fn(&InteractionEvent) -> bool) -> usize {
        sim.events().iter().filter(|e| pred(e)).count()
    }

    fn grab_mapping(local: u32, remote: u32) -> InteractionMapping {
        InteractionMapping::new(InteractionType::GRAB, ModeMask(local), ModeMask(remote))
    }

    /// Two interactors with mutual Grab mappings; `a` hosts a grab handler.
    fn grab_pair(local: u32, remote: u32) -> (Simulation, InteractorId, InteractorId) {
        let mut sim = Simulation::new();
        let a = sim.spawn_interactor("hand");
        let b = sim.spawn_interactor("box");
        sim.add_handler(a, GrabHandler::new()).unwrap();
        sim.set_mappings(a, vec![grab_mapping(local, remote).with_handler("grab")])
            .unwrap();
        sim.set_mappings(b, vec![grab_mapping(remote, local)]).unwrap();
        (sim, a, b)
    }

    #[test]
    fn new_simulation_is_empty() {
        let sim = Simulation::new();
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.interactor_count(), 0);
        assert!(sim.events().is_empty());
    }

    #[test]
    fn shared_touch_record_is_created_once() {
        let mut sim = Simulation::new();
        let a = sim.spawn_interactor("a");
        let b = sim.spawn_interactor("b");
        assert!(sim.started_touching(a, b));
        assert!(sim.started_touching(b, a));
        assert_eq!(sim.touches().len(), 1);
        let record = sim.touches().between(a, b).unwrap();
        assert_eq!(record.a, a);
        let touch = record.id;

        assert!(sim.stopped_touching(a, b));
        assert!(sim.touch(touch).is_some(), "b still holds the record");
        assert!(sim.stopped_touching(b, a));
        assert!(sim.touches().is_empty());

        let stops = |who: InteractorId| {
            move |e: &InteractionEvent| {
                matches!(e, InteractionEvent::TouchStopped { interactor, .. } if *interactor == who)
            }
        };
        assert_eq!(count(&sim, stops(a)), 1);
        assert_eq!(count(&sim, stops(b)), 1);
        assert_eq!(
            count(&sim, |e| matches!(e, InteractionEvent::TouchReleased { .. })),
            1
        );
    }

    #[test]
    fn repeated_touch_references_are_counted() {
        let mut sim = Simulation::new();
        let a = sim.spawn_interactor("a");
        let b = sim.spawn_interactor("b");
        assert!(sim.started_touching(a, b));
        assert!(!sim.started_touching(a, b));
        assert_eq!(sim.interactor(a).unwrap().touch_count(b), 2);
        assert!(!sim.stopped_touching(a, b));
        assert!(sim.stopped_touching(a, b));
        assert_eq!(
            count(&sim, |e| matches!(e, InteractionEvent::TouchStarted { .. })),
            1
        );
    }

    #[test]
    fn unmatched_stop_touch_is_ignored() {
        let mut sim = Simulation::new();
        let a = sim.spawn_interactor("a");
        let b = sim.spawn_interactor("b");
        assert!(!sim.stopped_touching(a, b));
        assert!(!sim.started_touching(a, a));
        assert!(!sim.started_touching(a, InteractorId(999)));
        assert!(sim.touching(a).is_empty());
    }

    #[test]
    fn mode_setter_is_a_no_op_when_unchanged() {
        let mut sim = Simulation::new();
        let a = sim.spawn_interactor("a");
        assert!(!sim.set_mode(a, Mode(0)));
        assert!(sim.set_mode(a, Mode(3)));
        assert_eq!(sim.mode(a), Some(Mode(3)));
        assert_eq!(
            count(&sim, |e| matches!(e, InteractionEvent::ModeChanged { .. })),
            1
        );
    }

    #[test]
    fn mutual_mappings_resolve_symmetrically() {
        let (mut sim, a, b) = grab_pair(0b01, 0b10);
        sim.set_mode(b, Mode(1));
        sim.started_touching(a, b);
        sim.started_touching(b, a);
        assert!(sim.has_interaction(a, InteractionType::GRAB));
        assert!(sim.has_interaction(b, InteractionType::GRAB));
        assert_eq!(sim.interactor(a).unwrap().interaction_peers(InteractionType::GRAB), &[b]);

        // b leaves the remote mask: both sides drop the interaction at once.
        sim.set_mode(b, Mode(2));
        assert!(!sim.has_interaction(a, InteractionType::GRAB));
        assert!(!sim.has_interaction(b, InteractionType::GRAB));

        sim.set_mode(b, Mode(1));
        assert!(sim.has_interaction(a, InteractionType::GRAB));
        sim.set_mode(a, Mode(1));
        assert!(!sim.has_interaction(a, InteractionType::GRAB));
        assert!(!sim.has_interaction(b, InteractionType::GRAB));
    }

    #[test]
    fn resolution_requires_a_willing_handler() {
        let mut sim = Simulation::new();
        let a = sim.spawn_interactor("a");
        let b = sim.spawn_interactor("b");
        sim.set_mappings(a, vec![grab_mapping(1, 1)]).unwrap();
        sim.set_mappings(b, vec![grab_mapping(1, 1)]).unwrap();
        sim.started_touching(a, b);
        assert!(!sim.has_interaction(a, InteractionType::GRAB));

        // Two grab hosts refuse each other.
        let h = sim.add_handler(b, GrabHandler::new()).unwrap();
        sim.add_handler(a, GrabHandler::new()).unwrap();
        sim.set_mappings(a, vec![grab_mapping(1, 1).with_handler("grab")])
            .unwrap();
        sim.set_mappings(b, vec![grab_mapping(1, 1).with_handler("grab")])
            .unwrap();
        assert!(!sim.has_interaction(a, InteractionType::GRAB));

        sim.unregister_handler(h);
        assert!(sim.has_interaction(a, InteractionType::GRAB));
    }

    #[test]
    fn touch_interaction_type_never_resolves() {
        let mut sim = Simulation::new();
        let a = sim.spawn_interactor("a");
        let b = sim.spawn_interactor("b");
        sim.add_handler(a, HighlightHandler::default()).unwrap();
        let touch = InteractionMapping::new(InteractionType::TOUCH, ModeMask::ALL, ModeMask::ALL)
            .with_handler("highlight");
        sim.set_mappings(a, vec![touch.clone()]).unwrap();
        sim.set_mappings(b, vec![touch]).unwrap();
        sim.started_touching(a, b);
        assert!(!sim.has_interaction(a, InteractionType::TOUCH));
    }

    #[test]
    fn unknown_handler_kind_excludes_mapping() {
        let mut sim = Simulation::new();
        let a = sim.spawn_interactor("a");
        let b = sim.spawn_interactor("b");
        sim.set_mappings(a, vec![grab_mapping(1, 1).with_handler("teleport")])
            .unwrap();
        sim.set_mappings(b, vec![grab_mapping(1, 1)]).unwrap();
        sim.started_touching(a, b);
        assert_eq!(sim.interactor(a).unwrap().mappings()[0].bound_handler(), None);
        assert!(!sim.has_interaction(a, InteractionType::GRAB));
    }

    #[test]
    fn mode_inheritance_propagates_downward() {
        let mut sim = Simulation::new();
        let root = sim.spawn_interactor("root");
        let mid = sim.spawn_interactor("mid");
        let leaf = sim.spawn_interactor("leaf");
        sim.set_mode(root, Mode(2));
        sim.set_inherit_mode_from(mid, Some(root)).unwrap();
        sim.set_inherit_mode_from(leaf, Some(mid)).unwrap();
        assert_eq!(sim.mode(leaf), Some(Mode(2)));

        sim.set_mode(root, Mode(4));
        assert_eq!(sim.mode(mid), Some(Mode(4)));
        assert_eq!(sim.mode(leaf), Some(Mode(4)));

        sim.set_inherit_mode_from(mid, None).unwrap();
        sim.set_mode(root, Mode(1));
        assert_eq!(sim.mode(mid), Some(Mode(4)));
    }

    #[test]
    fn cyclic_inheritance_is_rejected() {
        let mut sim = Simulation::new();
        let a = sim.spawn_interactor("a");
        let b = sim.spawn_interactor("b");
        assert_eq!(
            sim.set_inherit_mode_from(a, Some(a)),
            Err(KernelError::CyclicInheritance { child: a, parent: a })
        );
        sim.set_inherit_mode_from(b, Some(a)).unwrap();
        assert!(matches!(
            sim.set_inherit_mode_from(a, Some(b)),
            Err(KernelError::CyclicInheritance { .. })
        ));
        // The rejected link left no propagation behind.
        sim.set_mode(a, Mode(1));
        assert_eq!(sim.mode(b), Some(Mode(1)));
        assert_eq!(sim.interactor(a).unwrap().inherit_mode_from(), None);
    }

    #[test]
    fn despawn_stops_touches_on_both_sides() {
        let (mut sim, a, b) = grab_pair(1, 1);
        sim.started_touching(a, b);
        sim.started_touching(a, b);
        sim.started_touching(b, a);
        assert!(sim.despawn_interactor(b));
        assert!(sim.touching(a).is_empty());
        assert!(sim.touches().is_empty());
        assert!(!sim.has_interaction(a, InteractionType::GRAB));
        assert!(sim.interactor(b).is_none());
        assert!(!sim.despawn_interactor(b));
    }

    #[test]
    fn touch_links_own_their_subscriptions() {
        let (mut sim, a, b) = grab_pair(1, 1);
        sim.started_touching(a, b);
        sim.started_touching(b, a);
        assert_eq!(sim.subscriptions.watchers_of(b).len(), 1);
        assert_eq!(sim.subscriptions.watchers_of(a).len(), 1);

        sim.stopped_touching(a, b);
        assert!(sim.subscriptions.watchers_of(b).is_empty());
        assert_eq!(sim.subscriptions.watchers_of(a).len(), 1);
        sim.stopped_touching(b, a);
        assert!(sim.subscriptions.is_empty());
    }

    #[test]
    fn despawn_leaves_no_watchers_behind() {
        let (mut sim, a, b) = grab_pair(1, 1);
        let child = sim.spawn_interactor("child");
        sim.set_inherit_mode_from(child, Some(b)).unwrap();
        sim.started_touching(a, b);
        sim.started_touching(b, a);
        assert_eq!(sim.subscriptions.len(), 3);

        sim.despawn_interactor(b);
        assert!(sim.subscriptions.watchers_of(b).is_empty());
        assert!(sim.subscriptions.is_empty());
        assert_eq!(sim.interactor(child).unwrap().inherit_mode_from(), None);
    }

    #[test]
    fn relinking_inheritance_drops_the_old_watch() {
        let mut sim = Simulation::new();
        let a = sim.spawn_interactor("a");
        let b = sim.spawn_interactor("b");
        let child = sim.spawn_interactor("child");
        sim.set_inherit_mode_from(child, Some(a)).unwrap();
        sim.set_inherit_mode_from(child, Some(b)).unwrap();
        assert!(sim.subscriptions.watchers_of(a).is_empty());
        assert_eq!(sim.subscriptions.watchers_of(b).len(), 1);

        sim.set_mode(a, Mode(1));
        assert_eq!(sim.mode(child), Some(Mode::DEFAULT));
        sim.set_inherit_mode_from(child, None).unwrap();
        assert!(sim.subscriptions.is_empty());
    }

    #[test]
    fn inheritance_stops_past_the_depth_cap() {
        let mut sim = Simulation::new();
        let chain: Vec<InteractorId> = (0..MAX_INHERIT_DEPTH + 3)
            .map(|i| sim.spawn_interactor(format!("link{i}")))
            .collect();
        for pair in chain.windows(2) {
            sim.set_inherit_mode_from(pair[1], Some(pair[0])).unwrap();
        }

        assert!(sim.set_mode(chain[0], Mode(1)));
        assert_eq!(sim.mode(chain[MAX_INHERIT_DEPTH]), Some(Mode(1)));
        assert_eq!(sim.mode(chain[MAX_INHERIT_DEPTH + 1]), Some(Mode::DEFAULT));
        assert_eq!(sim.mode(chain[MAX_INHERIT_DEPTH + 2]), Some(Mode::DEFAULT));

        // Each link below the cap still follows its own parent.
        assert!(sim.set_mode(chain[MAX_INHERIT_DEPTH], Mode(2)));
        assert_eq!(sim.mode(chain[MAX_INHERIT_DEPTH + 2]), Some(Mode(2)));
    }

    #[test]
    fn notifications_mirror_the_log() {
        let mut sim = Simulation::new();
        let a = sim.spawn_interactor("a");
        sim.set_mode(a, Mode(1));
        assert_eq!(sim.pending_notifications(), 2);
        assert_eq!(
            sim.poll_notification(),
            Some(InteractionEvent::InteractorSpawned { interactor: a })
        );
        assert!(matches!(
            sim.poll_notification(),
            Some(InteractionEvent::ModeChanged { .. })
        ));
        assert!(sim.poll_notification().is_none());
        assert_eq!(sim.events().len(), 2);
        assert_eq!(sim.drain_events().len(), 2);
        assert!(sim.events().is_empty());
    }

    #[test]
    fn step_advances_tick() {
        let mut sim = Simulation::new();
        sim.step();
        sim.step();
        assert_eq!(sim.tick(), 2);
        assert_eq!(sim.events().last(), Some(&InteractionEvent::Stepped { tick: 2 }));
    }

    #[test]
    fn find_by_name() {
        let mut sim = Simulation::new();
        let a = sim.spawn_interactor("left hand");
        assert_eq!(sim.find_interactor("left hand"), Some(a));
        assert_eq!(sim.find_interactor("right hand"), None);
    }
}
