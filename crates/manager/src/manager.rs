use std::collections::BTreeMap;

use tactile_common::{ActionIndex, ActionSourceId, InstanceId, InteractorId, Mode, TrackerId};
use tactile_input::{ActionEvent, ActionSignal, SourceState};
use tactile_kernel::world::MAX_INHERIT_DEPTH;
use tactile_kernel::{InteractionEvent, Simulation};

use crate::aggregator::{Aggregator, AggregatorEvent};
use crate::policy::ModePolicy;

/// Notifications handled per pump before the rest are left for the next one.
pub const MAX_PUMP_EVENTS: usize = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ControllerState {
    grabbed: Option<InteractorId>,
    grab_instance: Option<InstanceId>,
}

/// Converts action events into interaction trackers and keeps controller
/// and object modes consistent with touches and grabs.
///
/// Every entry point that mutates the simulation pumps its notification
/// queue before returning; the events seen are kept for
/// [`InteractionManager::drain_observed`].
#[derive(Debug, Clone, Default)]
pub struct InteractionManager {
    policy: ModePolicy,
    controllers: BTreeMap<ActionSourceId, ControllerState>,
    held: BTreeMap<(ActionSourceId, ActionIndex), TrackerId>,
    toggled: BTreeMap<ActionIndex, TrackerId>,
    observed: Vec<InteractionEvent>,
}

impl InteractionManager {
    pub fn new(policy: ModePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> &ModePolicy {
        &self.policy
    }

    /// The object a controller currently holds.
    pub fn grabbed_by(&self, source: ActionSourceId) -> Option<InteractorId> {
        self.controllers.get(&source).and_then(|c| c.grabbed)
    }

    pub fn held_tracker(&self, source: ActionSourceId, action: ActionIndex) -> Option<TrackerId> {
        self.held.get(&(source, action)).copied()
    }

    pub fn toggle_tracker(&self, action: ActionIndex) -> Option<TrackerId> {
        self.toggled.get(&action).copied()
    }

    pub fn live_trackers(&self) -> usize {
        self.held.len() + self.toggled.len()
    }

    /// Events seen by the pump since the last drain.
    pub fn drain_observed(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.observed)
    }

    // ---- sources ----

    /// Apply pending aggregator notifications, then recompute every
    /// controller mode. Returns false when nothing was pending.
    pub fn sync_sources(&mut self, sim: &mut Simulation, agg: &mut Aggregator) -> bool {
        let events = agg.drain_events();
        if events.is_empty() {
            return false;
        }
        for event in events {
            match event {
                AggregatorEvent::Registered(id) => {
                    self.controllers.entry(id).or_default();
                }
                AggregatorEvent::Unregistered(id) => {
                    self.controllers.remove(&id);
                    let stale: Vec<(ActionSourceId, ActionIndex)> = self
                        .held
                        .keys()
                        .filter(|(source, _)| *source == id)
                        .copied()
                        .collect();
                    for key in stale {
                        if let Some(tracker) = self.held.remove(&key) {
                            sim.release_tracker(tracker);
                        }
                    }
                }
                AggregatorEvent::InteractorAdded { source, interactor } => {
                    if let Some(mode) = agg.source(source).map(|s| s.mode()) {
                        sim.set_mode(interactor, mode);
                    }
                }
                AggregatorEvent::StateChanged { .. } | AggregatorEvent::InteractorRemoved { .. } => {}
            }
        }
        self.refresh_controller_modes(sim, agg);
        self.pump(sim, agg);
        true
    }

    /// Forward a lifecycle change to the aggregator and retire whatever
    /// trackers it releases.
    pub fn set_source_state(
        &mut self,
        sim: &mut Simulation,
        agg: &mut Aggregator,
        source: ActionSourceId,
        state: SourceState,
    ) {
        for event in agg.set_source_state(source, state) {
            self.handle_action(sim, agg, event);
        }
        self.sync_sources(sim, agg);
    }

    pub fn press_button(
        &mut self,
        sim: &mut Simulation,
        agg: &mut Aggregator,
        source: ActionSourceId,
        button: u8,
    ) -> Vec<InstanceId> {
        let events = agg
            .source_mut(source)
            .map(|s| s.press(button))
            .unwrap_or_default();
        self.handle_actions(sim, agg, events)
    }

    pub fn release_button(
        &mut self,
        sim: &mut Simulation,
        agg: &mut Aggregator,
        source: ActionSourceId,
        button: u8,
    ) -> Vec<InstanceId> {
        let events = agg
            .source_mut(source)
            .map(|s| s.release(button))
            .unwrap_or_default();
        self.handle_actions(sim, agg, events)
    }

    /// Feed a whole button state word for one source.
    pub fn update_buttons(
        &mut self,
        sim: &mut Simulation,
        agg: &mut Aggregator,
        source: ActionSourceId,
        state: u64,
    ) -> Vec<InstanceId> {
        let events = agg
            .source_mut(source)
            .map(|s| s.update_buttons(state))
            .unwrap_or_default();
        self.handle_actions(sim, agg, events)
    }

    fn handle_actions(
        &mut self,
        sim: &mut Simulation,
        agg: &mut Aggregator,
        events: Vec<ActionEvent>,
    ) -> Vec<InstanceId> {
        events
            .into_iter()
            .flat_map(|event| self.handle_action(sim, agg, event))
            .collect()
    }

    // ---- actions ----

    /// React to one action event. Returns the instances accepted by the
    /// resulting dispatch.
    pub fn handle_action(
        &mut self,
        sim: &mut Simulation,
        agg: &mut Aggregator,
        event: ActionEvent,
    ) -> Vec<InstanceId> {
        let Some(interaction) = self.policy.interaction_for(event.action) else {
            tracing::trace!(action = event.action.0, "action maps to no interaction");
            return Vec::new();
        };
        let _span = tracing::debug_span!("action", source = %event.source, action = event.action.0)
            .entered();
        let locals = agg
            .source(event.source)
            .map(|s| s.local_interactors().to_vec())
            .unwrap_or_default();

        let mut accepted = Vec::new();
        match event.signal {
            ActionSignal::Value(value) => {
                let existing = if event.edge.is_toggle() {
                    self.toggled.get(&event.action).copied()
                } else {
                    self.held.get(&(event.source, event.action)).copied()
                };
                let offered = match existing {
                    Some(tracker) => {
                        sim.set_tracker_value(tracker, value);
                        if value {
                            Some(tracker)
                        } else {
                            self.forget(&event);
                            sim.release_tracker(tracker);
                            None
                        }
                    }
                    None if value => {
                        let tracker = sim.create_bool_tracker(interaction, true);
                        if event.edge.is_toggle() {
                            self.toggled.insert(event.action, tracker);
                        } else {
                            self.held.insert((event.source, event.action), tracker);
                        }
                        tracing::debug!(%tracker, ?interaction, "interaction requested");
                        Some(tracker)
                    }
                    None => None,
                };
                if let Some(tracker) = offered {
                    for local in &locals {
                        accepted.extend(sim.dispatch_all(tracker, *local));
                    }
                }
            }
            ActionSignal::Fired => {
                let tracker = sim.create_one_shot_tracker(interaction);
                for local in &locals {
                    accepted.extend(sim.dispatch_all(tracker, *local));
                }
                sim.fire_tracker(tracker);
            }
            ActionSignal::Released => {
                if let Some(tracker) = self.forget(&event) {
                    sim.release_tracker(tracker);
                }
            }
        }
        self.pump(sim, agg);
        accepted
    }

    fn forget(&mut self, event: &ActionEvent) -> Option<TrackerId> {
        if event.edge.is_toggle() {
            self.toggled.remove(&event.action)
        } else {
            self.held.remove(&(event.source, event.action))
        }
    }

    // ---- notifications ----

    /// Drain the simulation's notification queue, reacting to touches and
    /// grabs. Returns how many events were handled.
    pub fn pump(&mut self, sim: &mut Simulation, agg: &mut Aggregator) -> usize {
        let mut handled = 0;
        while handled < MAX_PUMP_EVENTS {
            let Some(event) = sim.poll_notification() else {
                return handled;
            };
            self.react(sim, agg, &event);
            self.observed.push(event);
            handled += 1;
        }
        tracing::warn!(
            handled,
            pending = sim.pending_notifications(),
            "notification pump cap reached"
        );
        handled
    }

    fn react(&mut self, sim: &mut Simulation, agg: &mut Aggregator, event: &InteractionEvent) {
        match *event {
            // Either side may start or stop alone, e.g. when a collider
            // refilters on one side's mode change.
            InteractionEvent::TouchStarted {
                interactor, other, ..
            }
            | InteractionEvent::TouchStopped {
                interactor, other, ..
            } => self.touch_changed(sim, agg, interactor, other),
            InteractionEvent::InteractionStarted {
                interactor,
                other,
                instance,
                interaction,
                ..
            } => {
                let Some(source) = agg.source_of(interactor) else {
                    return;
                };
                if interaction == self.policy.grab_interaction {
                    if let Some(state) = self.controllers.get_mut(&source) {
                        state.grabbed = Some(other);
                        state.grab_instance = Some(instance);
                    }
                    tracing::debug!(%source, object = %other, "grab started");
                    self.set_object_mode(sim, agg, other, 0);
                }
                self.refresh_controller_modes(sim, agg);
            }
            InteractionEvent::InteractionStopped {
                interactor,
                other,
                instance,
                ..
            } => {
                let mut released = None;
                for state in self.controllers.values_mut() {
                    if state.grab_instance == Some(instance) {
                        tracing::debug!(object = ?state.grabbed, "grab stopped");
                        released = state.grabbed;
                        *state = ControllerState::default();
                    }
                }
                if released.is_none() && !agg.is_local(interactor) {
                    return;
                }
                self.set_object_mode(sim, agg, released.unwrap_or(other), 0);
                self.refresh_controller_modes(sim, agg);
            }
            InteractionEvent::InteractorDespawned { interactor } => {
                for source in agg.source_ids() {
                    agg.remove_local_interactor(source, interactor);
                }
                for state in self.controllers.values_mut() {
                    if state.grabbed == Some(interactor) {
                        *state = ControllerState::default();
                    }
                }
                self.refresh_controller_modes(sim, agg);
            }
            _ => {}
        }
    }

    /// Objects first, so controllers see the objects' new modes.
    fn touch_changed(
        &self,
        sim: &mut Simulation,
        agg: &mut Aggregator,
        a: InteractorId,
        b: InteractorId,
    ) {
        if !agg.is_local(a) && !agg.is_local(b) {
            return;
        }
        self.set_object_mode(sim, agg, a, 0);
        self.set_object_mode(sim, agg, b, 0);
        let sources: Vec<ActionSourceId> = [a, b]
            .into_iter()
            .filter_map(|side| agg.source_of(side))
            .collect();
        for source in sources {
            self.set_controller_mode(sim, agg, source);
        }
    }

    // ---- modes ----

    /// Whether `object` takes part in a grab whose counterpart belongs to a
    /// controller.
    pub fn is_grabbed(&self, sim: &Simulation, agg: &Aggregator, object: InteractorId) -> bool {
        let Some(it) = sim.interactor(object) else {
            return false;
        };
        it.active_interactions()
            .iter()
            .filter_map(|id| sim.instance(*id))
            .any(|instance| {
                instance.interaction == self.policy.grab_interaction
                    && instance
                        .counterpart(object)
                        .is_some_and(|c| agg.is_local(c))
            })
    }

    fn is_touched_by_controller(
        &self,
        sim: &Simulation,
        agg: &Aggregator,
        object: InteractorId,
    ) -> bool {
        sim.touching(object).iter().any(|peer| agg.is_local(*peer))
            || agg
                .sources()
                .flat_map(|s| s.local_interactors())
                .any(|local| sim.interactor(*local).is_some_and(|it| it.is_touching(object)))
    }

    /// The mode the policy assigns to a non-controller interactor.
    pub fn object_mode(&self, sim: &Simulation, agg: &Aggregator, object: InteractorId) -> Mode {
        let policy = &self.policy;
        if self.is_grabbed(sim, agg, object) {
            return policy.grabbed_mode;
        }
        if let Some(secondary) = policy.secondary_mode {
            let parent = sim.interactor(object).and_then(|it| it.parent());
            if parent.is_some_and(|p| self.is_grabbed(sim, agg, p)) {
                return secondary;
            }
        }
        if self.is_touched_by_controller(sim, agg, object) {
            return policy.touching_mode;
        }
        Mode::DEFAULT
    }

    /// The mode the policy assigns to a controller: busy while grabbing,
    /// can-grab while touching something grabbable, otherwise the default.
    pub fn controller_mode(
        &self,
        sim: &Simulation,
        agg: &Aggregator,
        source: ActionSourceId,
    ) -> Mode {
        let policy = &self.policy;
        if self.grabbed_by(source).is_some() {
            return policy.busy_mode;
        }
        let Some(src) = agg.source(source) else {
            return Mode::DEFAULT;
        };
        for local in src.local_interactors() {
            let Some(hand) = sim.interactor(*local) else {
                continue;
            };
            for peer in hand.touching() {
                let Some(mode) = sim.mode(peer) else {
                    continue;
                };
                if self.is_grabbed(sim, agg, peer)
                    || policy.secondary_mode == Some(mode)
                    || sim.has_interaction(peer, policy.grab_interaction)
                    || hand.interaction_peers(policy.grab_interaction).contains(&peer)
                {
                    return policy.can_grab_mode;
                }
            }
        }
        Mode::DEFAULT
    }

    fn set_object_mode(
        &self,
        sim: &mut Simulation,
        agg: &Aggregator,
        object: InteractorId,
        depth: usize,
    ) -> bool {
        if depth > MAX_INHERIT_DEPTH || agg.is_local(object) || sim.interactor(object).is_none() {
            return false;
        }
        let mode = self.object_mode(sim, agg, object);
        if !sim.set_mode(object, mode) {
            return false;
        }
        let children: Vec<InteractorId> = sim
            .interactors()
            .filter(|it| it.parent() == Some(object))
            .map(|it| it.id)
            .collect();
        for child in children {
            self.set_object_mode(sim, agg, child, depth + 1);
        }
        true
    }

    fn set_controller_mode(
        &self,
        sim: &mut Simulation,
        agg: &mut Aggregator,
        source: ActionSourceId,
    ) -> bool {
        let mode = self.controller_mode(sim, agg, source);
        agg.source_mut(source)
            .is_some_and(|s| s.set_mode(sim, mode))
    }

    /// Recompute every controller's mode.
    pub fn refresh_controller_modes(&self, sim: &mut Simulation, agg: &mut Aggregator) {
        for source in agg.source_ids() {
            self.set_controller_mode(sim, agg, source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactile_common::{InteractionType, ModeMask, Registry};
    use tactile_input::{ActionEdge, ButtonMapping};
    use tactile_kernel::{GrabHandler, HandlerEffect, InteractionMapping, ModeFilter};

    const GRAB_BUTTON: u8 = 0;
    const TOGGLE_BUTTON: u8 = 1;
    const FIRE_BUTTON: u8 = 2;

    struct Rig {
        sim: Simulation,
        agg: Aggregator,
        manager: InteractionManager,
        left: ActionSourceId,
        hand: InteractorId,
        cube: InteractorId,
        modes: [Mode; 5],
    }

    fn rig(secondary: bool) -> Rig {
        let registry = Registry::with_extensions(
            &["Touching", "Busy", "CanGrab", "Grabbed", "Secondary"],
            &["Grab", "GrabToggle", "Poke"],
            &[],
        )
        .unwrap();
        let mode = |name: &str| registry.mode(name).unwrap();
        let modes = [
            mode("Touching"),
            mode("Busy"),
            mode("CanGrab"),
            mode("Grabbed"),
            mode("Secondary"),
        ];
        let grab = registry.action("Grab").unwrap();
        let toggle = registry.action("GrabToggle").unwrap();
        let poke = registry.action("Poke").unwrap();

        let mut sim = Simulation::new();
        let hand = sim.spawn_interactor("hand");
        let cube = sim.spawn_interactor("cube");
        sim.add_handler(hand, GrabHandler::new()).unwrap();
        let both = InteractionMapping::new(InteractionType::GRAB, ModeMask::ALL, ModeMask::ALL);
        sim.add_mapping(hand, both.clone().with_handler(GrabHandler::KIND))
            .unwrap();
        sim.add_mapping(cube, both).unwrap();

        let mut agg = Aggregator::new(registry);
        let left = agg.register_source(
            "left",
            vec![
                ButtonMapping::new(ModeMask::ALL, GRAB_BUTTON, grab, ActionEdge::Momentary).unwrap(),
                ButtonMapping::new(ModeMask::ALL, TOGGLE_BUTTON, toggle, ActionEdge::ToggleLeading)
                    .unwrap(),
                ButtonMapping::new(ModeMask::ALL, FIRE_BUTTON, poke, ActionEdge::OneshotLeading)
                    .unwrap(),
            ],
        );
        agg.add_local_interactor(left, hand);

        let policy = ModePolicy {
            touching_mode: modes[0],
            busy_mode: modes[1],
            can_grab_mode: modes[2],
            grabbed_mode: modes[3],
            secondary_mode: secondary.then_some(modes[4]),
            ..ModePolicy::default()
        }
        .with_action(grab, InteractionType::GRAB)
        .with_action(toggle, InteractionType::GRAB)
        .with_action(poke, InteractionType::GRAB);
        let mut manager = InteractionManager::new(policy);
        manager.sync_sources(&mut sim, &mut agg);

        Rig {
            sim,
            agg,
            manager,
            left,
            hand,
            cube,
            modes,
        }
    }

    impl Rig {
        fn touch(&mut self) {
            self.sim.started_touching(self.hand, self.cube);
            self.sim.started_touching(self.cube, self.hand);
            self.manager.pump(&mut self.sim, &mut self.agg);
        }

        fn untouch(&mut self) {
            self.sim.stopped_touching(self.hand, self.cube);
            self.sim.stopped_touching(self.cube, self.hand);
            self.manager.pump(&mut self.sim, &mut self.agg);
        }

        fn press(&mut self, button: u8) -> Vec<InstanceId> {
            self.manager
                .press_button(&mut self.sim, &mut self.agg, self.left, button)
        }

        fn release(&mut self, button: u8) -> Vec<InstanceId> {
            self.manager
                .release_button(&mut self.sim, &mut self.agg, self.left, button)
        }

        fn hand_mode(&self) -> Mode {
            self.sim.mode(self.hand).unwrap()
        }

        fn cube_mode(&self) -> Mode {
            self.sim.mode(self.cube).unwrap()
        }
    }

    #[test]
    fn touch_sets_object_and_controller_modes() {
        let mut r = rig(false);
        let [touching, _, can_grab, _, _] = r.modes;
        assert_eq!(r.hand_mode(), Mode::DEFAULT);

        r.touch();
        assert_eq!(r.cube_mode(), touching);
        assert_eq!(r.hand_mode(), can_grab);
        assert_eq!(r.agg.source(r.left).unwrap().mode(), can_grab);

        r.untouch();
        assert_eq!(r.cube_mode(), Mode::DEFAULT);
        assert_eq!(r.hand_mode(), Mode::DEFAULT);
    }

    #[test]
    fn momentary_grab_round_trip() {
        let mut r = rig(false);
        let [touching, busy, can_grab, grabbed, _] = r.modes;
        r.touch();

        let accepted = r.press(GRAB_BUTTON);
        assert_eq!(accepted.len(), 1);
        let instance = accepted[0];
        assert!(r.sim.interactor(r.hand).unwrap().active_interactions().contains(&instance));
        assert!(r.sim.interactor(r.cube).unwrap().active_interactions().contains(&instance));
        assert_eq!(r.manager.grabbed_by(r.left), Some(r.cube));
        assert!(r.manager.is_grabbed(&r.sim, &r.agg, r.cube));
        assert_eq!(r.cube_mode(), grabbed);
        assert_eq!(r.hand_mode(), busy);
        assert_eq!(r.manager.live_trackers(), 1);

        assert!(r.release(GRAB_BUTTON).is_empty());
        assert!(r.sim.interactor(r.hand).unwrap().active_interactions().is_empty());
        assert!(r.sim.interactor(r.cube).unwrap().active_interactions().is_empty());
        assert_eq!(r.manager.grabbed_by(r.left), None);
        assert_eq!(r.manager.live_trackers(), 0);
        assert_eq!(r.cube_mode(), touching);
        assert_eq!(r.hand_mode(), can_grab);

        r.untouch();
        assert_eq!(r.hand_mode(), Mode::DEFAULT);
        assert_eq!(r.cube_mode(), Mode::DEFAULT);
    }

    #[test]
    fn grab_effects_reach_the_log() {
        let mut r = rig(false);
        r.touch();
        r.press(GRAB_BUTTON);
        r.release(GRAB_BUTTON);
        let observed = r.manager.drain_observed();
        let effects: Vec<&HandlerEffect> = observed
            .iter()
            .filter_map(|e| match e {
                InteractionEvent::Effect { effect, .. } => Some(effect),
                _ => None,
            })
            .collect();
        assert!(matches!(effects.first(), Some(HandlerEffect::Attached { .. })));
        assert!(matches!(effects.last(), Some(HandlerEffect::Detached { .. })));
    }

    #[test]
    fn press_without_touch_requests_nothing_lasting() {
        let mut r = rig(false);
        assert!(r.press(GRAB_BUTTON).is_empty());
        let grab = r.agg.registry().action("Grab").unwrap();
        assert!(r.manager.held_tracker(r.left, grab).is_some());
        r.release(GRAB_BUTTON);
        assert_eq!(r.manager.live_trackers(), 0);
        assert_eq!(r.hand_mode(), Mode::DEFAULT);
    }

    #[test]
    fn toggles_hold_one_global_tracker() {
        let mut r = rig(false);
        let toggle = r.agg.registry().action("GrabToggle").unwrap();
        r.touch();

        assert_eq!(r.press(TOGGLE_BUTTON).len(), 1);
        r.release(TOGGLE_BUTTON);
        assert!(r.manager.toggle_tracker(toggle).is_some());
        assert_eq!(r.manager.grabbed_by(r.left), Some(r.cube));

        r.press(TOGGLE_BUTTON);
        assert!(r.manager.toggle_tracker(toggle).is_none());
        assert_eq!(r.manager.grabbed_by(r.left), None);
    }

    #[test]
    fn one_shot_starts_and_ends_in_one_call() {
        let mut r = rig(false);
        r.touch();
        r.manager.drain_observed();

        let accepted = r.press(FIRE_BUTTON);
        assert_eq!(accepted.len(), 1);
        assert!(r.sim.instance(accepted[0]).is_none());
        assert_eq!(r.manager.live_trackers(), 0);
        assert_eq!(r.manager.grabbed_by(r.left), None);

        let observed = r.manager.drain_observed();
        assert!(observed.iter().any(|e| matches!(e, InteractionEvent::TrackerFired { .. })));
        assert!(observed
            .iter()
            .any(|e| matches!(e, InteractionEvent::InteractionStopped { .. })));
    }

    #[test]
    fn children_of_grabbed_objects_take_the_secondary_mode() {
        let mut r = rig(true);
        let secondary = r.modes[4];
        let handle = r.sim.spawn_interactor("handle");
        r.sim.set_parent(handle, Some(r.cube)).unwrap();
        r.touch();

        r.press(GRAB_BUTTON);
        assert_eq!(r.sim.mode(handle), Some(secondary));
        r.release(GRAB_BUTTON);
        assert_eq!(r.sim.mode(handle), Some(Mode::DEFAULT));
    }

    #[test]
    fn without_secondary_mode_children_are_untouched() {
        let mut r = rig(false);
        let handle = r.sim.spawn_interactor("handle");
        r.sim.set_parent(handle, Some(r.cube)).unwrap();
        r.touch();
        r.press(GRAB_BUTTON);
        assert_eq!(r.sim.mode(handle), Some(Mode::DEFAULT));
    }

    #[test]
    fn destroying_a_source_releases_its_grab() {
        let mut r = rig(false);
        r.touch();
        r.press(GRAB_BUTTON);
        assert_eq!(r.sim.instances().count(), 1);

        r.manager
            .set_source_state(&mut r.sim, &mut r.agg, r.left, SourceState::Destroyed);
        assert_eq!(r.sim.instances().count(), 0);
        assert_eq!(r.manager.live_trackers(), 0);
        assert!(r.agg.source(r.left).is_none());
        assert_eq!(r.cube_mode(), Mode::DEFAULT, "hand is no longer a controller");
    }

    #[test]
    fn unmapped_actions_are_ignored() {
        let mut r = rig(false);
        let event = ActionEvent {
            source: r.left,
            action: ActionIndex(0),
            edge: ActionEdge::Momentary,
            signal: ActionSignal::Value(true),
        };
        assert!(r.manager.handle_action(&mut r.sim, &mut r.agg, event).is_empty());
        assert_eq!(r.manager.live_trackers(), 0);
    }

    #[test]
    fn late_local_interactor_adopts_source_mode() {
        let mut r = rig(false);
        r.touch();
        let finger = r.sim.spawn_interactor("finger");
        r.agg.add_local_interactor(r.left, finger);
        r.manager.sync_sources(&mut r.sim, &mut r.agg);
        assert_eq!(r.sim.mode(finger), Some(r.modes[2]));
    }

    #[test]
    fn despawned_object_clears_the_grab() {
        let mut r = rig(false);
        r.touch();
        r.press(GRAB_BUTTON);
        r.sim.despawn_interactor(r.cube);
        r.manager.pump(&mut r.sim, &mut r.agg);
        assert_eq!(r.manager.grabbed_by(r.left), None);
        assert_eq!(r.hand_mode(), Mode::DEFAULT);
        r.release(GRAB_BUTTON);
        assert_eq!(r.manager.live_trackers(), 0);
    }

    #[test]
    fn one_sided_stop_recomputes_the_controller() {
        let mut r = rig(false);
        let [touching, _, can_grab, _, _] = r.modes;
        r.touch();
        assert_eq!(r.hand_mode(), can_grab);

        r.sim.stopped_touching(r.hand, r.cube);
        r.manager.pump(&mut r.sim, &mut r.agg);
        assert!(r.sim.touching(r.hand).is_empty());
        assert_eq!(r.hand_mode(), Mode::DEFAULT);
        assert_eq!(r.cube_mode(), touching, "the cube still holds its side");

        r.sim.stopped_touching(r.cube, r.hand);
        r.manager.pump(&mut r.sim, &mut r.agg);
        assert_eq!(r.cube_mode(), Mode::DEFAULT);
    }

    #[test]
    fn one_sided_start_from_the_object_sets_its_mode() {
        let mut r = rig(false);
        let [touching, _, _, _, _] = r.modes;
        r.sim.started_touching(r.cube, r.hand);
        r.manager.pump(&mut r.sim, &mut r.agg);
        assert_eq!(r.cube_mode(), touching);
        assert_eq!(r.hand_mode(), Mode::DEFAULT, "the hand touches nothing");
    }

    #[test]
    fn busy_filter_drops_and_restores_the_collider_touch() {
        let mut r = rig(false);
        let [touching, busy, can_grab, grabbed, _] = r.modes;
        let palm = r
            .sim
            .spawn_collider(
                r.hand,
                vec![ModeFilter::new(ModeMask::ALL.without(busy), ModeMask::ALL)],
            )
            .unwrap();
        let body = r.sim.spawn_collider(r.cube, Vec::new()).unwrap();
        r.sim.contact_begin(palm, body);
        r.manager.pump(&mut r.sim, &mut r.agg);
        assert_eq!(r.hand_mode(), can_grab);
        assert_eq!(r.cube_mode(), touching);

        assert_eq!(r.press(GRAB_BUTTON).len(), 1);
        assert_eq!(r.hand_mode(), busy);
        assert!(r.sim.touching(r.hand).is_empty());
        assert!(r.sim.touching(r.cube).is_empty());
        assert_eq!(r.sim.collider(palm).unwrap().volumes(body), 1);
        assert_eq!(r.manager.grabbed_by(r.left), Some(r.cube));
        assert_eq!(r.cube_mode(), grabbed);

        r.release(GRAB_BUTTON);
        assert_eq!(r.sim.touching(r.hand), vec![r.cube]);
        assert_eq!(r.hand_mode(), can_grab);
        assert_eq!(r.cube_mode(), touching);

        r.sim.contact_end(palm, body);
        r.manager.pump(&mut r.sim, &mut r.agg);
        assert_eq!(r.hand_mode(), Mode::DEFAULT);
        assert_eq!(r.cube_mode(), Mode::DEFAULT);
    }

    #[test]
    fn grabbed_mode_stops_at_the_inherit_depth_cap() {
        let mut r = rig(false);
        let [_, _, _, grabbed, _] = r.modes;
        let mut links = Vec::new();
        let mut parent = r.cube;
        for i in 0..MAX_INHERIT_DEPTH + 2 {
            let link = r.sim.spawn_interactor(format!("link{i}"));
            r.sim.set_inherit_mode_from(link, Some(parent)).unwrap();
            links.push(link);
            parent = link;
        }
        r.manager.pump(&mut r.sim, &mut r.agg);

        r.touch();
        r.press(GRAB_BUTTON);
        assert_eq!(r.cube_mode(), grabbed);
        assert_eq!(r.sim.mode(links[MAX_INHERIT_DEPTH - 1]), Some(grabbed));
        assert_eq!(r.sim.mode(links[MAX_INHERIT_DEPTH]), Some(Mode::DEFAULT));
        assert_eq!(r.sim.mode(links[MAX_INHERIT_DEPTH + 1]), Some(Mode::DEFAULT));
        assert_eq!(r.sim.pending_notifications(), 0);
    }
}
