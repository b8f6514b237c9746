use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tactile_common::{
    ColliderId, HandlerId, InstanceId, InteractionType, InteractorId, Mode, ModeMask, TouchId,
    Transform,
};

use crate::subscription::Subscription;

/// Which handler a mapping routes its interaction to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandlerRef {
    /// Resolution still considers the peer's handlers.
    None,
    /// First handler of this kind on the same interactor.
    Kind(String),
    /// A specific handler; must be owned by the same interactor.
    Id(HandlerId),
}

/// Static configuration: interaction type, local/remote mode masks, handler.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMapping {
    pub interaction: InteractionType,
    pub local: ModeMask,
    pub remote: ModeMask,
    pub handler: HandlerRef,
    pub(crate) bound: Option<HandlerId>,
}

impl InteractionMapping {
    pub fn new(interaction: InteractionType, local: ModeMask, remote: ModeMask) -> Self {
        Self {
            interaction,
            local,
            remote,
            handler: HandlerRef::None,
            bound: None,
        }
    }

    pub fn with_handler(mut self, kind: impl Into<String>) -> Self {
        self.handler = HandlerRef::Kind(kind.into());
        self
    }

    pub fn with_handler_id(mut self, id: HandlerId) -> Self {
        self.handler = HandlerRef::Id(id);
        self
    }

    /// The handler this mapping resolved to on its interactor, if any.
    pub fn bound_handler(&self) -> Option<HandlerId> {
        self.bound
    }

    /// Whether this mapping is active for the given pair of modes.
    pub fn admits(&self, local: Mode, remote: Mode) -> bool {
        self.local.contains(local) && self.remote.contains(remote)
    }
}

/// Per-peer touch bookkeeping. Owns the subscription on the peer's mode.
#[derive(Debug)]
pub(crate) struct TouchLink {
    pub count: u32,
    pub touch: TouchId,
    pub _watch: Subscription,
}

/// A participant that can touch, be touched, and host handlers.
#[derive(Debug)]
pub struct Interactor {
    pub id: InteractorId,
    pub name: String,
    pub(crate) mode: Mode,
    pub(crate) touching: BTreeMap<InteractorId, TouchLink>,
    pub(crate) mappings: Vec<InteractionMapping>,
    pub(crate) available: BTreeMap<InteractionType, Vec<InteractorId>>,
    pub(crate) active: BTreeSet<InstanceId>,
    pub(crate) handlers: Vec<(HandlerId, &'static str)>,
    pub(crate) colliders: Vec<ColliderId>,
    pub(crate) inherit_mode_from: Option<InteractorId>,
    pub(crate) inherit_watch: Option<Subscription>,
    pub(crate) parent: Option<InteractorId>,
    pub(crate) transform: Transform,
}

impl Interactor {
    pub(crate) fn new(id: InteractorId, name: String) -> Self {
        Self {
            id,
            name,
            mode: Mode::DEFAULT,
            touching: BTreeMap::new(),
            mappings: Vec::new(),
            available: BTreeMap::new(),
            active: BTreeSet::new(),
            handlers: Vec::new(),
            colliders: Vec::new(),
            inherit_mode_from: None,
            inherit_watch: None,
            parent: None,
            transform: Transform::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Peers with a positive touch count, in id order.
    pub fn touching(&self) -> Vec<InteractorId> {
        self.touching.keys().copied().collect()
    }

    pub fn touch_count(&self, other: InteractorId) -> u32 {
        self.touching.get(&other).map_or(0, |l| l.count)
    }

    pub fn is_touching(&self, other: InteractorId) -> bool {
        self.touching.contains_key(&other)
    }

    pub fn mappings(&self) -> &[InteractionMapping] {
        &self.mappings
    }

    /// Cached result of the last mapping resolution.
    pub fn has_interaction(&self, interaction: InteractionType) -> bool {
        self.available
            .get(&interaction)
            .is_some_and(|peers| !peers.is_empty())
    }

    pub fn interaction_peers(&self, interaction: InteractionType) -> &[InteractorId] {
        self.available
            .get(&interaction)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Union of local mode masks of every mapping for `interaction`.
    pub fn interaction_modes(&self, interaction: InteractionType) -> ModeMask {
        self.mappings
            .iter()
            .filter(|m| m.interaction == interaction)
            .fold(ModeMask::NONE, |mask, m| mask.union(m.local))
    }

    /// Union of local mode masks of mappings bound to handlers of `kind`.
    pub fn interaction_modes_for_kind(&self, kind: &str) -> ModeMask {
        self.mappings
            .iter()
            .filter(|m| {
                m.bound
                    .is_some_and(|h| self.handlers.iter().any(|(id, k)| *id == h && *k == kind))
            })
            .fold(ModeMask::NONE, |mask, m| mask.union(m.local))
    }

    pub fn active_interactions(&self) -> &BTreeSet<InstanceId> {
        &self.active
    }

    pub fn handlers(&self) -> impl Iterator<Item = (HandlerId, &'static str)> + '_ {
        self.handlers.iter().copied()
    }

    pub fn hosts_handler(&self, kind: &str) -> bool {
        self.handlers.iter().any(|(_, k)| *k == kind)
    }

    pub fn colliders(&self) -> &[ColliderId] {
        &self.colliders
    }

    pub fn inherit_mode_from(&self) -> Option<InteractorId> {
        self.inherit_mode_from
    }

    pub fn parent(&self) -> Option<InteractorId> {
        self.parent
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Re-resolve each mapping's handler reference against this interactor's
    /// handler list. Unresolved references leave the mapping unbound.
    pub(crate) fn rebind_mappings(&mut self) {
        let handlers = &self.handlers;
        for mapping in &mut self.mappings {
            mapping.bound = match &mapping.handler {
                HandlerRef::None => None,
                HandlerRef::Kind(kind) => handlers
                    .iter()
                    .find(|(_, k)| *k == kind.as_str())
                    .map(|(id, _)| *id),
                HandlerRef::Id(id) => handlers.iter().find(|(h, _)| h == id).map(|(h, _)| *h),
            };
        }
    }
}
