//! Collision-volume aggregation.
//!
//! A collider stands for any number of physical sub-volumes belonging to one
//! interactor. Raw enter/exit signals are reference counted per peer collider
//! and forwarded to the interactor only on a filtered 0↔1 edge per peer
//! interactor.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tactile_common::{ColliderId, InteractorId, Mode, ModeMask};

use crate::error::KernelError;
use crate::subscription::{Subscription, Watcher};
use crate::world::Simulation;

/// Bidirectional mode filter: passes when this side's mode is in `local` and
/// the peer's mode is in `remote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeFilter {
    pub local: ModeMask,
    pub remote: ModeMask,
}

impl ModeFilter {
    pub fn new(local: ModeMask, remote: ModeMask) -> Self {
        Self { local, remote }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProximityPhase {
    Enter,
    Stay,
    Exit,
}

/// One physical proximity report between two sub-volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProximitySignal {
    pub collider: ColliderId,
    pub other: ColliderId,
    pub phase: ProximityPhase,
}

#[derive(Debug)]
struct ContactEntry {
    peer: InteractorId,
    volumes: u32,
    valid: bool,
    _watch: Subscription,
}

#[derive(Debug)]
pub struct ColliderRecord {
    pub id: ColliderId,
    pub interactor: InteractorId,
    pub filters: Vec<ModeFilter>,
    contacts: BTreeMap<ColliderId, ContactEntry>,
}

impl ColliderRecord {
    /// Overlapping sub-volume count against `other`.
    pub fn volumes(&self, other: ColliderId) -> u32 {
        self.contacts.get(&other).map_or(0, |c| c.volumes)
    }

    /// Whether the last filter evaluation against `other` passed.
    pub fn is_valid(&self, other: ColliderId) -> bool {
        self.contacts.get(&other).is_some_and(|c| c.valid)
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    fn touches_peer_besides(&self, peer: InteractorId, except: ColliderId) -> bool {
        self.contacts
            .iter()
            .any(|(id, c)| *id != except && c.peer == peer && c.valid)
    }

    fn passes(&self, local: Mode, remote: Mode) -> bool {
        self.filters.is_empty()
            || self
                .filters
                .iter()
                .any(|f| f.local.contains(local) && f.remote.contains(remote))
    }
}

impl Simulation {
    /// Attach a collider to `interactor`. An empty filter list lets every
    /// contact through.
    pub fn spawn_collider(
        &mut self,
        interactor: InteractorId,
        filters: Vec<ModeFilter>,
    ) -> Result<ColliderId, KernelError> {
        let id = ColliderId(self.next_raw());
        let Some(owner) = self.interactors.get_mut(&interactor) else {
            return Err(KernelError::UnknownInteractor(interactor));
        };
        owner.colliders.push(id);
        self.colliders.insert(
            id,
            ColliderRecord {
                id,
                interactor,
                filters,
                contacts: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    pub fn collider(&self, id: ColliderId) -> Option<&ColliderRecord> {
        self.colliders.get(&id)
    }

    /// Route a physical proximity report. `Stay` carries no state change.
    pub fn apply_proximity(&mut self, signal: ProximitySignal) -> bool {
        match signal.phase {
            ProximityPhase::Enter => self.proximity_enter(signal.collider, signal.other),
            ProximityPhase::Exit => self.proximity_exit(signal.collider, signal.other),
            ProximityPhase::Stay => false,
        }
    }

    /// Deliver a sub-volume contact to both colliders.
    pub fn contact_begin(&mut self, a: ColliderId, b: ColliderId) {
        self.proximity_enter(a, b);
        self.proximity_enter(b, a);
    }

    pub fn contact_end(&mut self, a: ColliderId, b: ColliderId) {
        self.proximity_exit(a, b);
        self.proximity_exit(b, a);
    }

    /// One sub-volume of `other` started overlapping `collider`. Returns true
    /// when this produced a logical touch start on the owning interactor.
    pub fn proximity_enter(&mut self, collider: ColliderId, other: ColliderId) -> bool {
        let Some(peer) = self.colliders.get(&other).map(|c| c.interactor) else {
            tracing::warn!(%collider, %other, "contact with unknown collider");
            return false;
        };
        let valid = self.check_filter(collider, other);
        let Some(record) = self.colliders.get_mut(&collider) else {
            tracing::warn!(%collider, "contact on unknown collider");
            return false;
        };
        if record.interactor == peer {
            return false;
        }
        if let Some(entry) = record.contacts.get_mut(&other) {
            entry.volumes += 1;
            return false;
        }
        let touched = record.touches_peer_besides(peer, other);
        let watch = self
            .subscriptions
            .subscribe(peer, Watcher::ColliderFilter(collider));
        record.contacts.insert(
            other,
            ContactEntry {
                peer,
                volumes: 1,
                valid,
                _watch: watch,
            },
        );
        let owner = record.interactor;
        if valid && !touched {
            return self.started_touching(owner, peer);
        }
        false
    }

    /// One sub-volume of `other` stopped overlapping `collider`. Returns true
    /// when this produced a logical touch stop on the owning interactor.
    pub fn proximity_exit(&mut self, collider: ColliderId, other: ColliderId) -> bool {
        let Some(record) = self.colliders.get_mut(&collider) else {
            tracing::warn!(%collider, "exit on unknown collider");
            return false;
        };
        let Some(entry) = record.contacts.get_mut(&other) else {
            tracing::warn!(%collider, %other, "exit without matching enter");
            return false;
        };
        entry.volumes -= 1;
        if entry.volumes > 0 {
            return false;
        }
        let (peer, valid) = (entry.peer, entry.valid);
        record.contacts.remove(&other);
        let touched_by_other = record.touches_peer_besides(peer, other);
        let owner = record.interactor;
        if valid && !touched_by_other {
            return self.stopped_touching(owner, peer);
        }
        false
    }

    /// Remove a collider. Touches it forwarded are stopped on both sides.
    pub fn despawn_collider(&mut self, id: ColliderId) -> bool {
        let Some(record) = self.colliders.get(&id) else {
            return false;
        };
        let owner = record.interactor;
        let own: Vec<ColliderId> = record.contacts.keys().copied().collect();
        // Peers see every sub-volume leave at once.
        let peers: Vec<ColliderId> = self
            .colliders
            .iter()
            .filter(|(_, c)| c.contacts.contains_key(&id))
            .map(|(cid, _)| *cid)
            .collect();
        for peer in peers {
            self.drop_contact(peer, id);
        }
        for other in own {
            self.drop_contact(id, other);
        }
        self.colliders.remove(&id);
        if let Some(it) = self.interactors.get_mut(&owner) {
            it.colliders.retain(|c| *c != id);
        }
        true
    }

    fn drop_contact(&mut self, collider: ColliderId, other: ColliderId) {
        if let Some(entry) = self
            .colliders
            .get_mut(&collider)
            .and_then(|c| c.contacts.get_mut(&other))
        {
            entry.volumes = 1;
        }
        self.proximity_exit(collider, other);
    }

    /// Both colliders' filters must pass for the pair's current modes.
    pub(crate) fn check_filter(&self, collider: ColliderId, other: ColliderId) -> bool {
        let (Some(me), Some(them)) = (self.colliders.get(&collider), self.colliders.get(&other))
        else {
            return false;
        };
        let (Some(my_mode), Some(their_mode)) = (self.mode(me.interactor), self.mode(them.interactor))
        else {
            return false;
        };
        me.passes(my_mode, their_mode) && them.passes(their_mode, my_mode)
    }

    /// The owning interactor changed mode: re-evaluate every contact and
    /// forward the per-peer edges.
    pub(crate) fn refilter_own(&mut self, collider: ColliderId) {
        let Some(record) = self.colliders.get(&collider) else {
            return;
        };
        let owner = record.interactor;
        let keys: Vec<ColliderId> = record.contacts.keys().copied().collect();
        let mut old = BTreeSet::new();
        let mut new = BTreeSet::new();
        for other in keys {
            let valid = self.check_filter(collider, other);
            let Some(entry) = self
                .colliders
                .get_mut(&collider)
                .and_then(|c| c.contacts.get_mut(&other))
            else {
                continue;
            };
            if entry.valid {
                old.insert(entry.peer);
            }
            if valid {
                new.insert(entry.peer);
            }
            entry.valid = valid;
        }
        for peer in new.difference(&old) {
            self.started_touching(owner, *peer);
        }
        for peer in old.difference(&new) {
            self.stopped_touching(owner, *peer);
        }
    }

    /// `peer` changed mode: re-evaluate contacts against it only.
    pub(crate) fn refilter_peer(&mut self, collider: ColliderId, peer: InteractorId) {
        let Some(record) = self.colliders.get(&collider) else {
            return;
        };
        let owner = record.interactor;
        let keys: Vec<ColliderId> = record
            .contacts
            .iter()
            .filter(|(_, c)| c.peer == peer)
            .map(|(id, _)| *id)
            .collect();
        let mut was = false;
        let mut now = false;
        for other in keys {
            let valid = self.check_filter(collider, other);
            if let Some(entry) = self
                .colliders
                .get_mut(&collider)
                .and_then(|c| c.contacts.get_mut(&other))
            {
                was |= entry.valid;
                now |= valid;
                entry.valid = valid;
            }
        }
        if now && !was {
            self.started_touching(owner, peer);
        } else if was && !now {
            self.stopped_touching(owner, peer);
        }
    }
}
