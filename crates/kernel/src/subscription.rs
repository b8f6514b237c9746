//! Mode-change subscriptions.
//!
//! [`SubscriptionTable::subscribe`] hands back a [`Subscription`] guard.
//! The table only holds a weak token, so the registration lives exactly as
//! long as the record that owns the guard: dropping a touch link, a collider
//! contact or an inheritance link deregisters its watcher on every path.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use tactile_common::{ColliderId, InteractorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Who reacts when the watched interactor changes mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watcher {
    /// A touching peer recomputes its available interactions.
    PeerMappings(InteractorId),
    /// A collider re-evaluates its mode filter against the watched peer.
    ColliderFilter(ColliderId),
    /// A child copies the new mode.
    InheritMode(InteractorId),
}

/// Scoped registration. Not `Clone`: one guard, one registration.
#[must_use = "dropping the guard deregisters the watcher"]
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    _token: Arc<()>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

#[derive(Debug)]
struct Entry {
    topic: InteractorId,
    watcher: Watcher,
    token: Weak<()>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.token.strong_count() > 0
    }
}

#[derive(Debug, Default)]
pub struct SubscriptionTable {
    next: u64,
    entries: BTreeMap<SubscriptionId, Entry>,
}

impl SubscriptionTable {
    pub fn subscribe(&mut self, topic: InteractorId, watcher: Watcher) -> Subscription {
        self.prune();
        self.next += 1;
        let id = SubscriptionId(self.next);
        let token = Arc::new(());
        self.entries.insert(
            id,
            Entry {
                topic,
                watcher,
                token: Arc::downgrade(&token),
            },
        );
        Subscription { id, _token: token }
    }

    /// Whether the guard for `id` is still held.
    pub fn is_live(&self, id: SubscriptionId) -> bool {
        self.entries.get(&id).is_some_and(Entry::is_live)
    }

    /// Snapshot of the live watchers of `topic`, in subscription order.
    pub fn watchers_of(&self, topic: InteractorId) -> Vec<(SubscriptionId, Watcher)> {
        self.entries
            .iter()
            .filter(|(_, e)| e.topic == topic && e.is_live())
            .map(|(id, e)| (*id, e.watcher))
            .collect()
    }

    /// Forget entries whose guard is gone. Returns how many were dropped.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_live());
        before - self.entries.len()
    }

    /// Live registrations.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| e.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_the_guard_deregisters() {
        let mut table = SubscriptionTable::default();
        let topic = InteractorId(1);
        let guard = table.subscribe(topic, Watcher::PeerMappings(InteractorId(2)));
        let id = guard.id();
        assert!(table.is_live(id));
        assert_eq!(table.watchers_of(topic).len(), 1);

        drop(guard);
        assert!(!table.is_live(id));
        assert!(table.watchers_of(topic).is_empty());
        assert!(table.is_empty());
        assert_eq!(table.prune(), 1);
        assert_eq!(table.prune(), 0);
    }

    #[test]
    fn removing_the_owning_record_deregisters() {
        let mut table = SubscriptionTable::default();
        let topic = InteractorId(1);
        let mut links: BTreeMap<InteractorId, Subscription> = BTreeMap::new();
        links.insert(
            InteractorId(2),
            table.subscribe(topic, Watcher::PeerMappings(InteractorId(2))),
        );
        links.insert(
            InteractorId(3),
            table.subscribe(topic, Watcher::PeerMappings(InteractorId(3))),
        );
        links.remove(&InteractorId(2));
        assert_eq!(
            table.watchers_of(topic),
            vec![(links[&InteractorId(3)].id(), Watcher::PeerMappings(InteractorId(3)))]
        );
        links.clear();
        assert!(table.watchers_of(topic).is_empty());
    }

    #[test]
    fn watchers_are_snapshotted_in_order() {
        let mut table = SubscriptionTable::default();
        let topic = InteractorId(1);
        let _a = table.subscribe(topic, Watcher::PeerMappings(InteractorId(2)));
        let _b = table.subscribe(InteractorId(9), Watcher::PeerMappings(InteractorId(2)));
        let _c = table.subscribe(topic, Watcher::ColliderFilter(ColliderId(7)));
        let watchers: Vec<Watcher> = table.watchers_of(topic).into_iter().map(|(_, w)| w).collect();
        assert_eq!(
            watchers,
            vec![
                Watcher::PeerMappings(InteractorId(2)),
                Watcher::ColliderFilter(ColliderId(7))
            ]
        );
    }
}
