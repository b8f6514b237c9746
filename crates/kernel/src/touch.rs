use std::collections::BTreeMap;
use tactile_common::{InteractorId, TouchId};

/// Order-independent key for a pair of interactors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(InteractorId, InteractorId);

impl PairKey {
    pub fn new(a: InteractorId, b: InteractorId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    pub fn low(&self) -> InteractorId {
        self.0
    }

    pub fn high(&self) -> InteractorId {
        self.1
    }
}

/// Shared record for one undirected touch between two interactors.
///
/// Whichever side touches first creates it; the other side finds it by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchRecord {
    pub id: TouchId,
    /// The interactor that created the record.
    pub a: InteractorId,
    pub b: InteractorId,
    held_by_a: bool,
    held_by_b: bool,
}

impl TouchRecord {
    pub fn contains(&self, interactor: InteractorId) -> bool {
        self.a == interactor || self.b == interactor
    }

    pub fn other(&self, interactor: InteractorId) -> Option<InteractorId> {
        if self.a == interactor {
            Some(self.b)
        } else if self.b == interactor {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn is_held_by(&self, interactor: InteractorId) -> bool {
        (self.a == interactor && self.held_by_a) || (self.b == interactor && self.held_by_b)
    }

    fn set_held(&mut self, interactor: InteractorId, held: bool) {
        if self.a == interactor {
            self.held_by_a = held;
        } else if self.b == interactor {
            self.held_by_b = held;
        }
    }

    fn is_unheld(&self) -> bool {
        !self.held_by_a && !self.held_by_b
    }
}

/// Arena of touch records keyed by interactor pair.
#[derive(Debug, Default)]
pub struct TouchTable {
    records: BTreeMap<PairKey, TouchRecord>,
    index: BTreeMap<TouchId, PairKey>,
}

impl TouchTable {
    /// Get or insert the record for `(side, other)` and mark `side` as holding it.
    ///
    /// Returns the record id and whether it was created by this call.
    pub fn acquire(
        &mut self,
        side: InteractorId,
        other: InteractorId,
        fresh_id: impl FnOnce() -> TouchId,
    ) -> (TouchId, bool) {
        let key = PairKey::new(side, other);
        let mut created = false;
        let record = self.records.entry(key).or_insert_with(|| {
            created = true;
            TouchRecord {
                id: fresh_id(),
                a: side,
                b: other,
                held_by_a: false,
                held_by_b: false,
            }
        });
        record.set_held(side, true);
        let id = record.id;
        self.index.insert(id, key);
        (id, created)
    }

    /// Drop `side`'s hold on the pair's record. Returns the record once neither
    /// side holds it; the record is then gone from the table.
    pub fn release(&mut self, side: InteractorId, other: InteractorId) -> Option<TouchRecord> {
        let key = PairKey::new(side, other);
        let record = self.records.get_mut(&key)?;
        record.set_held(side, false);
        if !record.is_unheld() {
            return None;
        }
        let record = self.records.remove(&key)?;
        self.index.remove(&record.id);
        Some(record)
    }

    pub fn get(&self, id: TouchId) -> Option<&TouchRecord> {
        self.index.get(&id).and_then(|key| self.records.get(key))
    }

    pub fn between(&self, a: InteractorId, b: InteractorId) -> Option<&TouchRecord> {
        self.records.get(&PairKey::new(a, b))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TouchRecord> {
        self.records.values()
    }
}
