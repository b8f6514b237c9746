//! Name tables for modes, actions and interaction types.
//!
//! Each table has a fixed portion of built-in names and a free portion that
//! configuration can extend. Lookups by name happen only while a scene is
//! being loaded; the simulation itself sees only indices.

use crate::mode::{Mode, ModeMask, SLOT_COUNT};
use crate::types::{ActionIndex, InteractionType};

/// Errors from registry construction and name resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{table} table is full ({capacity} slots)")]
    TableFull {
        table: &'static str,
        capacity: usize,
    },
    #[error("unknown {table} name: {name:?}")]
    UnknownName { table: &'static str, name: String },
    #[error("{table} names must not be empty")]
    EmptyName { table: &'static str },
}

/// A fixed-capacity list of names with a reserved built-in prefix.
#[derive(Debug, Clone)]
pub struct NameTable {
    label: &'static str,
    slots: Vec<Option<String>>,
    fixed: usize,
}

impl NameTable {
    /// Build a table of `capacity` slots whose first `fixed` slots are reserved
    /// for built-ins. `defaults` fill the reserved slots from index 0.
    pub fn new(label: &'static str, capacity: usize, fixed: usize, defaults: &[&str]) -> Self {
        let mut slots = vec![None; capacity];
        for (slot, name) in slots.iter_mut().zip(defaults) {
            *slot = Some((*name).to_string());
        }
        Self {
            label,
            slots,
            fixed: fixed.min(capacity),
        }
    }

    /// Add a custom name, returning its index. Defining an existing name
    /// returns the existing index.
    pub fn define(&mut self, name: &str) -> Result<u8, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName { table: self.label });
        }
        if let Some(index) = self.index_of(name) {
            return Ok(index);
        }
        let free = self
            .slots
            .iter()
            .enumerate()
            .skip(self.fixed)
            .find(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
            .ok_or(RegistryError::TableFull {
                table: self.label,
                capacity: self.slots.len(),
            })?;
        self.slots[free] = Some(name.to_string());
        Ok(free as u8)
    }

    pub fn index_of(&self, name: &str) -> Option<u8> {
        self.slots
            .iter()
            .position(|slot| slot.as_deref() == Some(name))
            .map(|i| i as u8)
    }

    pub fn resolve(&self, name: &str) -> Result<u8, RegistryError> {
        self.index_of(name).ok_or_else(|| RegistryError::UnknownName {
            table: self.label,
            name: name.to_string(),
        })
    }

    pub fn name(&self, index: u8) -> Option<&str> {
        self.slots.get(usize::from(index))?.as_deref()
    }

    /// Whether `index` lies in the built-in portion of the table.
    pub fn is_fixed(&self, index: u8) -> bool {
        usize::from(index) < self.fixed
    }

    /// Populated slots as `(index, name)` pairs, in index order.
    pub fn entries(&self) -> impl Iterator<Item = (u8, &str)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_deref().map(|s| (i as u8, s)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registry context passed to every component that resolves names.
///
/// Built once at startup; several independent registries may coexist, one per
/// simulation.
#[derive(Debug, Clone)]
pub struct Registry {
    pub modes: NameTable,
    pub actions: NameTable,
    pub interaction_types: NameTable,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            modes: NameTable::new("mode", SLOT_COUNT, 1, &["Normal"]),
            actions: NameTable::new("action", SLOT_COUNT, 1, &["Touch"]),
            interaction_types: NameTable::new(
                "interaction type",
                SLOT_COUNT,
                8,
                &["Touch", "Use", "Grab"],
            ),
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with custom names appended to the built-ins.
    pub fn with_extensions<S: AsRef<str>>(
        modes: &[S],
        actions: &[S],
        interaction_types: &[S],
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for name in modes {
            registry.modes.define(name.as_ref())?;
        }
        for name in actions {
            registry.actions.define(name.as_ref())?;
        }
        for name in interaction_types {
            registry.interaction_types.define(name.as_ref())?;
        }
        Ok(registry)
    }

    pub fn mode(&self, name: &str) -> Result<Mode, RegistryError> {
        self.modes.resolve(name).map(Mode)
    }

    pub fn mode_mask<S: AsRef<str>>(&self, names: &[S]) -> Result<ModeMask, RegistryError> {
        names.iter().try_fold(ModeMask::NONE, |mask, name| {
            Ok(mask.with(self.mode(name.as_ref())?))
        })
    }

    pub fn action(&self, name: &str) -> Result<ActionIndex, RegistryError> {
        self.actions.resolve(name).map(ActionIndex)
    }

    pub fn interaction_type(&self, name: &str) -> Result<InteractionType, RegistryError> {
        self.interaction_types.resolve(name).map(InteractionType)
    }

    pub fn mode_name(&self, mode: Mode) -> Option<&str> {
        self.modes.name(mode.0)
    }

    pub fn interaction_name(&self, ty: InteractionType) -> Option<&str> {
        self.interaction_types.name(ty.0)
    }
}
