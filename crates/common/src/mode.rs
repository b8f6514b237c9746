use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of addressable modes, actions and interaction types.
pub const SLOT_COUNT: usize = 32;

/// A small integer state per interactor gating which mappings are active.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Mode(pub u8);

impl Mode {
    /// The mode every interactor starts in.
    pub const DEFAULT: Self = Self(0);

    /// The single-bit mask for this mode. Out-of-range modes map to an empty bit.
    pub fn bit(self) -> u32 {
        1u32.checked_shl(u32::from(self.0)).unwrap_or(0)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode{}", self.0)
    }
}

/// A set of modes, one bit per mode index.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ModeMask(pub u32);

impl ModeMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    pub fn of(modes: &[Mode]) -> Self {
        modes.iter().fold(Self::NONE, |mask, m| mask.with(*m))
    }

    pub fn with(self, mode: Mode) -> Self {
        Self(self.0 | mode.bit())
    }

    pub fn without(self, mode: Mode) -> Self {
        Self(self.0 & !mode.bit())
    }

    pub fn contains(self, mode: Mode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Modes present in the mask, lowest index first.
    pub fn modes(self) -> impl Iterator<Item = Mode> {
        (0..SLOT_COUNT as u8).map(Mode).filter(move |m| self.contains(*m))
    }
}

impl From<Mode> for ModeMask {
    fn from(mode: Mode) -> Self {
        Self(mode.bit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_contains_listed_modes() {
        let mask = ModeMask::of(&[Mode(0), Mode(3)]);
        assert!(mask.contains(Mode(0)));
        assert!(mask.contains(Mode(3)));
        assert!(!mask.contains(Mode(1)));
        assert_eq!(mask.0, 0b1001);
        assert_eq!(mask.without(Mode(3)), ModeMask::from(Mode(0)));
        assert!(!ModeMask::ALL.without(Mode(2)).contains(Mode(2)));
    }

    #[test]
    fn out_of_range_mode_matches_nothing() {
        assert_eq!(Mode(40).bit(), 0);
        assert!(!ModeMask::ALL.contains(Mode(40)));
    }

    #[test]
    fn modes_iterates_in_order() {
        let mask = ModeMask(0b1010);
        let modes: Vec<Mode> = mask.modes().collect();
        assert_eq!(modes, vec![Mode(1), Mode(3)]);
    }

    #[test]
    fn empty_mask() {
        assert!(ModeMask::NONE.is_empty());
        assert!(!ModeMask::from(Mode(0)).is_empty());
    }
}
