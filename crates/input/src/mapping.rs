use serde::{Deserialize, Serialize};
use tactile_common::{ActionIndex, Mode, ModeMask};

use crate::action::ActionEdge;

/// Buttons are bits of a 64-bit state word.
pub const MAX_BUTTONS: u8 = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("button {0} is out of range (max {max})", max = MAX_BUTTONS - 1)]
    ButtonOutOfRange(u8),
}

/// Static binding of a button to an action, active in the modes of `mode_mask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonMapping {
    pub mode_mask: ModeMask,
    pub button: u8,
    pub action: ActionIndex,
    pub edge: ActionEdge,
}

impl ButtonMapping {
    pub fn new(
        mode_mask: ModeMask,
        button: u8,
        action: ActionIndex,
        edge: ActionEdge,
    ) -> Result<Self, InputError> {
        if button >= MAX_BUTTONS {
            return Err(InputError::ButtonOutOfRange(button));
        }
        Ok(Self {
            mode_mask,
            button,
            action,
            edge,
        })
    }

    pub fn bit(&self) -> u64 {
        1u64.checked_shl(u32::from(self.button)).unwrap_or(0)
    }

    pub fn is_active_in(&self, mode: Mode) -> bool {
        self.mode_mask.contains(mode)
    }
}
