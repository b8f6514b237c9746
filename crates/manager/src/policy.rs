use std::collections::BTreeMap;

use tactile_common::{ActionIndex, InteractionType, Mode};

/// Application policy: which action drives which interaction, and the modes
/// the manager assigns to controllers and objects.
#[derive(Debug, Clone, PartialEq)]
pub struct ModePolicy {
    pub actions: BTreeMap<ActionIndex, InteractionType>,
    pub grab_interaction: InteractionType,
    /// Controller holding a grab.
    pub busy_mode: Mode,
    /// Controller touching something it could grab.
    pub can_grab_mode: Mode,
    /// Object held by a controller.
    pub grabbed_mode: Mode,
    /// Object touched by a controller.
    pub touching_mode: Mode,
    /// Child of a grabbed object. Unset means children are left alone.
    pub secondary_mode: Option<Mode>,
}

impl Default for ModePolicy {
    fn default() -> Self {
        Self {
            actions: BTreeMap::new(),
            grab_interaction: InteractionType::GRAB,
            busy_mode: Mode::DEFAULT,
            can_grab_mode: Mode::DEFAULT,
            grabbed_mode: Mode::DEFAULT,
            touching_mode: Mode::DEFAULT,
            secondary_mode: None,
        }
    }
}

impl ModePolicy {
    pub fn with_action(mut self, action: ActionIndex, interaction: InteractionType) -> Self {
        self.actions.insert(action, interaction);
        self
    }

    pub fn interaction_for(&self, action: ActionIndex) -> Option<InteractionType> {
        self.actions.get(&action).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_actions_have_no_interaction() {
        let policy = ModePolicy::default().with_action(ActionIndex(1), InteractionType::GRAB);
        assert_eq!(policy.interaction_for(ActionIndex(1)), Some(InteractionType::GRAB));
        assert_eq!(policy.interaction_for(ActionIndex(0)), None);
        assert_eq!(policy.secondary_mode, None);
    }
}
