use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Identifies an interactor inside one simulation.
    InteractorId,
    "interactor"
);
arena_id!(
    /// Identifies a collision volume group that relays touches to an interactor.
    ColliderId,
    "collider"
);
arena_id!(
    /// Identifies an interaction handler registered on an interactor.
    HandlerId,
    "handler"
);
arena_id!(
    /// Identifies a live interaction tracker (an input-driven intent).
    TrackerId,
    "tracker"
);
arena_id!(
    /// Identifies an accepted interaction instance.
    InstanceId,
    "instance"
);
arena_id!(
    /// Identifies a shared touch record between two interactors.
    TouchId,
    "touch"
);
arena_id!(
    /// Identifies an action source (a controller or other input device).
    ActionSourceId,
    "source"
);

/// Index into the interaction type table.
///
/// Index 0 is the reserved "touch" type and never takes part in mapping
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InteractionType(pub u8);

impl InteractionType {
    pub const TOUCH: Self = Self(0);
    pub const USE: Self = Self(1);
    pub const GRAB: Self = Self(2);

    pub fn is_touch(self) -> bool {
        self == Self::TOUCH
    }
}

/// Index into the action table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionIndex(pub u8);

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Straight-line distance between the origins of two transforms.
    pub fn distance(&self, other: &Transform) -> f32 {
        self.position.distance(other.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_by_value() {
        let a = InteractorId(1);
        let b = InteractorId(2);
        assert!(a < b);
        assert_eq!(a.to_string(), "interactor#1");
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
    }

    #[test]
    fn transform_distance() {
        let a = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let b = Transform::from_position(Vec3::new(4.0, 4.0, 0.0));
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn touch_type_is_reserved() {
        assert!(InteractionType::TOUCH.is_touch());
        assert!(!InteractionType::GRAB.is_touch());
    }
}
