use std::any::Any;

use glam::Vec3;
use tactile_common::InteractorId;

use super::{MIN_ANCHOR_DISTANCE, separation};
use crate::event::HandlerEffect;
use crate::handler::{HandlerContext, InteractionHandler};
use crate::tracker::{InteractionInstance, InteractionTracker};

/// Scales a target in proportion to its distance from the manipulating peer.
///
/// The target defaults to the owning interactor.
#[derive(Debug, Default)]
pub struct ScaleHandler {
    target: Option<InteractorId>,
    manipulator: Option<InteractorId>,
    initial_distance: f32,
    initial_scale: Vec3,
}

impl ScaleHandler {
    pub const KIND: &'static str = "scale";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(target: InteractorId) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }

    pub fn manipulator(&self) -> Option<InteractorId> {
        self.manipulator
    }
}

impl InteractionHandler for ScaleHandler {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn try_interact(
        &mut self,
        ctx: &mut HandlerContext<'_>,
        tracker: &InteractionTracker,
        other: InteractorId,
    ) -> bool {
        if !tracker.value().is_active() || self.manipulator.is_some() {
            return false;
        }
        let target = self.target.unwrap_or(ctx.owner());
        let (Some(distance), Some(transform)) = (separation(ctx, target, other), ctx.transform(target))
        else {
            return false;
        };
        if distance < MIN_ANCHOR_DISTANCE {
            return false;
        }
        self.manipulator = Some(other);
        self.initial_distance = distance;
        self.initial_scale = transform.scale;
        true
    }

    fn on_released(&mut self, _ctx: &mut HandlerContext<'_>, instance: &InteractionInstance) {
        if self.manipulator == Some(instance.other) {
            self.manipulator = None;
        }
    }

    fn update(&mut self, ctx: &mut HandlerContext<'_>) {
        let Some(manipulator) = self.manipulator else {
            return;
        };
        let target = self.target.unwrap_or(ctx.owner());
        let Some(distance) = separation(ctx, target, manipulator) else {
            return;
        };
        ctx.emit(HandlerEffect::Scaled {
            target,
            scale: self.initial_scale * (distance / self.initial_distance),
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
