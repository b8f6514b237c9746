use std::any::Any;

use tactile_common::InteractorId;

use super::{MIN_ANCHOR_DISTANCE, separation};
use crate::event::HandlerEffect;
use crate::handler::{HandlerContext, InteractionHandler};
use crate::tracker::{InteractionInstance, InteractionTracker};

/// Drives a normalized animation position from how far the manipulator has
/// pulled away from where it started.
#[derive(Debug, Default)]
pub struct AnimateHandler {
    target: Option<InteractorId>,
    manipulator: Option<InteractorId>,
    initial_distance: f32,
}

impl AnimateHandler {
    pub const KIND: &'static str = "animate";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(target: InteractorId) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }

    /// Playback position for a distance ratio: 0 until the distance grows,
    /// reaching 1 at five times the initial distance.
    pub fn progress(ratio: f32) -> f32 {
        ((ratio.max(1.0) - 1.0) / 4.0).min(1.0)
    }
}

impl InteractionHandler for AnimateHandler {
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
        match separation(ctx, target, other) {
            Some(distance) if distance >= MIN_ANCHOR_DISTANCE => {
                self.manipulator = Some(other);
                self.initial_distance = distance;
                true
            }
            _ => false,
        }
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
        ctx.emit(HandlerEffect::Animated {
            target,
            progress: Self::progress(distance / self.initial_distance),
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_curve() {
        assert_eq!(AnimateHandler::progress(0.5), 0.0);
        assert_eq!(AnimateHandler::progress(1.0), 0.0);
        assert!((AnimateHandler::progress(3.0) - 0.5).abs() < 1e-6);
        assert_eq!(AnimateHandler::progress(5.0), 1.0);
        assert_eq!(AnimateHandler::progress(12.0), 1.0);
    }
}
