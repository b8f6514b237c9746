use std::any::Any;

use tactile_common::InteractorId;

use crate::event::HandlerEffect;
use crate::handler::{HandlerContext, InteractionHandler};
use crate::tracker::{InteractionInstance, InteractionTracker};

/// Attaches the peer to the owner while the tracker value stays active.
///
/// Holds at most one peer at a time and refuses peers that host a grab
/// handler themselves (another controller).
#[derive(Debug, Default)]
pub struct GrabHandler {
    grabbed: Option<InteractorId>,
}

impl GrabHandler {
    pub const KIND: &'static str = "grab";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn grabbed(&self) -> Option<InteractorId> {
        self.grabbed
    }
}

impl InteractionHandler for GrabHandler {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn can_interact(&self, ctx: &HandlerContext<'_>, other: InteractorId) -> bool {
        !ctx.hosts_handler(other, Self::KIND)
    }

    fn try_interact(
        &mut self,
        ctx: &mut HandlerContext<'_>,
        tracker: &InteractionTracker,
        other: InteractorId,
    ) -> bool {
        if !tracker.value().is_active() || self.grabbed.is_some() || !self.can_interact(ctx, other) {
            return false;
        }
        self.grabbed = Some(other);
        let holder = ctx.owner();
        ctx.emit(HandlerEffect::Attached {
            holder,
            target: other,
        });
        true
    }

    fn on_released(&mut self, ctx: &mut HandlerContext<'_>, instance: &InteractionInstance) {
        if self.grabbed != Some(instance.other) {
            return;
        }
        self.grabbed = None;
        let holder = ctx.owner();
        ctx.emit(HandlerEffect::Detached {
            holder,
            target: instance.other,
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
