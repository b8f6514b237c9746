use std::any::Any;

use tactile_common::InteractorId;

use crate::event::HandlerEffect;
use crate::handler::{HandlerContext, InteractionHandler};
use crate::tracker::{InteractionInstance, InteractionTracker};

/// Shows a highlight colour on the owner while any peer keeps it lit.
#[derive(Debug)]
pub struct HighlightHandler {
    color: [f32; 4],
    highlighters: Vec<InteractorId>,
    lit: bool,
}

impl HighlightHandler {
    pub const KIND: &'static str = "highlight";

    pub fn new(color: [f32; 4]) -> Self {
        Self {
            color,
            highlighters: Vec::new(),
            lit: false,
        }
    }

    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn highlighters(&self) -> &[InteractorId] {
        &self.highlighters
    }
}

impl Default for HighlightHandler {
    fn default() -> Self {
        Self::new([1.0, 1.0, 0.0, 1.0])
    }
}

impl InteractionHandler for HighlightHandler {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn try_interact(
        &mut self,
        ctx: &mut HandlerContext<'_>,
        tracker: &InteractionTracker,
        other: InteractorId,
    ) -> bool {
        if !tracker.value().is_active() {
            return false;
        }
        self.highlighters.push(other);
        if !self.lit {
            self.lit = true;
            let target = ctx.owner();
            ctx.emit(HandlerEffect::Highlighted {
                target,
                color: self.color,
            });
        }
        true
    }

    fn on_released(&mut self, ctx: &mut HandlerContext<'_>, instance: &InteractionInstance) {
        if let Some(pos) = self.highlighters.iter().position(|h| *h == instance.other) {
            self.highlighters.remove(pos);
        }
        if self.highlighters.is_empty() && self.lit {
            self.lit = false;
            let target = ctx.owner();
            ctx.emit(HandlerEffect::Unhighlighted { target });
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
