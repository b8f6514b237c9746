//! Built-in handler variants.

mod animate;
mod grab;
mod highlight;
mod scale;

pub use animate::AnimateHandler;
pub use grab::GrabHandler;
pub use highlight::HighlightHandler;
pub use scale::ScaleHandler;

use tactile_common::InteractorId;

use crate::handler::HandlerContext;

/// Distance between two interactors' origins, if both exist.
fn separation(ctx: &HandlerContext<'_>, a: InteractorId, b: InteractorId) -> Option<f32> {
    Some(ctx.transform(a)?.distance(ctx.transform(b)?))
}

/// Distances below this are treated as coincident and cannot anchor a ratio.
const MIN_ANCHOR_DISTANCE: f32 = 1e-4;
