//! Interaction policy layer.
//!
//! The [`Aggregator`] owns the registry context and every action source. The
//! [`InteractionManager`] turns action events into interaction trackers and
//! keeps controller and object modes in step with touches and grabs. A
//! [`Scene`] bundles both with a simulation, loaded from YAML.
//!
//! # Invariants
//! - A held action has at most one live tracker: per (source, action) for
//!   momentary edges, per action for toggles.
//! - Controller modes are recomputed eagerly after every touch, grab and
//!   source registration change.

pub mod aggregator;
pub mod highlighter;
pub mod manager;
pub mod policy;
pub mod scene;
pub mod script;

pub use aggregator::{Aggregator, AggregatorEvent};
pub use highlighter::{HighlightChange, ModeHighlightMapping, ModeHighlighter};
pub use manager::InteractionManager;
pub use policy::ModePolicy;
pub use scene::{Scene, SceneConfig, SceneError};
pub use script::{Script, ScriptStep};

pub fn crate_info() -> &'static str {
    "tactile-manager v0.1.0"
}
