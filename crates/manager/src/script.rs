//! Scripted input for driving a scene without an engine: touches, collider
//! contacts, button presses, moves and frame steps, read from YAML.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tactile_common::Transform;
use tactile_kernel::InteractionEvent;

use crate::highlighter::HighlightChange;
use crate::scene::{Scene, SceneError};

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Logical touch between two interactors, raised on both sides.
    Touch { a: String, b: String },
    Untouch { a: String, b: String },
    /// One sub-volume contact between two named colliders.
    Contact { a: String, b: String },
    Separate { a: String, b: String },
    Press { source: String, button: u8 },
    Release { source: String, button: u8 },
    Move { interactor: String, position: [f32; 3] },
    Mode { interactor: String, mode: String },
    Step {
        #[serde(default = "one")]
        count: u32,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

impl Script {
    pub fn from_yaml(yaml: &str) -> Result<Self, SceneError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}

/// What one step produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub step: ScriptStep,
    pub events: Vec<InteractionEvent>,
    pub highlights: Vec<HighlightChange>,
}

impl Scene {
    /// Apply one step and let the manager settle.
    pub fn apply(&mut self, step: &ScriptStep) -> Result<Vec<InteractionEvent>, SceneError> {
        match step {
            ScriptStep::Touch { a, b } => {
                let (a, b) = (self.interactor(a)?, self.interactor(b)?);
                self.sim.started_touching(a, b);
                self.sim.started_touching(b, a);
            }
            ScriptStep::Untouch { a, b } => {
                let (a, b) = (self.interactor(a)?, self.interactor(b)?);
                self.sim.stopped_touching(a, b);
                self.sim.stopped_touching(b, a);
            }
            ScriptStep::Contact { a, b } => {
                let (a, b) = (self.collider(a)?, self.collider(b)?);
                self.sim.contact_begin(a, b);
            }
            ScriptStep::Separate { a, b } => {
                let (a, b) = (self.collider(a)?, self.collider(b)?);
                self.sim.contact_end(a, b);
            }
            ScriptStep::Press { source, button } => {
                let source = self.source(source)?;
                self.manager
                    .press_button(&mut self.sim, &mut self.agg, source, *button);
            }
            ScriptStep::Release { source, button } => {
                let source = self.source(source)?;
                self.manager
                    .release_button(&mut self.sim, &mut self.agg, source, *button);
            }
            ScriptStep::Move {
                interactor,
                position,
            } => {
                let id = self.interactor(interactor)?;
                let mut transform = self
                    .sim
                    .interactor(id)
                    .map(|it| *it.transform())
                    .unwrap_or_else(Transform::default);
                transform.position = Vec3::from(*position);
                self.sim.set_transform(id, transform);
            }
            ScriptStep::Mode { interactor, mode } => {
                let id = self.interactor(interactor)?;
                let mode = self.agg.registry().mode(mode)?;
                self.sim.set_mode(id, mode);
            }
            ScriptStep::Step { count } => {
                for _ in 0..*count {
                    self.sim.step();
                }
            }
        }
        Ok(self.settle())
    }

    /// Run every step in order, stopping at the first error.
    pub fn run(&mut self, script: &Script) -> Result<Vec<StepReport>, SceneError> {
        let _span = tracing::info_span!("script", steps = script.steps.len()).entered();
        let mut reports = Vec::with_capacity(script.steps.len());
        for (index, step) in script.steps.iter().enumerate() {
            let events = self.apply(step)?;
            tracing::debug!(index, ?step, events = events.len(), "script step");
            reports.push(StepReport {
                index,
                step: step.clone(),
                events,
                highlights: self.drain_highlights(),
            });
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactile_kernel::HandlerEffect;

    const SCALE_SCENE: &str = r#"
registry:
  modes: [Touching]
  actions: [Squeeze]
  interaction_types: [Scale]
interactors:
  - name: hand
    position: [0.0, 0.0, 0.0]
    mappings:
      - interaction: Scale
  - name: box
    position: [1.0, 0.0, 0.0]
    handlers:
      - kind: scale
    mappings:
      - interaction: Scale
        handler: scale
sources:
  - name: right
    interactors: [hand]
    buttons:
      - button: 3
        action: Squeeze
        edge: momentary
policy:
  actions:
    Squeeze: Scale
  touching_mode: Touching
"#;

    const SCRIPT: &str = r#"
steps:
  - op: touch
    a: hand
    b: box
  - op: press
    source: right
    button: 3
  - op: move
    interactor: hand
    position: [2.0, 0.0, 0.0]
  - op: step
  - op: release
    source: right
    button: 3
  - op: untouch
    a: hand
    b: box
"#;

    #[test]
    fn script_parses_every_op() {
        let script = Script::from_yaml(SCRIPT).unwrap();
        assert_eq!(script.steps.len(), 6);
        assert_eq!(script.steps[3], ScriptStep::Step { count: 1 });
        assert_eq!(
            script.steps[1],
            ScriptStep::Press {
                source: "right".into(),
                button: 3
            }
        );
    }

    #[test]
    fn scripted_scale_doubles_the_box() {
        let mut scene = Scene::from_yaml(SCALE_SCENE).unwrap();
        let script = Script::from_yaml(SCRIPT).unwrap();
        let reports = scene.run(&script).unwrap();
        assert_eq!(reports.len(), 6);

        let started = reports[1]
            .events
            .iter()
            .filter(|e| matches!(e, InteractionEvent::InteractionStarted { .. }))
            .count();
        assert_eq!(started, 2, "one per participant");

        let scaled = reports[3].events.iter().find_map(|e| match e {
            InteractionEvent::Effect {
                effect: HandlerEffect::Scaled { scale, .. },
                ..
            } => Some(*scale),
            _ => None,
        });
        let scale = scaled.unwrap();
        assert!((scale.x - 2.0).abs() < 1e-5);

        let stopped = reports[4]
            .events
            .iter()
            .any(|e| matches!(e, InteractionEvent::InteractionStopped { .. }));
        assert!(stopped);
        assert_eq!(scene.sim.instances().count(), 0);
    }

    #[test]
    fn unknown_names_stop_the_run() {
        let mut scene = Scene::from_yaml(SCALE_SCENE).unwrap();
        let script = Script::from_yaml("steps:\n  - op: touch\n    a: hand\n    b: ghost\n").unwrap();
        assert!(matches!(
            scene.run(&script).unwrap_err(),
            SceneError::UnknownName { kind: "interactor", .. }
        ));
    }

    #[test]
    fn mode_step_resolves_names() {
        let mut scene = Scene::from_yaml(SCALE_SCENE).unwrap();
        let step = ScriptStep::Mode {
            interactor: "box".into(),
            mode: "Touching".into(),
        };
        let events = scene.apply(&step).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, InteractionEvent::ModeChanged { .. })));
    }
}
