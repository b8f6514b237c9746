//! Scene configuration: a YAML description of the registry, interactors,
//! action sources, manager policy and mode highlights.
//!
//! Names are resolved to indices once, here. Unknown mode and action names
//! are errors; a mapping naming an unknown interaction type is logged and
//! left out, and a mapping naming a handler kind its interactor lacks stays
//! unbound.

use std::collections::BTreeMap;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tactile_common::{
    ActionSourceId, ColliderId, InteractorId, Mode, ModeMask, Registry, RegistryError, Transform,
};
use tactile_input::{ActionEdge, ButtonMapping, InputError};
use tactile_kernel::{
    AnimateHandler, GrabHandler, HighlightHandler, InteractionEvent, InteractionMapping,
    KernelError, ModeFilter, ScaleHandler, Simulation,
};

use crate::aggregator::Aggregator;
use crate::highlighter::{HighlightChange, ModeHighlightMapping, ModeHighlighter};
use crate::manager::InteractionManager;
use crate::policy::ModePolicy;

/// Errors from loading or driving a scene.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error("unknown {kind} {name:?}")]
    UnknownName { kind: &'static str, name: String },
    #[error("duplicate {kind} {name:?}")]
    Duplicate { kind: &'static str, name: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub modes: Vec<String>,
    pub actions: Vec<String>,
    pub interaction_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandlerConfig {
    Grab,
    Highlight {
        #[serde(default)]
        color: Option<[f32; 4]>,
    },
    Scale {
        #[serde(default)]
        target: Option<String>,
    },
    Animate {
        #[serde(default)]
        target: Option<String>,
    },
}

impl HandlerConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Grab => GrabHandler::KIND,
            Self::Highlight { .. } => HighlightHandler::KIND,
            Self::Scale { .. } => ScaleHandler::KIND,
            Self::Animate { .. } => AnimateHandler::KIND,
        }
    }
}

/// Mode lists default to every mode when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    pub interaction: String,
    #[serde(default)]
    pub local: Option<Vec<String>>,
    #[serde(default)]
    pub remote: Option<Vec<String>>,
    #[serde(default)]
    pub handler: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub local: Option<Vec<String>>,
    #[serde(default)]
    pub remote: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColliderConfig {
    pub name: Option<String>,
    pub filters: Vec<FilterConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractorConfig {
    pub name: String,
    pub mode: Option<String>,
    pub position: Option<[f32; 3]>,
    pub parent: Option<String>,
    pub inherit_mode_from: Option<String>,
    pub handlers: Vec<HandlerConfig>,
    pub mappings: Vec<MappingConfig>,
    pub colliders: Vec<ColliderConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonConfig {
    pub button: u8,
    pub action: String,
    pub edge: ActionEdge,
    #[serde(default)]
    pub modes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub name: String,
    pub interactors: Vec<String>,
    pub buttons: Vec<ButtonConfig>,
}

/// Policy by name. Action names map to interaction type names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub actions: BTreeMap<String, String>,
    pub grab_interaction: Option<String>,
    pub busy_mode: Option<String>,
    pub can_grab_mode: Option<String>,
    pub grabbed_mode: Option<String>,
    pub touching_mode: Option<String>,
    pub secondary_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightMappingConfig {
    pub modes: Vec<String>,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub watch: Vec<String>,
    pub mappings: Vec<HighlightMappingConfig>,
}

/// Top-level scene description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub registry: RegistryConfig,
    pub interactors: Vec<InteractorConfig>,
    pub sources: Vec<SourceConfig>,
    pub policy: PolicyConfig,
    pub highlights: HighlightConfig,
}

impl SceneConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, SceneError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}

/// A running scene: simulation, action sources, manager and highlighter,
/// plus the name tables used to address them.
#[derive(Debug)]
pub struct Scene {
    pub sim: Simulation,
    pub agg: Aggregator,
    pub manager: InteractionManager,
    pub highlighter: ModeHighlighter,
    interactors: BTreeMap<String, InteractorId>,
    colliders: BTreeMap<String, ColliderId>,
    highlights: Vec<HighlightChange>,
}

impl Scene {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        Self::from_config(SceneConfig::load(path)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, SceneError> {
        Self::from_config(SceneConfig::from_yaml(yaml)?)
    }

    pub fn from_config(config: SceneConfig) -> Result<Self, SceneError> {
        let _span = tracing::info_span!("scene_load").entered();
        let registry = Registry::with_extensions(
            &config.registry.modes,
            &config.registry.actions,
            &config.registry.interaction_types,
        )?;

        let mut sim = Simulation::new();
        let mut interactors = BTreeMap::new();
        for it in &config.interactors {
            if interactors.contains_key(&it.name) {
                return Err(SceneError::Duplicate {
                    kind: "interactor",
                    name: it.name.clone(),
                });
            }
            interactors.insert(it.name.clone(), sim.spawn_interactor(it.name.as_str()));
        }
        let lookup = |name: &str| -> Result<InteractorId, SceneError> {
            interactors.get(name).copied().ok_or_else(|| SceneError::UnknownName {
                kind: "interactor",
                name: name.to_string(),
            })
        };

        let mut colliders = BTreeMap::new();
        for it in &config.interactors {
            let id = lookup(&it.name)?;
            if let Some(position) = it.position {
                sim.set_transform(id, Transform::from_position(Vec3::from(position)));
            }
            if let Some(parent) = &it.parent {
                sim.set_parent(id, Some(lookup(parent)?))?;
            }
            for handler in &it.handlers {
                match handler {
                    HandlerConfig::Grab => sim.add_handler(id, GrabHandler::new())?,
                    HandlerConfig::Highlight { color } => sim.add_handler(
                        id,
                        color.map(HighlightHandler::new).unwrap_or_default(),
                    )?,
                    HandlerConfig::Scale { target: Some(target) } => {
                        sim.add_handler(id, ScaleHandler::with_target(lookup(target)?))?
                    }
                    HandlerConfig::Scale { target: None } => sim.add_handler(id, ScaleHandler::new())?,
                    HandlerConfig::Animate { target: Some(target) } => {
                        sim.add_handler(id, AnimateHandler::with_target(lookup(target)?))?
                    }
                    HandlerConfig::Animate { target: None } => {
                        sim.add_handler(id, AnimateHandler::new())?
                    }
                };
            }

            let mut mappings = Vec::with_capacity(it.mappings.len());
            for m in &it.mappings {
                let Ok(interaction) = registry.interaction_type(&m.interaction) else {
                    tracing::warn!(
                        interactor = %it.name,
                        interaction = %m.interaction,
                        "mapping names an unknown interaction type; excluded"
                    );
                    continue;
                };
                let mut mapping = InteractionMapping::new(
                    interaction,
                    mode_mask(&registry, m.local.as_deref())?,
                    mode_mask(&registry, m.remote.as_deref())?,
                );
                if let Some(kind) = &m.handler {
                    if !it.handlers.iter().any(|h| h.kind() == kind.as_str()) {
                        tracing::warn!(
                            interactor = %it.name,
                            handler = %kind,
                            "mapping names a handler the interactor lacks"
                        );
                    }
                    mapping = mapping.with_handler(kind.as_str());
                }
                mappings.push(mapping);
            }
            sim.set_mappings(id, mappings)?;

            for collider in &it.colliders {
                let filters = collider
                    .filters
                    .iter()
                    .map(|f| -> Result<ModeFilter, SceneError> {
                        Ok(ModeFilter::new(
                            mode_mask(&registry, f.local.as_deref())?,
                            mode_mask(&registry, f.remote.as_deref())?,
                        ))
                    })
                    .collect::<Result<Vec<_>, SceneError>>()?;
                let cid = sim.spawn_collider(id, filters)?;
                if let Some(name) = &collider.name {
                    if colliders.insert(name.clone(), cid).is_some() {
                        return Err(SceneError::Duplicate {
                            kind: "collider",
                            name: name.clone(),
                        });
                    }
                }
            }
        }

        for it in &config.interactors {
            let id = lookup(&it.name)?;
            if let Some(parent) = &it.inherit_mode_from {
                sim.set_inherit_mode_from(id, Some(lookup(parent)?))?;
            } else if let Some(mode) = &it.mode {
                sim.set_mode(id, registry.mode(mode)?);
            }
        }

        let policy = resolve_policy(&registry, &config.policy)?;

        let mut highlighter = ModeHighlighter::new(
            config
                .highlights
                .mappings
                .iter()
                .map(|m| -> Result<ModeHighlightMapping, SceneError> {
                    Ok(ModeHighlightMapping {
                        mode_mask: registry.mode_mask(&m.modes)?,
                        color: m.color,
                    })
                })
                .collect::<Result<Vec<_>, SceneError>>()?,
        );
        for name in &config.highlights.watch {
            highlighter.watch(lookup(name)?);
        }

        let mut agg = Aggregator::new(registry);
        for source in &config.sources {
            if agg.find_source(&source.name).is_some() {
                return Err(SceneError::Duplicate {
                    kind: "source",
                    name: source.name.clone(),
                });
            }
            let buttons = source
                .buttons
                .iter()
                .map(|b| -> Result<ButtonMapping, SceneError> {
                    Ok(ButtonMapping::new(
                        mode_mask(agg.registry(), b.modes.as_deref())?,
                        b.button,
                        agg.registry().action(&b.action)?,
                        b.edge,
                    )?)
                })
                .collect::<Result<Vec<_>, SceneError>>()?;
            let id = agg.register_source(source.name.as_str(), buttons);
            for name in &source.interactors {
                agg.add_local_interactor(id, lookup(name)?);
            }
        }

        let mut scene = Self {
            sim,
            agg,
            manager: InteractionManager::new(policy),
            highlighter,
            interactors,
            colliders,
            highlights: Vec::new(),
        };
        scene.manager.sync_sources(&mut scene.sim, &mut scene.agg);
        scene.settle();
        tracing::info!(
            interactors = scene.interactors.len(),
            sources = scene.agg.len(),
            "scene loaded"
        );
        Ok(scene)
    }

    pub fn interactor(&self, name: &str) -> Result<InteractorId, SceneError> {
        self.interactors
            .get(name)
            .copied()
            .ok_or_else(|| SceneError::UnknownName {
                kind: "interactor",
                name: name.to_string(),
            })
    }

    pub fn collider(&self, name: &str) -> Result<ColliderId, SceneError> {
        self.colliders
            .get(name)
            .copied()
            .ok_or_else(|| SceneError::UnknownName {
                kind: "collider",
                name: name.to_string(),
            })
    }

    pub fn source(&self, name: &str) -> Result<ActionSourceId, SceneError> {
        self.agg
            .find_source(name)
            .ok_or_else(|| SceneError::UnknownName {
                kind: "source",
                name: name.to_string(),
            })
    }

    pub fn interactor_names(&self) -> impl Iterator<Item = &str> {
        self.interactors.keys().map(String::as_str)
    }

    /// Let the manager react to everything pending and pass the events on to
    /// the highlighter. Returns the events handled.
    pub fn settle(&mut self) -> Vec<InteractionEvent> {
        self.manager.pump(&mut self.sim, &mut self.agg);
        self.manager.sync_sources(&mut self.sim, &mut self.agg);
        let events = self.manager.drain_observed();
        let changes = self.highlighter.observe_all(&events);
        self.highlights.extend(changes);
        events
    }

    pub fn drain_highlights(&mut self) -> Vec<HighlightChange> {
        std::mem::take(&mut self.highlights)
    }
}

fn mode_mask(registry: &Registry, names: Option<&[String]>) -> Result<ModeMask, SceneError> {
    match names {
        Some(names) => Ok(registry.mode_mask(names)?),
        None => Ok(ModeMask::ALL),
    }
}

fn resolve_policy(registry: &Registry, config: &PolicyConfig) -> Result<ModePolicy, SceneError> {
    let mode = |name: &Option<String>| -> Result<Option<Mode>, SceneError> {
        name.as_deref()
            .map(|n| registry.mode(n))
            .transpose()
            .map_err(SceneError::from)
    };
    let mut policy = ModePolicy::default();
    for (action, interaction) in &config.actions {
        policy
            .actions
            .insert(registry.action(action)?, registry.interaction_type(interaction)?);
    }
    if let Some(grab) = &config.grab_interaction {
        policy.grab_interaction = registry.interaction_type(grab)?;
    }
    policy.busy_mode = mode(&config.busy_mode)?.unwrap_or_default();
    policy.can_grab_mode = mode(&config.can_grab_mode)?.unwrap_or_default();
    policy.grabbed_mode = mode(&config.grabbed_mode)?.unwrap_or_default();
    policy.touching_mode = mode(&config.touching_mode)?.unwrap_or_default();
    policy.secondary_mode = mode(&config.secondary_mode)?;
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tactile_common::InteractionType;

    const GRAB_SCENE: &str = r#"
registry:
  modes: [Touching, Busy, CanGrab, Grabbed, Secondary]
  actions: [Grab]
interactors:
  - name: hand
    handlers:
      - kind: grab
    mappings:
      - interaction: Grab
        handler: grab
    colliders:
      - name: palm
      - name: finger
  - name: cube
    position: [0.0, 0.0, 1.0]
    mappings:
      - interaction: Grab
      - interaction: Throw
    colliders:
      - name: cube_body
  - name: lid
    parent: cube
sources:
  - name: left
    interactors: [hand]
    buttons:
      - button: 0
        action: Grab
        edge: momentary
policy:
  actions:
    Grab: Grab
  busy_mode: Busy
  can_grab_mode: CanGrab
  grabbed_mode: Grabbed
  touching_mode: Touching
  secondary_mode: Secondary
highlights:
  watch: [cube]
  mappings:
    - modes: [Grabbed]
      color: [0.0, 1.0, 0.0, 1.0]
    - modes: [Touching]
      color: [1.0, 1.0, 0.0, 1.0]
"#;

    #[test]
    fn grab_scene_loads() {
        let scene = Scene::from_yaml(GRAB_SCENE).unwrap();
        let hand = scene.interactor("hand").unwrap();
        let cube = scene.interactor("cube").unwrap();
        let lid = scene.interactor("lid").unwrap();
        assert_eq!(scene.sim.interactor_count(), 3);
        assert!(scene.sim.interactor(hand).unwrap().hosts_handler(GrabHandler::KIND));
        assert_eq!(scene.sim.interactor(cube).unwrap().mappings().len(), 1, "Throw is excluded");
        assert_eq!(scene.sim.interactor(lid).unwrap().parent(), Some(cube));
        assert_eq!(scene.sim.interactor(cube).unwrap().transform().position, Vec3::Z);
        assert_eq!(scene.agg.source_of(hand), Some(scene.source("left").unwrap()));
        assert_eq!(
            scene.manager.policy().interaction_for(scene.agg.registry().action("Grab").unwrap()),
            Some(InteractionType::GRAB)
        );
        assert!(scene.collider("palm").is_ok());
        assert!(scene.collider("nope").is_err());
    }

    #[test]
    fn grab_through_colliders_and_buttons() {
        let mut scene = Scene::from_yaml(GRAB_SCENE).unwrap();
        let registry = scene.agg.registry().clone();
        let cube = scene.interactor("cube").unwrap();
        let lid = scene.interactor("lid").unwrap();
        let left = scene.source("left").unwrap();
        let palm = scene.collider("palm").unwrap();
        let finger = scene.collider("finger").unwrap();
        let body = scene.collider("cube_body").unwrap();

        scene.sim.contact_begin(palm, body);
        scene.sim.contact_begin(finger, body);
        scene.settle();
        assert_eq!(scene.sim.mode(cube), Some(registry.mode("Touching").unwrap()));
        assert_eq!(scene.highlighter.shown(cube), Some([1.0, 1.0, 0.0, 1.0]));

        scene
            .manager
            .press_button(&mut scene.sim, &mut scene.agg, left, 0);
        scene.settle();
        assert_eq!(scene.sim.mode(cube), Some(registry.mode("Grabbed").unwrap()));
        assert_eq!(scene.sim.mode(lid), Some(registry.mode("Secondary").unwrap()));
        assert_eq!(scene.highlighter.shown(cube), Some([0.0, 1.0, 0.0, 1.0]));

        scene
            .manager
            .release_button(&mut scene.sim, &mut scene.agg, left, 0);
        scene.sim.contact_end(palm, body);
        scene.settle();
        assert_eq!(scene.sim.mode(cube), Some(registry.mode("Touching").unwrap()));

        scene.sim.contact_end(finger, body);
        scene.settle();
        assert_eq!(scene.sim.mode(cube), Some(Mode::DEFAULT));
        assert_eq!(scene.highlighter.shown(cube), None);
        assert_eq!(scene.drain_highlights().len(), 4);
    }

    #[test]
    fn unknown_mode_name_is_an_error() {
        let yaml = r#"
interactors:
  - name: cube
    mode: Flying
"#;
        let err = Scene::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, SceneError::Registry(RegistryError::UnknownName { .. })));
    }

    #[test]
    fn duplicate_and_dangling_names() {
        let dup = "interactors:\n  - name: a\n  - name: a\n";
        assert!(matches!(
            Scene::from_yaml(dup).unwrap_err(),
            SceneError::Duplicate { kind: "interactor", .. }
        ));
        let dangling = "interactors:\n  - name: a\n    parent: ghost\n";
        assert!(matches!(
            Scene::from_yaml(dangling).unwrap_err(),
            SceneError::UnknownName { kind: "interactor", .. }
        ));
    }

    #[test]
    fn cyclic_inheritance_in_config_is_rejected() {
        let yaml = r#"
interactors:
  - name: a
    inherit_mode_from: b
  - name: b
    inherit_mode_from: a
"#;
        assert!(matches!(
            Scene::from_yaml(yaml).unwrap_err(),
            SceneError::Kernel(KernelError::CyclicInheritance { .. })
        ));
    }

    #[test]
    fn out_of_range_button_is_an_error() {
        let yaml = r#"
registry:
  actions: [Grab]
sources:
  - name: left
    buttons:
      - button: 64
        action: Grab
        edge: toggle_leading
"#;
        assert!(matches!(
            Scene::from_yaml(yaml).unwrap_err(),
            SceneError::Input(InputError::ButtonOutOfRange(64))
        ));
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(GRAB_SCENE.as_bytes()).unwrap();
        let scene = Scene::load(file.path()).unwrap();
        assert_eq!(scene.interactor_names().count(), 3);
        assert!(Scene::load(file.path().with_extension("missing")).is_err());
    }
}
