use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tactile_kernel::{InteractionEvent, Simulation};
use tactile_manager::{Scene, Script};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tactile-cli", about = "CLI tool for tactile interaction scenes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and crate info
    Info,
    /// Load a scene file and report what it contains
    Validate {
        /// Scene YAML file
        scene: PathBuf,
    },
    /// Run a scripted input sequence against a scene
    Run {
        /// Scene YAML file
        scene: PathBuf,
        /// Script YAML file
        script: PathBuf,
        /// Print step reports as JSON
        #[arg(long)]
        json: bool,
    },
}

fn describe(scene: &Scene, event: &InteractionEvent) -> Option<String> {
    let name = |id| {
        scene
            .sim
            .interactor(id)
            .map(|it| it.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    let registry = scene.agg.registry();
    Some(match event {
        InteractionEvent::TouchStarted {
            interactor, other, ..
        } => format!("touch started: {} -> {}", name(*interactor), name(*other)),
        InteractionEvent::TouchStopped {
            interactor, other, ..
        } => format!("touch stopped: {} -> {}", name(*interactor), name(*other)),
        InteractionEvent::ModeChanged {
            interactor, new, ..
        } => format!(
            "mode: {} = {}",
            name(*interactor),
            registry.mode_name(*new).unwrap_or("?")
        ),
        InteractionEvent::InteractionStarted {
            interactor,
            other,
            interaction,
            ..
        } => format!(
            "interaction started: {} {} {}",
            name(*interactor),
            registry.interaction_name(*interaction).unwrap_or("?"),
            name(*other)
        ),
        InteractionEvent::InteractionStopped {
            interactor,
            other,
            interaction,
            ..
        } => format!(
            "interaction stopped: {} {} {}",
            name(*interactor),
            registry.interaction_name(*interaction).unwrap_or("?"),
            name(*other)
        ),
        InteractionEvent::Effect { effect, .. } => format!("effect: {effect:?}"),
        _ => return None,
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("tactile-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("kernel: {} (tick={})", tactile_kernel::crate_info(), Simulation::new().tick());
            println!("common: {}", tactile_common::crate_info());
            println!("input: {}", tactile_input::crate_info());
            println!("manager: {}", tactile_manager::crate_info());
        }
        Commands::Validate { scene } => {
            let loaded = Scene::load(&scene)
                .with_context(|| format!("loading scene {}", scene.display()))?;
            println!("Scene {}: OK", scene.display());
            println!(
                "interactors={}, sources={}",
                loaded.sim.interactor_count(),
                loaded.agg.len()
            );
            for it in loaded.sim.interactors() {
                let handlers: Vec<&str> = it.handlers().map(|(_, kind)| kind).collect();
                println!(
                    "  {}: mappings={}, handlers=[{}], colliders={}",
                    it.name,
                    it.mappings().len(),
                    handlers.join(", "),
                    it.colliders().len()
                );
            }
            for source in loaded.agg.sources() {
                println!(
                    "  source {}: buttons={}, interactors={}",
                    source.name,
                    source.mappings().len(),
                    source.local_interactors().len()
                );
            }
        }
        Commands::Run {
            scene,
            script,
            json,
        } => {
            let mut loaded = Scene::load(&scene)
                .with_context(|| format!("loading scene {}", scene.display()))?;
            let steps = Script::load(&script)
                .with_context(|| format!("loading script {}", script.display()))?;
            tracing::debug!(steps = steps.steps.len(), script = %script.display(), "script loaded");
            let reports = loaded.run(&steps)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
                return Ok(());
            }
            for report in &reports {
                println!("[{}] {:?}", report.index, report.step);
                for event in &report.events {
                    if let Some(line) = describe(&loaded, event) {
                        println!("    {line}");
                    }
                }
                for change in &report.highlights {
                    println!("    highlight: {} -> {:?}", change.interactor, change.color);
                }
            }
            tracing::info!(
                steps = reports.len(),
                tick = loaded.sim.tick(),
                live_instances = loaded.sim.instances().count(),
                "script finished"
            );
        }
    }

    Ok(())
}
