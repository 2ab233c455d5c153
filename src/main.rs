use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use shadow_lab::mesh::ProceduralMeshes;
use shadow_lab::texture::{DirectoryTextures, ProceduralTextures, TextureProvider};
use shadow_lab::timing::FixedClock;
use shadow_lab::{
    run_headless, run_windowed, Scene, SceneUpdate, ScriptedPress, Settings, Simulation, Viewport,
    WindowInitError,
};

/// Spotlight shadow-mapping demo.
#[derive(Debug, Parser)]
#[command(name = "shadow-lab", version, about)]
struct Cli {
    /// TOML settings file; every value is optional.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    shadow_map_size: Option<u32>,

    /// Full spotlight cone angle in degrees.
    #[arg(long)]
    cone_angle: Option<f32>,

    /// Directory holding texture images instead of the built-in ones.
    #[arg(long)]
    assets: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Run without a window: update, record and audit only.
    #[arg(long)]
    headless: bool,

    /// Number of frames to simulate in headless mode.
    #[arg(long, default_value_t = 120)]
    frames: u32,

    /// Fixed time step in seconds for headless mode.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Key tapped at a headless frame, as FRAME:KEY. Repeatable.
    #[arg(long = "press", value_name = "FRAME:KEY")]
    presses: Vec<String>,
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        log::error!("{err:#}");
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    let presses = cli
        .presses
        .iter()
        .map(|press| ScriptedPress::parse(press))
        .collect::<Result<Vec<_>, _>>()?;

    if cli.headless {
        return headless(&cli, &settings, &presses);
    }

    match run_windowed(build_simulation(&settings)?, &settings.window) {
        Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
            warn!("{err:#}");
            eprintln!("{err}. Falling back to --headless mode.");
            headless(&cli, &settings, &presses)
        }
        result => result,
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(size) = cli.shadow_map_size {
        settings.rendering.shadow_map_size = size;
    }
    if let Some(angle) = cli.cone_angle {
        settings.rendering.cone_angle = angle;
    }
    if let Some(directory) = &cli.assets {
        settings.assets.directory = Some(directory.clone());
    }
    if let Some(width) = cli.width {
        settings.window.width = width;
    }
    if let Some(height) = cli.height {
        settings.window.height = height;
    }
    settings.validate().context("invalid settings")?;
    Ok(settings)
}

fn build_simulation(settings: &Settings) -> Result<Simulation> {
    let textures: Box<dyn TextureProvider> = match &settings.assets.directory {
        Some(directory) => {
            info!("loading textures from {}", directory.display());
            Box::new(DirectoryTextures::new(directory))
        }
        None => Box::new(ProceduralTextures::default()),
    };
    let scene = Scene::demo(settings, &ProceduralMeshes, textures.as_ref())
        .context("failed to initialize scene")?;
    let update = SceneUpdate::new(settings.keys.controls()?, settings.update_settings());
    Ok(Simulation::new(scene, update, settings.keys.quit_key()?))
}

fn headless(cli: &Cli, settings: &Settings, presses: &[ScriptedPress]) -> Result<()> {
    let mut simulation = build_simulation(settings)?;
    let viewport = Viewport::new(settings.window.width, settings.window.height);
    let report = run_headless(
        &mut simulation,
        cli.frames,
        &mut FixedClock::new(cli.dt).context("invalid --dt")?,
        presses,
        viewport,
    );
    let summary = toml::to_string(&report).context("failed to format headless summary")?;
    print!("{summary}");
    if report.hazards > 0 {
        anyhow::bail!("{} binding hazards detected", report.hazards);
    }
    Ok(())
}
