//! Viewer for side-by-side RGBD frames.

use std::path::PathBuf;

use clap::Parser;
use rgbd_particles::prelude::*;
use rgbd_particles::visuals::is_hidden;

#[derive(Parser)]
#[command(name = "rgbd-particles")]
#[command(about = "Animated point clouds from side-by-side RGBD video", long_about = None)]
#[command(version)]
struct Cli {
    /// Side-by-side frame image (color left, hue-encoded depth right)
    frame: PathBuf,

    /// Calibration: a metadata .json file or a recording with it appended
    metadata: PathBuf,

    /// Grid edge length; the particle count is its square
    #[arg(long, default_value_t = 256)]
    grid: u32,

    /// Run this many ticks on the CPU without a window and print statistics
    #[arg(long, value_name = "TICKS")]
    headless: Option<u64>,

    /// Lifetime in seconds for every particle instead of a random range
    #[arg(long)]
    lifetime: Option<f32>,
}

fn main() -> Result<(), SimulationError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let source = StillFrameSource::open(&cli.frame, &cli.metadata)?;

    let lifecycle = match cli.lifetime {
        Some(seconds) => Lifecycle::new().lifetime(seconds),
        None => Lifecycle::flicker(),
    };
    let sim = Simulation::new().with_grid_size(cli.grid).with_lifecycle(lifecycle);

    match cli.headless {
        Some(ticks) => run_headless(sim, &source, ticks),
        None => sim.run(source),
    }
}

fn run_headless(sim: Simulation, source: &StillFrameSource, ticks: u64) -> Result<(), SimulationError> {
    let mut engine = sim.build()?;
    let mut clock = FrameClock::new().with_fixed_delta(1.0 / 60.0);
    let cells = engine.grid().cell_count();

    while let Some((dt, time)) = clock.tick() {
        if clock.frame() > ticks {
            break;
        }
        engine.tick(dt, time, source);
        log::debug!("tick {}: {:?}", engine.tick_count(), engine.stats());
    }

    let stats = engine.stats();
    let textures = engine.render_textures();
    let visible = textures
        .lifecycle
        .iter()
        .zip(textures.position)
        .filter(|(life, pos)| !is_hidden(life, pos.flag))
        .count();
    println!(
        "{} ticks, {} cells: {} respawning, {} discarded, {} visible",
        engine.tick_count(),
        cells,
        stats.respawning,
        stats.discarded,
        visible
    );
    Ok(())
}
