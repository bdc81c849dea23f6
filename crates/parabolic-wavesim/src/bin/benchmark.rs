//! Step throughput benchmark for the canonical reflector pair.
//!
//! Run with: cargo run -p parabolic-wavesim --bin benchmark --release

use std::time::Instant;

use parabolic_wavesim::simulation::{MaterialType, SimulationConfig, StepMode};
use tracing_subscriber::EnvFilter;

const STEPS: usize = 200;

fn main() -> parabolic_wavesim::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("parabolic_wavesim=info")),
        )
        .init();

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║            Parabolic WaveSim Step Throughput                     ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    println!(
        "{:<10} {:>9} {:>9} {:>9} {:>12} {:>12} {:>14}",
        "Grid", "Open", "Shell", "Rigid", "Mode", "Steps/s", "Mcells/s"
    );
    println!("{}", "-".repeat(81));

    for resolution in [100, 200, 300, 600] {
        for mode in [StepMode::Sequential, StepMode::Parallel] {
            let mut sim = SimulationConfig::coarse(resolution).build()?;
            sim.set_step_mode(mode);

            let start = Instant::now();
            sim.step_n(STEPS);
            let elapsed = start.elapsed().as_secs_f64();

            let steps_per_sec = STEPS as f64 / elapsed;
            let cells = (resolution * resolution) as f64;
            let materials = sim.materials();

            println!(
                "{:<10} {:>9} {:>9} {:>9} {:>12} {:>12.1} {:>14.2}",
                format!("{resolution}x{resolution}"),
                materials.count(MaterialType::OpenMedium),
                materials.count(MaterialType::ShellMedium),
                materials.count(MaterialType::Rigid),
                format!("{mode:?}"),
                steps_per_sec,
                steps_per_sec * cells / 1e6
            );
        }
    }

    println!();
    let mut sim = SimulationConfig::coarse(150).with_frequency(4_000.0).build()?;
    let steps = sim.run_until(sim.field().pulse().duration());
    let stats = sim.stats();
    println!(
        "Full pulse at 4 kHz on 150x150: {} steps to t = {:.3} ms, max amplitude {:.4e}, energy {:.4e}",
        steps,
        stats.time * 1e3,
        stats.max_amplitude,
        stats.energy
    );

    Ok(())
}
