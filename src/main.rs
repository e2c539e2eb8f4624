//! Headless junction runner.
//!
//! ```bash
//! RUST_LOG=info junction --frames 3600 --voltage -0.8 --seed 7
//! ```

use std::path::PathBuf;

use clap::Parser;
use junction_sim::{
    BiasControl, CarrierKind, HeadlessScene, IntervalExchange, JunctionConfig, Membership, Result,
    Simulation,
};

/// PN-junction carrier transport simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 3600)]
    frames: u64,

    /// Frame duration in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Bias voltage; defaults to the config's initial voltage
    #[arg(short, long, allow_negative_numbers = true)]
    voltage: Option<f32>,

    /// RNG seed for a reproducible run
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON file overriding the default configuration
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Frames between census lines
    #[arg(long, default_value_t = 600)]
    report_every: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("╔═══════════════════════════════════════════════════════╗");
    println!("║           Junction - carrier transport core           ║");
    println!("║   Electrons and holes drifting across a PN junction   ║");
    println!("╚═══════════════════════════════════════════════════════╝\n");

    let mut config = match &args.config {
        Some(path) => JunctionConfig::from_json_file(path)?,
        None => JunctionConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    let bias = BiasControl::new(args.voltage.unwrap_or(config.initial_voltage));
    let exchange = IntervalExchange::from_config(&config);
    let scene = HeadlessScene::new();

    let mut sim = Simulation::new(config, scene.clone(), exchange, bias.clone())?;

    println!("Configuration:");
    println!("  Capacity: {} per kind", sim.config().capacity);
    println!("  Box: {}", sim.config().box_size);
    println!("  Bias: {:.2} V", bias.get());
    println!("  Frame: {:.2} ms", args.dt * 1e3);
    println!("  Frames: {}\n", args.frames);
    let start_time = std::time::Instant::now();

    for frame in 1..=args.frames {
        sim.step(args.dt);
        if args.report_every > 0 && frame % args.report_every == 0 {
            let stats = sim.statistics();
            log::info!(
                "frame {}: t={:.1}s electrons={} holes={} extracting={} injecting={}",
                frame,
                sim.time().now_ms / 1e3,
                stats.live(CarrierKind::Electron),
                stats.live(CarrierKind::Hole),
                stats.extraction_queue,
                stats.injection_queue
            );
        }
    }

    let elapsed = start_time.elapsed();
    let stats = sim.statistics();

    println!("Statistics:");
    println!("  Simulated time: {:.2} s", sim.time().now_ms / 1e3);
    println!("  Wall clock time: {:.2} s", elapsed.as_secs_f64());
    println!("  Half-width: {:.2}", sim.half_width());
    println!("  Live electrons: {}", sim.population(CarrierKind::Electron));
    println!("  Live holes: {}", sim.population(CarrierKind::Hole));
    println!("  Extraction queue: {}", sim.queue_len(Membership::Extraction));
    println!("  Injection queue: {}", sim.queue_len(Membership::Injection));
    println!("  Evictions: {}", stats.evictions);
    println!("  Extracted: {}", stats.extracted);
    println!("  Injected: {}", stats.injected);
    println!("  Generated pairs: {}", stats.generated_pairs);
    println!("  Recombinations: {}", stats.recombinations);
    println!("  Render handles live: {}", scene.live_count());

    println!("\n✓ Simulation completed successfully");
    Ok(())
}
