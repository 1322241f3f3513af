//! Synthetic frame loop driving the quality controller.
//!
//! Simulates an application with several quality settings whose true
//! per-option costs are hidden from the controller. Each frame the
//! controller picks options under the budget, the "application" measures
//! noisy costs for the applied choices, and mid-run a throttling window
//! inflates every cost to exercise anomaly tracking. A profile snapshot
//! can be carried between runs to exercise past-run seeding.
//!
//! Usage:
//! ```bash
//! cargo run --bin frame_sim -- --frames 2000 --limit 12 --save profile.json
//! cargo run --bin frame_sim -- --frames 500 --limit 12 --load profile.json
//! ```

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::info;

use frametune::{
    init_logging, ArraySetting, ControllerConfig, LogConfig, ProfileSnapshot, QualityController,
    Setting,
};

#[derive(Parser)]
#[command(name = "frame_sim")]
#[command(version, about = "Synthetic workload for the quality controller", long_about = None)]
struct Cli {
    /// Frames to simulate
    #[arg(long, default_value = "2000")]
    frames: usize,

    /// Mean net-burden budget per frame (milliseconds, say)
    #[arg(long, default_value = "12.0")]
    limit: f64,

    /// Number of simulated settings
    #[arg(long, default_value = "6")]
    settings: usize,

    /// Value bonus for under-sampled options
    #[arg(long, default_value = "0.0")]
    explore_value: f64,

    /// Cost multiplier applied during the mid-run throttling window
    #[arg(long, default_value = "1.5")]
    throttle: f64,

    /// RNG seed; omit for a random one
    #[arg(long)]
    seed: Option<u64>,

    /// Profile snapshot to load as the past run
    #[arg(long)]
    load: Option<PathBuf>,

    /// Where to save this run's profile snapshot
    #[arg(long)]
    save: Option<PathBuf>,
}

struct SimSetting {
    handle: Rc<RefCell<ArraySetting>>,
    /// Hidden true mean cost per option.
    true_costs: Vec<f64>,
}

fn main() -> frametune::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&LogConfig::default());

    let seed = cli.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    info!(seed, frames = cli.frames, limit = cli.limit, "starting simulation");

    let config = ControllerConfig {
        explore_value: cli.explore_value,
        ..Default::default()
    };
    config.validate()?;
    let mut controller = QualityController::new(config);

    if let Some(path) = &cli.load {
        let snapshot = ProfileSnapshot::load(path)?;
        info!(path = %path.display(), tasks = snapshot.task_count(), "loaded past profile");
        controller.load_past_profile(&snapshot);
    }

    // Each setting gets four options: higher options are worth more and
    // cost more, with a per-setting weight so settings differ.
    let mut sim_settings = Vec::with_capacity(cli.settings);
    for index in 0..cli.settings {
        let weight = rng.gen_range(0.5..2.0);
        let values: Vec<f64> = (0..4).map(|o| o as f64 * rng.gen_range(1.0..4.0)).collect();
        let true_costs: Vec<f64> = (0..4).map(|o| o as f64 * weight).collect();

        let setting = ArraySetting::new(format!("setting-{index:02}"), values, 0).into_handle();
        controller.register(setting.clone());
        sim_settings.push(SimSetting {
            handle: setting,
            true_costs,
        });
    }

    let noise = Normal::new(0.0, 0.05).expect("valid noise distribution");
    let throttle_window = (cli.frames * 2 / 5)..(cli.frames * 3 / 5);
    let mut over_capacity_frames = 0usize;

    for frame in 0..cli.frames {
        let summary = controller.update(cli.limit);
        if !summary.within_capacity {
            over_capacity_frames += 1;
        }

        let throttled = throttle_window.contains(&frame);
        for sim in &sim_settings {
            let choice = sim.handle.borrow().choice_current();
            let mut cost = sim.true_costs[choice];
            if throttled {
                cost *= cli.throttle;
            }
            cost *= 1.0 + noise.sample(&mut rng);
            sim.handle.borrow_mut().submit(cost.max(0.0));
        }

        if frame % 500 == 0 || frame + 1 == cli.frames {
            info!(
                frame,
                net_value = summary.net_value,
                predicted_burden = summary.net_burden.mean,
                anomaly = summary.anomaly_recent,
                ratio = ?summary.past_present_ratio,
                throttled,
                "frame"
            );
        }
    }

    for sim in &sim_settings {
        let setting = sim.handle.borrow();
        let choice = setting.choice_current();
        info!(
            setting = setting.id(),
            choice,
            true_cost = sim.true_costs[choice],
            "final choice"
        );
    }
    info!(
        over_capacity_frames,
        anomaly_recent = controller.anomaly().recent(),
        "simulation done"
    );

    if let Some(path) = &cli.save {
        let snapshot = controller.snapshot();
        snapshot.save(path)?;
        info!(path = %path.display(), tasks = snapshot.task_count(), "saved profile snapshot");
    }

    Ok(())
}
