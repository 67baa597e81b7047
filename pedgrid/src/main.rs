mod args;

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use args::Args;
use clap::Parser;
use log::{info, warn};
use pedgrid_simulator::{
    diagnostic::{DiagnosticLog, GridSnapshot},
    scenario::Scenario,
    Simulator,
};

static SIG_INT: AtomicBool = AtomicBool::new(false);

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module("pedgrid", log::LevelFilter::Info)
        .init();

    if cfg!(debug_assertions) {
        warn!("Debug build");
    }

    let args = Args::parse();

    let scenario: Scenario = toml::from_str(&fs::read_to_string(&args.scenario)?)?;
    let options = args.to_simulator_options(scenario.options.clone());
    let delta_time = options.delta_time;
    let mut simulator = Simulator::new(options, &scenario)?;
    info!("Loaded scenario {}", args.scenario.display());

    ctrlc::set_handler(|| SIG_INT.store(true, Ordering::SeqCst))?;

    let min_interval = min_step_interval(delta_time, args.speed);
    if min_interval.is_none() && args.speed != 0.0 {
        warn!("Playback speed {} cannot be throttled, running unthrottled", args.speed);
    }

    let mut diagnostic_log = DiagnosticLog {
        scenario: args.scenario.display().to_string(),
        preprocess_metrics: simulator.preprocess_metrics.clone(),
        ..Default::default()
    };

    loop {
        if SIG_INT.load(Ordering::SeqCst) {
            warn!("Interrupted at step {}", simulator.step);
            break;
        }
        if simulator.is_finished() {
            info!("All pedestrians arrived or got stuck");
            break;
        }
        if args.step_limit.is_some_and(|limit| simulator.step >= limit) {
            info!("Step limit reached");
            break;
        }

        let start = Instant::now();
        let step_metrics = simulator.tick();
        if simulator.step % 100 == 0 {
            info!(
                "Step: {:6}, Active pedestrians: {:6}, Next event: {:?}",
                simulator.step,
                step_metrics.active_ped_count,
                simulator.scheduler().next_event_time()
            );
        }
        diagnostic_log.push(step_metrics);

        if let Some(min_interval) = min_interval {
            let step_time = Instant::now() - start;
            if step_time < min_interval {
                thread::sleep(min_interval - step_time);
            }
        }
    }

    let pedestrians = simulator.list_pedestrians();
    info!(
        "Finished at t = {:.3}: {} arrived, {} stuck, {} active",
        simulator.timestamp,
        pedestrians.iter().filter(|p| p.arrived).count(),
        pedestrians.iter().filter(|p| p.stuck).count(),
        simulator.grid().active_count(),
    );

    diagnostic_log.arrivals = simulator.arrivals.clone();
    diagnostic_log.final_grid = Some(GridSnapshot::capture(simulator.grid()));

    if args.print_grid {
        print!("{}", simulator.grid());
    }

    if let Some(log_dir) = &args.log_dir {
        let log_path = export_log(log_dir, &diagnostic_log)?;
        info!("Exported log file: {}", log_path.display());
    }

    Ok(())
}

/// Wall time one tick must take at the given playback speed, `None` when unthrottled.
fn min_step_interval(delta_time: f64, speed: f64) -> Option<Duration> {
    if speed > 0.0 {
        Duration::try_from_secs_f64(delta_time / speed).ok()
    } else {
        None
    }
}

fn export_log(log_dir: &Path, diagnostic_log: &DiagnosticLog) -> anyhow::Result<PathBuf> {
    let current_time = chrono::Local::now();
    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(current_time.format("%Y-%m-%d_%H%M%S_log.json").to_string());

    let mut log_file = File::create(&log_path)?;
    serde_json::to_writer(&mut log_file, diagnostic_log)?;

    Ok(log_path)
}
