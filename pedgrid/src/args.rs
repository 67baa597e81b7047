use std::path::PathBuf;

use pedgrid_simulator::SimulatorOptions;

#[derive(Debug, clap::Parser)]
pub struct Args {
    /// Path to scenario file
    #[arg(default_value = "scenarios/default.toml")]
    pub scenario: PathBuf,
    /// Max playback speed (0 runs unthrottled)
    #[arg(short, long, default_value_t = 100.0)]
    pub speed: f64,
    /// Upper bound on simulation steps
    #[arg(long)]
    pub step_limit: Option<usize>,
    /// Print the final grid to stdout
    #[arg(short, long)]
    pub print_grid: bool,
    /// Directory to write the JSON diagnostic log into
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Let the distance field pass through obstacles at an extra cost
    #[arg(long)]
    pub no_obstacle_avoidance: bool,
    /// Extra cost of entering an obstacle cell
    #[arg(long)]
    pub obstacle_extra_cost: Option<f64>,
    /// Simulated time per step
    #[arg(long)]
    pub delta_time: Option<f64>,
    /// Seed of the track color generator
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Args {
    /// Apply command-line overrides on top of the scenario's options.
    pub fn to_simulator_options(&self, mut options: SimulatorOptions) -> SimulatorOptions {
        if self.no_obstacle_avoidance {
            options.obstacle_avoidance = false;
        }
        if let Some(extra_cost) = self.obstacle_extra_cost {
            options.obstacle_extra_cost = extra_cost;
        }
        if let Some(delta_time) = self.delta_time {
            options.delta_time = delta_time;
        }
        if let Some(seed) = self.seed {
            options.seed = seed;
        }

        options
    }
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;
    use clap::Parser;

    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["pedgrid"]);
        assert_eq!(args.scenario, PathBuf::from("scenarios/default.toml"));
        assert!(args.step_limit.is_none());

        let options = args.to_simulator_options(SimulatorOptions::default());
        assert!(options.obstacle_avoidance);
        assert_float_absolute_eq!(options.delta_time, 1.0);
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "pedgrid",
            "scenarios/chicken.toml",
            "--no-obstacle-avoidance",
            "--obstacle-extra-cost",
            "25",
            "--delta-time",
            "0.5",
            "--step-limit",
            "40",
        ]);
        let base = SimulatorOptions {
            seed: 7,
            ..Default::default()
        };
        let options = args.to_simulator_options(base);

        assert!(!options.obstacle_avoidance);
        assert_float_absolute_eq!(options.obstacle_extra_cost, 25.0);
        assert_float_absolute_eq!(options.delta_time, 0.5);
        assert_eq!(options.seed, 7);
        assert_eq!(args.step_limit, Some(40));
    }
}
