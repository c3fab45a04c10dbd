use anyhow::{ensure, Context};
use clap::{ArgAction, Parser};
use stall_kinetics::{config::Config, sweep::Sweep};
use std::path::PathBuf;

use crate::app::{App, Output};

pub enum Parallel {
    False,
    True,
    Debug,
}

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "stall", version)]
#[command(
    about = "Ribosome stalling at stop codons: suppressor tRNA against release factor 1",
    long_about = "Sample the binding and unbinding rates of the suppressor tRNA and of the release factor 1, integrate the kinetics of the stalled codons for each combination of rates and initial number of codons, and summarise the probability of reading through the stop codons"
)]
pub struct Cli {
    /// Seed for reproducibility
    #[arg(long, default_value_t = 26)]
    seed: u64,
    /// Number of samples drawn for each rate, overrides the one in the config
    #[arg(long, value_name = "N")]
    samples: Option<usize>,
    /// The JSON file with the configuration, the reference configuration is
    /// used when not provided
    #[arg(long, value_name = "FILE", value_parser = |path: &str| { let path_b = PathBuf::from(path); if path_b.extension() == Some(std::ffi::OsStr::new("json")) { Ok(path_b) } else { Err("Must be JSON file: extension must be .json)") }} ) ]
    config: Option<PathBuf>,
    /// Plot the trajectory of the combination with this index
    #[arg(long, value_name = "INDEX")]
    trajectory: Option<usize>,
    /// Keep the trajectories of all combinations and save them
    #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
    keep_trajectories: bool,
    /// Do not plot the summary statistics
    #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
    no_plots: bool,
    /// Run sequentially each combination instead of using rayon for
    /// parallelisation
    #[arg(short, long, action = ArgAction::SetTrue, default_value_t = false, conflicts_with = "debug")]
    sequential: bool,
    /// Triggers debug mode: max verbosity and sequential sweep
    #[arg(short, long, action = ArgAction::SetTrue, default_value_t = false)]
    debug: bool,
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "debug", default_value_t = 0)]
    verbose: u8,
    /// Path to store the results of the sweep
    #[arg(value_name = "DIR", value_parser = |path: &str| { let path_b = PathBuf::from(path); if path_b.is_dir() { Ok(path_b) } else { Err("Cannot find dir") }} ) ]
    path: PathBuf,
}

impl Cli {
    pub fn build() -> anyhow::Result<App> {
        Cli::parse().into_app()
    }

    fn into_app(self) -> anyhow::Result<App> {
        let (parallel, verbosity) = if self.debug {
            (Parallel::Debug, u8::MAX)
        } else if self.sequential {
            (Parallel::False, self.verbose)
        } else {
            (Parallel::True, self.verbose)
        };

        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(samples) = self.samples {
            config.samples_per_rate = samples;
        }
        config.validate().with_context(|| "Invalid configuration")?;

        let sweep = Sweep::from_seed(config, self.seed)
            .with_context(|| "Cannot sample the rates")?
            .keep_trajectories(self.keep_trajectories);

        if let Some(idx) = self.trajectory {
            ensure!(
                idx < sweep.len(),
                "Cannot plot the trajectory {} of a sweep with {} combinations",
                idx,
                sweep.len()
            );
        }

        Ok(App {
            sweep,
            parallel,
            seed: self.seed,
            output: Output {
                path2dir: self.path,
                plots: !self.no_plots,
                trajectory: self.trajectory,
                save_trajectories: self.keep_trajectories,
            },
            verbosity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        let cli = parse(&["stall", path]);
        assert_eq!(cli.seed, 26);
        assert!(cli.samples.is_none());
        assert!(!cli.sequential);

        let app = cli.into_app().unwrap();
        assert_eq!(app.sweep.len(), 50_000);
        assert!(matches!(app.parallel, Parallel::True));
        assert!(app.output.plots);
    }

    #[test]
    fn samples_override_the_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        let app = parse(&["stall", "--samples", "2", "--seed", "1", path])
            .into_app()
            .unwrap();
        assert_eq!(app.sweep.len(), 2usize.pow(4) * 5);
        assert_eq!(app.seed, 1);
    }

    #[test]
    fn debug_is_sequential_and_verbose() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        let app = parse(&["stall", "-d", path]).into_app().unwrap();
        assert!(matches!(app.parallel, Parallel::Debug));
        assert_eq!(app.verbosity, u8::MAX);
    }

    #[test]
    fn debug_conflicts_with_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        assert!(Cli::try_parse_from(["stall", "-d", "-s", path]).is_err());
    }

    #[test]
    fn trajectory_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        let app = parse(&["stall", "--samples", "1", "--trajectory", "5", path])
            .into_app();
        assert!(app.is_err());
    }

    #[test]
    fn config_must_be_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        assert!(
            Cli::try_parse_from(["stall", "--config", "config.toml", path])
                .is_err()
        );
    }

    #[test]
    fn missing_dir() {
        assert!(Cli::try_parse_from(["stall", "/does/not/exist"]).is_err());
    }

    #[test]
    fn zero_samples_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        assert!(parse(&["stall", "--samples", "0", path]).into_app().is_err());
    }
}
