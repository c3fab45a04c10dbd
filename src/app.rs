use anyhow::Context;
use chrono::Utc;
use indicatif::ProgressBar;
use serde::Serialize;
use stall_kinetics::{
    aggregate::{aggregate, Summary},
    sampler::RateGrid,
    sweep::{Outcome, Sweep},
    Trajectory,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{clap_app::Parallel, plot};

pub struct Output {
    pub path2dir: PathBuf,
    pub plots: bool,
    /// Index of the combination whose trajectory is plotted
    pub trajectory: Option<usize>,
    pub save_trajectories: bool,
}

pub struct App {
    pub sweep: Sweep,
    pub parallel: Parallel,
    pub seed: u64,
    pub output: Output,
    pub verbosity: u8,
}

impl App {
    pub fn run(&self) -> anyhow::Result<()> {
        if self.verbosity > 1 {
            print_grid(self.sweep.grid());
        }
        let outcomes = self.sweep_outcomes();
        report_failures(&outcomes, self.verbosity);

        let summary = aggregate(&self.sweep, &outcomes)
            .with_context(|| "Cannot aggregate the failure probabilities")?;
        if self.verbosity > 0 {
            print_summary(&summary);
        }

        let path2dir = &self.output.path2dir;
        self.sweep
            .config()
            .save(&path2dir.join("config.json"))
            .with_context(|| "Cannot save the configuration")?;
        fs::write(path2dir.join("seed.txt"), self.seed.to_string())
            .with_context(|| "Cannot save the seed")?;
        save_outcomes(&outcomes, &path2dir.join("sweep.csv"), self.verbosity)?;
        save_summary(&summary, &path2dir.join("summary.csv"), self.verbosity)?;
        if self.output.save_trajectories {
            save_trajectories(
                &outcomes,
                &path2dir.join("trajectories"),
                self.verbosity,
            )?;
        }

        if self.output.plots {
            plot::probability_per_stop(
                &summary,
                &path2dir.join("prob_per_stop.png"),
            )
            .with_context(|| "Cannot plot the probabilities")?;
            plot::failures_per_hour(
                &summary,
                &path2dir.join("avg_fail_per_hour.png"),
            )
            .with_context(|| "Cannot plot the failures per hour")?;
        }
        if let Some(idx) = self.output.trajectory {
            let trajectory = self
                .sweep
                .trajectory(idx)
                .with_context(|| format!("No combination with index {}", idx))?
                .with_context(|| {
                    format!("Cannot integrate the combination {}", idx)
                })?;
            plot::trajectory(&trajectory, &path2dir.join("model.png"))
                .with_context(|| {
                    format!("Cannot plot the trajectory of {}", idx)
                })?;
        }
        if self.verbosity > 0 {
            println!("{} Results saved in {:#?}", Utc::now(), path2dir);
        }
        Ok(())
    }

    fn sweep_outcomes(&self) -> Vec<Outcome> {
        match self.parallel {
            Parallel::Debug | Parallel::False => self.sweep.run(),
            Parallel::True => {
                let progress = ProgressBar::new(self.sweep.len() as u64);
                let outcomes =
                    self.sweep.par_run_with_progress(Some(&progress));
                progress.finish();
                outcomes
            }
        }
    }
}

fn print_grid(grid: &RateGrid) {
    println!("stRNA binding rates: {:?}", grid.strna_bind);
    println!("RF1 binding rates: {:?}", grid.rf1_bind);
    println!("stRNA unbinding rates: {:?}", grid.strna_unbind);
    println!("RF1 unbinding rates: {:?}", grid.rf1_unbind);
}

fn print_summary(summary: &Summary) {
    for stats in &summary.buckets {
        println!(
            "{} stop codons ({} codons): min {:e}, mean {:e}, max {:e}, {:e} failures per hour over {} combinations",
            stats.stop_codons,
            stats.initial_codons,
            stats.min,
            stats.mean,
            stats.max,
            stats.avg_failures_per_hour,
            stats.count
        );
        if stats.above_one > 0 {
            println!(
                "{} probabilities greater than one for {} codons",
                stats.above_one, stats.initial_codons
            );
        }
    }
}

fn report_failures(outcomes: &[Outcome], verbosity: u8) {
    let mut failed = 0usize;
    for outcome in outcomes {
        if let Err(err) = &outcome.probability {
            failed += 1;
            if verbosity > 1 {
                eprintln!(
                    "combination {} with {:?} failed: {}",
                    outcome.index, outcome.combo, err
                );
            }
        }
    }
    if failed > 0 {
        eprintln!(
            "{} {} out of {} combinations failed",
            Utc::now(),
            failed,
            outcomes.len()
        );
    }
}

/// One row of `sweep.csv`.
#[derive(Debug, Serialize)]
struct OutcomeRecord {
    index: usize,
    strna_bind: f64,
    rf1_bind: f64,
    strna_unbind: f64,
    rf1_unbind: f64,
    initial_codons: f64,
    codon: Option<f64>,
    codon_strna: Option<f64>,
    codon_rf1: Option<f64>,
    probability: Option<f64>,
    error: Option<String>,
}

impl From<&Outcome> for OutcomeRecord {
    fn from(outcome: &Outcome) -> Self {
        let rates = outcome.combo.rates;
        let (probability, error) = match &outcome.probability {
            Ok(prob) => (Some(*prob), None),
            Err(err) => (None, Some(err.to_string())),
        };
        OutcomeRecord {
            index: outcome.index,
            strna_bind: rates.strna_bind,
            rf1_bind: rates.rf1_bind,
            strna_unbind: rates.strna_unbind,
            rf1_unbind: rates.rf1_unbind,
            initial_codons: outcome.combo.initial_codons,
            codon: outcome.final_state.map(|s| s.codon),
            codon_strna: outcome.final_state.map(|s| s.codon_strna),
            codon_rf1: outcome.final_state.map(|s| s.codon_rf1),
            probability,
            error,
        }
    }
}

pub fn save_outcomes(
    outcomes: &[Outcome],
    path2file: &Path,
    verbosity: u8,
) -> anyhow::Result<()> {
    if verbosity > 1 {
        println!("Saving the outcomes to {:#?}", path2file);
    }
    let mut wtr = csv::Writer::from_path(path2file)
        .with_context(|| format!("Cannot create {:#?}", path2file))?;
    for outcome in outcomes {
        wtr.serialize(OutcomeRecord::from(outcome)).with_context(|| {
            format!("Cannot serialize the outcome {}", outcome.index)
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_summary(
    summary: &Summary,
    path2file: &Path,
    verbosity: u8,
) -> anyhow::Result<()> {
    if verbosity > 1 {
        println!("Saving the summary to {:#?}", path2file);
    }
    let mut wtr = csv::Writer::from_path(path2file)
        .with_context(|| format!("Cannot create {:#?}", path2file))?;
    for stats in &summary.buckets {
        wtr.serialize(stats).with_context(|| {
            "Cannot serialize the summary statistics".to_string()
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row of a trajectory file.
#[derive(Debug, Serialize)]
struct TrajectoryRecord {
    time: f64,
    codon: f64,
    codon_strna: f64,
    codon_rf1: f64,
}

pub fn save_trajectory(
    trajectory: &Trajectory,
    path2file: &Path,
) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path2file)
        .with_context(|| format!("Cannot create {:#?}", path2file))?;
    for (time, state) in trajectory.time.iter().zip(&trajectory.states) {
        wtr.serialize(TrajectoryRecord {
            time: *time,
            codon: state.codon,
            codon_strna: state.codon_strna,
            codon_rf1: state.codon_rf1,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn save_trajectories(
    outcomes: &[Outcome],
    path2dir: &Path,
    verbosity: u8,
) -> anyhow::Result<()> {
    fs::create_dir_all(path2dir)
        .with_context(|| format!("Cannot create dir {:#?}", path2dir))?;
    if verbosity > 1 {
        println!("Saving the trajectories to {:#?}", path2dir);
    }
    for outcome in outcomes {
        if let Some(trajectory) = &outcome.trajectory {
            let mut path2file = path2dir.join(outcome.index.to_string());
            path2file.set_extension("csv");
            save_trajectory(trajectory, &path2file)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stall_kinetics::config::{Config, TimeGrid};

    fn small_sweep() -> Sweep {
        let config = Config {
            samples_per_rate: 1,
            initial_codons: vec![200., 400.],
            stop_codons: vec![1, 2],
            time: TimeGrid { steps: 20, dt: 1. },
            ..Default::default()
        };
        Sweep::from_seed(config, 26).unwrap().keep_trajectories(true)
    }

    #[test]
    fn save_outcomes_one_row_per_combination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.csv");
        let outcomes = small_sweep().run();
        save_outcomes(&outcomes, &path, 0).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("index"));
        assert_eq!(headers.get(9), Some("probability"));
        assert_eq!(rdr.records().count(), 2);
    }

    #[test]
    fn save_summary_one_row_per_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let sweep = small_sweep();
        let summary = aggregate(&sweep, &sweep.run()).unwrap();
        save_summary(&summary, &path, 0).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        assert_eq!(rdr.records().count(), 2);
    }

    #[test]
    fn run_without_plots_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let app = App {
            sweep: small_sweep(),
            parallel: Parallel::False,
            seed: 26,
            output: Output {
                path2dir: dir.path().to_path_buf(),
                plots: false,
                trajectory: None,
                save_trajectories: true,
            },
            verbosity: 0,
        };
        app.run().unwrap();
        for file in ["config.json", "seed.txt", "sweep.csv", "summary.csv"] {
            assert!(dir.path().join(file).is_file(), "missing {}", file);
        }
        assert!(dir.path().join("trajectories").join("0.csv").is_file());
        assert!(dir.path().join("trajectories").join("1.csv").is_file());
        assert_eq!(
            Config::load(&dir.path().join("config.json")).unwrap(),
            *app.sweep.config()
        );
    }
}
