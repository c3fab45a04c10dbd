//! PNG rendering of the trajectories and of the summary statistics.
use std::path::Path;

use anyhow::{ensure, Context};
use plotters::prelude::*;
use stall_kinetics::{aggregate::Summary, SystemState, Trajectory};

const SIZE: (u32, u32) = (1000, 1000);

/// The positive range spanning all `values`, widened to show the extremes.
fn log_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| *v > 0. && v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    (lo <= hi).then_some((lo / 2., hi * 2.))
}

fn stop_codon_range(summary: &Summary) -> (f64, f64) {
    let max = summary
        .buckets
        .iter()
        .map(|stats| stats.stop_codons as f64)
        .fold(1., f64::max);
    (0., max + 1.)
}

/// The number of codons in each state over time.
pub fn trajectory(trajectory: &Trajectory, path: &Path) -> anyhow::Result<()> {
    ensure!(!trajectory.is_empty(), "Cannot plot an empty trajectory");
    let t_max = trajectory.time.last().copied().unwrap_or(1.).max(1.);
    let y_max = trajectory
        .states
        .iter()
        .map(|s| s.codon.max(s.codon_strna).max(s.codon_rf1))
        .fold(1., f64::max)
        * 1.05;

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..t_max, 0f64..y_max)?;
    chart
        .configure_mesh()
        .x_desc("Time (minutes)")
        .y_desc("Codons per State")
        .draw()?;

    let series: [(&str, RGBColor, fn(&SystemState) -> f64); 3] = [
        ("codon", BLUE, |s| s.codon),
        ("codon:stRNA", RED, |s| s.codon_strna),
        ("codon:RF1", GREEN, |s| s.codon_rf1),
    ];
    for (label, color, get) in series {
        chart
            .draw_series(LineSeries::new(
                trajectory
                    .time
                    .iter()
                    .zip(&trajectory.states)
                    .map(|(t, state)| (*t, get(state))),
                &color,
            ))?
            .label(label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color)
            });
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()
        .with_context(|| format!("Cannot write {:#?}", path))?;
    Ok(())
}

/// The min-max band and the mean of the failure probabilities against the
/// number of stop codons, on a log scale.
pub fn probability_per_stop(
    summary: &Summary,
    path: &Path,
) -> anyhow::Result<()> {
    let (y_lo, y_hi) = log_range(
        summary
            .buckets
            .iter()
            .flat_map(|stats| [stats.min, stats.mean, stats.max]),
    )
    .with_context(|| "No positive probability to plot on a log scale")?;
    let (x_lo, x_hi) = stop_codon_range(summary);

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(x_lo..x_hi, (y_lo..y_hi).log_scale())?;
    chart
        .configure_mesh()
        .x_desc("Number of Stop Codons")
        .y_desc("Probability")
        .y_label_formatter(&|y| format!("{:.0e}", y))
        .draw()?;

    // probabilities of zero cannot be shown on a log scale
    let mut band: Vec<(f64, f64)> = summary
        .buckets
        .iter()
        .map(|stats| (stats.stop_codons as f64, stats.max.max(y_lo)))
        .collect();
    band.extend(
        summary
            .buckets
            .iter()
            .rev()
            .map(|stats| (stats.stop_codons as f64, stats.min.max(y_lo))),
    );
    chart
        .draw_series(std::iter::once(Polygon::new(band, BLUE.mix(0.3).filled())))?
        .label("min-max")
        .legend(|(x, y)| {
            Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLUE.mix(0.3).filled())
        });
    chart
        .draw_series(LineSeries::new(
            summary
                .buckets
                .iter()
                .map(|stats| (stats.stop_codons as f64, stats.mean.max(y_lo))),
            &BLUE,
        ))?
        .label("mean")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()
        .with_context(|| format!("Cannot write {:#?}", path))?;
    Ok(())
}

/// The average number of failures per hour against the number of stop codons,
/// on a log scale.
pub fn failures_per_hour(summary: &Summary, path: &Path) -> anyhow::Result<()> {
    let (y_lo, y_hi) = log_range(
        summary.buckets.iter().map(|stats| stats.avg_failures_per_hour),
    )
    .with_context(|| "No positive failure rate to plot on a log scale")?;
    let (x_lo, x_hi) = stop_codon_range(summary);
    let points: Vec<(f64, f64)> = summary
        .buckets
        .iter()
        .map(|stats| {
            (stats.stop_codons as f64, stats.avg_failures_per_hour.max(y_lo))
        })
        .collect();

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(x_lo..x_hi, (y_lo..y_hi).log_scale())?;
    chart
        .configure_mesh()
        .x_desc("Number of Stop Codons")
        .y_desc("Average Frequency of Failures per Hour")
        .y_label_formatter(&|y| format!("{:.0e}", y))
        .draw()?;
    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(
        points.iter().map(|(x, y)| Circle::new((*x, *y), 4, BLUE.filled())),
    )?;
    root.present()
        .with_context(|| format!("Cannot write {:#?}", path))?;
    Ok(())
}
