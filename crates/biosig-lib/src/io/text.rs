use anyhow::{bail, Context, Result};
use log::warn;
use std::path::Path;

use crate::signal::{PointSeries, WaveSeries};

/// Split a data line on whitespace, commas, semicolons or tabs.
fn fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|f| !f.is_empty())
}

/// Parse rows of `columns` floating point fields, ignoring blank/comment lines.
pub fn parse_rows(text: &str, columns: usize) -> Result<Vec<Vec<f64>>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let row = fields(trimmed)
            .map(|f| {
                f.parse::<f64>()
                    .with_context(|| format!("line {} is not f64: {}", idx + 1, f))
            })
            .collect::<Result<Vec<f64>>>()?;
        if row.len() != columns {
            bail!(
                "line {} has {} fields, expected {}: {}",
                idx + 1,
                row.len(),
                columns,
                trimmed
            );
        }
        out.push(row);
    }
    if out.is_empty() {
        bail!("no numeric rows found");
    }
    Ok(out)
}

/// Build a wave from `(time, value)` rows.
///
/// The offset is the first time and the sample period is the mean spacing,
/// `(last - first) / (n - 1)`; a spacing that strays from it is only warned
/// about.
pub fn wave_from_rows(times: &[f64], values: Vec<f64>, wave_type: &str) -> Result<WaveSeries> {
    if times.len() < 2 {
        bail!("a wave needs at least 2 samples, got {}", times.len());
    }
    if let Some(w) = times.windows(2).find(|w| !(w[1] > w[0])) {
        bail!("sample times must increase, found {} then {}", w[0], w[1]);
    }
    let first = times[0];
    let period = (times[times.len() - 1] - first) / (times.len() - 1) as f64;
    let worst = times
        .windows(2)
        .map(|w| ((w[1] - w[0]) - period).abs())
        .fold(0.0f64, f64::max);
    if worst > 0.01 * period {
        warn!(
            "irregular sampling in '{wave_type}': spacing deviates {worst:.6} s from the {period:.6} s mean"
        );
    }
    let complete_length = times.len() as f64 * period;
    Ok(WaveSeries::new(values, complete_length, wave_type, first)?)
}

/// Read a wave stored as `time value` rows.
pub fn import_wave(path: &Path, wave_type: &str) -> Result<WaveSeries> {
    let rows = read_rows(path, 2)?;
    let times: Vec<f64> = rows.iter().map(|r| r[0]).collect();
    let values = rows.iter().map(|r| r[1]).collect();
    wave_from_rows(&times, values, wave_type)
        .with_context(|| format!("building wave from {}", path.display()))
}

/// Read a single-column sample file recorded at `sample_rate` Hz.
pub fn import_wave_samples(path: &Path, sample_rate: f64, wave_type: &str) -> Result<WaveSeries> {
    let rows = read_rows(path, 1)?;
    let values = rows.into_iter().map(|r| r[0]).collect();
    WaveSeries::from_samples(values, sample_rate, wave_type, 0.0)
        .with_context(|| format!("building wave from {}", path.display()))
}

/// Read a point set stored as `x y` rows.
pub fn import_points(path: &Path, point_type: &str) -> Result<PointSeries> {
    let rows = read_rows(path, 2)?;
    let pairs = rows.into_iter().map(|r| (r[0], r[1])).collect();
    PointSeries::from_pairs(pairs, point_type)
        .with_context(|| format!("building points from {}", path.display()))
}

fn read_rows(path: &Path, columns: usize) -> Result<Vec<Vec<f64>>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_rows(&text, columns).with_context(|| format!("parsing {}", path.display()))
}
