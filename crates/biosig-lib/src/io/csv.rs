use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::path::Path;

use super::text::wave_from_rows;
use crate::signal::WaveSeries;

/// Load a CSV with a header row and build a wave from two of its columns.
///
/// Column names match case-insensitively. Timing follows the same rules as
/// [`import_wave`](super::text::import_wave).
pub fn import_wave_csv(
    path: &Path,
    time_column: &str,
    value_column: &str,
    wave_type: &str,
) -> Result<WaveSeries> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .with_context(|| format!("missing column '{}'", name))
    };
    let time_idx = position(time_column)?;
    let value_idx = position(value_column)?;

    let mut times = Vec::new();
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record.context("reading record")?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let field = |idx: usize, name: &str| -> Result<f64> {
            let raw = record
                .get(idx)
                .ok_or_else(|| anyhow!("line {line}: missing '{name}' field"))?;
            raw.parse::<f64>()
                .with_context(|| format!("line {line}: parsing '{name}' value {raw}"))
        };
        times.push(field(time_idx, time_column)?);
        values.push(field(value_idx, value_column)?);
    }
    wave_from_rows(&times, values, wave_type)
        .with_context(|| format!("building wave from {}", path.display()))
}
