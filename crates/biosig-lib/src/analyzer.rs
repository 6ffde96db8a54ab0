//! Runs procedures over a dataset and wraps their output.
//!
//! Every function here reads its inputs and returns a new, detached series.
//! Nothing is written back: committing a result (`WaveSeries::replace_slice`,
//! `CompositeDataset::join_points`, `CompositeDataset::add_parameter`, ...) is
//! always a separate call made by the caller.

use crate::dataset::CompositeDataset;
use crate::error::{Error, Result};
use crate::procedure::{Arguments, Entry, Procedure, ProcedureKind};
use crate::signal::{ParameterSeries, PointSeries, Sampling, WaveSeries};
use log::debug;

/// Run a Modify procedure over the raw samples of `[begin, end)`.
///
/// The result starts at the first sliced sample, keeps the wave's sample
/// rate and type, and lasts `count * sample_length` seconds, so it can be
/// passed straight to `replace_slice(begin, end, ..)`.
pub fn modify_wave(
    wave: &WaveSeries,
    begin: f64,
    end: f64,
    procedure: &Procedure,
    arguments: &Arguments,
) -> Result<WaveSeries> {
    let Entry::Modify(modify) = procedure.entry() else {
        return Err(wrong_kind(procedure, ProcedureKind::Modify));
    };
    arguments.check_against(procedure.default_arguments(), procedure.name())?;
    let input = wave.data_slice(begin, end, Sampling::Raw)?;
    if input.len() < 2 {
        return Err(Error::range(
            begin,
            end,
            format!("window holds {} raw samples, at least 2 needed", input.len()),
        ));
    }
    let first = wave.sample_at(begin)?;
    debug!(
        "running '{}' over {} samples of '{}' in [{begin}, {end})",
        procedure.name(),
        input.len(),
        wave.wave_type()
    );
    let output = modify(&input, wave.sample_rate(), arguments).map_err(|e| failed(procedure, e))?;
    if output.len() != input.len() {
        return Err(Error::contract(
            procedure.name(),
            format!("returned {} samples for {} input samples", output.len(), input.len()),
        ));
    }
    if output.iter().any(|v| !v.is_finite()) {
        return Err(Error::contract(procedure.name(), "returned non-finite samples"));
    }
    let complete_length = output.len() as f64 * wave.sample_length();
    WaveSeries::new(output, complete_length, wave.wave_type(), wave.sample_time(first))
}

/// Run a PointFinder procedure over `[begin, end)` of the dataset.
///
/// The returned points are sorted by time and tagged with the procedure's
/// output type.
pub fn find_points(
    dataset: &CompositeDataset,
    begin: f64,
    end: f64,
    procedure: &Procedure,
    arguments: &Arguments,
) -> Result<PointSeries> {
    let Entry::Points(find) = procedure.entry() else {
        return Err(wrong_kind(procedure, ProcedureKind::Points));
    };
    arguments.check_against(procedure.default_arguments(), procedure.name())?;
    check_required_channels(dataset, procedure)?;
    check_window(dataset, procedure, begin, end)?;
    debug!("running '{}' over [{begin}, {end})", procedure.name());
    let pairs = find(dataset, begin, end, arguments).map_err(|e| failed(procedure, e))?;
    if let Some((x, y)) = pairs
        .iter()
        .find(|(x, y)| !x.is_finite() || !y.is_finite() || *x < begin || *x >= end)
    {
        return Err(Error::contract(
            procedure.name(),
            format!("returned point ({x}, {y}) outside [{begin}, {end}) or not finite"),
        ));
    }
    PointSeries::from_pairs(pairs, procedure.output_type())
}

/// Run a ParameterCalculator over each interval, keeping their order.
pub fn calculate_parameter(
    dataset: &CompositeDataset,
    intervals: &[(f64, f64)],
    procedure: &Procedure,
    arguments: &Arguments,
) -> Result<ParameterSeries> {
    let Entry::Parameter(calculate) = procedure.entry() else {
        return Err(wrong_kind(procedure, ProcedureKind::Parameter));
    };
    arguments.check_against(procedure.default_arguments(), procedure.name())?;
    check_required_channels(dataset, procedure)?;
    for &(b, e) in intervals {
        check_window(dataset, procedure, b, e)?;
    }
    debug!(
        "running '{}' over {} intervals",
        procedure.name(),
        intervals.len()
    );
    let values = calculate(dataset, intervals, arguments).map_err(|e| failed(procedure, e))?;
    if values.len() != intervals.len() {
        return Err(Error::ShapeMismatch(format!(
            "procedure '{}' returned {} values for {} intervals",
            procedure.name(),
            values.len(),
            intervals.len()
        )));
    }
    if let Some(v) = values.iter().find(|v| !v.is_finite()) {
        return Err(Error::contract(
            procedure.name(),
            format!("returned non-finite value {v}"),
        ));
    }
    ParameterSeries::from_intervals(procedure.output_type(), intervals, values)
}

/// Split `[begin, end)` into consecutive windows of `width` seconds; the last
/// one is shortened to end at `end`.
pub fn windows(begin: f64, end: f64, width: f64) -> Result<Vec<(f64, f64)>> {
    if !(begin < end) {
        return Err(Error::range(begin, end, "begin must precede end"));
    }
    if !(width > 0.0) || !width.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "window width must be positive and finite, got {width}"
        )));
    }
    let count = ((end - begin) / width - 1e-9).ceil().max(1.0) as usize;
    Ok((0..count)
        .map(|k| {
            let b = begin + k as f64 * width;
            (b, (b + width).min(end))
        })
        .collect())
}

fn wrong_kind(procedure: &Procedure, expected: ProcedureKind) -> Error {
    Error::contract(
        procedure.name(),
        format!("is a '{}' procedure, not '{expected}'", procedure.kind()),
    )
}

fn check_required_channels(dataset: &CompositeDataset, procedure: &Procedure) -> Result<()> {
    if let Some(key) = procedure
        .required_waves()
        .iter()
        .find(|key| dataset.wave(key).is_none())
    {
        return Err(Error::contract(
            procedure.name(),
            format!("needs wave channel '{key}' which the dataset lacks"),
        ));
    }
    if let Some(key) = procedure
        .required_points()
        .iter()
        .find(|key| dataset.point_set(key).is_none())
    {
        return Err(Error::contract(
            procedure.name(),
            format!("needs point channel '{key}' which the dataset lacks"),
        ));
    }
    Ok(())
}

/// Required waves must cover all of `[begin, end)`; required point sets must
/// share part of their `[first, last]` span with it.
fn check_window(
    dataset: &CompositeDataset,
    procedure: &Procedure,
    begin: f64,
    end: f64,
) -> Result<()> {
    if !(begin < end) || !begin.is_finite() || !end.is_finite() {
        return Err(Error::range(begin, end, "begin must precede end"));
    }
    for key in procedure.required_waves() {
        if let Some(wave) = dataset.wave(key) {
            wave.check_range(begin, end)?;
        }
    }
    for key in procedure.required_points() {
        let Some(points) = dataset.point_set(key) else {
            continue;
        };
        match points.time_span() {
            Some((first, last)) if begin <= last && first < end => {}
            _ => {
                return Err(Error::range(
                    begin,
                    end,
                    format!("does not reach any '{key}' point"),
                ))
            }
        }
    }
    Ok(())
}

fn failed(procedure: &Procedure, err: anyhow::Error) -> Error {
    Error::ProcedureFailed {
        name: procedure.name().to_string(),
        message: format!("{err:#}"),
    }
}
