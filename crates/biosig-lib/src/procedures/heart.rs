use crate::dataset::CompositeDataset;
use crate::metrics::hrv::{heart_rate_bpm, hrv_time};
use crate::procedure::{Arguments, Entry, ProcedureModule};
use crate::signal::RRSeries;
use anyhow::{anyhow, bail, Result};

const R_POINTS: &str = "r";

pub(super) fn heart_rate_module() -> ProcedureModule {
    ProcedureModule {
        name: "parameter_heart_rate".into(),
        description: "Heart rate in beats per minute from the mean R-R period.".into(),
        author: "biosig".into(),
        kind: Some("parameter".into()),
        default_arguments: Some(Arguments::new()),
        required_points: vec![R_POINTS.into()],
        output_type: Some("hr".into()),
        entry: Some(Entry::Parameter(heart_rate)),
        ..ProcedureModule::default()
    }
}

pub(super) fn rmssd_module() -> ProcedureModule {
    ProcedureModule {
        name: "parameter_rmssd".into(),
        description: "Root mean square of successive R-R differences, in seconds.".into(),
        author: "biosig".into(),
        kind: Some("parameter".into()),
        default_arguments: Some(Arguments::new().with("min_beats", 3i64)),
        required_points: vec![R_POINTS.into()],
        output_type: Some("rmssd".into()),
        entry: Some(Entry::Parameter(rmssd)),
        ..ProcedureModule::default()
    }
}

/// R-R intervals between the beats falling in `[begin, end)`.
fn rr_in(dataset: &CompositeDataset, begin: f64, end: f64, min_beats: usize) -> Result<RRSeries> {
    let beats = dataset
        .point_set(R_POINTS)
        .ok_or_else(|| anyhow!("dataset has no '{R_POINTS}' points"))?;
    let (times, _) = beats.data_slice(begin, end);
    if times.len() < min_beats {
        bail!(
            "[{begin}, {end}) holds {} beats, at least {min_beats} needed",
            times.len()
        );
    }
    Ok(RRSeries::from_beat_times(times))
}

fn heart_rate(
    dataset: &CompositeDataset,
    intervals: &[(f64, f64)],
    _args: &Arguments,
) -> Result<Vec<f64>> {
    intervals
        .iter()
        .map(|&(b, e)| -> Result<f64> {
            let rr = rr_in(dataset, b, e, 2)?;
            heart_rate_bpm(&rr).ok_or_else(|| anyhow!("[{b}, {e}) has no positive R-R period"))
        })
        .collect()
}

fn rmssd(dataset: &CompositeDataset, intervals: &[(f64, f64)], args: &Arguments) -> Result<Vec<f64>> {
    let min_beats = args.integer("min_beats")?;
    if min_beats < 3 {
        bail!("min_beats must be at least 3, got {min_beats}");
    }
    intervals
        .iter()
        .map(|&(b, e)| -> Result<f64> {
            Ok(hrv_time(&rr_in(dataset, b, e, min_beats as usize)?).rmssd)
        })
        .collect()
}
