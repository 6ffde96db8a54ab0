use crate::dataset::CompositeDataset;
use crate::detectors::ecg::{detect_r_peaks, EcgPipelineConfig};
use crate::procedure::{Arguments, Entry, ProcedureModule};
use crate::signal::Sampling;
use anyhow::{anyhow, Result};

const ECG: &str = "ecg";

pub(super) fn module() -> ProcedureModule {
    ProcedureModule {
        name: "points_r_simple".into(),
        description: "Pan-Tompkins style R-peak detector on the 'ecg' wave.".into(),
        author: "biosig".into(),
        kind: Some("points".into()),
        default_arguments: Some(EcgPipelineConfig::default().to_arguments()),
        required_waves: vec![ECG.into()],
        output_type: Some("r".into()),
        entry: Some(Entry::Points(find_r_peaks)),
        ..ProcedureModule::default()
    }
}

fn find_r_peaks(
    dataset: &CompositeDataset,
    begin: f64,
    end: f64,
    args: &Arguments,
) -> Result<Vec<(f64, f64)>> {
    let wave = dataset
        .wave(ECG)
        .ok_or_else(|| anyhow!("dataset has no '{ECG}' wave"))?;
    let cfg = EcgPipelineConfig::from_arguments(args)?;

    let data = wave.data_slice(begin, end, Sampling::Raw)?;
    let first = wave.sample_at(begin)?;

    Ok(detect_r_peaks(&data, wave.sample_rate(), &cfg)
        .into_iter()
        .map(|i| (wave.sample_time(first + i), data[i]))
        // The first raw sample may sit half a period before `begin`.
        .filter(|(x, _)| *x >= begin && *x < end)
        .collect())
}
