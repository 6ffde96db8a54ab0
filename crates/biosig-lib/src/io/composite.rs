//! Versioned JSON persistence for [`CompositeDataset`].
//!
//! Documents are decoded through plain record structs and every series is
//! rebuilt with its checked constructor, so a hand-edited file cannot smuggle
//! in a wave with mismatched lengths or an unsorted point set.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::dataset::CompositeDataset;
use crate::signal::{ParameterSeries, PointSeries, WaveSeries};

pub const FORMAT: &str = "biosig-composite";
pub const VERSION: u32 = 1;

#[derive(Serialize)]
struct DocumentRef<'a> {
    format: &'static str,
    version: u32,
    waves: &'a BTreeMap<String, WaveSeries>,
    points: &'a BTreeMap<String, PointSeries>,
    parameters: &'a BTreeMap<String, ParameterSeries>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    format: String,
    version: u32,
    waves: BTreeMap<String, WaveRecord>,
    points: BTreeMap<String, PointRecord>,
    parameters: BTreeMap<String, ParameterRecord>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WaveRecord {
    data: Vec<f64>,
    complete_length: f64,
    offset: f64,
    #[serde(rename = "type")]
    wave_type: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PointRecord {
    data_x: Vec<f64>,
    data_y: Vec<f64>,
    #[serde(rename = "type")]
    point_type: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ParameterRecord {
    values: Vec<f64>,
    begin_times: Vec<f64>,
    end_times: Vec<f64>,
    #[serde(rename = "type")]
    parameter_type: String,
}

pub fn composite_to_json(dataset: &CompositeDataset) -> Result<String> {
    let doc = DocumentRef {
        format: FORMAT,
        version: VERSION,
        waves: dataset.waves(),
        points: dataset.points(),
        parameters: dataset.parameters(),
    };
    serde_json::to_string_pretty(&doc).context("serializing dataset")
}

pub fn composite_from_json(text: &str) -> Result<CompositeDataset> {
    let doc: Document = serde_json::from_str(text).context("decoding dataset document")?;
    if doc.format != FORMAT {
        bail!("unknown document format '{}', expected '{FORMAT}'", doc.format);
    }
    if doc.version != VERSION {
        bail!("unsupported {FORMAT} version {}, expected {VERSION}", doc.version);
    }

    let waves = doc
        .waves
        .into_iter()
        .map(|(key, w)| -> Result<(String, WaveSeries)> {
            let wave = WaveSeries::new(w.data, w.complete_length, w.wave_type, w.offset)
                .with_context(|| format!("wave '{key}'"))?;
            Ok((key, wave))
        })
        .collect::<Result<Vec<_>>>()?;
    let points = doc
        .points
        .into_iter()
        .map(|(key, p)| -> Result<(String, PointSeries)> {
            let points = PointSeries::new(p.data_x, p.data_y, p.point_type)
                .with_context(|| format!("points '{key}'"))?;
            Ok((key, points))
        })
        .collect::<Result<Vec<_>>>()?;
    let parameters = doc
        .parameters
        .into_iter()
        .map(|(key, p)| -> Result<(String, ParameterSeries)> {
            let parameter =
                ParameterSeries::from_parts(p.parameter_type, p.begin_times, p.end_times, p.values)
                    .with_context(|| format!("parameter '{key}'"))?;
            Ok((key, parameter))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CompositeDataset::from_series(waves, points, parameters)?)
}

/// Write `dataset` to `path`, replacing any existing file.
pub fn save_composite_data(path: &Path, dataset: &CompositeDataset) -> Result<()> {
    let text = composite_to_json(dataset)?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

pub fn load_composite_data(path: &Path) -> Result<CompositeDataset> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    composite_from_json(&text).with_context(|| format!("loading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::windows;

    fn sample() -> CompositeDataset {
        let mut data = CompositeDataset::new();
        let samples = (0..40).map(|i| (i % 7) as f64 * 0.5).collect();
        data.add_wave("ecg", WaveSeries::new(samples, 4.0, "ecg", 1.5).unwrap())
            .unwrap();
        let pairs = vec![(2.0, 1.0), (3.25, 1.5), (4.5, 0.75)];
        data.add_points("r", PointSeries::from_pairs(pairs, "r").unwrap())
            .unwrap();
        let intervals = windows(1.5, 5.5, 2.0).unwrap();
        data.add_parameter(
            "hr",
            ParameterSeries::from_intervals("hr", &intervals, vec![72.0, 74.5]).unwrap(),
        )
        .unwrap();
        data
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let data = sample();
        save_composite_data(&path, &data).unwrap();
        let back = load_composite_data(&path).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn document_carries_format_and_version() {
        let json: serde_json::Value =
            serde_json::from_str(&composite_to_json(&sample()).unwrap()).unwrap();
        assert_eq!(json["format"], FORMAT);
        assert_eq!(json["version"], VERSION);
        assert_eq!(json["waves"]["ecg"]["type"], "ecg");
        assert_eq!(json["points"]["r"]["data_x"][1], 3.25);
    }

    #[test]
    fn rejects_other_versions_and_fields() {
        let text = composite_to_json(&sample()).unwrap();
        let mut json: serde_json::Value = serde_json::from_str(&text).unwrap();
        json["version"] = 2.into();
        assert!(composite_from_json(&json.to_string()).is_err());

        let mut json: serde_json::Value = serde_json::from_str(&text).unwrap();
        json["waves"]["ecg"]["sample_rate"] = 10.into();
        assert!(composite_from_json(&json.to_string()).is_err());
    }

    #[test]
    fn saved_files_stay_loadable_after_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut data = sample();
        save_composite_data(&path, &data).unwrap();

        assert!(WaveSeries::new(vec![f64::NAN, 1.0, 2.0], 1.0, "bp", 0.0).is_err());
        assert!(data
            .point_set_mut("r")
            .unwrap()
            .add_point(5.0, f64::INFINITY)
            .is_err());
        save_composite_data(&path, &data).unwrap();
        assert_eq!(load_composite_data(&path).unwrap(), data);

        // serde_json writes NaN as null; such a document is refused on load.
        let text = std::fs::read_to_string(&path).unwrap();
        let mut json: serde_json::Value = serde_json::from_str(&text).unwrap();
        json["parameters"]["hr"]["values"][0] = serde_json::Value::Null;
        assert!(composite_from_json(&json.to_string()).is_err());
    }

    #[test]
    fn rejects_invalid_series() {
        let text = r#"{"format":"biosig-composite","version":1,
            "waves":{"ecg":{"data":[1.0],"complete_length":1.0,"offset":0.0,"type":"ecg"}},
            "points":{},"parameters":{}}"#;
        let err = composite_from_json(text).unwrap_err();
        assert!(format!("{err:#}").contains("wave 'ecg'"));
    }
}
