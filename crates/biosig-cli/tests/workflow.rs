use assert_cmd::cargo::cargo_bin_cmd;
use biosig_lib::io::{load_composite_data, save_composite_data};
use biosig_lib::{CompositeDataset, PointSeries, WaveSeries};
use serde_json::Value;
use std::error::Error;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

fn run_json(args: &[&str]) -> Result<Value, Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("biosig");
    cmd.args(args);
    let output = cmd.assert().success().get_output().stdout.clone();
    Ok(serde_json::from_slice(&output)?)
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}

/// Gaussian R waves every 0.8 s on a slow baseline, 250 Hz.
fn synthetic_ecg() -> Vec<f64> {
    let fs = 250.0;
    let beats: Vec<f64> = (0..12).map(|k| 0.5 + 0.8 * k as f64).collect();
    (0..2500)
        .map(|i| {
            let t = i as f64 / fs;
            let mut v = 0.05 * (2.0 * PI * t).sin();
            for bt in &beats {
                v += 1.2 * (-0.5 * ((t - bt) / 0.02).powi(2)).exp();
            }
            v
        })
        .collect()
}

fn ramp_dataset(path: &Path) {
    let mut data = CompositeDataset::new();
    let samples = (0..1000).map(|i| i as f64).collect();
    data.add_wave("ecg", WaveSeries::new(samples, 10.0, "ecg", 0.0).unwrap())
        .unwrap();
    let pairs = vec![(1.0, 1.0), (2.0, 1.0), (12.0, 1.0)];
    data.add_points("r", PointSeries::from_pairs(pairs, "r").unwrap())
        .unwrap();
    save_composite_data(path, &data).unwrap();
}

#[test]
fn imports_text_wave_and_reports_time_range() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("bp.txt");
    let rows: String = (0..20)
        .map(|i| format!("{} {}\n", 2.0 + i as f64 * 0.5, 80.0 + i as f64))
        .collect();
    fs::write(&input, rows)?;
    let data = dir.path().join("data.json");

    let mut cmd = cargo_bin_cmd!("biosig");
    cmd.args([
        "import-wave",
        "--data",
        path_str(&data),
        "--key",
        "bp",
        "--input",
        path_str(&input),
    ]);
    cmd.assert().success();

    let dataset = load_composite_data(&data)?;
    let wave = dataset.wave("bp").expect("imported wave");
    assert_eq!(wave.len(), 20);
    assert!((wave.sample_rate() - 2.0).abs() < 1e-9);

    let range = run_json(&["time-range", "--data", path_str(&data), "bp"])?;
    assert_eq!(range["begin"], 2.0);
    assert_eq!(range["end"], 12.0);

    // Same key again is a collision unless --replace is given.
    let mut cmd = cargo_bin_cmd!("biosig");
    cmd.args([
        "import-wave",
        "--data",
        path_str(&data),
        "--key",
        "bp",
        "--input",
        path_str(&input),
    ]);
    let stderr = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8_lossy(&stderr).contains("already exists"));
    Ok(())
}

#[test]
fn non_finite_import_leaves_dataset_intact() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let data = dir.path().join("data.json");
    ramp_dataset(&data);
    let before = fs::read(&data)?;
    let input = dir.path().join("bp.txt");
    fs::write(&input, "0.0 80\n0.5 nan\n1.0 82\n")?;

    let mut cmd = cargo_bin_cmd!("biosig");
    cmd.args([
        "import-wave",
        "--data",
        path_str(&data),
        "--key",
        "bp",
        "--input",
        path_str(&input),
    ]);
    let stderr = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8_lossy(&stderr).contains("finite"));
    assert_eq!(fs::read(&data)?, before);
    assert!(load_composite_data(&data)?.wave("ecg").is_some());
    Ok(())
}

#[test]
fn time_range_intersects_waves_and_points() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let data = dir.path().join("data.json");
    ramp_dataset(&data);
    let range = run_json(&["time-range", "--data", path_str(&data), "ecg", "r"])?;
    assert_eq!(range["begin"], 1.0);
    assert_eq!(range["end"], 10.0);

    let mut cmd = cargo_bin_cmd!("biosig");
    cmd.args(["time-range", "--data", path_str(&data), "ecg", "bp"]);
    cmd.assert().failure();
    Ok(())
}

#[test]
fn modify_previews_until_committed() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let data = dir.path().join("data.json");
    ramp_dataset(&data);
    let before = fs::read(&data)?;

    let args = [
        "modify",
        "--data",
        path_str(&data),
        "--wave",
        "ecg",
        "--procedure",
        "filter_lowpass",
        "--begin",
        "2",
        "--end",
        "4",
        "--set",
        "cutoff_hz=5",
    ];
    let preview = run_json(&args)?;
    assert_eq!(preview["committed"], false);
    assert_eq!(preview["result"]["data"].as_array().map(Vec::len), Some(200));
    assert_eq!(fs::read(&data)?, before, "preview must not touch the file");

    let mut committed = args.to_vec();
    committed.push("--commit");
    let out = run_json(&committed)?;
    assert_eq!(out["committed"], true);

    let dataset = load_composite_data(&data)?;
    let wave = dataset.wave("ecg").expect("wave kept");
    assert_eq!(wave.len(), 1000);
    assert_eq!(wave.data()[199], 199.0);
    assert_eq!(wave.data()[200], 200.0);
    assert!(wave.data()[399] < 399.0, "filtered ramp lags behind");
    assert_eq!(wave.data()[400], 400.0);
    Ok(())
}

#[test]
fn argument_file_and_unknown_options() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let data = dir.path().join("data.json");
    ramp_dataset(&data);
    let toml = dir.path().join("args.toml");
    fs::write(&toml, "cutoff_hz = 2.5\n")?;

    let out = run_json(&[
        "modify",
        "--data",
        path_str(&data),
        "--wave",
        "ecg",
        "--procedure",
        "filter_fft_lowpass",
        "--args",
        path_str(&toml),
    ])?;
    assert_eq!(out["result"]["data"].as_array().map(Vec::len), Some(1000));

    let mut cmd = cargo_bin_cmd!("biosig");
    cmd.args([
        "modify",
        "--data",
        path_str(&data),
        "--wave",
        "ecg",
        "--procedure",
        "filter_lowpass",
        "--set",
        "cutof_hz=5",
    ]);
    let stderr = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8_lossy(&stderr).contains("no option 'cutof_hz'"));
    Ok(())
}

#[test]
fn detect_beats_then_heart_rate() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let samples = dir.path().join("ecg.txt");
    let text: String = synthetic_ecg().iter().map(|v| format!("{v}\n")).collect();
    fs::write(&samples, text)?;
    let data = dir.path().join("data.json");

    let mut cmd = cargo_bin_cmd!("biosig");
    cmd.args([
        "import-wave",
        "--data",
        path_str(&data),
        "--key",
        "ecg",
        "--fs",
        "250",
        "--input",
        path_str(&samples),
    ]);
    cmd.assert().success();

    let found = run_json(&[
        "find-points",
        "--data",
        path_str(&data),
        "--procedure",
        "points_r_simple",
        "--set",
        "min_rr_s=0.3",
        "--commit",
    ])?;
    assert_eq!(found["key"], "r");
    assert_eq!(found["result"]["data_x"].as_array().map(Vec::len), Some(12));

    let hr = run_json(&[
        "parameter",
        "--data",
        path_str(&data),
        "--procedure",
        "parameter_heart_rate",
        "--begin",
        "0",
        "--end",
        "8",
        "--interval",
        "4",
        "--commit",
    ])?;
    let values = hr["result"]["values"].as_array().expect("values");
    assert_eq!(values.len(), 2);
    for v in values {
        let bpm = v.as_f64().expect("number");
        assert!((70.0..80.0).contains(&bpm), "heart rate {bpm}");
    }

    let dataset = load_composite_data(&data)?;
    assert_eq!(dataset.parameter("hr").map(|p| p.len()), Some(values.len()));
    Ok(())
}
