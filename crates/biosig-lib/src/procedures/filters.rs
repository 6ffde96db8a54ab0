use crate::detectors::ecg::{bandpass, single_pole_lowpass};
use crate::procedure::{Arguments, Entry, ProcedureModule};
use anyhow::{anyhow, bail, Result};
use realfft::num_complex::Complex;
use realfft::RealFftPlanner;

pub(super) fn bandpass_module() -> ProcedureModule {
    ProcedureModule {
        name: "filter_bandpass".into(),
        description: "Single-pole high-pass followed by single-pole low-pass.".into(),
        author: "biosig".into(),
        kind: Some("modify".into()),
        default_arguments: Some(
            Arguments::new()
                .with("lowcut_hz", 0.5)
                .with("highcut_hz", 40.0),
        ),
        entry: Some(Entry::Modify(run_bandpass)),
        ..ProcedureModule::default()
    }
}

pub(super) fn lowpass_module() -> ProcedureModule {
    ProcedureModule {
        name: "filter_lowpass".into(),
        description: "Single-pole (RC) low-pass filter.".into(),
        author: "biosig".into(),
        kind: Some("modify".into()),
        default_arguments: Some(Arguments::new().with("cutoff_hz", 30.0)),
        entry: Some(Entry::Modify(run_lowpass)),
        ..ProcedureModule::default()
    }
}

pub(super) fn fft_lowpass_module() -> ProcedureModule {
    ProcedureModule {
        name: "filter_fft_lowpass".into(),
        description: "Zeroes every frequency bin above the cutoff.".into(),
        author: "biosig".into(),
        kind: Some("modify".into()),
        default_arguments: Some(Arguments::new().with("cutoff_hz", 30.0)),
        entry: Some(Entry::Modify(run_fft_lowpass)),
        ..ProcedureModule::default()
    }
}

fn positive(args: &Arguments, name: &str) -> Result<f64> {
    let value = args.float(name)?;
    if !(value > 0.0) {
        bail!("{name} must be positive, got {value}");
    }
    Ok(value)
}

fn run_bandpass(data: &[f64], fs: f64, args: &Arguments) -> Result<Vec<f64>> {
    let low = args.float("lowcut_hz")?;
    let high = args.float("highcut_hz")?;
    if low >= high {
        bail!("lowcut_hz ({low}) must be below highcut_hz ({high})");
    }
    Ok(bandpass(data, fs, low, high))
}

fn run_lowpass(data: &[f64], fs: f64, args: &Arguments) -> Result<Vec<f64>> {
    let cutoff = positive(args, "cutoff_hz")?;
    Ok(single_pole_lowpass(data, fs, cutoff))
}

fn run_fft_lowpass(data: &[f64], fs: f64, args: &Arguments) -> Result<Vec<f64>> {
    let cutoff = positive(args, "cutoff_hz")?;
    let n = data.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let mut planner = RealFftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut buffer = data.to_vec();
    let mut spectrum = forward.make_output_vec();
    forward
        .process(&mut buffer, &mut spectrum)
        .map_err(|e| anyhow!("forward FFT: {e}"))?;

    let bin_hz = fs / n as f64;
    for (k, bin) in spectrum.iter_mut().enumerate() {
        if k as f64 * bin_hz > cutoff {
            *bin = Complex::new(0.0, 0.0);
        }
    }
    // DC and Nyquist bins must be purely real for the inverse transform.
    spectrum[0].im = 0.0;
    if n % 2 == 0 {
        if let Some(last) = spectrum.last_mut() {
            last.im = 0.0;
        }
    }

    let mut output = inverse.make_output_vec();
    inverse
        .process(&mut spectrum, &mut output)
        .map_err(|e| anyhow!("inverse FFT: {e}"))?;
    let scale = n as f64;
    Ok(output.into_iter().map(|v| v / scale).collect())
}
