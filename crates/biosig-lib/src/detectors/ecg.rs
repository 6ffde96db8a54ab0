use crate::error::Result;
use crate::procedure::Arguments;

/// Configurable parameters for the ECG beat detector.
#[derive(Debug, Clone, Copy)]
pub struct EcgPipelineConfig {
    /// Lower cutoff for the single-pole high-pass filter (Hz).
    pub lowcut_hz: f64,
    /// Upper cutoff for the single-pole low-pass filter (Hz).
    pub highcut_hz: f64,
    /// Moving window integration length (seconds).
    pub integration_window_s: f64,
    /// Minimum physiological RR distance / refractory period (seconds).
    pub min_rr_s: f64,
    /// Scale between noise and signal envelopes for the adaptive threshold.
    pub threshold_scale: f64,
    /// How far back to search (seconds) for the precise R-peak after a detection.
    pub search_back_s: f64,
}

impl Default for EcgPipelineConfig {
    fn default() -> Self {
        Self {
            lowcut_hz: 5.0,
            highcut_hz: 15.0,
            integration_window_s: 0.150,
            min_rr_s: 0.120,
            threshold_scale: 0.6,
            search_back_s: 0.150,
        }
    }
}

impl EcgPipelineConfig {
    /// The configuration as procedure options.
    pub fn to_arguments(&self) -> Arguments {
        Arguments::new()
            .with("lowcut_hz", self.lowcut_hz)
            .with("highcut_hz", self.highcut_hz)
            .with("integration_window_s", self.integration_window_s)
            .with("min_rr_s", self.min_rr_s)
            .with("threshold_scale", self.threshold_scale)
            .with("search_back_s", self.search_back_s)
    }

    pub fn from_arguments(args: &Arguments) -> Result<Self> {
        Ok(Self {
            lowcut_hz: args.float("lowcut_hz")?,
            highcut_hz: args.float("highcut_hz")?,
            integration_window_s: args.float("integration_window_s")?,
            min_rr_s: args.float("min_rr_s")?,
            threshold_scale: args.float("threshold_scale")?,
            search_back_s: args.float("search_back_s")?,
        })
    }
}

/// Detect R-peaks in `data` sampled at `fs` Hz, returning sample indices.
///
/// Pan–Tompkins-inspired: band-pass, derivative, squaring, moving-window
/// integration and an adaptive threshold, with a simple local-maximum picker
/// as fallback when fewer than two beats are found.
pub fn detect_r_peaks(data: &[f64], fs: f64, cfg: &EcgPipelineConfig) -> Vec<usize> {
    if data.is_empty() {
        return Vec::new();
    }

    let (bandpassed, integrated) = pan_tompkins_envelope(data, fs, cfg);
    let peaks = pick_peaks(&bandpassed, &integrated, fs, cfg);

    if peaks.len() < 2 {
        return fallback_peak_picker(data, fs, cfg);
    }

    peaks
}

fn pan_tompkins_envelope(data: &[f64], fs: f64, cfg: &EcgPipelineConfig) -> (Vec<f64>, Vec<f64>) {
    let fs = fs.max(1.0);
    let bandpassed = bandpass(data, fs, cfg.lowcut_hz, cfg.highcut_hz);
    let derivative = derivative(&bandpassed);
    let squared = square(&derivative);
    let win = ((cfg.integration_window_s * fs).round() as usize).max(1);
    let integrated = moving_average(&squared, win);
    (bandpassed, integrated)
}

pub(crate) fn bandpass(data: &[f64], fs: f64, low: f64, high: f64) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let hp = if low > 0.0 {
        single_pole_highpass(data, fs, low)
    } else {
        data.to_vec()
    };
    if high <= 0.0 || high >= fs * 0.5 {
        hp
    } else {
        single_pole_lowpass(&hp, fs, high)
    }
}

pub(crate) fn single_pole_highpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let dt = 1.0 / fs;
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff.max(0.01));
    let alpha = rc / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let mut prev_y = data[0];
    let mut prev_x = data[0];
    for &x in data {
        let y = alpha * (prev_y + x - prev_x);
        out.push(y);
        prev_y = y;
        prev_x = x;
    }
    out
}

pub(crate) fn single_pole_lowpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let dt = 1.0 / fs;
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff.max(0.01));
    let alpha = dt / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let mut prev = data[0];
    for &x in data {
        prev += alpha * (x - prev);
        out.push(prev);
    }
    out
}

fn derivative(data: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    for i in 1..data.len() {
        out[i] = data[i] - data[i - 1];
    }
    out
}

fn square(data: &[f64]) -> Vec<f64> {
    data.iter().map(|x| x * x).collect()
}

fn moving_average(data: &[f64], win: usize) -> Vec<f64> {
    if win <= 1 {
        return data.to_vec();
    }
    let mut out = vec![0.0; data.len()];
    let mut acc = 0.0;
    for (i, &sample) in data.iter().enumerate() {
        acc += sample;
        if i >= win {
            acc -= data[i - win];
        }
        out[i] = acc / win as f64;
    }
    out
}

fn pick_peaks(
    bandpassed: &[f64],
    envelope: &[f64],
    fs: f64,
    cfg: &EcgPipelineConfig,
) -> Vec<usize> {
    if bandpassed.is_empty() || envelope.is_empty() {
        return Vec::new();
    }

    let refractory = (cfg.min_rr_s * fs).round().clamp(1.0, f64::MAX) as usize;
    let search = (cfg.search_back_s * fs).round().max(1.0) as usize;

    let init = envelope.len().min((fs as usize).max(1));
    let avg = envelope[..init].iter().sum::<f64>() / init as f64;
    let mut signal_level = avg;
    let mut noise_level = avg * 0.5;
    let mut threshold = noise_level + cfg.threshold_scale * (signal_level - noise_level).max(0.0);
    let mut last_peak_sample = 0usize;
    let mut peaks = Vec::new();

    for (i, &sample) in envelope.iter().enumerate() {
        let refractory_ok = peaks.is_empty() || i - last_peak_sample >= refractory;
        if sample >= threshold && refractory_ok {
            let start = i.saturating_sub(search);
            let end = i.min(bandpassed.len() - 1);
            let mut idx = start;
            let mut max_val = f64::MIN;
            for (j, &value) in bandpassed.iter().enumerate().take(end + 1).skip(start) {
                if value > max_val {
                    max_val = value;
                    idx = j;
                }
            }
            peaks.push(idx);
            last_peak_sample = i;
            signal_level = 0.125 * sample + 0.875 * signal_level;
        } else {
            noise_level = 0.125 * sample + 0.875 * noise_level;
        }

        threshold = noise_level + cfg.threshold_scale * (signal_level - noise_level).max(0.0);
    }

    peaks.sort_unstable();
    peaks.dedup();
    peaks
}

fn fallback_peak_picker(data: &[f64], fs: f64, cfg: &EcgPipelineConfig) -> Vec<usize> {
    let min_gap = (cfg.min_rr_s * fs).max(1.0) as usize;
    if data.len() < 3 {
        return Vec::new();
    }

    let win = ((0.150 * fs) as usize).max(1);
    let ma = moving_average(data, win);

    let mut peaks = Vec::new();
    let mut last_idx = 0usize;
    for i in 1..data.len() - 1 {
        let y = data[i] - ma[i];
        if y > 0.0
            && y > (data[i - 1] - ma[i - 1])
            && y > (data[i + 1] - ma[i + 1])
            && (peaks.is_empty() || (i - last_idx) >= min_gap)
        {
            peaks.push(i);
            last_idx = i;
        }
    }
    peaks
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Gaussian "R waves" on a slow sine, one per beat time.
    pub(crate) fn synthetic_ecg(fs: f64, beats: &[f64], duration: f64) -> Vec<f64> {
        use std::f64::consts::PI;
        let samples = (duration * fs) as usize;
        (0..samples)
            .map(|i| {
                let time = i as f64 / fs;
                let mut v = 0.05 * (2.0 * PI * 1.0 * time).sin();
                for &bt in beats {
                    let width = 0.02;
                    v += 1.2 * (-0.5 * ((time - bt) / width).powi(2)).exp();
                }
                v
            })
            .collect()
    }

    pub(crate) fn beat_times(rr: &[f64]) -> Vec<f64> {
        let mut t = 0.5;
        let mut beats = vec![t];
        for &interval in rr {
            t += interval;
            beats.push(t);
        }
        beats
    }

    #[test]
    fn detects_regular_beats() {
        let fs = 250.0;
        let rr = [0.82, 0.78, 0.8, 0.79, 0.81, 0.77, 0.84, 0.88];
        let beats = beat_times(&rr);
        let data = synthetic_ecg(fs, &beats, beats[beats.len() - 1] + 1.0);
        let cfg = EcgPipelineConfig {
            min_rr_s: 0.3,
            ..EcgPipelineConfig::default()
        };
        let peaks = detect_r_peaks(&data, fs, &cfg);
        assert_eq!(peaks.len(), rr.len() + 1);
    }

    #[test]
    fn arguments_round_trip_into_config() {
        let cfg = EcgPipelineConfig {
            min_rr_s: 0.25,
            ..EcgPipelineConfig::default()
        };
        let back = EcgPipelineConfig::from_arguments(&cfg.to_arguments()).unwrap();
        assert_eq!(back.min_rr_s, 0.25);
        assert_eq!(back.highcut_hz, 15.0);
        assert!(EcgPipelineConfig::from_arguments(&Arguments::new()).is_err());
    }

    #[test]
    fn lowpass_keeps_constant_signal() {
        let out = single_pole_lowpass(&[2.0; 50], 100.0, 5.0);
        assert!(out.iter().all(|v| (v - 2.0).abs() < 1e-12));
    }
}
