use crate::signal::RRSeries;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HRVTime {
    pub n: usize,
    pub avnn: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    pub pnn50: f64,
}

pub fn hrv_time(rr: &RRSeries) -> HRVTime {
    let n = rr.rr.len();
    let avnn = if n > 0 {
        rr.rr.iter().sum::<f64>() / n as f64
    } else {
        0.0
    };
    let sdnn = if n > 1 {
        let mean = avnn;
        (rr.rr.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };
    let rmssd = if n > 1 {
        let diffs = rr.rr.windows(2).map(|w| (w[1] - w[0]).powi(2));
        (diffs.sum::<f64>() / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };
    let pnn50 = if n > 1 {
        let count = rr
            .rr
            .windows(2)
            .filter(|w| (w[1] - w[0]).abs() > 0.050)
            .count();
        (count as f64) / (n as f64 - 1.0)
    } else {
        0.0
    };

    HRVTime {
        n,
        avnn,
        sdnn,
        rmssd,
        pnn50,
    }
}

/// Beats per minute from the mean RR interval; `None` without intervals.
pub fn heart_rate_bpm(rr: &RRSeries) -> Option<f64> {
    let avnn = hrv_time(rr).avnn;
    (avnn > 0.0).then(|| 60.0 / avnn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn time_domain_metrics() {
        let rr = RRSeries {
            rr: vec![0.8, 0.9, 0.7, 0.8],
        };
        let m = hrv_time(&rr);
        assert_eq!(m.n, 4);
        assert_close(m.avnn, 0.8, 1e-12);
        assert_close(m.sdnn, (0.02f64 / 3.0).sqrt(), 1e-12);
        assert_close(m.rmssd, (0.06f64 / 3.0).sqrt(), 1e-12);
        assert_close(m.pnn50, 1.0, 1e-12);
    }

    #[test]
    fn heart_rate_from_regular_rhythm() {
        let rr = RRSeries { rr: vec![0.8; 5] };
        assert_close(heart_rate_bpm(&rr).unwrap(), 75.0, 1e-9);
        assert_eq!(heart_rate_bpm(&RRSeries { rr: Vec::new() }), None);
    }
}
