pub mod parameter;
pub mod points;
pub mod wave;

pub use parameter::{ParameterEntry, ParameterSeries};
pub use points::PointSeries;
pub use wave::{Sampling, WaveSeries};

use serde::{Deserialize, Serialize};

/// RR intervals (seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    /// Differences between consecutive beat times.
    pub fn from_beat_times(times: &[f64]) -> Self {
        let rr = times.windows(2).map(|w| w[1] - w[0]).collect();
        Self { rr }
    }

    pub fn len(&self) -> usize {
        self.rr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rr.is_empty()
    }
}
