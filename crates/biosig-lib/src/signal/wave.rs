use crate::error::{Error, Result};
use log::warn;
use serde::Serialize;

/// How `WaveSeries::data_slice` turns a time range into values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampling {
    /// Stored samples, index-exact.
    Raw,
    /// One interpolated value every given number of seconds.
    Every(f64),
    /// Exactly this many interpolated values spread over the range.
    Count(usize),
}

/// Uniformly sampled signal with an explicit duration and time offset.
///
/// Sample `i` sits at `offset + i * sample_length`. The valid time domain is
/// `[offset, offset + complete_length)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveSeries {
    data: Vec<f64>,
    complete_length: f64,
    offset: f64,
    #[serde(rename = "type")]
    wave_type: String,
}

impl WaveSeries {
    pub fn new(
        data: Vec<f64>,
        complete_length: f64,
        wave_type: impl Into<String>,
        offset: f64,
    ) -> Result<Self> {
        if data.len() < 2 {
            return Err(Error::ShapeMismatch(format!(
                "a wave needs at least 2 samples, got {}",
                data.len()
            )));
        }
        if !(complete_length > 0.0) || !complete_length.is_finite() {
            return Err(Error::ShapeMismatch(format!(
                "wave length must be positive and finite, got {complete_length}"
            )));
        }
        if !offset.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "wave offset must be finite, got {offset}"
            )));
        }
        if let Some(index) = data.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "sample {index} is {}, samples must be finite",
                data[index]
            )));
        }
        Ok(Self {
            data,
            complete_length,
            offset,
            wave_type: wave_type.into(),
        })
    }

    /// Build a wave from samples taken at `sample_rate` Hz.
    pub fn from_samples(
        data: Vec<f64>,
        sample_rate: f64,
        wave_type: impl Into<String>,
        offset: f64,
    ) -> Result<Self> {
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "sample rate must be positive and finite, got {sample_rate}"
            )));
        }
        let complete_length = data.len() as f64 / sample_rate;
        Self::new(data, complete_length, wave_type, offset)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn complete_length(&self) -> f64 {
        self.complete_length
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Shift the series' time origin relative to other channels.
    pub fn set_offset(&mut self, offset: f64) -> Result<()> {
        if !offset.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "wave offset must be finite, got {offset}"
            )));
        }
        self.offset = offset;
        Ok(())
    }

    pub fn wave_type(&self) -> &str {
        &self.wave_type
    }

    pub fn sample_rate(&self) -> f64 {
        self.data.len() as f64 / self.complete_length
    }

    pub fn sample_length(&self) -> f64 {
        self.complete_length / self.data.len() as f64
    }

    pub fn end_time(&self) -> f64 {
        self.offset + self.complete_length
    }

    pub fn sample_time(&self, index: usize) -> f64 {
        self.offset + index as f64 * self.sample_length()
    }

    /// Index of the sample nearest to `time`.
    pub fn sample_at(&self, time: f64) -> Result<usize> {
        self.check_time(time)?;
        Ok(self.index_at(time).min(self.data.len() - 1))
    }

    /// Value at `time`, linearly interpolated between the neighbouring samples.
    /// Past the last sample the last value is held.
    pub fn value_at(&self, time: f64) -> Result<f64> {
        self.check_time(time)?;
        Ok(self.interpolate(time))
    }

    /// Values over `[begin, end)`.
    ///
    /// `Sampling::Raw` returns the stored samples whose index
    /// `round((t - offset) * sample_rate)` falls in the range, with the upper
    /// edge excluded. The other modes interpolate linearly at the requested
    /// times: `Count(n)` at `begin + k * (end - begin) / n` for `k < n`,
    /// `Every(s)` at `begin + k * s` while that stays below `end`.
    pub fn data_slice(&self, begin: f64, end: f64, sampling: Sampling) -> Result<Vec<f64>> {
        self.check_range(begin, end)?;
        match sampling {
            Sampling::Raw => {
                let (b, e) = self.index_range(begin, end);
                Ok(self.data[b..e].to_vec())
            }
            Sampling::Count(count) => {
                if count == 0 {
                    return Err(Error::InvalidArgument(
                        "value count must be at least 1".into(),
                    ));
                }
                let step = (end - begin) / count as f64;
                Ok((0..count)
                    .map(|k| self.interpolate(begin + k as f64 * step))
                    .collect())
            }
            Sampling::Every(step) => {
                if !(step > 0.0) || !step.is_finite() {
                    return Err(Error::InvalidArgument(format!(
                        "value spacing must be positive and finite, got {step}"
                    )));
                }
                // Snap counts that are integral up to rounding noise.
                let count = ((end - begin) / step - 1e-9).ceil().max(1.0) as usize;
                Ok((0..count)
                    .map(|k| self.interpolate(begin + k as f64 * step))
                    .collect())
            }
        }
    }

    /// Raw samples over `[begin, end)` paired with their times.
    pub fn coordinates(&self, begin: f64, end: f64) -> Result<(Vec<f64>, Vec<f64>)> {
        self.check_range(begin, end)?;
        let (b, e) = self.index_range(begin, end);
        let times = (b..e).map(|i| self.sample_time(i)).collect();
        Ok((times, self.data[b..e].to_vec()))
    }

    /// Splice `replacement`'s samples over the raw run covering `[begin, end)`.
    ///
    /// The replacement must last `end - begin` seconds, give or take one
    /// sample period of this wave. The array may grow or shrink; the total
    /// length in seconds stays fixed so the sample rate follows the new count.
    pub fn replace_slice(&mut self, begin: f64, end: f64, replacement: &WaveSeries) -> Result<()> {
        self.check_range(begin, end)?;
        let span = end - begin;
        let mismatch = (replacement.complete_length - span).abs();
        if mismatch > self.sample_length() + 1e-9 {
            return Err(Error::ShapeMismatch(format!(
                "replacement lasts {:.6} s but the range [{begin}, {end}) lasts {span:.6} s",
                replacement.complete_length
            )));
        }
        let rate_ratio = replacement.sample_rate() / self.sample_rate();
        if (rate_ratio - 1.0).abs() > 1e-4 {
            warn!(
                "replacing [{begin}, {end}) of '{}' with {:.3} Hz data (wave is {:.3} Hz)",
                self.wave_type,
                replacement.sample_rate(),
                self.sample_rate()
            );
        }
        let (b, e) = self.index_range(begin, end);
        self.data.splice(b..e, replacement.data.iter().copied());
        Ok(())
    }

    pub(crate) fn check_range(&self, begin: f64, end: f64) -> Result<()> {
        if !(begin < end) {
            return Err(Error::range(begin, end, "begin must precede end"));
        }
        if begin < self.offset || end > self.end_time() {
            return Err(Error::range(
                begin,
                end,
                format!(
                    "outside the '{}' domain [{}, {})",
                    self.wave_type,
                    self.offset,
                    self.end_time()
                ),
            ));
        }
        Ok(())
    }

    fn check_time(&self, time: f64) -> Result<()> {
        if !(time >= self.offset && time <= self.end_time()) {
            return Err(Error::range(
                time,
                time,
                format!(
                    "time lies outside the '{}' domain [{}, {})",
                    self.wave_type,
                    self.offset,
                    self.end_time()
                ),
            ));
        }
        Ok(())
    }

    fn index_at(&self, time: f64) -> usize {
        let index = ((time - self.offset) * self.sample_rate()).round().max(0.0) as usize;
        index.min(self.data.len())
    }

    fn index_range(&self, begin: f64, end: f64) -> (usize, usize) {
        let b = self.index_at(begin);
        let e = self.index_at(end).max(b);
        (b, e)
    }

    fn interpolate(&self, time: f64) -> f64 {
        let position = ((time - self.offset) * self.sample_rate()).max(0.0);
        let lower = position.floor() as usize;
        let last = self.data.len() - 1;
        if lower >= last {
            return self.data[last];
        }
        let frac = position - lower as f64;
        self.data[lower] + frac * (self.data[lower + 1] - self.data[lower])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(count: usize, length: f64, offset: f64) -> WaveSeries {
        let data = (0..count).map(|i| i as f64).collect();
        WaveSeries::new(data, length, "ramp", offset).unwrap()
    }

    #[test]
    fn derived_rate_matches_count_over_length() {
        let wave = ramp(500, 2.5, 0.0);
        assert!((wave.sample_rate() - 200.0).abs() < 1e-9);
        assert!((wave.sample_length() - 0.005).abs() < 1e-12);
    }

    #[test]
    fn rejects_degenerate_waves() {
        assert!(matches!(
            WaveSeries::new(vec![1.0], 1.0, "x", 0.0),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(matches!(
            WaveSeries::new(vec![1.0, 2.0], 0.0, "x", 0.0),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn rejects_non_finite_samples_and_offsets() {
        assert!(matches!(
            WaveSeries::new(vec![f64::NAN, 1.0, 2.0], 1.0, "x", 0.0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            WaveSeries::from_samples(vec![0.0, f64::INFINITY], 10.0, "x", 0.0),
            Err(Error::InvalidArgument(_))
        ));
        let mut wave = ramp(10, 1.0, 0.0);
        assert!(wave.set_offset(f64::NAN).is_err());
        assert_eq!(wave.offset(), 0.0);
        wave.set_offset(-2.5).unwrap();
        assert_eq!(wave.end_time(), -1.5);
    }

    #[test]
    fn full_raw_slice_is_identity() {
        let wave = ramp(317, 1.585, -0.4);
        let slice = wave
            .data_slice(wave.offset(), wave.end_time(), Sampling::Raw)
            .unwrap();
        assert_eq!(slice, wave.data());
    }

    #[test]
    fn short_window_at_200_hz_returns_five_samples() {
        let wave = ramp(2000, 10.0, 0.0);
        let slice = wave.data_slice(5.0, 5.025, Sampling::Raw).unwrap();
        assert_eq!(slice, vec![1000.0, 1001.0, 1002.0, 1003.0, 1004.0]);
    }

    #[test]
    fn raw_slice_honours_offset() {
        let wave = ramp(100, 1.0, 2.0);
        let slice = wave.data_slice(2.5, 2.53, Sampling::Raw).unwrap();
        assert_eq!(slice, vec![50.0, 51.0, 52.0]);
    }

    #[test]
    fn count_sampling_has_exact_length() {
        let wave = ramp(1000, 3.3, 0.1);
        for count in [1, 2, 7, 333, 4096] {
            let values = wave.data_slice(0.37, 2.91, Sampling::Count(count)).unwrap();
            assert_eq!(values.len(), count);
        }
    }

    #[test]
    fn count_sampling_interpolates_between_samples() {
        // 10 Hz ramp: value == 10 * t
        let wave = ramp(100, 10.0, 0.0);
        let values = wave.data_slice(1.0, 2.0, Sampling::Count(4)).unwrap();
        let expected = [10.0, 12.5, 15.0, 17.5];
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < 1e-9, "{v} != {e}");
        }
    }

    #[test]
    fn every_sampling_stops_before_end() {
        let wave = ramp(100, 10.0, 0.0);
        let values = wave.data_slice(1.0, 2.0, Sampling::Every(0.25)).unwrap();
        assert_eq!(values.len(), 4);
        assert!((values[3] - 17.5).abs() < 1e-9);
        let values = wave.data_slice(1.0, 2.0, Sampling::Every(0.3)).unwrap();
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn invalid_sampling_requests_fail() {
        let wave = ramp(100, 10.0, 0.0);
        assert!(matches!(
            wave.data_slice(1.0, 2.0, Sampling::Count(0)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            wave.data_slice(1.0, 2.0, Sampling::Every(-1.0)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn out_of_domain_slices_fail_with_range() {
        let wave = ramp(100, 10.0, 1.0);
        assert!(matches!(
            wave.data_slice(0.5, 2.0, Sampling::Raw),
            Err(Error::Range { .. })
        ));
        assert!(matches!(
            wave.data_slice(5.0, 11.5, Sampling::Raw),
            Err(Error::Range { .. })
        ));
        assert!(matches!(
            wave.data_slice(3.0, 3.0, Sampling::Raw),
            Err(Error::Range { .. })
        ));
    }

    #[test]
    fn value_at_interpolates_and_holds_tail() {
        let wave = ramp(10, 1.0, 0.0);
        assert!((wave.value_at(0.25).unwrap() - 2.5).abs() < 1e-9);
        assert_eq!(wave.value_at(0.95).unwrap(), 9.0);
        assert_eq!(wave.value_at(1.0).unwrap(), 9.0);
        assert!(wave.value_at(1.01).is_err());
        assert_eq!(wave.sample_at(0.26).unwrap(), 3);
        assert_eq!(wave.sample_at(1.0).unwrap(), 9);
    }

    #[test]
    fn replace_slice_splices_only_the_range() {
        let mut wave = ramp(1000, 10.0, 0.0);
        let before = wave.data().to_vec();
        let replacement = WaveSeries::new(vec![-1.0; 200], 2.0, "ramp", 3.0).unwrap();
        wave.replace_slice(3.0, 5.0, &replacement).unwrap();
        assert_eq!(wave.data_slice(3.0, 5.0, Sampling::Raw).unwrap(), vec![-1.0; 200]);
        assert_eq!(
            wave.data_slice(0.0, 3.0, Sampling::Raw).unwrap(),
            before[..300].to_vec()
        );
        assert_eq!(
            wave.data_slice(5.0, 10.0, Sampling::Raw).unwrap(),
            before[500..].to_vec()
        );
    }

    #[test]
    fn replace_slice_resizes_and_recomputes_rate() {
        let mut wave = ramp(100, 10.0, 0.0);
        let replacement = WaveSeries::new(vec![0.0; 19], 1.95, "ramp", 0.0).unwrap();
        wave.replace_slice(2.0, 4.0, &replacement).unwrap();
        assert_eq!(wave.len(), 99);
        assert!((wave.sample_rate() - 9.9).abs() < 1e-9);
        assert_eq!(wave.complete_length(), 10.0);
    }

    #[test]
    fn replace_slice_rejects_wrong_duration() {
        let mut wave = ramp(100, 10.0, 0.0);
        let replacement = WaveSeries::new(vec![0.0; 10], 1.0, "ramp", 0.0).unwrap();
        assert!(matches!(
            wave.replace_slice(2.0, 4.0, &replacement),
            Err(Error::ShapeMismatch(_))
        ));
        assert_eq!(wave.len(), 100);
    }

    #[test]
    fn coordinates_pair_samples_with_times() {
        let wave = ramp(10, 1.0, 5.0);
        let (x, y) = wave.coordinates(5.2, 5.5).unwrap();
        assert_eq!(y, vec![2.0, 3.0, 4.0]);
        assert!((x[0] - 5.2).abs() < 1e-12);
        assert!((x[2] - 5.4).abs() < 1e-12);
    }
}
