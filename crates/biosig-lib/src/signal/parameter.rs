use crate::error::{Error, Result};
use serde::Serialize;

/// One computed value together with the interval it describes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterEntry {
    pub begin: f64,
    pub end: f64,
    pub value: f64,
}

/// Values of one parameter (e.g. heart rate), each tied to the interval it
/// was computed over. Only built by the analyzer or when loading a saved
/// dataset; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSeries {
    values: Vec<f64>,
    begin_times: Vec<f64>,
    end_times: Vec<f64>,
    #[serde(rename = "type")]
    parameter_type: String,
}

impl ParameterSeries {
    pub(crate) fn from_parts(
        parameter_type: impl Into<String>,
        begin_times: Vec<f64>,
        end_times: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<Self> {
        if begin_times.len() != values.len() || end_times.len() != values.len() {
            return Err(Error::ShapeMismatch(format!(
                "parameter has {} values, {} begin times and {} end times",
                values.len(),
                begin_times.len(),
                end_times.len()
            )));
        }
        if let Some(v) = values
            .iter()
            .chain(&begin_times)
            .chain(&end_times)
            .find(|v| !v.is_finite())
        {
            return Err(Error::InvalidArgument(format!(
                "parameter values and interval bounds must be finite, got {v}"
            )));
        }
        if let Some((b, e)) = begin_times
            .iter()
            .zip(&end_times)
            .find(|(b, e)| !(b <= e))
        {
            return Err(Error::range(*b, *e, "parameter interval ends before it begins"));
        }
        Ok(Self {
            values,
            begin_times,
            end_times,
            parameter_type: parameter_type.into(),
        })
    }

    pub(crate) fn from_intervals(
        parameter_type: impl Into<String>,
        intervals: &[(f64, f64)],
        values: Vec<f64>,
    ) -> Result<Self> {
        let (begin_times, end_times) = intervals.iter().copied().unzip();
        Self::from_parts(parameter_type, begin_times, end_times, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn parameter_type(&self) -> &str {
        &self.parameter_type
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn begin_times(&self) -> &[f64] {
        &self.begin_times
    }

    pub fn end_times(&self) -> &[f64] {
        &self.end_times
    }

    pub fn get(&self, index: usize) -> Option<ParameterEntry> {
        Some(ParameterEntry {
            begin: *self.begin_times.get(index)?,
            end: *self.end_times.get(index)?,
            value: *self.values.get(index)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = ParameterEntry> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    /// Indices of the entries whose `[begin, end)` contains `time`.
    pub fn containing(&self, time: f64) -> Vec<usize> {
        self.iter()
            .enumerate()
            .filter(|(_, e)| e.begin <= time && time < e.end)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of the entries whose `[begin, end)` intersects `[begin, end)`.
    pub fn overlapping(&self, begin: f64, end: f64) -> Vec<usize> {
        self.iter()
            .enumerate()
            .filter(|(_, e)| e.begin < end && begin < e.end)
            .map(|(i, _)| i)
            .collect()
    }

    /// Mean of the values whose interval contains `time`.
    pub fn value_at(&self, time: f64) -> Option<f64> {
        let indices = self.containing(time);
        if indices.is_empty() {
            return None;
        }
        let sum: f64 = indices.iter().map(|&i| self.values[i]).sum();
        Some(sum / indices.len() as f64)
    }

    /// Entries overlapping the window, clipped to it.
    pub fn segments(&self, begin: Option<f64>, end: Option<f64>) -> Vec<ParameterEntry> {
        let lo = begin.unwrap_or(f64::NEG_INFINITY);
        let hi = end.unwrap_or(f64::INFINITY);
        self.iter()
            .filter(|e| e.begin < hi && lo < e.end)
            .map(|e| ParameterEntry {
                begin: e.begin.max(lo),
                end: e.end.min(hi),
                value: e.value,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hr() -> ParameterSeries {
        ParameterSeries::from_intervals(
            "hr",
            &[(0.0, 10.0), (5.0, 15.0), (20.0, 30.0)],
            vec![60.0, 70.0, 80.0],
        )
        .unwrap()
    }

    #[test]
    fn keeps_supplied_interval_order() {
        let p = hr();
        assert_eq!(p.begin_times(), &[0.0, 5.0, 20.0]);
        assert_eq!(p.end_times(), &[10.0, 15.0, 30.0]);
        assert_eq!(
            p.get(1),
            Some(ParameterEntry {
                begin: 5.0,
                end: 15.0,
                value: 70.0
            })
        );
        assert_eq!(p.get(3), None);
    }

    #[test]
    fn rejects_inconsistent_parts() {
        assert!(matches!(
            ParameterSeries::from_parts("hr", vec![0.0], vec![1.0, 2.0], vec![1.0]),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(matches!(
            ParameterSeries::from_parts("hr", vec![2.0], vec![1.0], vec![1.0]),
            Err(Error::Range { .. })
        ));
        assert!(matches!(
            ParameterSeries::from_parts("hr", vec![0.0], vec![1.0], vec![f64::NAN]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ParameterSeries::from_parts("hr", vec![0.0], vec![f64::INFINITY], vec![1.0]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn point_and_range_queries() {
        let p = hr();
        assert_eq!(p.containing(7.0), vec![0, 1]);
        assert_eq!(p.containing(10.0), vec![1]);
        assert!(p.containing(17.0).is_empty());
        assert_eq!(p.overlapping(14.0, 21.0), vec![1, 2]);
        assert!(p.overlapping(15.0, 20.0).is_empty());
        assert_eq!(p.value_at(7.0), Some(65.0));
        assert_eq!(p.value_at(17.0), None);
    }

    #[test]
    fn segments_are_clipped_to_window() {
        let p = hr();
        let segments = p.segments(Some(8.0), Some(25.0));
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].begin, 8.0);
        assert_eq!(segments[2].end, 25.0);
        assert_eq!(p.segments(None, None).len(), 3);
    }
}
