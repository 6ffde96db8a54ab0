use crate::error::{Error, Result};
use crate::signal::WaveSeries;
use serde::Serialize;
use std::ops::Range;

/// Time-ordered events of one type (e.g. R-peaks), stored as two parallel
/// arrays sorted by `x`. Equal `x` values are kept side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointSeries {
    data_x: Vec<f64>,
    data_y: Vec<f64>,
    #[serde(rename = "type")]
    point_type: String,
}

impl PointSeries {
    pub fn new(data_x: Vec<f64>, data_y: Vec<f64>, point_type: impl Into<String>) -> Result<Self> {
        if data_x.len() != data_y.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} x values but {} y values",
                data_x.len(),
                data_y.len()
            )));
        }
        Self::from_pairs(data_x.into_iter().zip(data_y).collect(), point_type)
    }

    pub fn empty(point_type: impl Into<String>) -> Self {
        Self {
            data_x: Vec::new(),
            data_y: Vec::new(),
            point_type: point_type.into(),
        }
    }

    pub fn from_pairs(mut pairs: Vec<(f64, f64)>, point_type: impl Into<String>) -> Result<Self> {
        if let Some(&(x, y)) = pairs.iter().find(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(non_finite(x, y));
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (data_x, data_y) = pairs.into_iter().unzip();
        Ok(Self {
            data_x,
            data_y,
            point_type: point_type.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.data_x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_x.is_empty()
    }

    pub fn data_x(&self) -> &[f64] {
        &self.data_x
    }

    pub fn data_y(&self) -> &[f64] {
        &self.data_y
    }

    pub fn point_type(&self) -> &str {
        &self.point_type
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.data_x.iter().copied().zip(self.data_y.iter().copied())
    }

    /// First and last event time, `None` when there are no points.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        Some((*self.data_x.first()?, *self.data_x.last()?))
    }

    /// Indices of the points with `begin <= x < end`.
    pub fn slice_range(&self, begin: f64, end: f64) -> Range<usize> {
        let b = self.data_x.partition_point(|&x| x < begin);
        let e = self.data_x.partition_point(|&x| x < end).max(b);
        b..e
    }

    /// Coordinates of the points with `begin <= x < end`.
    pub fn data_slice(&self, begin: f64, end: f64) -> (&[f64], &[f64]) {
        let range = self.slice_range(begin, end);
        (&self.data_x[range.clone()], &self.data_y[range])
    }

    pub fn add_point(&mut self, x: f64, y: f64) -> Result<()> {
        if !x.is_finite() || !y.is_finite() {
            return Err(non_finite(x, y));
        }
        let index = self.data_x.partition_point(|&existing| existing <= x);
        self.data_x.insert(index, x);
        self.data_y.insert(index, y);
        Ok(())
    }

    /// Merge every point of `other` into this series.
    pub fn add_points(&mut self, other: &PointSeries) {
        self.merge(other, 0.0);
    }

    /// Merge `other`, adding `shift` seconds to each incoming time. Useful when
    /// `other` was found relative to the start of a window.
    pub fn add_points_shifted(&mut self, other: &PointSeries, shift: f64) -> Result<()> {
        check_shift(shift)?;
        self.merge(other, shift);
        Ok(())
    }

    fn merge(&mut self, other: &PointSeries, shift: f64) {
        let mut pairs: Vec<(f64, f64)> = self.iter().collect();
        pairs.extend(other.iter().map(|(x, y)| (x + shift, y)));
        // stable: existing points stay ahead of incoming ones with equal x
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (data_x, data_y): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        self.data_x = data_x;
        self.data_y = data_y;
    }

    pub fn delete_point(&mut self, index: usize) -> Option<(f64, f64)> {
        if index >= self.len() {
            return None;
        }
        Some((self.data_x.remove(index), self.data_y.remove(index)))
    }

    /// Remove the point closest to `x`, or to `(x, y)` when `y` is given.
    pub fn delete_nearest(&mut self, x: f64, y: Option<f64>) -> Option<(f64, f64)> {
        let distance = |(px, py): (f64, f64)| match y {
            Some(y) => (px - x).powi(2) + (py - y).powi(2),
            None => (px - x).abs(),
        };
        let index = self
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| distance(*a).total_cmp(&distance(*b)))
            .map(|(i, _)| i)?;
        self.delete_point(index)
    }

    /// Remove the points in `[begin, end)`, returning how many were removed.
    pub fn delete_slice(&mut self, begin: f64, end: f64) -> usize {
        let range = self.slice_range(begin, end);
        let removed = range.len();
        self.data_x.drain(range.clone());
        self.data_y.drain(range);
        removed
    }

    /// Replace the points in `[begin, end)` with those of `other`, whose times
    /// are relative to `begin`. Points of `other` beyond `end - begin` are
    /// dropped.
    pub fn replace_slice(&mut self, begin: f64, end: f64, other: &PointSeries) -> Result<()> {
        if !(begin < end) {
            return Err(Error::range(begin, end, "begin must precede end"));
        }
        check_shift(begin)?;
        self.delete_slice(begin, end);
        let span = end - begin;
        let (x, y) = other.data_slice(0.0, span);
        let window = PointSeries {
            data_x: x.to_vec(),
            data_y: y.to_vec(),
            point_type: other.point_type.clone(),
        };
        self.add_points_shifted(&window, begin)
    }

    /// Set every point's value to the wave's value at the point's time.
    pub fn align_to_wave(&mut self, wave: &WaveSeries) -> Result<()> {
        let aligned = self
            .data_x
            .iter()
            .map(|&x| wave.value_at(x))
            .collect::<Result<Vec<_>>>()?;
        self.data_y = aligned;
        Ok(())
    }

    pub fn move_in_time(&mut self, shift: f64) -> Result<()> {
        check_shift(shift)?;
        for x in &mut self.data_x {
            *x += shift;
        }
        Ok(())
    }
}

fn non_finite(x: f64, y: f64) -> Error {
    Error::InvalidArgument(format!("point ({x}, {y}) is not finite"))
}

fn check_shift(shift: f64) -> Result<()> {
    if !shift.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "time shift must be finite, got {shift}"
        )));
    }
    Ok(())
}
