//! Multichannel container tying waves, events and parameters together.

use crate::error::{Error, Result};
use crate::signal::{ParameterSeries, PointSeries, WaveSeries};
use std::collections::BTreeMap;

/// Named waves, point sets and parameters analysed together.
///
/// Keys are unique within each mapping; the same key may appear in several
/// mappings (`"ecg"` wave and `"ecg"` points). `add_*` never overwrites: a
/// taken key fails with [`Error::ChannelExists`]. Overwriting goes through
/// the explicit `replace_*` calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeDataset {
    waves: BTreeMap<String, WaveSeries>,
    points: BTreeMap<String, PointSeries>,
    parameters: BTreeMap<String, ParameterSeries>,
}

impl CompositeDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from initial keyed series. Keys go through the same
    /// checks as `add_*`, so a key repeated within one collection fails with
    /// [`Error::ChannelExists`].
    pub fn from_series<W, P, Q>(waves: W, points: P, parameters: Q) -> Result<Self>
    where
        W: IntoIterator<Item = (String, WaveSeries)>,
        P: IntoIterator<Item = (String, PointSeries)>,
        Q: IntoIterator<Item = (String, ParameterSeries)>,
    {
        let mut dataset = Self::new();
        for (key, wave) in waves {
            dataset.add_wave(key, wave)?;
        }
        for (key, set) in points {
            dataset.add_points(key, set)?;
        }
        for (key, parameter) in parameters {
            dataset.add_parameter(key, parameter)?;
        }
        Ok(dataset)
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty() && self.points.is_empty() && self.parameters.is_empty()
    }

    pub fn waves(&self) -> &BTreeMap<String, WaveSeries> {
        &self.waves
    }

    pub fn points(&self) -> &BTreeMap<String, PointSeries> {
        &self.points
    }

    pub fn parameters(&self) -> &BTreeMap<String, ParameterSeries> {
        &self.parameters
    }

    pub fn wave(&self, key: &str) -> Option<&WaveSeries> {
        self.waves.get(key)
    }

    pub fn point_set(&self, key: &str) -> Option<&PointSeries> {
        self.points.get(key)
    }

    pub fn parameter(&self, key: &str) -> Option<&ParameterSeries> {
        self.parameters.get(key)
    }

    /// Mutable access for explicit commits such as `replace_slice`.
    pub fn wave_mut(&mut self, key: &str) -> Option<&mut WaveSeries> {
        self.waves.get_mut(key)
    }

    pub fn point_set_mut(&mut self, key: &str) -> Option<&mut PointSeries> {
        self.points.get_mut(key)
    }

    pub fn add_wave(&mut self, key: impl Into<String>, wave: WaveSeries) -> Result<()> {
        insert_new(&mut self.waves, "wave", key.into(), wave)
    }

    pub fn add_points(&mut self, key: impl Into<String>, points: PointSeries) -> Result<()> {
        insert_new(&mut self.points, "points", key.into(), points)
    }

    pub fn add_parameter(
        &mut self,
        key: impl Into<String>,
        parameter: ParameterSeries,
    ) -> Result<()> {
        insert_new(&mut self.parameters, "parameter", key.into(), parameter)
    }

    pub fn replace_wave(&mut self, key: impl Into<String>, wave: WaveSeries) -> Option<WaveSeries> {
        self.waves.insert(key.into(), wave)
    }

    pub fn replace_points(
        &mut self,
        key: impl Into<String>,
        points: PointSeries,
    ) -> Option<PointSeries> {
        self.points.insert(key.into(), points)
    }

    pub fn replace_parameter(
        &mut self,
        key: impl Into<String>,
        parameter: ParameterSeries,
    ) -> Option<ParameterSeries> {
        self.parameters.insert(key.into(), parameter)
    }

    /// Merge `points` into the set under `key`, or insert it if the key is free.
    pub fn join_points(&mut self, key: impl Into<String>, points: PointSeries) {
        match self.points.entry(key.into()) {
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                slot.get_mut().add_points(&points)
            }
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(points);
            }
        }
    }

    /// Detach a wave; the caller owns it afterwards.
    pub fn remove_wave(&mut self, key: &str) -> Option<WaveSeries> {
        self.waves.remove(key)
    }

    pub fn remove_points(&mut self, key: &str) -> Option<PointSeries> {
        self.points.remove(key)
    }

    pub fn remove_parameter(&mut self, key: &str) -> Option<ParameterSeries> {
        self.parameters.remove(key)
    }

    /// Time span covered by every named channel.
    ///
    /// Each series stored under a key contributes its domain: `[offset,
    /// offset + length)` for a wave, `[first x, last x]` for points. The
    /// result is a usable window, so it must have `begin < end`: a span that
    /// shrinks to a single instant (one point, or points touching a wave's
    /// edge) counts as empty. Fails with [`Error::EmptyIntersection`] when no
    /// key is given, a key is unknown, a point set is empty or the domains do
    /// not overlap.
    pub fn calculate_time_range<S: AsRef<str>>(&self, channel_keys: &[S]) -> Result<(f64, f64)> {
        if channel_keys.is_empty() {
            return Err(Error::EmptyIntersection("no channels requested".into()));
        }
        let mut begin = f64::NEG_INFINITY;
        let mut end = f64::INFINITY;
        for key in channel_keys {
            let key = key.as_ref();
            let wave = self.waves.get(key);
            let points = self.points.get(key);
            if wave.is_none() && points.is_none() {
                return Err(Error::EmptyIntersection(format!(
                    "channel '{key}' does not exist"
                )));
            }
            if let Some(wave) = wave {
                begin = begin.max(wave.offset());
                end = end.min(wave.end_time());
            }
            if let Some(points) = points {
                let (first, last) = points.time_span().ok_or_else(|| {
                    Error::EmptyIntersection(format!("point channel '{key}' is empty"))
                })?;
                begin = begin.max(first);
                end = end.min(last);
            }
        }
        if !(begin < end) {
            return Err(Error::EmptyIntersection(format!(
                "channels {:?} share no time span",
                channel_keys.iter().map(|k| k.as_ref()).collect::<Vec<&str>>()
            )));
        }
        Ok((begin, end))
    }

    /// Span covered by any wave or point set, `None` for a dataset without them.
    pub fn calculate_complete_time_span(&self) -> Option<(f64, f64)> {
        let wave_spans = self.waves.values().map(|w| (w.offset(), w.end_time()));
        let point_spans = self.points.values().filter_map(PointSeries::time_span);
        wave_spans
            .chain(point_spans)
            .reduce(|(b0, e0), (b1, e1)| (b0.min(b1), e0.max(e1)))
    }
}

fn insert_new<T>(
    map: &mut BTreeMap<String, T>,
    mapping: &'static str,
    key: String,
    value: T,
) -> Result<()> {
    if map.contains_key(&key) {
        return Err(Error::ChannelExists { mapping, key });
    }
    map.insert(key, value);
    Ok(())
}
