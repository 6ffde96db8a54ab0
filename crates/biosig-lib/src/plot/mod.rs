use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::dataset::CompositeDataset;

/// Samples kept per series after decimation.
pub const DEFAULT_MAX_POINTS: usize = 2000;

const PALETTE: [u32; 6] = [0x1F77B4, 0xD62728, 0x2CA02C, 0xFF7F0E, 0x9467BD, 0x8C564B];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        ((self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

/// Interval-valued data: each entry is `[begin, end, value]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSeries {
    pub name: String,
    pub segments: Vec<[f64; 3]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(LineSeries),
    Segments(SegmentSeries),
}

impl Series {
    pub fn name(&self) -> &str {
        match self {
            Series::Line(s) | Series::Markers(s) => &s.name,
            Series::Segments(s) => &s.name,
        }
    }

    /// `(min, max)` of the plotted values, if there are any.
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        let values: Box<dyn Iterator<Item = f64> + '_> = match self {
            Series::Line(s) | Series::Markers(s) => Box::new(s.points.iter().map(|p| p[1])),
            Series::Segments(s) => Box::new(s.segments.iter().map(|p| p[2])),
        };
        values.fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    /// Visible time window.
    pub x_range: (f64, f64),
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>, x_range: (f64, f64)) -> Self {
        Self {
            title: title.into(),
            x: Axis {
                label: Some("time [s]".into()),
            },
            y: Axis { label: None },
            x_range,
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

fn style(index: usize, width: f32) -> Style {
    Style {
        width,
        dash: None,
        color: Color(PALETTE[index % PALETTE.len()]),
    }
}

/// Build a figure of the dataset over `[begin, end)`.
///
/// `wanted_channels` selects keys from all three mappings (every key when
/// `None`). A missing bound defaults to the outer edge of the selected
/// channels. Waves become lines, point sets markers and parameters
/// horizontal segments; each is decimated to `max_points`.
pub fn figure_from_composite(
    dataset: &CompositeDataset,
    begin: Option<f64>,
    end: Option<f64>,
    wanted_channels: Option<&[String]>,
    title: Option<&str>,
    max_points: usize,
) -> Result<Figure> {
    let selected = |key: &str| wanted_channels.map_or(true, |w| w.iter().any(|c| c == key));
    if let Some(wanted) = wanted_channels {
        let known = |key: &str| {
            dataset.wave(key).is_some()
                || dataset.point_set(key).is_some()
                || dataset.parameter(key).is_some()
        };
        if let Some(missing) = wanted.iter().find(|k| !known(k.as_str())) {
            bail!("dataset has no channel '{missing}'");
        }
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let mut widen = |b: f64, e: f64| {
        lo = lo.min(b);
        hi = hi.max(e);
    };
    for (_, wave) in dataset.waves().iter().filter(|(k, _)| selected(k.as_str())) {
        widen(wave.offset(), wave.end_time());
    }
    for (_, points) in dataset.points().iter().filter(|(k, _)| selected(k.as_str())) {
        if let Some((b, e)) = points.time_span() {
            widen(b, e);
        }
    }
    for (_, parameter) in dataset.parameters().iter().filter(|(k, _)| selected(k.as_str())) {
        for entry in parameter.iter() {
            widen(entry.begin, entry.end);
        }
    }
    let begin = begin.unwrap_or(lo);
    let end = end.unwrap_or(hi);
    if !(begin < end) || !begin.is_finite() || !end.is_finite() {
        bail!("nothing to plot in [{begin}, {end})");
    }

    let mut fig = Figure::new(title.map(str::to_string), (begin, end));
    let mut colour = 0;
    for (key, wave) in dataset.waves().iter().filter(|(k, _)| selected(k.as_str())) {
        let b = begin.max(wave.offset());
        let e = end.min(wave.end_time());
        if !(b < e) {
            continue;
        }
        let (times, values) = wave.coordinates(b, e)?;
        let points: Vec<[f64; 2]> = times.into_iter().zip(values).map(|(t, v)| [t, v]).collect();
        fig.add_series(Series::Line(LineSeries {
            name: key.clone(),
            points: decimate_points(&points, max_points),
            style: style(colour, 1.4),
        }));
        colour += 1;
    }
    for (key, set) in dataset.points().iter().filter(|(k, _)| selected(k.as_str())) {
        let (xs, ys) = set.data_slice(begin, end);
        let points: Vec<[f64; 2]> = xs.iter().zip(ys).map(|(x, y)| [*x, *y]).collect();
        fig.add_series(Series::Markers(LineSeries {
            name: key.clone(),
            points: decimate_points(&points, max_points),
            style: style(colour, 3.0),
        }));
        colour += 1;
    }
    for (key, parameter) in dataset.parameters().iter().filter(|(k, _)| selected(k.as_str())) {
        let segments = parameter
            .segments(Some(begin), Some(end))
            .into_iter()
            .take(max_points)
            .map(|s| [s.begin, s.end, s.value])
            .collect();
        fig.add_series(Series::Segments(SegmentSeries {
            name: key.clone(),
            segments,
            style: style(colour, 2.0),
        }));
        colour += 1;
    }
    Ok(fig)
}
