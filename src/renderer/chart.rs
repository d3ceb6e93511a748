// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::path::PathBuf;

use snafu::{ensure, Snafu};

use crate::pattern::PatternRegistry;
use crate::series::Value;

#[derive(Debug, Snafu)]
pub enum ChartError {
  #[snafu(display("nothing to plot yet"))]
  Empty,

  #[snafu(display(
    "displayed series disagree on the x axis: {} vs {}", first, second
  ))]
  MultipleIndexAxes {
    first: String,
    second: String
  },

  #[snafu(display("unable to save chart to {}: {}", path.display(), source))]
  Save {
    path: PathBuf,
    source: image::ImageError
  }
}

/// A rendered chart file and the legend that goes along with it
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
  pub path: PathBuf,

  /// axis ranges and one entry per drawn series, sent in the caption
  pub legend: Vec<String>
}

/// Renders the displayed series of a registry into an image file
pub trait ChartRenderer {
  fn render(
    &self, registry: &PatternRegistry, title: &str
  ) -> Result<Chart, ChartError>;
}

/// One plotted series
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
  pub label: String,
  pub points: Vec<(f64, f64)>
}

impl Line {
  /// Smallest and largest y, `None` for a line without points
  pub fn y_range(&self) -> Option<(f64, f64)> {
    self.points.iter().fold(None, |range, &(_, y)| match range {
      None => Some((y, y)),
      Some((min, max)) => Some((f64::min(min, y), f64::max(max, y)))
    })
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plot {
  pub x_label: String,
  pub lines: Vec<Line>
}

impl Plot {
  /// Smallest and largest x and y over all points, as `(min, max)` pairs
  pub fn bounds(&self) -> ((f64, f64), (f64, f64)) {
    let mut x = (std::f64::INFINITY, std::f64::NEG_INFINITY);
    let mut y = x;

    for &(px, py) in self.lines.iter().flat_map(|l| l.points.iter()) {
      x = (x.0.min(px), x.1.max(px));
      y = (y.0.min(py), y.1.max(py));
    }

    (x, y)
  }
}

/// the arrival ordinal stands in for the x axis of patterns without one
const ORDINAL_AXIS: &str = "#";

/// Gathers one line per displayed field of every pattern.
///
/// Each line is plotted against its own pattern's index field, so every
/// pattern with displayed fields must name the same index field.
pub fn collect_plot(registry: &PatternRegistry) -> Result<Plot, ChartError> {
  let mut axis: Option<(String, String)> = None;
  let mut lines = Vec::new();

  for registration in registry {
    let spec = &registration.spec;
    if spec.displayed_fields().next().is_none() {
      continue;
    }

    let series = registration.series();
    let index = spec.index_field();
    let index_name = index.map(|f| f.name.as_str()).unwrap_or(ORDINAL_AXIS);

    if axis.is_none() {
      axis = Some((index_name.to_string(), spec.name.clone()));
    }

    if let Some((name, owner)) = &axis {
      if name != index_name {
        return MultipleIndexAxes {
          first: format!("{}.{}", owner, name),
          second: format!("{}.{}", spec.name, index_name)
        }.fail();
      }
    }

    let xs: Vec<Option<f64>> = match index {
      Some(field) => series.get(&field.name)
        .unwrap_or(&[])
        .iter()
        .map(Value::as_f64)
        .collect(),
      None => (0..series.len()).map(|i| Some(i as f64)).collect()
    };

    for field in spec.displayed_fields() {
      let ys = series.get(&field.name).unwrap_or(&[]);
      let points = xs.iter()
        .zip(ys)
        .filter_map(|(x, y)| match (x, y.as_f64()) {
          (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, y)),
          _ => None
        })
        .collect();

      lines.push(Line {
        label: format!("{} ({})", field.name, spec.name),
        points
      });
    }
  }

  ensure!(lines.iter().any(|l| !l.points.is_empty()), Empty);

  Ok(Plot {
    x_label: axis.map(|(name, _)| name).unwrap_or_else(|| ORDINAL_AXIS.to_string()),
    lines
  })
}
