// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::path::{Path, PathBuf};

use chrono::Utc;
use image::{Rgb, RgbImage};
use tracing::debug;

use crate::pattern::PatternRegistry;
use super::chart::{collect_plot, Chart, ChartError, ChartRenderer, Plot};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const MARGIN: u32 = 40;
const GRID_LINES: u32 = 5;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([228, 228, 228]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);

// matplotlib's default cycle; names are used in the legend
const PALETTE: &[(&str, Rgb<u8>)] = &[
  ("blue", Rgb([31, 119, 180])),
  ("orange", Rgb([255, 127, 14])),
  ("green", Rgb([44, 160, 44])),
  ("red", Rgb([214, 39, 40])),
  ("purple", Rgb([148, 103, 189])),
  ("brown", Rgb([140, 86, 75]))
];

/// Writes charts as PNG files into a scratch directory
#[derive(Debug, Clone)]
pub struct PngRenderer {
  dir: PathBuf
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
  if x >= 0 && y >= 0 && x < i64::from(img.width()) && y < i64::from(img.height()) {
    img.put_pixel(x as u32, y as u32, color);
  }
}

/// Bresenham, two pixels thick
fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
  let (mut x, mut y) = from;
  let dx = (to.0 - x).abs();
  let dy = -(to.1 - y).abs();
  let sx = if x < to.0 { 1 } else { -1 };
  let sy = if y < to.1 { 1 } else { -1 };
  let mut err = dx + dy;

  loop {
    put(img, x, y, color);
    put(img, x, y + 1, color);

    if x == to.0 && y == to.1 {
      break;
    }

    let e2 = 2 * err;
    if e2 >= dy {
      err += dy;
      x += sx;
    }
    if e2 <= dx {
      err += dx;
      y += sy;
    }
  }
}

fn draw_marker(img: &mut RgbImage, at: (i64, i64), color: Rgb<u8>) {
  for dx in -1..=1 {
    for dy in -1..=1 {
      put(img, at.0 + dx, at.1 + dy, color);
    }
  }
}

/// widens a degenerate range so single values still land mid-chart
fn span(range: (f64, f64)) -> (f64, f64) {
  if range.1 > range.0 {
    range
  } else {
    (range.0 - 0.5, range.0 + 0.5)
  }
}

/// Draws `plot` onto a fresh canvas: grid, axes, then one polyline per series
pub fn draw(plot: &Plot, width: u32, height: u32) -> RgbImage {
  let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

  let left = i64::from(MARGIN);
  let top = i64::from(MARGIN);
  let right = i64::from(width.saturating_sub(MARGIN));
  let bottom = i64::from(height.saturating_sub(MARGIN));

  for i in 0..=GRID_LINES {
    let gx = left + (right - left) * i64::from(i) / i64::from(GRID_LINES);
    let gy = top + (bottom - top) * i64::from(i) / i64::from(GRID_LINES);
    draw_line(&mut img, (gx, top), (gx, bottom), GRID);
    draw_line(&mut img, (left, gy), (right, gy), GRID);
  }

  draw_line(&mut img, (left, top), (left, bottom), AXIS);
  draw_line(&mut img, (left, bottom), (right, bottom), AXIS);

  let (xr, yr) = plot.bounds();
  let (xr, yr) = (span(xr), span(yr));
  let project = |(x, y): (f64, f64)| -> (i64, i64) {
    let px = left as f64 + (x - xr.0) / (xr.1 - xr.0) * (right - left) as f64;
    let py = bottom as f64 - (y - yr.0) / (yr.1 - yr.0) * (bottom - top) as f64;
    (px.round() as i64, py.round() as i64)
  };

  for (i, line) in plot.lines.iter().enumerate() {
    let (_, color) = PALETTE[i % PALETTE.len()];
    let points: Vec<(i64, i64)> = line.points.iter().cloned().map(&project).collect();

    for pair in points.windows(2) {
      draw_line(&mut img, pair[0], pair[1], color);
    }

    for point in &points {
      draw_marker(&mut img, *point, color);
    }
  }

  img
}

/// Describes what `draw` put on the canvas: the x range, then the color, label
/// and y range of every line that has points
pub fn legend(plot: &Plot) -> Vec<String> {
  let ((x_min, x_max), _) = plot.bounds();
  let mut legend = vec![format!("x: {} {} .. {}", plot.x_label, x_min, x_max)];

  for (i, line) in plot.lines.iter().enumerate() {
    if let Some((y_min, y_max)) = line.y_range() {
      let (color, _) = PALETTE[i % PALETTE.len()];
      legend.push(format!("{}: {} {} .. {}", color, line.label, y_min, y_max));
    }
  }

  legend
}

/// keeps file names portable whatever the log is called
fn file_safe(title: &str) -> String {
  title.chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
    .collect()
}

impl PngRenderer {
  pub fn new<P: AsRef<Path>>(dir: P) -> Self {
    PngRenderer {
      dir: dir.as_ref().to_path_buf()
    }
  }

  fn chart_path(&self, title: &str) -> PathBuf {
    self.dir.join(format!(
      "{}_{}_lossgraph.png",
      Utc::now().format("%Y%m%dT%H%M%S%.6f"),
      file_safe(title)
    ))
  }
}

impl ChartRenderer for PngRenderer {
  fn render(
    &self, registry: &PatternRegistry, title: &str
  ) -> Result<Chart, ChartError> {
    let plot = collect_plot(registry)?;
    let img = draw(&plot, WIDTH, HEIGHT);

    let path = self.chart_path(title);
    img.save(&path).map_err(|source| ChartError::Save {
      path: path.clone(),
      source
    })?;

    debug!(path = %path.display(), lines = plot.lines.len(), "chart rendered");
    Ok(Chart {
      path,
      legend: legend(&plot)
    })
  }
}
