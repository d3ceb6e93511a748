// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

mod chart;
mod png;

pub use chart::{Chart, ChartError, ChartRenderer};
pub use png::PngRenderer;
