// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use regex::Regex;

use super::registry::{MalformedPatternError, PatternRegistry};
use super::types::{FieldSpec, FieldType, PatternSpec};

pub const TRAIN_SPEED: &str = "train-speed";
pub const TRAIN: &str = "train";
pub const TEST_MARKER: &str = "test-marker";
pub const TEST: &str = "test";

lazy_static! {
  // Iteration 100 (3.21 iter/s, 6.23s/20 iters), loss = 0.51
  static ref SPEED_RE: Regex = Regex::new(
    r"Iteration (\d+) \(([0-9.eE+-]+) iter/s, ([0-9.eE+-]+)s/\d+ iters\)"
  ).unwrap();

  // Iteration 100, loss = 0.51 (with or without the speed block)
  static ref TRAIN_RE: Regex = Regex::new(
    r"Iteration (\d+)(?: \([^)]*\))?, loss = ([^\s,]+)"
  ).unwrap();

  static ref TEST_MARKER_RE: Regex = Regex::new(
    r"Iteration (\d+), Testing net"
  ).unwrap();

  // Test net output #0: loss = 0.42 (* 1 = 0.42 loss)
  static ref TEST_RE: Regex = Regex::new(
    r"Test net output #(\d+): loss = ([^\s,]+)"
  ).unwrap();
}

/// The Caffe solver patterns, in the order they must be registered
pub fn caffe_specs() -> Vec<PatternSpec> {
  vec![
    PatternSpec::new(TRAIN_SPEED, SPEED_RE.clone(), vec![
      FieldSpec::new("Iteration", FieldType::Int).index(),
      FieldSpec::new("IterPerSec", FieldType::Float),
      FieldSpec::new("SecPerBatch", FieldType::Float)
    ]),

    PatternSpec::new(TRAIN, TRAIN_RE.clone(), vec![
      FieldSpec::new("Iteration", FieldType::Int).index(),
      FieldSpec::new("Loss", FieldType::Float).display()
    ]).decisive(),

    PatternSpec::new(TEST_MARKER, TEST_MARKER_RE.clone(), vec![
      FieldSpec::new("Iteration", FieldType::Int).index()
    ]),

    // test outputs carry no iteration, so they borrow the last marker's
    PatternSpec::new(TEST, TEST_RE.clone(), vec![
      FieldSpec::new("Iteration", FieldType::Int)
        .index()
        .from(TEST_MARKER, "Iteration"),
      FieldSpec::new("Output", FieldType::Int),
      FieldSpec::new("TestLoss", FieldType::Float).display()
    ])
  ]
}

pub fn register_caffe(
  registry: &mut PatternRegistry
) -> Result<(), MalformedPatternError> {
  for spec in caffe_specs() {
    registry.register(spec)?;
  }

  Ok(())
}
