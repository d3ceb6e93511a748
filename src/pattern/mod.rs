// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

pub mod builtin;
mod registry;
mod types;

pub use registry::{MalformedPatternError, PatternId, PatternRegistry};
pub use types::{FieldSpec, FieldType, PatternSpec};
