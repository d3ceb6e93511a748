// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::fmt;

use regex::Regex;
use serde::Deserialize;
use serde::de::{self, Visitor, Deserializer};

struct RegexFromStr;

impl<'de> Visitor<'de> for RegexFromStr {
  type Value = Regex;

  fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str("a string containing a valid regular expression")
  }

  fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
  where
    E: de::Error
  {
    match Regex::new(s) {
      Ok(r) => Ok(r),
      Err(e) => Err(de::Error::custom(format!(
        "could not compile regex: {:?}", e
      )))
    }
  }
}

fn de_regex<'de, D>(deserializer: D) -> Result<Regex, D::Error>
where
  D: Deserializer<'de>
{
  deserializer.deserialize_str(RegexFromStr)
}

/// How the text captured for a field is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
  Int,
  Float,
  Text
}

impl Default for FieldType {
  fn default() -> Self {
    FieldType::Float
  }
}

impl fmt::Display for FieldType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      FieldType::Int => f.write_str("int"),
      FieldType::Float => f.write_str("float"),
      FieldType::Text => f.write_str("text")
    }
  }
}

/// Points at a field of another pattern whose latest value should be reused
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldRef {
  pub pattern: String,
  pub field: String
}

impl fmt::Display for FieldRef {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}.{}", self.pattern, self.field)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
  pub name: String,

  #[serde(rename = "type", default)]
  pub kind: FieldType,

  /// Marks the shared x-axis of the pattern, e.g. the iteration number
  #[serde(default)]
  pub index: bool,

  /// Plot this field as a y-series
  #[serde(default)]
  pub display: bool,

  /// If set, the field does not consume a capture group and instead copies
  /// the most recent value recorded for the referenced field
  #[serde(default)]
  pub from: Option<FieldRef>
}

impl FieldSpec {
  pub fn new(name: &str, kind: FieldType) -> Self {
    FieldSpec {
      name: name.to_string(),
      kind,
      index: false,
      display: false,
      from: None
    }
  }

  pub fn index(mut self) -> Self {
    self.index = true;
    self
  }

  pub fn display(mut self) -> Self {
    self.display = true;
    self
  }

  pub fn from(mut self, pattern: &str, field: &str) -> Self {
    self.from = Some(FieldRef {
      pattern: pattern.to_string(),
      field: field.to_string()
    });
    self
  }

  /// True if this field is filled from a capture group of its own pattern
  pub fn is_captured(&self) -> bool {
    self.from.is_none()
  }
}

/// A declarative description of one recognized log line shape
#[derive(Debug, Clone, Deserialize)]
pub struct PatternSpec {
  pub name: String,

  #[serde(deserialize_with = "de_regex")]
  pub pattern: Regex,

  /// Whether matches of this pattern count toward the notification threshold
  #[serde(default)]
  pub decisive: bool,

  pub fields: Vec<FieldSpec>
}

impl PatternSpec {
  pub fn new(name: &str, pattern: Regex, fields: Vec<FieldSpec>) -> Self {
    PatternSpec {
      name: name.to_string(),
      pattern,
      decisive: false,
      fields
    }
  }

  pub fn decisive(mut self) -> Self {
    self.decisive = true;
    self
  }

  pub fn index_field(&self) -> Option<&FieldSpec> {
    self.fields.iter().find(|f| f.index)
  }

  pub fn displayed_fields(&self) -> impl Iterator<Item = &FieldSpec> {
    self.fields.iter().filter(|f| f.display)
  }

  /// Number of fields that consume a capture group
  pub fn captured_len(&self) -> usize {
    self.fields.iter().filter(|f| f.is_captured()).count()
  }
}
