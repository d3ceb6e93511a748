// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::num::{ParseFloatError, ParseIntError};

use regex::Captures;
use snafu::{ensure, OptionExt, ResultExt, Snafu};

use crate::pattern::{FieldSpec, FieldType, PatternId, PatternRegistry, PatternSpec};
use crate::series::Value;

#[derive(Debug, Snafu)]
pub enum DecodeError {
  #[snafu(display(
    "{}.{}: {:?} is not an integer: {}", pattern, field, text, source
  ))]
  InvalidInt {
    pattern: String,
    field: String,
    text: String,
    source: ParseIntError
  },

  #[snafu(display(
    "{}.{}: {:?} is not a number: {}", pattern, field, text, source
  ))]
  InvalidFloat {
    pattern: String,
    field: String,
    text: String,
    source: ParseFloatError
  },

  #[snafu(display("{}.{}: {:?} is not a finite number", pattern, field, text))]
  NonFinite {
    pattern: String,
    field: String,
    text: String
  },

  #[snafu(display("{}.{}: capture group did not participate", pattern, field))]
  MissingCapture {
    pattern: String,
    field: String
  },

  #[snafu(display(
    "{}.{}: nothing recorded for {} yet", pattern, field, target
  ))]
  MissingReference {
    pattern: String,
    field: String,
    target: String
  }
}

/// One pattern that matched and decoded successfully
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
  pub id: PatternId,
  pub pattern: String,

  /// decoded values in declared field order
  pub values: Vec<(String, Value)>,

  pub decisive: bool
}

impl PatternMatch {
  #[cfg(test)]
  pub fn get(&self, field: &str) -> Option<&Value> {
    self.values.iter()
      .find(|(name, _)| name == field)
      .map(|(_, value)| value)
  }
}

/// Everything a single line produced
#[derive(Debug, Default)]
pub struct MatchOutcome {
  pub matches: Vec<PatternMatch>,

  /// patterns whose rule matched but whose captures could not be decoded
  pub errors: Vec<DecodeError>
}

impl MatchOutcome {
  #[cfg(test)]
  pub fn is_match(&self) -> bool {
    !self.matches.is_empty()
  }

  pub fn decisive(&self) -> impl Iterator<Item = &PatternMatch> {
    self.matches.iter().filter(|m| m.decisive)
  }
}

fn decode(
  spec: &PatternSpec, field: &FieldSpec, text: &str
) -> Result<Value, DecodeError> {
  let text = text.trim();
  match field.kind {
    FieldType::Int => text.parse::<i64>()
      .map(Value::Int)
      .context(InvalidInt {
        pattern: spec.name.as_str(),
        field: field.name.as_str(),
        text
      }),
    FieldType::Float => {
      let value = text.parse::<f64>().context(InvalidFloat {
        pattern: spec.name.as_str(),
        field: field.name.as_str(),
        text
      })?;

      // parse() accepts nan and inf, only finite values are recorded
      ensure!(value.is_finite(), NonFinite {
        pattern: spec.name.as_str(),
        field: field.name.as_str(),
        text
      });

      Ok(Value::Float(value))
    },
    FieldType::Text => Ok(Value::Text(text.to_string()))
  }
}

/// decodes all fields of `spec`, consuming capture groups in order and
/// resolving references against what the registry has recorded so far
fn decode_row(
  registry: &PatternRegistry, spec: &PatternSpec, caps: &Captures
) -> Result<Vec<Value>, DecodeError> {
  let mut row = Vec::with_capacity(spec.fields.len());
  let mut group = 0;

  for field in &spec.fields {
    let value = match &field.from {
      Some(target) => registry.by_name(&target.pattern)
        .and_then(|r| r.series().last(&target.field))
        .cloned()
        .context(MissingReference {
          pattern: spec.name.as_str(),
          field: field.name.as_str(),
          target: target.to_string()
        })?,
      None => {
        group += 1;

        let text = caps.get(group).context(MissingCapture {
          pattern: spec.name.as_str(),
          field: field.name.as_str()
        })?;

        decode(spec, field, text.as_str())?
      }
    };

    row.push(value);
  }

  Ok(row)
}

/// Feeds lines through every registered pattern and records what they decode
#[derive(Debug)]
pub struct LineMatcher {
  registry: PatternRegistry
}

impl LineMatcher {
  pub fn new(registry: PatternRegistry) -> Self {
    LineMatcher { registry }
  }

  pub fn registry(&self) -> &PatternRegistry {
    &self.registry
  }

  /// Tests `line` against all patterns in registration order.
  ///
  /// Each pattern is decoded and recorded before the next one is tried, so a
  /// reference may resolve to a value recorded from this very line. A decode
  /// failure only discards that pattern's contribution.
  pub fn feed(&mut self, line: &str) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();
    let ids: Vec<PatternId> = self.registry.iter().map(|r| r.id).collect();

    for id in ids {
      let decoded = {
        let spec = match self.registry.get(id) {
          Some(registration) => &registration.spec,
          None => continue
        };

        let caps = match spec.pattern.captures(line) {
          Some(caps) => caps,
          None => continue
        };

        decode_row(&self.registry, spec, &caps).map(|row| {
          let values = spec.fields.iter()
            .map(|f| f.name.clone())
            .zip(row.iter().cloned())
            .collect();

          let found = PatternMatch {
            id,
            pattern: spec.name.clone(),
            values,
            decisive: spec.decisive
          };

          (row, found)
        })
      };

      match decoded {
        Ok((row, found)) => {
          self.registry.record(id, row);
          outcome.matches.push(found);
        },
        Err(e) => outcome.errors.push(e)
      }
    }

    outcome
  }
}
