// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::collections::HashSet;
use std::fmt;
use std::slice;

use snafu::{ensure, Snafu};

use crate::series::{SeriesStore, Value};
use super::types::{FieldType, PatternSpec};

#[derive(Debug, Snafu)]
pub enum MalformedPatternError {
  #[snafu(display("pattern name must not be empty"))]
  EmptyName,

  #[snafu(display("pattern {} is already registered", name))]
  DuplicatePattern {
    name: String
  },

  #[snafu(display("pattern {} declares no fields", name))]
  NoFields {
    name: String
  },

  #[snafu(display("field #{} of pattern {} has no name", position, pattern))]
  UnnamedField {
    pattern: String,
    position: usize
  },

  #[snafu(display("pattern {} declares field {} more than once", pattern, field))]
  DuplicateField {
    pattern: String,
    field: String
  },

  #[snafu(display(
    "pattern {} marks both {} and {} as index axis",
    pattern, first, second
  ))]
  MultipleIndexFields {
    pattern: String,
    first: String,
    second: String
  },

  #[snafu(display(
    "pattern {} has {} capture groups but {} captured fields",
    pattern, groups, fields
  ))]
  ArityMismatch {
    pattern: String,
    groups: usize,
    fields: usize
  },

  #[snafu(display(
    "field {} of pattern {} refers to unknown field {}",
    field, pattern, target
  ))]
  UnknownReference {
    pattern: String,
    field: String,
    target: String
  },

  #[snafu(display(
    "field {} of pattern {} is {} but refers to {} which is {}",
    field, pattern, expected, target, found
  ))]
  ReferenceTypeMismatch {
    pattern: String,
    field: String,
    target: String,
    expected: FieldType,
    found: FieldType
  }
}

/// Stable identifier handed out on registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(usize);

impl fmt::Display for PatternId {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A registered pattern together with the series it has accumulated
#[derive(Debug)]
pub struct Registration {
  pub id: PatternId,
  pub spec: PatternSpec,
  series: SeriesStore
}

impl Registration {
  pub fn series(&self) -> &SeriesStore {
    &self.series
  }
}

#[derive(Debug, Default)]
pub struct PatternRegistry {
  entries: Vec<Registration>
}

fn validate(
  spec: &PatternSpec, registry: &PatternRegistry
) -> Result<(), MalformedPatternError> {
  ensure!(!spec.name.is_empty(), EmptyName);
  ensure!(
    registry.by_name(&spec.name).is_none(),
    DuplicatePattern { name: spec.name.as_str() }
  );
  ensure!(!spec.fields.is_empty(), NoFields { name: spec.name.as_str() });

  let mut names = HashSet::new();
  let mut index_field: Option<&str> = None;
  for (position, field) in spec.fields.iter().enumerate() {
    ensure!(
      !field.name.is_empty(),
      UnnamedField { pattern: spec.name.as_str(), position }
    );

    ensure!(
      names.insert(field.name.as_str()),
      DuplicateField {
        pattern: spec.name.as_str(),
        field: field.name.as_str()
      }
    );

    if field.index {
      if let Some(first) = index_field {
        return MultipleIndexFields {
          pattern: spec.name.as_str(),
          first,
          second: field.name.as_str()
        }.fail();
      }

      index_field = Some(field.name.as_str());
    }

    // references may only point backwards so that a single pass over the
    // registry always sees the referenced value first
    if let Some(target) = &field.from {
      let referenced = registry.by_name(&target.pattern)
        .and_then(|r| r.spec.fields.iter().find(|f| f.name == target.field));

      let referenced = match referenced {
        Some(referenced) => referenced,
        None => return UnknownReference {
          pattern: spec.name.as_str(),
          field: field.name.as_str(),
          target: target.to_string()
        }.fail()
      };

      // the copied value keeps its variant, so the declared types must agree
      ensure!(referenced.kind == field.kind, ReferenceTypeMismatch {
        pattern: spec.name.as_str(),
        field: field.name.as_str(),
        target: target.to_string(),
        expected: field.kind,
        found: referenced.kind
      });
    }
  }

  // captures_len() includes the implicit whole-match group
  let groups = spec.pattern.captures_len() - 1;
  let fields = spec.captured_len();
  ensure!(groups == fields, ArityMismatch {
    pattern: spec.name.as_str(),
    groups,
    fields
  });

  Ok(())
}

impl PatternRegistry {
  pub fn new() -> Self {
    PatternRegistry::default()
  }

  /// Validates and stores a new pattern, creating an empty series for it
  pub fn register(
    &mut self, spec: PatternSpec
  ) -> Result<PatternId, MalformedPatternError> {
    validate(&spec, self)?;

    let id = PatternId(self.entries.len());
    let series = SeriesStore::new(spec.fields.iter().map(|f| f.name.clone()));
    self.entries.push(Registration { id, spec, series });

    Ok(id)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, id: PatternId) -> Option<&Registration> {
    self.entries.get(id.0)
  }

  pub fn by_name(&self, name: &str) -> Option<&Registration> {
    self.entries.iter().find(|r| r.spec.name == name)
  }

  /// Iterates registrations in registration order
  pub fn iter(&self) -> slice::Iter<Registration> {
    self.entries.iter()
  }

  pub(crate) fn record(&mut self, id: PatternId, row: Vec<Value>) {
    self.entries[id.0].series.push_row(row);
  }
}

impl<'a> IntoIterator for &'a PatternRegistry {
  type Item = &'a Registration;
  type IntoIter = slice::Iter<'a, Registration>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.iter()
  }
}
