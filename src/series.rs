// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::fmt;

/// A single decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Int(i64),
  Float(f64),
  Text(String)
}

impl Value {
  /// Numeric view of the value for plotting, `None` for text
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Int(i) => Some(*i as f64),
      Value::Float(f) => Some(*f),
      Value::Text(_) => None
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Value::Int(i) => write!(f, "{}", i),
      Value::Float(v) => write!(f, "{}", v),
      Value::Text(s) => f.write_str(s)
    }
  }
}

/// Accumulated values of one pattern, one column per declared field.
///
/// Columns only ever grow, and always together: `push_row` appends exactly one
/// value to each of them.
#[derive(Debug, Clone, Default)]
pub struct SeriesStore {
  names: Vec<String>,
  columns: Vec<Vec<Value>>
}

impl SeriesStore {
  pub fn new<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>
  {
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    let columns = names.iter().map(|_| Vec::new()).collect();

    SeriesStore { names, columns }
  }

  /// Number of rows recorded so far
  pub fn len(&self) -> usize {
    self.columns.first().map(Vec::len).unwrap_or(0)
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// All values recorded for `field`, in arrival order
  pub fn get(&self, field: &str) -> Option<&[Value]> {
    self.names.iter()
      .position(|n| n == field)
      .map(|i| self.columns[i].as_slice())
  }

  /// The most recently recorded value of `field`
  pub fn last(&self, field: &str) -> Option<&Value> {
    self.get(field).and_then(|values| values.last())
  }

  /// Appends one decoded row; the row must hold one value per field, in
  /// declared order.
  pub(crate) fn push_row(&mut self, row: Vec<Value>) {
    assert_eq!(
      row.len(), self.columns.len(),
      "row width does not match the series field count"
    );

    for (column, value) in self.columns.iter_mut().zip(row) {
      column.push(value);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use spectral::prelude::*;

  #[test]
  fn test_empty_store() {
    let store = SeriesStore::new(vec!["Iteration", "Loss"]);

    assert_that!(store.len()).is_equal_to(0);
    assert_that!(store.is_empty()).is_true();
    assert_that!(store.get("Loss").map(|v| v.len())).is_some().is_equal_to(0);
    assert_that!(store.get("Missing")).is_none();
    assert_that!(store.last("Loss")).is_none();
  }

  #[test]
  fn test_rows_grow_together() {
    let mut store = SeriesStore::new(vec!["Iteration", "Loss"]);
    store.push_row(vec![Value::Int(1), Value::Float(0.9)]);
    store.push_row(vec![Value::Int(2), Value::Float(0.8)]);

    assert_that!(store.len()).is_equal_to(2);
    assert_that!(store.get("Iteration").unwrap().to_vec())
      .is_equal_to(vec![Value::Int(1), Value::Int(2)]);
    assert_that!(store.get("Loss").unwrap().to_vec())
      .is_equal_to(vec![Value::Float(0.9), Value::Float(0.8)]);
    assert_that!(store.last("Iteration")).is_some().is_equal_to(&Value::Int(2));
  }

  #[test]
  #[should_panic]
  fn test_short_row_rejected() {
    let mut store = SeriesStore::new(vec!["Iteration", "Loss"]);
    store.push_row(vec![Value::Int(1)]);
  }

  #[test]
  fn test_value_views() {
    assert_that!(Value::Int(3).as_f64()).is_some().is_equal_to(3.0);
    assert_that!(Value::Float(0.5).as_f64()).is_some().is_equal_to(0.5);
    assert_that!(Value::Text("x".into()).as_f64()).is_none();
    assert_that!(Value::Float(0.25).to_string()).is_equal_to("0.25".to_string());
  }
}
