// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::fs;

use tracing::{debug, info, warn};

use crate::matcher::{LineMatcher, MatchOutcome};
use crate::notify::{NotificationSink, NotificationTrigger, SinkError};
use crate::pattern::PatternRegistry;
use crate::renderer::{Chart, ChartRenderer};

/// Builds the notification text: the title, then the latest value of every
/// displayed field along with its index value, if any
pub fn caption(title: &str, registry: &PatternRegistry) -> String {
  let mut lines = vec![title.to_string()];

  for registration in registry {
    let spec = &registration.spec;
    let series = registration.series();

    let index = spec.index_field().and_then(|field| {
      series.last(&field.name).map(|value| format!(" @ {} {}", field.name, value))
    });

    for field in spec.displayed_fields() {
      if let Some(value) = series.last(&field.name) {
        lines.push(format!(
          "{} = {}{}",
          field.name,
          value,
          index.as_ref().map(String::as_str).unwrap_or("")
        ));
      }
    }
  }

  lines.join("\n")
}

fn notify<R, S>(
  title: &str,
  registry: &PatternRegistry,
  renderer: &R,
  sink: &S,
  charts: bool
) -> Result<(), SinkError>
where
  R: ChartRenderer,
  S: NotificationSink
{
  let text = caption(title, registry);

  if !charts {
    return sink.send_text(&text);
  }

  match renderer.render(registry, title) {
    Ok(Chart { path, legend }) => {
      let text = format!("{}\n\n{}", text, legend.join("\n"));
      let sent = sink.send_image(&path, &text);

      if let Err(e) = fs::remove_file(&path) {
        debug!(path = %path.display(), error = %e, "could not remove chart");
      }

      sent
    },
    Err(e) => {
      warn!(file = title, error = %e, "unable to render chart, sending text");
      sink.send_text(&text)
    }
  }
}

/// The whole pipeline for one followed file: every line is matched, and every
/// `threshold`-th decisive match sends a notification
pub struct Monitor<R, S> {
  name: String,
  matcher: LineMatcher,
  trigger: NotificationTrigger,
  renderer: R,
  sink: S,
  charts: bool
}

impl<R, S> Monitor<R, S>
where
  R: ChartRenderer,
  S: NotificationSink
{
  pub fn new(
    name: &str,
    matcher: LineMatcher,
    trigger: NotificationTrigger,
    renderer: R,
    sink: S,
    charts: bool
  ) -> Self {
    Monitor {
      name: name.to_string(),
      matcher,
      trigger,
      renderer,
      sink,
      charts
    }
  }

  #[cfg(test)]
  pub fn matcher(&self) -> &LineMatcher {
    &self.matcher
  }

  #[cfg(test)]
  pub fn pending(&self) -> usize {
    self.trigger.pending()
  }

  pub fn on_line(&mut self, line: &str) -> MatchOutcome {
    let outcome = self.matcher.feed(line);

    for error in &outcome.errors {
      warn!(file = %self.name, %error, "unable to decode line");
    }

    for found in &outcome.matches {
      debug!(
        file = %self.name,
        pattern = %found.pattern,
        id = %found.id,
        values = ?found.values,
        "matched"
      );
    }

    let name = self.name.as_str();
    let registry = self.matcher.registry();
    let (renderer, sink, charts) = (&self.renderer, &self.sink, self.charts);

    for _ in outcome.decisive() {
      let fired = self.trigger.on_decisive_match(|| {
        match notify(name, registry, renderer, sink, charts) {
          Ok(()) => info!(file = %name, "notification sent"),
          Err(e) => warn!(file = %name, error = %e, "notification failed")
        }
      });

      if !fired {
        debug!(file = %name, pending = self.trigger.pending(), "waiting for more");
      }
    }

    outcome
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::cell::RefCell;
  use std::path::{Path, PathBuf};
  use std::rc::Rc;

  use spectral::prelude::*;

  use crate::notify::DEFAULT_THRESHOLD;
  use crate::pattern::builtin;
  use crate::renderer::ChartError;
  use crate::series::Value;

  #[derive(Debug, Clone, PartialEq)]
  enum Sent {
    Text(String),
    Image(String)
  }

  #[derive(Default)]
  struct FakeSink {
    sent: Rc<RefCell<Vec<Sent>>>,
    images_existed: Rc<RefCell<Vec<bool>>>,
    fail: bool
  }

  impl NotificationSink for FakeSink {
    fn send_text(&self, message: &str) -> Result<(), SinkError> {
      self.sent.borrow_mut().push(Sent::Text(message.to_string()));

      if self.fail {
        return Err(SinkError::Delivery {
          method: "sendMessage".to_string(),
          status: 500,
          description: "down".to_string()
        });
      }

      Ok(())
    }

    fn send_image(&self, path: &Path, caption: &str) -> Result<(), SinkError> {
      self.sent.borrow_mut().push(Sent::Image(caption.to_string()));
      self.images_existed.borrow_mut().push(path.exists());

      if self.fail {
        return Err(SinkError::Delivery {
          method: "sendPhoto".to_string(),
          status: 500,
          description: "down".to_string()
        });
      }

      Ok(())
    }
  }

  struct FakeRenderer {
    dir: PathBuf,
    renders: Rc<RefCell<usize>>,
    fail: bool
  }

  impl ChartRenderer for FakeRenderer {
    fn render(
      &self, _registry: &PatternRegistry, title: &str
    ) -> Result<Chart, ChartError> {
      if self.fail {
        return Err(ChartError::Empty);
      }

      *self.renders.borrow_mut() += 1;

      let path = self.dir.join(format!("{}_lossgraph.png", title));
      fs::write(&path, b"png").unwrap();
      Ok(Chart {
        path,
        legend: vec!["blue: Loss (train)".to_string()]
      })
    }
  }

  struct Harness {
    monitor: Monitor<FakeRenderer, FakeSink>,
    sent: Rc<RefCell<Vec<Sent>>>,
    images_existed: Rc<RefCell<Vec<bool>>>,
    renders: Rc<RefCell<usize>>,
    dir: tempfile::TempDir
  }

  fn harness(charts: bool, render_fails: bool, sink_fails: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = PatternRegistry::new();
    builtin::register_caffe(&mut registry).unwrap();

    let sink = FakeSink { fail: sink_fails, ..FakeSink::default() };
    let sent = Rc::clone(&sink.sent);
    let images_existed = Rc::clone(&sink.images_existed);

    let renders = Rc::new(RefCell::new(0));
    let renderer = FakeRenderer {
      dir: dir.path().to_path_buf(),
      renders: Rc::clone(&renders),
      fail: render_fails
    };

    let monitor = Monitor::new(
      "train.log",
      LineMatcher::new(registry),
      NotificationTrigger::new(DEFAULT_THRESHOLD),
      renderer,
      sink,
      charts
    );

    Harness { monitor, sent, images_existed, renders, dir }
  }

  fn loss(i: i64) -> f64 {
    1.0 - i as f64 / 10.0
  }

  fn train_lines(h: &mut Harness, range: std::ops::RangeInclusive<i64>) {
    for i in range {
      h.monitor.on_line(&format!("Iteration {}, loss = {}", i, loss(i)));
    }
  }

  #[test]
  fn test_fifth_line_sends_chart() {
    let mut h = harness(true, false, false);
    train_lines(&mut h, 1..=5);

    let series = h.monitor.matcher().registry()
      .by_name(builtin::TRAIN)
      .unwrap()
      .series();

    assert_that!(series.get("Iteration").map(|v| v.to_vec())).is_some().is_equal_to(
      (1..=5).map(Value::Int).collect::<Vec<_>>()
    );
    assert_that!(series.get("Loss").map(|v| v.to_vec())).is_some().is_equal_to(
      (1..=5).map(|i| Value::Float(loss(i))).collect::<Vec<_>>()
    );

    assert_that!(*h.renders.borrow()).is_equal_to(1);
    assert_that!(h.sent.borrow().clone()).is_equal_to(vec![
      Sent::Image(
        "train.log\nLoss = 0.5 @ Iteration 5\n\nblue: Loss (train)".to_string()
      )
    ]);
    assert_that!(h.monitor.pending()).is_equal_to(0);

    // sent while it existed, removed afterwards
    assert_that!(h.images_existed.borrow().clone()).is_equal_to(vec![true]);
    assert_that!(fs::read_dir(h.dir.path()).unwrap().count()).is_equal_to(0);
  }

  #[test]
  fn test_four_lines_send_nothing() {
    let mut h = harness(true, false, false);
    train_lines(&mut h, 1..=4);

    assert_that!(*h.renders.borrow()).is_equal_to(0);
    assert_that!(h.sent.borrow().len()).is_equal_to(0);
    assert_that!(h.monitor.pending()).is_equal_to(4);
  }

  #[test]
  fn test_every_fifth_line() {
    let mut h = harness(true, false, false);
    train_lines(&mut h, 1..=12);

    assert_that!(*h.renders.borrow()).is_equal_to(2);
    assert_that!(h.monitor.pending()).is_equal_to(2);
  }

  #[test]
  fn test_dual_series_does_not_notify() {
    let mut h = harness(true, false, false);
    h.monitor.on_line("Iteration 10, Testing net (#0)");
    h.monitor.on_line("Test net output #0: loss = 0.42");
    h.monitor.on_line("Iteration 11, loss = 0.33");

    let registry = h.monitor.matcher().registry();
    let test = registry.by_name(builtin::TEST).unwrap().series();
    let train = registry.by_name(builtin::TRAIN).unwrap().series();

    assert_that!(test.last("Iteration")).is_equal_to(Some(&Value::Int(10)));
    assert_that!(test.last("TestLoss")).is_equal_to(Some(&Value::Float(0.42)));
    assert_that!(train.last("Iteration")).is_equal_to(Some(&Value::Int(11)));
    assert_that!(train.last("Loss")).is_equal_to(Some(&Value::Float(0.33)));

    assert_that!(h.sent.borrow().len()).is_equal_to(0);
    assert_that!(h.monitor.pending()).is_equal_to(1);
  }

  #[test]
  fn test_undecodable_line_does_not_count() {
    let mut h = harness(true, false, false);
    let outcome = h.monitor.on_line("Iteration 1, loss = lots");

    assert_that!(outcome.errors.len()).is_equal_to(1);
    assert_that!(h.monitor.pending()).is_equal_to(0);
  }

  #[test]
  fn test_failing_sink_keeps_going() {
    let mut h = harness(true, false, true);
    train_lines(&mut h, 1..=6);

    assert_that!(h.sent.borrow().len()).is_equal_to(1);
    assert_that!(h.monitor.pending()).is_equal_to(1);
    assert_that!(fs::read_dir(h.dir.path()).unwrap().count()).is_equal_to(0);
  }

  #[test]
  fn test_text_mode() {
    let mut h = harness(false, false, false);
    train_lines(&mut h, 1..=5);

    assert_that!(*h.renders.borrow()).is_equal_to(0);
    assert_that!(h.sent.borrow().clone()).is_equal_to(vec![
      Sent::Text("train.log\nLoss = 0.5 @ Iteration 5".to_string())
    ]);
  }

  #[test]
  fn test_render_failure_falls_back_to_text() {
    let mut h = harness(true, true, false);
    train_lines(&mut h, 1..=5);

    assert_that!(h.sent.borrow().clone()).is_equal_to(vec![
      Sent::Text("train.log\nLoss = 0.5 @ Iteration 5".to_string())
    ]);
  }

  #[test]
  fn test_caption_includes_test_loss() {
    let mut h = harness(false, false, false);
    h.monitor.on_line("Iteration 0, Testing net (#0)");
    h.monitor.on_line("Test net output #0: loss = 2.5");
    h.monitor.on_line("Iteration 3, loss = 0.7");

    assert_that!(caption("run", h.monitor.matcher().registry())).is_equal_to(
      "run\nLoss = 0.7 @ Iteration 3\nTestLoss = 2.5 @ Iteration 0".to_string()
    );
  }
}
