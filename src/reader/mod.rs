// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::io;
use std::thread::{self, JoinHandle};

use tracing::info;

use crate::monitor::Monitor;
use crate::notify::NotificationSink;
use crate::renderer::ChartRenderer;

pub mod tail;

pub use tail::FileTailer;

/// Feeds every new line of `tailer` to `monitor` on a dedicated thread
pub fn follow<R, S>(
  mut tailer: FileTailer,
  mut monitor: Monitor<R, S>
) -> io::Result<JoinHandle<io::Result<()>>>
where
  R: ChartRenderer + Send + 'static,
  S: NotificationSink + Send + 'static
{
  let name = tailer.name().to_string();

  thread::Builder::new().name(format!("follow:{}", name)).spawn(move || {
    info!(
      file = %tailer.name(),
      position = tailer.cursor().position,
      "waiting for new lines"
    );

    tailer.run(|line| {
      monitor.on_line(line);
    })
  })
}
