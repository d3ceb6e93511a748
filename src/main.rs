// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

#[macro_use] extern crate lazy_static;

use std::error::Error;
use std::process;

use structopt::StructOpt;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod matcher;
mod monitor;
mod notify;
mod pattern;
mod reader;
mod renderer;
mod series;

use config::{Config, TelegramConfig};
use matcher::LineMatcher;
use monitor::Monitor;
use notify::{NotificationTrigger, TelegramSink};
use reader::FileTailer;
use renderer::PngRenderer;

fn init_logging() {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(true)
    .with_level(true)
    .init();
}

fn fatal(message: String) -> ! {
  eprintln!("error: {}", message);
  process::exit(1);
}

fn main() -> Result<(), Box<dyn Error>> {
  init_logging();

  let config = Config::from_args();

  let telegram = match TelegramConfig::load(&config.config) {
    Ok(telegram) => telegram,
    Err(e) => fatal(e.to_string())
  };

  info!(
    files = config.files.len(),
    lossgraph = config.lossgraph,
    threshold = config.threshold,
    "starting"
  );

  let mut handles = Vec::new();
  for path in &config.files {
    let registry = match config.build_registry() {
      Ok(registry) => registry,
      Err(e) => fatal(e.to_string())
    };

    if registry.is_empty() {
      warn!(file = %path.display(), "no patterns registered, nothing will match");
    } else {
      info!(file = %path.display(), patterns = registry.len(), "patterns registered");
    }

    let tailer = match FileTailer::open(path, config.interval()) {
      Ok(tailer) => tailer,
      Err(e) => fatal(format!("unable to open {}: {}", path.display(), e))
    };

    let monitor = Monitor::new(
      tailer.name(),
      LineMatcher::new(registry),
      NotificationTrigger::new(config.threshold),
      PngRenderer::new(&config.tmpdir),
      TelegramSink::new(&telegram, &config.api_base),
      config.lossgraph
    );

    handles.push((path.clone(), reader::follow(tailer, monitor)?));
  }

  // tail threads only return on I/O errors
  for (path, handle) in handles {
    match handle.join() {
      Ok(Ok(())) => (),
      Ok(Err(e)) => error!(file = %path.display(), error = %e, "stopped following"),
      Err(_) => error!(file = %path.display(), "follow thread panicked")
    }
  }

  Ok(())
}
