// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::de::{self, Visitor, Deserializer};
use simple_error::SimpleError;
use snafu::{ensure, ResultExt, Snafu};
use structopt::StructOpt;
use structopt::clap::AppSettings;

use crate::pattern::{builtin, MalformedPatternError, PatternRegistry, PatternSpec};

#[derive(Debug, Snafu)]
pub enum ConfigError {
  #[snafu(display("unable to expand config path {}: {}", path, message))]
  Expand {
    path: String,
    message: String
  },

  #[snafu(display("unable to read config at {}: {}", path.display(), source))]
  ConfigRead {
    path: PathBuf,
    source: std::io::Error
  },

  #[snafu(display(
    "unable to deserialize config at {}: {}", path.display(), source
  ))]
  ConfigDeserialize {
    path: PathBuf,
    source: serde_yaml::Error
  },

  #[snafu(display("config at {} has an empty {}", path.display(), key))]
  EmptyKey {
    path: PathBuf,
    key: String
  },

  #[snafu(display("invalid log pattern: {}", source))]
  Pattern {
    source: MalformedPatternError
  }
}

struct ChatIdFromAny;

impl<'de> Visitor<'de> for ChatIdFromAny {
  type Value = String;

  fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str("a chat id, either numeric or a @channel name")
  }

  fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
  where
    E: de::Error
  {
    Ok(s.to_string())
  }

  fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
  where
    E: de::Error
  {
    Ok(v.to_string())
  }

  fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
  where
    E: de::Error
  {
    Ok(v.to_string())
  }
}

fn de_chat_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>
{
  deserializer.deserialize_any(ChatIdFromAny)
}

/// Telegram bot credentials, loaded once at startup
#[derive(Clone, Deserialize)]
pub struct TelegramConfig {
  #[serde(rename = "TELEGRAM_APIKEY")]
  api_key: String,

  #[serde(rename = "TELEGRAM_ID", deserialize_with = "de_chat_id")]
  pub chat_id: String
}

impl fmt::Debug for TelegramConfig {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.debug_struct("TelegramConfig")
      .field("api_key", &"<redacted>")
      .field("chat_id", &self.chat_id)
      .finish()
  }
}

impl TelegramConfig {
  #[cfg(test)]
  pub fn new(api_key: &str, chat_id: &str) -> Self {
    TelegramConfig {
      api_key: api_key.to_string(),
      chat_id: chat_id.to_string()
    }
  }

  pub fn load(path: &str) -> Result<Self, ConfigError> {
    let expanded = shellexpand::full(path).map_err(|e| ConfigError::Expand {
      path: path.to_string(),
      message: e.to_string()
    })?;
    let path = PathBuf::from(expanded.as_ref());

    let file = File::open(&path).context(ConfigRead { path: path.clone() })?;
    let config: TelegramConfig = serde_yaml::from_reader(BufReader::new(file))
      .context(ConfigDeserialize { path: path.clone() })?;

    ensure!(!config.api_key.is_empty(), EmptyKey {
      path: path.clone(),
      key: "TELEGRAM_APIKEY"
    });
    ensure!(!config.chat_id.is_empty(), EmptyKey {
      path,
      key: "TELEGRAM_ID"
    });

    Ok(config)
  }

  pub fn api_key(&self) -> &str {
    &self.api_key
  }
}

/// Additional patterns loaded from a yaml file
#[derive(Debug)]
pub struct PatternConfig {
  pub specs: Vec<PatternSpec>
}

impl FromStr for PatternConfig {
  type Err = SimpleError;

  fn from_str(path: &str) -> Result<Self, Self::Err> {
    let expanded_path = shellexpand::full(path).map_err(SimpleError::from)?;
    let file = File::open(&expanded_path.to_string()).map_err(SimpleError::from)?;
    let reader = BufReader::new(file);

    match serde_yaml::from_reader(reader) {
      Ok(specs) => Ok(PatternConfig { specs }),
      Err(e) => Err(SimpleError::new(
        format!("error loading patterns {}: {}", path, e)
      ))
    }
  }
}

#[derive(Debug, StructOpt)]
#[structopt(
  name = "telenotify",
  rename_all = "kebab-case",
  setting = AppSettings::ColoredHelp
)]
pub struct Config {
  /// Training log files to follow
  ///
  /// Each file is followed from its current end on its own thread, with its
  /// own series and notification counter.
  #[structopt(required = true, parse(from_os_str))]
  pub files: Vec<PathBuf>,

  /// Attach a loss chart to notifications instead of sending plain text
  #[structopt(long)]
  pub lossgraph: bool,

  /// Path to the yaml file holding TELEGRAM_APIKEY and TELEGRAM_ID
  #[structopt(long, short = "c", default_value = "config.yaml", env = "TN_CONFIG")]
  pub config: String,

  /// A path to a yaml file with additional log patterns
  ///
  /// Patterns from this file are registered after the built-in Caffe patterns
  /// and may refer to them.
  #[structopt(long, env = "TN_PATTERNS")]
  pub patterns: Option<PatternConfig>,

  /// Do not register the built-in Caffe patterns
  #[structopt(long)]
  pub no_builtins: bool,

  /// Seconds to wait before polling an idle file again
  #[structopt(long, default_value = "4", env = "TN_INTERVAL")]
  pub interval: u64,

  /// Number of training loss lines between two notifications
  #[structopt(long, short = "t", default_value = "5", env = "TN_THRESHOLD")]
  pub threshold: usize,

  /// Directory charts are rendered into before they are sent
  #[structopt(long, default_value = "/tmp", env = "TN_TMPDIR", parse(from_os_str))]
  pub tmpdir: PathBuf,

  /// Base URL of the Telegram Bot API
  #[structopt(long, default_value = "https://api.telegram.org", env = "TN_API_BASE")]
  pub api_base: String
}

impl Config {
  pub fn interval(&self) -> Duration {
    Duration::from_secs(self.interval)
  }

  /// Builds a fresh registry with the built-in and configured patterns
  pub fn build_registry(&self) -> Result<PatternRegistry, ConfigError> {
    let mut registry = PatternRegistry::new();

    if !self.no_builtins {
      builtin::register_caffe(&mut registry).context(Pattern)?;
    }

    if let Some(patterns) = &self.patterns {
      for spec in &patterns.specs {
        registry.register(spec.clone()).context(Pattern)?;
      }
    }

    Ok(registry)
  }
}
