// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::path::{Path, PathBuf};

use snafu::{OptionExt, Snafu};

#[derive(Debug, Snafu)]
pub enum SinkError {
  #[snafu(display(
    "image {} has no supported extension (jpg, jpeg, png)", path.display()
  ))]
  UnsupportedImageFormat {
    path: PathBuf
  },

  #[snafu(display("unable to read image {}: {}", path.display(), source))]
  ImageRead {
    path: PathBuf,
    source: std::io::Error
  },

  #[snafu(display("{} request failed: {}", method, source))]
  Request {
    method: String,
    source: reqwest::Error
  },

  #[snafu(display(
    "{} was not delivered ({}): {}", method, status, description
  ))]
  Delivery {
    method: String,
    status: u16,
    description: String
  }
}

/// Somewhere notifications can be delivered to
pub trait NotificationSink {
  fn send_text(&self, message: &str) -> Result<(), SinkError>;

  /// Sends the image at `path` with a caption; only jpeg and png images are
  /// accepted
  fn send_image(&self, path: &Path, caption: &str) -> Result<(), SinkError>;
}

/// Maps an image path to its content type based on the extension
pub fn image_content_type(path: &Path) -> Result<&'static str, SinkError> {
  let ext = path.extension()
    .map(|e| e.to_string_lossy().to_lowercase())
    .unwrap_or_default();

  let content_type = match ext.as_str() {
    "jpg" | "jpeg" => Some("image/jpeg"),
    "png" => Some("image/png"),
    _ => None
  };

  content_type.context(UnsupportedImageFormat { path })
}
