// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::fs;
use std::path::Path;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::config::TelegramConfig;
use super::types::{image_content_type, NotificationSink, SinkError};

/// The envelope every Bot API response is wrapped in
#[derive(Debug, Deserialize)]
struct ApiResponse {
  ok: bool,
  description: Option<String>
}

/// Delivers notifications to a single Telegram chat through the Bot API
pub struct TelegramSink {
  client: Client,

  // contains the bot key, never log this
  endpoint: String,

  chat_id: String
}

impl TelegramSink {
  pub fn new(config: &TelegramConfig, api_base: &str) -> Self {
    TelegramSink {
      client: Client::new(),
      endpoint: format!(
        "{}/bot{}",
        api_base.trim_end_matches('/'), config.api_key()
      ),
      chat_id: config.chat_id.clone()
    }
  }

  fn method_url(&self, method: &str) -> String {
    format!("{}/{}", self.endpoint, method)
  }

  fn deliver(&self, method: &str, request: RequestBuilder) -> Result<(), SinkError> {
    let response = request.send().map_err(|source| SinkError::Request {
      method: method.to_string(),
      source
    })?;

    let status = response.status();

    // an empty or non-json body is fine as long as the status says so
    let body: Option<ApiResponse> = response.json().ok();
    let accepted = status.is_success() && body.as_ref().map(|b| b.ok).unwrap_or(true);

    if !accepted {
      let description = body
        .and_then(|b| b.description)
        .or_else(|| status.canonical_reason().map(String::from))
        .unwrap_or_default();

      return Err(SinkError::Delivery {
        method: method.to_string(),
        status: status.as_u16(),
        description
      });
    }

    debug!(method, status = status.as_u16(), "notification delivered");
    Ok(())
  }
}

impl NotificationSink for TelegramSink {
  fn send_text(&self, message: &str) -> Result<(), SinkError> {
    let request = self.client
      .post(&self.method_url("sendMessage"))
      .form(&[("chat_id", self.chat_id.as_str()), ("text", message)]);

    self.deliver("sendMessage", request)
  }

  fn send_image(&self, path: &Path, caption: &str) -> Result<(), SinkError> {
    // reject before touching the file or the network
    let content_type = image_content_type(path)?;

    let data = fs::read(path).map_err(|source| SinkError::ImageRead {
      path: path.to_path_buf(),
      source
    })?;

    let file_name = path.file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| String::from("chart"));

    let photo = Part::bytes(data)
      .file_name(file_name)
      .mime_str(content_type)
      .map_err(|source| SinkError::Request {
        method: String::from("sendPhoto"),
        source
      })?;

    let form = Form::new()
      .text("chat_id", self.chat_id.clone())
      .text("caption", caption.to_string())
      .part("photo", photo);

    let request = self.client
      .post(&self.method_url("sendPhoto"))
      .multipart(form);

    self.deliver("sendPhoto", request)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::path::PathBuf;

  use serde_json::json;
  use spectral::prelude::*;
  use wiremock::{Mock, MockServer, ResponseTemplate};
  use wiremock::matchers::{body_string_contains, method, path};

  fn sink(api_base: &str) -> TelegramSink {
    TelegramSink::new(&TelegramConfig::new("KEY", "42"), api_base)
  }

  fn chart(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, "not really a png").unwrap();
    path
  }

  #[tokio::test]
  async fn test_send_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
      .and(path("/botKEY/sendMessage"))
      .and(body_string_contains("chat_id=42"))
      .and(body_string_contains("text=hello"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
      .expect(1)
      .mount(&server)
      .await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || sink(&uri).send_text("hello"))
      .await
      .unwrap();

    assert_that!(result).is_ok();
  }

  #[tokio::test]
  async fn test_send_image() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let image = chart(&dir, "123_train.log_lossgraph.png");

    Mock::given(method("POST"))
      .and(path("/botKEY/sendPhoto"))
      .and(body_string_contains("Loss = 0.5"))
      .and(body_string_contains("image/png"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
      .expect(1)
      .mount(&server)
      .await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
      sink(&uri).send_image(&image, "train.log\nLoss = 0.5")
    }).await.unwrap();

    assert_that!(result).is_ok();
  }

  #[tokio::test]
  async fn test_rejected_delivery() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
      .and(path("/botKEY/sendMessage"))
      .respond_with(ResponseTemplate::new(400).set_body_json(json!({
        "ok": false,
        "error_code": 400,
        "description": "Bad Request: chat not found"
      })))
      .mount(&server)
      .await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || sink(&uri).send_text("hello"))
      .await
      .unwrap();

    match result {
      Err(SinkError::Delivery { status, description, .. }) => {
        assert_that!(status).is_equal_to(400);
        assert_that!(description.as_str()).is_equal_to("Bad Request: chat not found");
      },
      other => panic!("unexpected result: {:?}", other)
    }
  }

  #[tokio::test]
  async fn test_ok_false_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
      .and(path("/botKEY/sendMessage"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "ok": false,
        "description": "nope"
      })))
      .mount(&server)
      .await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || sink(&uri).send_text("hello"))
      .await
      .unwrap();

    match result {
      Err(SinkError::Delivery { status, .. }) => assert_that!(status).is_equal_to(200),
      other => panic!("unexpected result: {:?}", other)
    }
  }

  #[test]
  fn test_unsupported_image_skips_network() {
    let dir = tempfile::tempdir().unwrap();
    let image = chart(&dir, "chart.gif");

    // nothing listens on the discard port; any request would fail differently
    match sink("http://127.0.0.1:9").send_image(&image, "caption") {
      Err(SinkError::UnsupportedImageFormat { path }) => {
        assert_that!(path).is_equal_to(image);
      },
      other => panic!("unexpected result: {:?}", other)
    }
  }

  #[test]
  fn test_missing_image() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("gone.png");

    match sink("http://127.0.0.1:9").send_image(&image, "caption") {
      Err(SinkError::ImageRead { .. }) => (),
      other => panic!("unexpected result: {:?}", other)
    }
  }
}
