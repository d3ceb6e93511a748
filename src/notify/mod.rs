// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

mod telegram;
mod trigger;
mod types;

pub use telegram::TelegramSink;
pub use trigger::{NotificationTrigger, DEFAULT_THRESHOLD};
pub use types::{NotificationSink, SinkError};
