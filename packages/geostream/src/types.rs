// Common types for the replay feed

use crate::config::ConfigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

/// Errors raised while loading the dataset. Always fatal at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// `row` is the 1-based data row (the header is not counted)
    #[error("Invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("Dataset contains no rows")]
    Empty,
}

/// Errors raised while decoding a received frame. The frame is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Frame is not valid UTF-8")]
    Utf8,

    #[error("Frame has no key/payload delimiter")]
    MissingDelimiter,

    #[error("Frame key is empty")]
    EmptyKey,

    #[error("Malformed row block: {0}")]
    Csv(String),

    #[error("Frame header is missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("Row {row} has time {row_key} but the frame key is {frame_key}")]
    KeyMismatch {
        frame_key: String,
        row_key: String,
        row: usize,
    },
}

/// Errors that can occur while publishing or subscribing
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Bind error: {0}")]
    Bind(String),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Send error: {0}")]
    Send(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Totals reported by the publisher loop when it stops
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PublishStats {
    pub frames_sent: u64,
    pub send_failures: u64,
    pub encode_failures: u64,
    pub cycles_completed: u64,
    pub started_at: Option<DateTime<Utc>>,
}

/// Totals reported by the subscriber loop when it stops
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReceiveStats {
    pub frames_received: u64,
    pub frames_decoded: u64,
    pub decode_failures: u64,
    pub records_delivered: u64,
    pub refreshes: u64,
}
