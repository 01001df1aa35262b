use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub type JobId = u64;
pub type TimerId = u64;

/// One job as listed by `GET /api/jobs`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    #[serde(default)]
    pub filename: String,
    pub status: String,
    #[serde(rename = "total_cnpjs", alias = "total_items", default)]
    pub total_items: u64,
    #[serde(rename = "successful_cnpjs", alias = "successful", default)]
    pub successful: u64,
    #[serde(rename = "failed_cnpjs", alias = "failed", default)]
    pub failed: u64,
    #[serde(default)]
    pub workers: u32,
    #[serde(default)]
    pub use_stealth: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub progress_percentage: f64,
}

/// Per-item record inside a job detail.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemSummary {
    #[serde(rename = "cnpj", alias = "item")]
    pub item: String,
    pub status: String,
    #[serde(rename = "fund_name", alias = "label", default)]
    pub label: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub data_count: u64,
    #[serde(default)]
    pub scraped_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobDetailReply {
    pub job: JobSummary,
    #[serde(rename = "cnpjs", alias = "items", default)]
    pub items: Vec<ItemSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct StatsReply {
    #[serde(default)]
    pub total_jobs: u64,
    #[serde(default)]
    pub completed_jobs: u64,
    #[serde(default)]
    pub running_jobs: u64,
    #[serde(rename = "total_cnpjs_scraped", alias = "total_items_scraped", default)]
    pub total_items_scraped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UploadReply {
    pub job_id: JobId,
    #[serde(rename = "total_cnpjs", alias = "total_items")]
    pub total_items: u64,
    #[serde(default)]
    pub workers: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Server default applies when `None`.
    pub workers: Option<u32>,
    pub use_stealth: bool,
}

/// Downloaded result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Server-suggested file name, if any.
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

/// `job_update` frame from the event feed. Only `job_id` is mandatory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobUpdate {
    pub job_id: JobId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub successful: Option<u64>,
    #[serde(default)]
    pub failed: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `item_update` frame from the event feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemUpdate {
    #[serde(default)]
    pub job_id: Option<JobId>,
    #[serde(rename = "cnpj", alias = "item")]
    pub item: String,
    pub status: String,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Connected,
    Disconnected,
    Job(JobUpdate),
    Item(ItemUpdate),
}

/// Everything the client runtime reports back to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Uploaded {
        start: bool,
        result: Result<UploadReply, ApiError>,
    },
    Started {
        job_id: JobId,
        result: Result<String, ApiError>,
    },
    Stopped {
        job_id: JobId,
        result: Result<String, ApiError>,
    },
    Retried {
        job_id: JobId,
        result: Result<String, ApiError>,
    },
    StuckFixed(Result<Vec<JobId>, ApiError>),
    JobsListed(Result<Vec<JobSummary>, ApiError>),
    DetailLoaded {
        job_id: JobId,
        result: Result<JobDetailReply, ApiError>,
    },
    StatsLoaded(Result<StatsReply, ApiError>),
    Downloaded {
        job_id: JobId,
        result: Result<PathBuf, ApiError>,
    },
    Feed(FeedEvent),
    ClearTimerFired { timer: TimerId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// The server answered `success: false`; the message is its `error` text.
    Rejected,
    Decode,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Rejected => write!(f, "rejected"),
            FailureKind::Decode => write!(f, "invalid response"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}
