pub type JobId = u64;

/// Lifecycle state of a backend job as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Parses the server's lowercase status string. Unknown values yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Failed and cancelled jobs accept no further progress.
    pub(crate) fn rejects_progress(self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }
}

/// Outcome attached to a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Processing,
    Success,
    Failed,
    NotFound,
    Info,
}

impl ItemOutcome {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "processing" => Some(Self::Processing),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "not_found" => Some(Self::NotFound),
            "info" => Some(Self::Info),
            _ => None,
        }
    }
}

/// Persisted per-item state inside a job detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemStatus {
    #[default]
    Pending,
    Processing,
    Success,
    Failed,
    NotFound,
}

impl ItemStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "not_found" => Some(Self::NotFound),
            _ => None,
        }
    }
}

/// Partial update for one job pushed by the event feed.
///
/// Only `job_id` is mandatory; every other field overwrites the tracked
/// value when present and leaves it alone when absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub status: Option<JobStatus>,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub phase: Option<String>,
    pub successful: Option<u64>,
    pub failed: Option<u64>,
    pub timestamp: Option<String>,
}

impl ProgressEvent {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSubject {
    /// Phase changes and other job-level notes.
    System,
    Item(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: Option<String>,
    pub subject: LogSubject,
    pub outcome: ItemOutcome,
    pub detail: Option<String>,
}

impl LogEntry {
    pub fn item(
        item: impl Into<String>,
        outcome: ItemOutcome,
        detail: Option<String>,
        timestamp: Option<String>,
    ) -> Self {
        Self {
            timestamp,
            subject: LogSubject::Item(item.into()),
            outcome,
            detail,
        }
    }

    pub fn system(text: impl Into<String>, timestamp: Option<String>) -> Self {
        Self {
            timestamp,
            subject: LogSubject::System,
            outcome: ItemOutcome::Info,
            detail: Some(text.into()),
        }
    }
}

/// One row of the server's job listing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobRecord {
    pub id: JobId,
    pub filename: String,
    pub status: JobStatus,
    pub total_items: u64,
    pub successful: u64,
    pub failed: u64,
    pub progress_percentage: f64,
    pub workers: u32,
    pub use_stealth: bool,
    pub created_at: Option<String>,
    pub completed_at: Option<String>,
    pub has_output: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemRecord {
    pub item: String,
    pub status: ItemStatus,
    pub label: Option<String>,
    pub error_message: Option<String>,
    pub data_count: u64,
    pub retry_count: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobDetail {
    pub job: JobRecord,
    pub items: Vec<ItemRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total_jobs: u64,
    pub completed_jobs: u64,
    pub running_jobs: u64,
    pub total_items_scraped: u64,
}

/// Server reply to a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub job_id: JobId,
    pub total_items: u64,
    pub workers: u32,
}

/// Why a command request did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    /// The server was unreachable or answered without a usable envelope.
    Transport(String),
    /// The server answered `success: false` with this error text.
    Rejected(String),
}

impl RequestFailure {
    pub fn message(&self) -> &str {
        match self {
            Self::Transport(message) | Self::Rejected(message) => message,
        }
    }
}
