use std::path::PathBuf;

use crate::{
    DashboardStats, JobDetail, JobId, JobRecord, LogEntry, ProgressEvent, RequestFailure,
    TimerId, UploadReceipt,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User asked to upload a batch file and create a job.
    UploadRequested {
        path: PathBuf,
        workers: Option<u32>,
        use_stealth: bool,
        /// Start the job as soon as it is created.
        start: bool,
    },
    UploadFinished {
        start: bool,
        result: Result<UploadReceipt, RequestFailure>,
    },
    /// User clicked Start on a job.
    StartClicked { job_id: JobId },
    JobStarted {
        job_id: JobId,
        result: Result<(), RequestFailure>,
    },
    /// User clicked Stop. `None` stops the tracked job.
    StopClicked { job_id: Option<JobId> },
    JobStopped {
        job_id: JobId,
        result: Result<(), RequestFailure>,
    },
    /// User asked to retry the failed items of a job.
    RetryClicked { job_id: JobId },
    RetryStarted {
        job_id: JobId,
        result: Result<String, RequestFailure>,
    },
    FixStuckClicked,
    StuckJobsFixed(Result<Vec<JobId>, RequestFailure>),
    DetailRequested { job_id: JobId },
    DetailLoaded {
        job_id: JobId,
        result: Result<JobDetail, RequestFailure>,
    },
    DownloadRequested { job_id: JobId, dest: PathBuf },
    DownloadFinished {
        job_id: JobId,
        result: Result<PathBuf, RequestFailure>,
    },
    /// Explicit reload of the job list and statistics.
    RefreshRequested,
    /// Periodic reload; polls the tracked job instead while one is tracked.
    RefreshTick,
    JobsLoaded(Result<Vec<JobRecord>, RequestFailure>),
    StatsLoaded(Result<DashboardStats, RequestFailure>),
    /// Feed: progress for some job.
    JobUpdate(ProgressEvent),
    /// Feed: outcome for one item.
    ItemUpdate(LogEntry),
    ClearTimerFired { timer: TimerId },
    FeedConnected,
    FeedDisconnected,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
