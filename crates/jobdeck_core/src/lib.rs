//! Jobdeck core: pure dashboard state machine and view-model helpers.
mod effect;
mod job;
mod msg;
mod state;
mod tracker;
mod update;
mod view_model;

pub use effect::Effect;
pub use job::{
    DashboardStats, ItemOutcome, ItemRecord, ItemStatus, JobDetail, JobId, JobRecord, JobStatus,
    LogEntry, LogSubject, ProgressEvent, RequestFailure, UploadReceipt,
};
pub use msg::Msg;
pub use state::{AppState, ConnectionState, Notice, Severity, NOTICE_CAPACITY};
pub use tracker::{
    JobTracker, LogLine, ProgressOutcome, TimerCommand, TimerId, TrackedJobView,
    TrackerSnapshot, LOG_CAPACITY, TERMINAL_GRACE,
};
pub use update::update;
pub use view_model::{AppViewModel, JobDetailView, JobRowView, RowActions, DETAIL_PREVIEW_LIMIT};
