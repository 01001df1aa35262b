use std::path::PathBuf;
use std::time::Duration;

use crate::{JobId, TimerCommand, TimerId};

/// Side effects requested by [`crate::update`]; executed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    UploadBatch {
        path: PathBuf,
        workers: Option<u32>,
        use_stealth: bool,
        start: bool,
    },
    StartJob { job_id: JobId },
    StopJob { job_id: JobId },
    RetryJob { job_id: JobId },
    FixStuckJobs,
    LoadJobs,
    LoadStats,
    LoadJobDetail { job_id: JobId },
    DownloadResult { job_id: JobId, dest: PathBuf },
    /// Arm the terminal clear timer; expiry comes back as `Msg::ClearTimerFired`.
    ScheduleClear { timer: TimerId, delay: Duration },
    CancelClear { timer: TimerId },
}

impl Effect {
    /// Effects answered by exactly one response message.
    pub fn is_request(&self) -> bool {
        !matches!(self, Effect::ScheduleClear { .. } | Effect::CancelClear { .. })
    }
}

impl From<TimerCommand> for Effect {
    fn from(command: TimerCommand) -> Self {
        match command {
            TimerCommand::Schedule { timer, delay } => Effect::ScheduleClear { timer, delay },
            TimerCommand::Cancel { timer } => Effect::CancelClear { timer },
        }
    }
}
