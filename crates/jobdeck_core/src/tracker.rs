//! Progress tracking for the one job the dashboard follows.
//!
//! [`JobTracker`] is a pure reducer over feed events. It never fails: events
//! for other jobs, events after a failed/cancelled status and stale timers
//! are dropped without touching state.

use std::collections::VecDeque;
use std::time::Duration;

use deck_logging::deck_debug;

use crate::{JobId, JobStatus, LogEntry, ProgressEvent};

/// Number of log lines retained; older lines are evicted first.
pub const LOG_CAPACITY: usize = 100;

/// Delay between a job reaching a terminal status and it being untracked.
pub const TERMINAL_GRACE: Duration = Duration::from_secs(5);

pub type TimerId = u64;

/// Request for the runtime to arm or disarm the terminal clear timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Schedule { timer: TimerId, delay: Duration },
    Cancel { timer: TimerId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressOutcome {
    /// Event named another job, nothing is tracked, or the job is closed.
    Ignored,
    Merged { status_changed: bool },
    /// The merge moved the job into a terminal status and armed the clear timer.
    EnteredTerminal {
        status: JobStatus,
        timer: TimerCommand,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct TrackedJob {
    job_id: JobId,
    status: JobStatus,
    // Kept as delivered; rounding happens in the snapshot.
    progress: f64,
    successful: u64,
    failed: u64,
    message: Option<String>,
    phase: Option<String>,
}

impl TrackedJob {
    fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
            progress: 0.0,
            successful: 0,
            failed: 0,
            message: None,
            phase: None,
        }
    }

    fn progress_percent(&self) -> u8 {
        self.progress.round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingClear {
    timer: TimerId,
    job_id: JobId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Monotonic across the session, including across clears.
    pub seq: u64,
    pub entry: LogEntry,
}

/// Fixed-capacity tail of log lines in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct LogBuffer {
    lines: VecDeque<LogLine>,
    next_seq: u64,
}

impl LogBuffer {
    fn push(&mut self, entry: LogEntry) {
        self.next_seq += 1;
        self.lines.push_back(LogLine {
            seq: self.next_seq,
            entry,
        });
        while self.lines.len() > LOG_CAPACITY {
            self.lines.pop_front();
        }
    }

    fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Render-ready view of the tracked job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedJobView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub successful: u64,
    pub failed: u64,
    pub message: Option<String>,
    pub phase: Option<String>,
    /// An automatic untrack is pending.
    pub clearing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackerSnapshot {
    pub job: Option<TrackedJobView>,
    pub log: Vec<LogLine>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobTracker {
    job: Option<TrackedJob>,
    pending_clear: Option<PendingClear>,
    last_timer: TimerId,
    log: LogBuffer,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked_job_id(&self) -> Option<JobId> {
        self.job.as_ref().map(|job| job.job_id)
    }

    pub fn is_tracking(&self) -> bool {
        self.job.is_some()
    }

    /// Follows `job_id` from scratch, replacing whatever was tracked.
    ///
    /// Clears the log. Returns the cancel command for a pending clear timer.
    pub fn start_tracking(&mut self, job_id: JobId) -> Option<TimerCommand> {
        let cancel = self.disarm();
        if let Some(previous) = self.tracked_job_id().filter(|id| *id != job_id) {
            deck_debug!("Tracking job {} replaces job {}", job_id, previous);
        }
        self.job = Some(TrackedJob::new(job_id));
        self.log.clear();
        cancel
    }

    /// Stops following the current job. Idempotent.
    pub fn stop_tracking(&mut self) -> Option<TimerCommand> {
        self.job = None;
        self.disarm()
    }

    pub fn apply_progress(&mut self, event: ProgressEvent) -> ProgressOutcome {
        let Some(job) = self.job.as_mut() else {
            deck_debug!("Dropping progress for job {}: nothing tracked", event.job_id);
            return ProgressOutcome::Ignored;
        };
        if job.job_id != event.job_id {
            deck_debug!(
                "Dropping progress for job {} while tracking job {}",
                event.job_id,
                job.job_id
            );
            return ProgressOutcome::Ignored;
        }
        if job.status.rejects_progress() {
            deck_debug!(
                "Dropping progress for job {} after {}",
                job.job_id,
                job.status.as_str()
            );
            return ProgressOutcome::Ignored;
        }

        let before = job.status;
        if let Some(status) = event.status {
            job.status = status;
        }
        if let Some(progress) = event.progress.filter(|p| p.is_finite()) {
            job.progress = progress;
        }
        if let Some(message) = event.message {
            job.message = Some(message);
        }
        if let Some(successful) = event.successful {
            job.successful = successful;
        }
        if let Some(failed) = event.failed {
            job.failed = failed;
        }
        if let Some(phase) = event.phase {
            self.log
                .push(LogEntry::system(phase.clone(), event.timestamp.clone()));
            job.phase = Some(phase);
        }

        let after = job.status;
        let job_id = job.job_id;
        if after.is_terminal() && !before.is_terminal() && self.pending_clear.is_none() {
            let timer = self.arm(job_id);
            return ProgressOutcome::EnteredTerminal {
                status: after,
                timer,
            };
        }
        ProgressOutcome::Merged {
            status_changed: before != after,
        }
    }

    /// Appends to the log tail regardless of which job the entry belongs to.
    pub fn apply_log(&mut self, entry: LogEntry) {
        self.log.push(entry);
    }

    /// Handles expiry of a clear timer. Returns whether the job was untracked.
    pub fn clear_timer_fired(&mut self, timer: TimerId) -> bool {
        match self.pending_clear {
            Some(pending) if pending.timer == timer => {
                deck_debug!("Grace period over for job {}", pending.job_id);
                self.pending_clear = None;
                self.job = None;
                true
            }
            _ => {
                deck_debug!("Ignoring stale clear timer {}", timer);
                false
            }
        }
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            job: self.job.as_ref().map(|job| TrackedJobView {
                job_id: job.job_id,
                status: job.status,
                progress_percent: job.progress_percent(),
                successful: job.successful,
                failed: job.failed,
                message: job.message.clone(),
                phase: job.phase.clone(),
                clearing: self.pending_clear.is_some(),
            }),
            log: self.log.lines.iter().cloned().collect(),
        }
    }

    fn arm(&mut self, job_id: JobId) -> TimerCommand {
        self.last_timer += 1;
        let timer = self.last_timer;
        self.pending_clear = Some(PendingClear { timer, job_id });
        TimerCommand::Schedule {
            timer,
            delay: TERMINAL_GRACE,
        }
    }

    fn disarm(&mut self) -> Option<TimerCommand> {
        self.pending_clear
            .take()
            .map(|pending| TimerCommand::Cancel {
                timer: pending.timer,
            })
    }
}
