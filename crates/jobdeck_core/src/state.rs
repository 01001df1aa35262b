use std::collections::VecDeque;

use crate::view_model::{AppViewModel, JobDetailView, JobRowView};
use crate::{DashboardStats, Effect, JobDetail, JobRecord, JobTracker};

/// Notices kept until the presenter consumes them.
pub const NOTICE_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    tracker: JobTracker,
    jobs: Vec<JobRecord>,
    stats: Option<DashboardStats>,
    detail: Option<JobDetail>,
    connection: ConnectionState,
    notices: VecDeque<Notice>,
    in_flight: usize,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            connection: self.connection,
            tracker: self.tracker.snapshot(),
            jobs: self.jobs.iter().map(JobRowView::from_record).collect(),
            stats: self.stats,
            detail: self.detail.as_ref().map(JobDetailView::from_detail),
            in_flight: self.in_flight,
            dirty: self.dirty,
        }
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Nothing is in flight and no job is being followed.
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0 && !self.tracker.is_tracking()
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn consume_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub(crate) fn tracker_mut(&mut self) -> &mut JobTracker {
        &mut self.tracker
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn notify(&mut self, severity: Severity, text: impl Into<String>) {
        self.notices.push_back(Notice {
            severity,
            text: text.into(),
        });
        while self.notices.len() > NOTICE_CAPACITY {
            self.notices.pop_front();
        }
        self.dirty = true;
    }

    /// Counts a request effect as in flight until its response message arrives.
    pub(crate) fn request(&mut self, effect: Effect) -> Effect {
        if effect.is_request() {
            self.in_flight += 1;
        }
        effect
    }

    pub(crate) fn request_finished(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.dirty = true;
    }

    pub(crate) fn set_jobs(&mut self, jobs: Vec<JobRecord>) {
        self.jobs = jobs;
        self.dirty = true;
    }

    pub(crate) fn set_stats(&mut self, stats: DashboardStats) {
        self.stats = Some(stats);
        self.dirty = true;
    }

    pub(crate) fn set_detail(&mut self, detail: JobDetail) {
        self.detail = Some(detail);
        self.dirty = true;
    }

    /// Returns whether the state actually changed.
    pub(crate) fn set_connection(&mut self, connection: ConnectionState) -> bool {
        if self.connection == connection {
            return false;
        }
        self.connection = connection;
        self.dirty = true;
        true
    }
}
