use crate::{
    ConnectionState, DashboardStats, ItemRecord, ItemStatus, JobDetail, JobId, JobRecord,
    JobStatus, TrackerSnapshot,
};

/// Successful items listed in a detail view before collapsing the rest.
pub const DETAIL_PREVIEW_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub connection: ConnectionState,
    pub tracker: TrackerSnapshot,
    pub jobs: Vec<JobRowView>,
    pub stats: Option<DashboardStats>,
    pub detail: Option<JobDetailView>,
    pub in_flight: usize,
    pub dirty: bool,
}

/// Actions a job row offers given its status and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowActions {
    pub start: bool,
    pub download: bool,
    pub retry: bool,
}

impl RowActions {
    pub fn for_record(record: &JobRecord) -> Self {
        let finished = matches!(record.status, JobStatus::Completed | JobStatus::Failed);
        Self {
            start: record.status == JobStatus::Pending,
            download: record.status == JobStatus::Completed && record.has_output,
            retry: finished && record.failed > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub filename: String,
    pub status: JobStatus,
    pub total_items: u64,
    pub successful: u64,
    pub failed: u64,
    pub progress_percentage: f64,
    pub workers: u32,
    pub created_at: Option<String>,
    pub completed_at: Option<String>,
    pub actions: RowActions,
}

impl JobRowView {
    pub(crate) fn from_record(record: &JobRecord) -> Self {
        Self {
            job_id: record.id,
            filename: record.filename.clone(),
            status: record.status,
            total_items: record.total_items,
            successful: record.successful,
            failed: record.failed,
            progress_percentage: record.progress_percentage,
            workers: record.workers,
            created_at: record.created_at.clone(),
            completed_at: record.completed_at.clone(),
            actions: RowActions::for_record(record),
        }
    }
}

/// Item outcomes of one job grouped for display.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDetailView {
    pub job: JobRowView,
    /// At most [`DETAIL_PREVIEW_LIMIT`] entries.
    pub succeeded: Vec<ItemRecord>,
    /// Successful items not listed in `succeeded`.
    pub succeeded_hidden: usize,
    pub failed: Vec<ItemRecord>,
    pub not_found: Vec<ItemRecord>,
    pub pending: usize,
}

impl JobDetailView {
    pub(crate) fn from_detail(detail: &JobDetail) -> Self {
        let of = |status: ItemStatus| {
            detail
                .items
                .iter()
                .filter(move |item| item.status == status)
        };

        let succeeded_total = of(ItemStatus::Success).count();
        Self {
            job: JobRowView::from_record(&detail.job),
            succeeded: of(ItemStatus::Success)
                .take(DETAIL_PREVIEW_LIMIT)
                .cloned()
                .collect(),
            succeeded_hidden: succeeded_total.saturating_sub(DETAIL_PREVIEW_LIMIT),
            failed: of(ItemStatus::Failed).cloned().collect(),
            not_found: of(ItemStatus::NotFound).cloned().collect(),
            pending: of(ItemStatus::Pending).count(),
        }
    }
}
