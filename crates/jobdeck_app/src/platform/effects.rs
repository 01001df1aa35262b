use std::sync::{mpsc, Arc};

use chrono::Local;
use deck_logging::{deck_debug, deck_warn};
use jobdeck_client::{
    ApiError, ApiRequest, ClientCommand, ClientEvent, ClientHandle, ClientSettings, EventSink,
    FailureKind, FeedEvent, ItemSummary, ItemUpdate, JobDetailReply, JobSummary, JobUpdate,
    ReqwestCommandApi, StatsReply, UploadOptions,
};
use jobdeck_core::{
    DashboardStats, Effect, ItemOutcome, ItemRecord, ItemStatus, JobDetail, JobRecord, JobStatus,
    LogEntry, Msg, ProgressEvent, RequestFailure, UploadReceipt,
};

pub struct EffectRunner {
    client: ClientHandle,
}

impl EffectRunner {
    /// `follow_feed` connects the event stream; one-shot commands skip it.
    pub fn new(
        settings: ClientSettings,
        follow_feed: bool,
        msg_tx: mpsc::Sender<Msg>,
    ) -> Result<Self, ApiError> {
        let sink: Arc<dyn EventSink> = Arc::new(MsgSink { msg_tx });
        let client = if follow_feed {
            ClientHandle::new(settings, sink)?
        } else {
            let api = Arc::new(ReqwestCommandApi::new(settings)?);
            ClientHandle::with_parts(api, None, sink)
        };
        Ok(Self { client })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            deck_debug!("Effect {:?}", effect);
            self.client.send(to_command(effect));
        }
    }
}

struct MsgSink {
    msg_tx: mpsc::Sender<Msg>,
}

impl EventSink for MsgSink {
    fn emit(&self, event: ClientEvent) {
        if let Some(msg) = to_msg(event) {
            let _ = self.msg_tx.send(msg);
        }
    }
}

fn to_command(effect: Effect) -> ClientCommand {
    let request = match effect {
        Effect::UploadBatch {
            path,
            workers,
            use_stealth,
            start,
        } => ApiRequest::Upload {
            path,
            options: UploadOptions {
                workers,
                use_stealth,
            },
            start,
        },
        Effect::StartJob { job_id } => ApiRequest::Start { job_id },
        Effect::StopJob { job_id } => ApiRequest::Stop { job_id },
        Effect::RetryJob { job_id } => ApiRequest::Retry { job_id },
        Effect::FixStuckJobs => ApiRequest::FixStuck,
        Effect::LoadJobs => ApiRequest::ListJobs,
        Effect::LoadStats => ApiRequest::Stats,
        Effect::LoadJobDetail { job_id } => ApiRequest::Detail { job_id },
        Effect::DownloadResult { job_id, dest } => ApiRequest::Download { job_id, dest },
        Effect::ScheduleClear { timer, delay } => {
            return ClientCommand::ScheduleClear { timer, delay }
        }
        Effect::CancelClear { timer } => return ClientCommand::CancelClear { timer },
    };
    ClientCommand::Request(request)
}

fn to_msg(event: ClientEvent) -> Option<Msg> {
    let msg = match event {
        ClientEvent::Uploaded { start, result } => Msg::UploadFinished {
            start,
            result: result
                .map(|reply| UploadReceipt {
                    job_id: reply.job_id,
                    total_items: reply.total_items,
                    workers: reply.workers,
                })
                .map_err(failure),
        },
        ClientEvent::Started { job_id, result } => Msg::JobStarted {
            job_id,
            result: result.map(|_| ()).map_err(failure),
        },
        ClientEvent::Stopped { job_id, result } => Msg::JobStopped {
            job_id,
            result: result.map(|_| ()).map_err(failure),
        },
        ClientEvent::Retried { job_id, result } => Msg::RetryStarted {
            job_id,
            result: result.map_err(failure),
        },
        ClientEvent::StuckFixed(result) => Msg::StuckJobsFixed(result.map_err(failure)),
        ClientEvent::JobsListed(result) => Msg::JobsLoaded(
            result
                .map(|jobs| jobs.into_iter().filter_map(job_record).collect())
                .map_err(failure),
        ),
        ClientEvent::DetailLoaded { job_id, result } => Msg::DetailLoaded {
            job_id,
            result: result.map_err(failure).and_then(job_detail),
        },
        ClientEvent::StatsLoaded(result) => Msg::StatsLoaded(result.map(stats).map_err(failure)),
        ClientEvent::Downloaded { job_id, result } => Msg::DownloadFinished {
            job_id,
            result: result.map_err(failure),
        },
        ClientEvent::Feed(FeedEvent::Connected) => Msg::FeedConnected,
        ClientEvent::Feed(FeedEvent::Disconnected) => Msg::FeedDisconnected,
        ClientEvent::Feed(FeedEvent::Job(update)) => Msg::JobUpdate(progress_event(update)),
        ClientEvent::Feed(FeedEvent::Item(update)) => Msg::ItemUpdate(log_entry(update)?),
        ClientEvent::ClearTimerFired { timer } => Msg::ClearTimerFired { timer },
    };
    Some(msg)
}

fn failure(err: ApiError) -> RequestFailure {
    match err.kind {
        FailureKind::Rejected => RequestFailure::Rejected(err.message),
        _ => RequestFailure::Transport(err.to_string()),
    }
}

/// Rows with a status this client does not know are left out.
fn job_record(summary: JobSummary) -> Option<JobRecord> {
    let Some(status) = JobStatus::parse(&summary.status) else {
        deck_warn!("Job {} has unknown status '{}'", summary.id, summary.status);
        return None;
    };
    Some(JobRecord {
        id: summary.id,
        filename: summary.filename,
        status,
        total_items: summary.total_items,
        successful: summary.successful,
        failed: summary.failed,
        progress_percentage: summary.progress_percentage,
        workers: summary.workers,
        use_stealth: summary.use_stealth,
        created_at: summary.created_at,
        completed_at: summary.completed_at,
        has_output: summary.output_file.is_some(),
    })
}

fn item_record(summary: ItemSummary) -> Option<ItemRecord> {
    let Some(status) = ItemStatus::parse(&summary.status) else {
        deck_warn!("Item {} has unknown status '{}'", summary.item, summary.status);
        return None;
    };
    Some(ItemRecord {
        item: summary.item,
        status,
        label: summary.label,
        error_message: summary.error_message,
        data_count: summary.data_count,
        retry_count: summary.retry_count,
    })
}

fn job_detail(reply: JobDetailReply) -> Result<JobDetail, RequestFailure> {
    let job_id = reply.job.id;
    let status = reply.job.status.clone();
    let job = job_record(reply.job).ok_or_else(|| {
        RequestFailure::Transport(format!("job {job_id} has unknown status '{status}'"))
    })?;
    Ok(JobDetail {
        job,
        items: reply.items.into_iter().filter_map(item_record).collect(),
    })
}

fn stats(reply: StatsReply) -> DashboardStats {
    DashboardStats {
        total_jobs: reply.total_jobs,
        completed_jobs: reply.completed_jobs,
        running_jobs: reply.running_jobs,
        total_items_scraped: reply.total_items_scraped,
    }
}

/// An unknown status is dropped; the remaining fields still merge.
fn progress_event(update: JobUpdate) -> ProgressEvent {
    let status = update.status.as_deref().and_then(|raw| {
        let parsed = JobStatus::parse(raw);
        if parsed.is_none() {
            deck_warn!("Job {} update has unknown status '{}'", update.job_id, raw);
        }
        parsed
    });
    ProgressEvent {
        job_id: update.job_id,
        status,
        progress: update.progress,
        message: update.message,
        phase: update.phase,
        successful: update.successful,
        failed: update.failed,
        timestamp: update.timestamp,
    }
}

fn log_entry(update: ItemUpdate) -> Option<LogEntry> {
    let Some(outcome) = ItemOutcome::parse(&update.status) else {
        deck_warn!("Item {} update has unknown status '{}'", update.item, update.status);
        return None;
    };
    let timestamp = update.timestamp.or_else(|| Some(Local::now().to_rfc3339()));
    Some(LogEntry::item(update.item, outcome, update.detail, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn summary(status: &str) -> JobSummary {
        JobSummary {
            id: 4,
            filename: "funds.xlsx".to_string(),
            status: status.to_string(),
            total_items: 10,
            successful: 7,
            failed: 3,
            workers: 2,
            use_stealth: false,
            created_at: None,
            started_at: None,
            completed_at: None,
            output_file: Some("results/anbima_results_4.xlsx".to_string()),
            progress_percentage: 100.0,
        }
    }

    #[test]
    fn timer_effects_become_timer_commands() {
        assert_eq!(
            to_command(Effect::ScheduleClear {
                timer: 2,
                delay: Duration::from_secs(5)
            }),
            ClientCommand::ScheduleClear {
                timer: 2,
                delay: Duration::from_secs(5)
            }
        );
        assert_eq!(
            to_command(Effect::LoadJobDetail { job_id: 9 }),
            ClientCommand::Request(ApiRequest::Detail { job_id: 9 })
        );
    }

    #[test]
    fn rejected_errors_keep_server_text() {
        let rejected = ApiError {
            kind: FailureKind::Rejected,
            message: "Job is not running".to_string(),
        };
        assert_eq!(
            failure(rejected),
            RequestFailure::Rejected("Job is not running".to_string())
        );

        let timeout = ApiError {
            kind: FailureKind::Timeout,
            message: "operation timed out".to_string(),
        };
        assert_eq!(
            failure(timeout),
            RequestFailure::Transport("timeout: operation timed out".to_string())
        );
    }

    #[test]
    fn job_list_skips_unknown_statuses() {
        let msg = to_msg(ClientEvent::JobsListed(Ok(vec![
            summary("completed"),
            summary("archived"),
        ])));
        match msg {
            Some(Msg::JobsLoaded(Ok(records))) => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].status, JobStatus::Completed);
                assert!(records[0].has_output);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn job_update_with_unknown_status_still_merges_counters() {
        let event = progress_event(JobUpdate {
            job_id: 4,
            status: Some("paused".to_string()),
            progress: Some(40.0),
            message: None,
            phase: None,
            successful: Some(4),
            failed: None,
            timestamp: None,
        });
        assert_eq!(event.status, None);
        assert_eq!(event.progress, Some(40.0));
        assert_eq!(event.successful, Some(4));
    }

    #[test]
    fn item_updates_are_stamped_and_unknown_outcomes_dropped() {
        let entry = log_entry(ItemUpdate {
            job_id: Some(4),
            item: "11.111.111/0001-11".to_string(),
            status: "not_found".to_string(),
            detail: None,
            timestamp: None,
        })
        .unwrap();
        assert_eq!(entry.outcome, ItemOutcome::NotFound);
        assert!(entry.timestamp.is_some());

        let unknown = to_msg(ClientEvent::Feed(FeedEvent::Item(ItemUpdate {
            job_id: Some(4),
            item: "x".to_string(),
            status: "exploded".to_string(),
            detail: None,
            timestamp: None,
        })));
        assert_eq!(unknown, None);
    }
}
