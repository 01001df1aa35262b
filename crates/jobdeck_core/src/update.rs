use deck_logging::{deck_info, deck_warn};

use crate::{
    AppState, ConnectionState, Effect, JobId, JobStatus, Msg, ProgressEvent, ProgressOutcome,
    RequestFailure, Severity,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::UploadRequested {
            path,
            workers,
            use_stealth,
            start,
        } => {
            vec![state.request(Effect::UploadBatch {
                path,
                workers,
                use_stealth,
                start,
            })]
        }
        Msg::UploadFinished { start, result } => {
            state.request_finished();
            match result {
                Ok(receipt) => {
                    deck_info!(
                        "Job {} created with {} items",
                        receipt.job_id,
                        receipt.total_items
                    );
                    state.notify(
                        Severity::Success,
                        format!(
                            "Job {} created ({} items, {} workers)",
                            receipt.job_id, receipt.total_items, receipt.workers
                        ),
                    );
                    let mut effects = Vec::with_capacity(2);
                    if start {
                        effects.push(state.request(Effect::StartJob {
                            job_id: receipt.job_id,
                        }));
                    }
                    effects.push(state.request(Effect::LoadJobs));
                    effects
                }
                Err(failure) => report_failure(&mut state, "Upload", failure),
            }
        }
        Msg::StartClicked { job_id } => vec![state.request(Effect::StartJob { job_id })],
        Msg::JobStarted { job_id, result } => {
            state.request_finished();
            match result {
                Ok(()) => {
                    let mut effects = begin_tracking(&mut state, job_id);
                    state.notify(Severity::Success, format!("Job {job_id} started"));
                    effects.push(state.request(Effect::LoadJobDetail { job_id }));
                    effects
                }
                Err(failure) => report_failure(&mut state, "Start job", failure),
            }
        }
        Msg::StopClicked { job_id } => match job_id.or(state.tracker().tracked_job_id()) {
            Some(job_id) => vec![state.request(Effect::StopJob { job_id })],
            None => {
                state.notify(Severity::Warning, "No active job");
                Vec::new()
            }
        },
        Msg::JobStopped { job_id, result } => {
            state.request_finished();
            match result {
                Ok(()) => {
                    let mut effects = Vec::new();
                    if state.tracker().tracked_job_id() == Some(job_id) {
                        effects.extend(state.tracker_mut().stop_tracking().map(Effect::from));
                        state.mark_dirty();
                    }
                    state.notify(Severity::Success, format!("Job {job_id} stopped"));
                    effects.push(state.request(Effect::LoadJobs));
                    effects.push(state.request(Effect::LoadStats));
                    effects
                }
                Err(failure) => report_failure(&mut state, "Stop job", failure),
            }
        }
        Msg::RetryClicked { job_id } => vec![state.request(Effect::RetryJob { job_id })],
        Msg::RetryStarted { job_id, result } => {
            state.request_finished();
            match result {
                Ok(message) => {
                    let mut effects = begin_tracking(&mut state, job_id);
                    state.notify(Severity::Success, message);
                    effects.push(state.request(Effect::LoadJobDetail { job_id }));
                    effects
                }
                Err(failure) => report_failure(&mut state, "Retry", failure),
            }
        }
        Msg::FixStuckClicked => vec![state.request(Effect::FixStuckJobs)],
        Msg::StuckJobsFixed(result) => {
            state.request_finished();
            match result {
                Ok(fixed) => {
                    if fixed.is_empty() {
                        state.notify(Severity::Info, "No stuck jobs found");
                    } else {
                        state.notify(Severity::Success, format!("{} job(s) fixed", fixed.len()));
                    }
                    vec![
                        state.request(Effect::LoadJobs),
                        state.request(Effect::LoadStats),
                    ]
                }
                Err(failure) => report_failure(&mut state, "Fix stuck jobs", failure),
            }
        }
        Msg::DetailRequested { job_id } => vec![state.request(Effect::LoadJobDetail { job_id })],
        Msg::DetailLoaded { job_id, result } => {
            state.request_finished();
            match result {
                Ok(detail) => {
                    if detail.job.id != job_id {
                        deck_warn!(
                            "Detail for job {} answered with job {}",
                            job_id,
                            detail.job.id
                        );
                    }
                    // A snapshot of the tracked job covers feed events missed before tracking began.
                    let snapshot = (state.tracker().tracked_job_id() == Some(detail.job.id))
                        .then(|| ProgressEvent {
                            status: Some(detail.job.status),
                            progress: Some(detail.job.progress_percentage),
                            successful: Some(detail.job.successful),
                            failed: Some(detail.job.failed),
                            ..ProgressEvent::new(detail.job.id)
                        });
                    state.set_detail(detail);
                    match snapshot {
                        Some(event) => apply_progress(&mut state, event),
                        None => Vec::new(),
                    }
                }
                Err(failure) => report_failure(&mut state, "Load job details", failure),
            }
        }
        Msg::DownloadRequested { job_id, dest } => {
            vec![state.request(Effect::DownloadResult { job_id, dest })]
        }
        Msg::DownloadFinished { job_id, result } => {
            state.request_finished();
            match result {
                Ok(path) => {
                    state.notify(
                        Severity::Success,
                        format!("Results of job {job_id} saved to {}", path.display()),
                    );
                    Vec::new()
                }
                Err(failure) => report_failure(&mut state, "Download", failure),
            }
        }
        Msg::RefreshRequested => vec![
            state.request(Effect::LoadJobs),
            state.request(Effect::LoadStats),
        ],
        Msg::RefreshTick => {
            if let Some(job_id) = state.tracker().tracked_job_id() {
                vec![state.request(Effect::LoadJobDetail { job_id })]
            } else {
                vec![
                    state.request(Effect::LoadJobs),
                    state.request(Effect::LoadStats),
                ]
            }
        }
        Msg::JobsLoaded(result) => {
            state.request_finished();
            match result {
                Ok(jobs) => {
                    state.set_jobs(jobs);
                    Vec::new()
                }
                Err(failure) => report_failure(&mut state, "Load jobs", failure),
            }
        }
        Msg::StatsLoaded(result) => {
            state.request_finished();
            match result {
                Ok(stats) => {
                    state.set_stats(stats);
                    Vec::new()
                }
                Err(failure) => report_failure(&mut state, "Load statistics", failure),
            }
        }
        Msg::JobUpdate(event) => apply_progress(&mut state, event),
        Msg::ItemUpdate(entry) => {
            state.tracker_mut().apply_log(entry);
            state.mark_dirty();
            Vec::new()
        }
        Msg::ClearTimerFired { timer } => {
            if state.tracker_mut().clear_timer_fired(timer) {
                state.mark_dirty();
                vec![
                    state.request(Effect::LoadJobs),
                    state.request(Effect::LoadStats),
                ]
            } else {
                Vec::new()
            }
        }
        Msg::FeedConnected => {
            if state.set_connection(ConnectionState::Connected) {
                state.notify(Severity::Success, "Connected to server");
            }
            Vec::new()
        }
        Msg::FeedDisconnected => {
            if state.set_connection(ConnectionState::Disconnected) {
                state.notify(Severity::Warning, "Disconnected from server");
            }
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn begin_tracking(state: &mut AppState, job_id: JobId) -> Vec<Effect> {
    let effects = state
        .tracker_mut()
        .start_tracking(job_id)
        .map(Effect::from)
        .into_iter()
        .collect();
    state.mark_dirty();
    effects
}

/// Merges progress for the tracked job; a terminal transition arms the clear.
fn apply_progress(state: &mut AppState, event: ProgressEvent) -> Vec<Effect> {
    let job_id = event.job_id;
    let outcome = state.tracker_mut().apply_progress(event);
    if outcome != ProgressOutcome::Ignored {
        state.mark_dirty();
    }
    match outcome {
        ProgressOutcome::Ignored => Vec::new(),
        ProgressOutcome::Merged { status_changed } => {
            if status_changed {
                vec![state.request(Effect::LoadStats)]
            } else {
                Vec::new()
            }
        }
        ProgressOutcome::EnteredTerminal { status, timer } => {
            let (severity, text) = match status {
                JobStatus::Completed => (Severity::Success, "completed successfully"),
                JobStatus::Failed => (Severity::Error, "failed"),
                _ => (Severity::Warning, "was cancelled"),
            };
            deck_info!("Job {} {}", job_id, text);
            state.notify(severity, format!("Job {job_id} {text}"));
            vec![Effect::from(timer), state.request(Effect::LoadStats)]
        }
    }
}

/// Surfaces a failed request; tracked-job state is left alone.
fn report_failure(state: &mut AppState, action: &str, failure: RequestFailure) -> Vec<Effect> {
    match &failure {
        RequestFailure::Rejected(error) => {
            deck_warn!("{} rejected: {}", action, error);
            state.notify(Severity::Error, format!("Error: {error}"));
        }
        RequestFailure::Transport(error) => {
            deck_warn!("{} failed: {}", action, error);
            state.notify(Severity::Error, format!("{action} failed: {error}"));
        }
    }
    Vec::new()
}
