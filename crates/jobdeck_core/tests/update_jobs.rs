use std::path::PathBuf;

use jobdeck_core::{
    update, AppState, DashboardStats, Effect, ItemRecord, ItemStatus, JobDetail, JobRecord,
    JobStatus, Msg, RequestFailure, RowActions, Severity, DETAIL_PREVIEW_LIMIT,
};

fn record(id: u64, status: JobStatus, failed: u64, has_output: bool) -> JobRecord {
    JobRecord {
        id,
        filename: format!("batch_{id}.xlsx"),
        status,
        total_items: 10,
        successful: 10 - failed,
        failed,
        progress_percentage: 100.0,
        workers: 4,
        has_output,
        ..JobRecord::default()
    }
}

fn items(status: ItemStatus, count: usize, prefix: &str) -> Vec<ItemRecord> {
    (0..count)
        .map(|i| ItemRecord {
            item: format!("{prefix}-{i}"),
            status,
            ..ItemRecord::default()
        })
        .collect()
}

#[test]
fn jobs_loaded_replaces_rows_in_server_order() {
    let (state, effects) = update(AppState::new(), Msg::RefreshRequested);
    assert_eq!(effects, vec![Effect::LoadJobs, Effect::LoadStats]);

    let (state, _) = update(
        state,
        Msg::JobsLoaded(Ok(vec![
            record(3, JobStatus::Running, 0, false),
            record(1, JobStatus::Completed, 0, true),
        ])),
    );
    let (mut state, _) = update(
        state,
        Msg::StatsLoaded(Ok(DashboardStats {
            total_jobs: 2,
            completed_jobs: 1,
            running_jobs: 1,
            total_items_scraped: 10,
        })),
    );

    let view = state.view();
    let ids: Vec<_> = view.jobs.iter().map(|row| row.job_id).collect();
    assert_eq!(ids, vec![3, 1]);
    assert_eq!(view.stats.unwrap().total_items_scraped, 10);
    assert_eq!(view.in_flight, 0);
    assert!(state.consume_dirty());
    assert!(state.is_idle());
}

#[test]
fn row_actions_follow_status_and_counters() {
    let pending = RowActions::for_record(&record(1, JobStatus::Pending, 0, false));
    assert_eq!(
        pending,
        RowActions {
            start: true,
            download: false,
            retry: false
        }
    );

    let completed = RowActions::for_record(&record(2, JobStatus::Completed, 2, true));
    assert_eq!(
        completed,
        RowActions {
            start: false,
            download: true,
            retry: true
        }
    );

    let completed_without_output =
        RowActions::for_record(&record(3, JobStatus::Completed, 0, false));
    assert_eq!(completed_without_output, RowActions::default());

    let failed = RowActions::for_record(&record(4, JobStatus::Failed, 1, false));
    assert!(failed.retry);
    assert!(!failed.download);

    let cancelled = RowActions::for_record(&record(5, JobStatus::Cancelled, 3, true));
    assert_eq!(cancelled, RowActions::default());
}

#[test]
fn refresh_tick_polls_tracked_job_instead_of_lists() {
    let (state, effects) = update(AppState::new(), Msg::RefreshTick);
    assert_eq!(effects, vec![Effect::LoadJobs, Effect::LoadStats]);

    let (state, _) = update(
        state,
        Msg::JobStarted {
            job_id: 1,
            result: Ok(()),
        },
    );
    let (_state, effects) = update(state, Msg::RefreshTick);
    assert_eq!(effects, vec![Effect::LoadJobDetail { job_id: 1 }]);
}

#[test]
fn detail_groups_items_and_collapses_long_success_lists() {
    let (state, effects) = update(AppState::new(), Msg::DetailRequested { job_id: 2 });
    assert_eq!(effects, vec![Effect::LoadJobDetail { job_id: 2 }]);

    let mut all = items(ItemStatus::Success, DETAIL_PREVIEW_LIMIT + 5, "ok");
    let mut failed = items(ItemStatus::Failed, 2, "bad");
    failed[0].error_message = Some("timeout".to_string());
    all.extend(failed);
    all.extend(items(ItemStatus::NotFound, 1, "missing"));
    all.extend(items(ItemStatus::Pending, 3, "todo"));

    let (state, _) = update(
        state,
        Msg::DetailLoaded {
            job_id: 2,
            result: Ok(JobDetail {
                job: record(2, JobStatus::Completed, 2, true),
                items: all,
            }),
        },
    );

    let detail = state.view().detail.expect("detail view");
    assert_eq!(detail.job.job_id, 2);
    assert_eq!(detail.succeeded.len(), DETAIL_PREVIEW_LIMIT);
    assert_eq!(detail.succeeded_hidden, 5);
    assert_eq!(detail.failed.len(), 2);
    assert_eq!(detail.failed[0].error_message.as_deref(), Some("timeout"));
    assert_eq!(detail.not_found[0].item, "missing-0");
    assert_eq!(detail.pending, 3);
}

#[test]
fn fix_stuck_reports_count_and_reloads() {
    let (state, effects) = update(AppState::new(), Msg::FixStuckClicked);
    assert_eq!(effects, vec![Effect::FixStuckJobs]);

    let (mut state, effects) = update(state, Msg::StuckJobsFixed(Ok(vec![4, 9])));
    assert_eq!(effects, vec![Effect::LoadJobs, Effect::LoadStats]);
    assert_eq!(state.consume_notices()[0].text, "2 job(s) fixed");

    let (state, _) = update(state, Msg::FixStuckClicked);
    let (mut state, _) = update(state, Msg::StuckJobsFixed(Ok(Vec::new())));
    let notice = &state.consume_notices()[0];
    assert_eq!(notice.severity, Severity::Info);
}

#[test]
fn download_reports_saved_path() {
    let dest = PathBuf::from("out");
    let (state, effects) = update(
        AppState::new(),
        Msg::DownloadRequested {
            job_id: 6,
            dest: dest.clone(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::DownloadResult {
            job_id: 6,
            dest: dest.clone()
        }]
    );

    let (mut state, _) = update(
        state,
        Msg::DownloadFinished {
            job_id: 6,
            result: Ok(dest.join("results_job_6.xlsx")),
        },
    );
    let notices = state.consume_notices();
    assert!(notices[0].text.contains("results_job_6.xlsx"));
    assert!(state.is_idle());
}

#[test]
fn failed_list_load_keeps_previous_rows() {
    let (state, _) = update(
        AppState::new(),
        Msg::JobsLoaded(Ok(vec![record(1, JobStatus::Pending, 0, false)])),
    );
    let (mut state, _) = update(
        state,
        Msg::JobsLoaded(Err(RequestFailure::Transport("timeout".to_string()))),
    );

    assert_eq!(state.view().jobs.len(), 1);
    assert_eq!(state.consume_notices()[0].severity, Severity::Error);
}
