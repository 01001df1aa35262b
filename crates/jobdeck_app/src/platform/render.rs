use chrono::{DateTime, Local, NaiveDateTime};
use jobdeck_core::{
    AppViewModel, DashboardStats, ItemOutcome, ItemRecord, JobDetailView, JobRowView, LogLine,
    LogSubject, Notice, Severity, TrackedJobView,
};

const BAR_WIDTH: usize = 20;

/// Which parts of the dashboard a command prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sections {
    pub tracker: bool,
    pub jobs: bool,
    pub stats: bool,
    pub detail: bool,
}

/// Turns successive view models into the lines not yet printed.
#[derive(Debug, Default)]
pub struct Presenter {
    sections: Sections,
    last_log_seq: u64,
    last_status: Option<String>,
    last_jobs: Option<String>,
    last_stats: Option<String>,
    last_detail: Option<String>,
}

impl Presenter {
    pub fn new(sections: Sections) -> Self {
        Self {
            sections,
            ..Self::default()
        }
    }

    pub fn render(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut out = Vec::new();

        if self.sections.tracker {
            let printed = self.last_log_seq;
            for line in view.tracker.log.iter().filter(|line| line.seq > printed) {
                out.push(log_line(line));
                self.last_log_seq = line.seq;
            }
            let status = view.tracker.job.as_ref().map(status_line);
            if status.is_some() && status != self.last_status {
                out.extend(status.clone());
            }
            self.last_status = status;
        }

        if self.sections.jobs {
            push_changed(&mut out, &mut self.last_jobs, Some(jobs_table(&view.jobs)));
        }
        if self.sections.stats {
            push_changed(&mut out, &mut self.last_stats, view.stats.as_ref().map(stats_line));
        }
        if self.sections.detail {
            push_changed(
                &mut out,
                &mut self.last_detail,
                view.detail.as_ref().map(detail_block),
            );
        }
        out
    }
}

fn push_changed(out: &mut Vec<String>, last: &mut Option<String>, current: Option<String>) {
    if current.is_some() && current != *last {
        out.extend(current.clone());
        *last = current;
    }
}

pub fn notice_line(notice: &Notice) -> String {
    let tag = match notice.severity {
        Severity::Info => "info",
        Severity::Success => "ok",
        Severity::Warning => "warn",
        Severity::Error => "error",
    };
    format!("[{tag}] {}", notice.text)
}

fn status_line(job: &TrackedJobView) -> String {
    let mut text = format!(
        "Job {} [{}] {} {:>3}% | {} ok, {} failed",
        job.job_id,
        job.status.as_str(),
        bar(job.progress_percent),
        job.progress_percent,
        job.successful,
        job.failed
    );
    if let Some(message) = &job.message {
        text.push_str(" | ");
        text.push_str(message);
    }
    if job.clearing {
        text.push_str(" (clearing)");
    }
    text
}

fn bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn log_line(line: &LogLine) -> String {
    let entry = &line.entry;
    let tag = match entry.outcome {
        ItemOutcome::Processing => "...",
        ItemOutcome::Success => "OK",
        ItemOutcome::Failed => "FAILED",
        ItemOutcome::NotFound => "NOT FOUND",
        ItemOutcome::Info => "INFO",
    };
    let clock = clock(entry.timestamp.as_deref());
    match (&entry.subject, &entry.detail) {
        (LogSubject::System, Some(detail)) => format!("{clock} {tag:<9} {detail}"),
        (LogSubject::System, None) => format!("{clock} {tag:<9}"),
        (LogSubject::Item(item), Some(detail)) => format!("{clock} {tag:<9} {item} - {detail}"),
        (LogSubject::Item(item), None) => format!("{clock} {tag:<9} {item}"),
    }
}

/// Local wall-clock time of a feed timestamp; unparseable input is shown raw.
fn clock(timestamp: Option<&str>) -> String {
    let Some(raw) = timestamp else {
        return "--:--:--".to_string();
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Local).format("%H:%M:%S").to_string();
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(parsed) => parsed.format("%H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}

fn jobs_table(jobs: &[JobRowView]) -> String {
    if jobs.is_empty() {
        return "No jobs yet".to_string();
    }
    let mut lines = vec![format!(
        "{:<6} {:<10} {:>8} {:>18} {:>7}  {:<19}  {:<24} {}",
        "ID", "STATUS", "PROGRESS", "OK/FAILED/TOTAL", "WORKERS", "CREATED", "FILE", "ACTIONS"
    )];
    for job in jobs {
        let counts = format!("{}/{}/{}", job.successful, job.failed, job.total_items);
        lines.push(format!(
            "{:<6} {:<10} {:>7.0}% {:>18} {:>7}  {:<19}  {:<24} {}",
            job.job_id,
            job.status.as_str(),
            job.progress_percentage,
            counts,
            job.workers,
            short_date(job.created_at.as_deref()),
            job.filename,
            actions(job)
        ));
    }
    lines.join("\n")
}

fn short_date(raw: Option<&str>) -> String {
    match raw {
        Some(raw) => raw.chars().take(19).collect::<String>().replace('T', " "),
        None => "-".to_string(),
    }
}

fn actions(job: &JobRowView) -> String {
    let mut names = Vec::new();
    if job.actions.start {
        names.push("start");
    }
    if job.actions.download {
        names.push("download");
    }
    if job.actions.retry {
        names.push("retry");
    }
    names.join(",")
}

fn stats_line(stats: &DashboardStats) -> String {
    format!(
        "Jobs: {} total, {} completed, {} running | Items scraped: {}",
        stats.total_jobs, stats.completed_jobs, stats.running_jobs, stats.total_items_scraped
    )
}

fn detail_block(detail: &JobDetailView) -> String {
    let job = &detail.job;
    let mut lines = vec![format!(
        "Job {} {} [{}] {} ok, {} failed of {}",
        job.job_id,
        job.filename,
        job.status.as_str(),
        job.successful,
        job.failed,
        job.total_items
    )];

    lines.push(format!(
        "Succeeded ({}):",
        detail.succeeded.len() + detail.succeeded_hidden
    ));
    lines.extend(detail.succeeded.iter().map(succeeded_line));
    if detail.succeeded_hidden > 0 {
        lines.push(format!("  ... and {} more", detail.succeeded_hidden));
    }

    lines.push(format!("Failed ({}):", detail.failed.len()));
    lines.extend(detail.failed.iter().map(|item| match &item.error_message {
        Some(error) => format!("  {} - {}", item.item, error),
        None => format!("  {}", item.item),
    }));

    lines.push(format!("Not found ({}):", detail.not_found.len()));
    lines.extend(detail.not_found.iter().map(|item| format!("  {}", item.item)));

    lines.push(format!("Pending: {}", detail.pending));
    lines.join("\n")
}

fn succeeded_line(item: &ItemRecord) -> String {
    match &item.label {
        Some(label) => format!("  {}  {} ({} rows)", item.item, label, item.data_count),
        None => format!("  {} ({} rows)", item.item, item.data_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobdeck_core::{JobStatus, LogEntry, RowActions, TrackerSnapshot};

    fn tracked(progress: u8, clearing: bool) -> TrackedJobView {
        TrackedJobView {
            job_id: 7,
            status: JobStatus::Running,
            progress_percent: progress,
            successful: 3,
            failed: 1,
            message: Some("Processing 4/10".to_string()),
            phase: None,
            clearing,
        }
    }

    fn line(seq: u64, entry: LogEntry) -> LogLine {
        LogLine { seq, entry }
    }

    #[test]
    fn status_line_shows_bar_counts_and_message() {
        assert_eq!(
            status_line(&tracked(50, false)),
            "Job 7 [running] [##########----------]  50% | 3 ok, 1 failed | Processing 4/10"
        );
        assert!(status_line(&tracked(100, true)).ends_with("(clearing)"));
    }

    #[test]
    fn log_lines_use_server_clock_and_outcome_tag() {
        let entry = LogEntry::item(
            "11.111.111/0001-11",
            ItemOutcome::Success,
            Some("3 rows".to_string()),
            Some("2024-05-01T10:00:03.250000".to_string()),
        );
        assert_eq!(
            log_line(&line(1, entry)),
            "10:00:03 OK        11.111.111/0001-11 - 3 rows"
        );
        let system = LogEntry::system("Browser ready", Some("garbage".to_string()));
        assert_eq!(log_line(&line(2, system)), "garbage INFO      Browser ready");
    }

    #[test]
    fn presenter_prints_only_new_log_lines_and_changed_status() {
        let mut presenter = Presenter::new(Sections {
            tracker: true,
            ..Sections::default()
        });
        let mut view = AppViewModel {
            tracker: TrackerSnapshot {
                job: Some(tracked(10, false)),
                log: vec![line(1, LogEntry::system("Starting", None))],
            },
            ..AppViewModel::default()
        };
        let first = presenter.render(&view);
        assert_eq!(first.len(), 2);

        assert!(presenter.render(&view).is_empty());

        view.tracker
            .log
            .push(line(2, LogEntry::system("Browser ready", None)));
        let second = presenter.render(&view);
        assert_eq!(second, vec!["--:--:-- INFO      Browser ready".to_string()]);

        view.tracker.job = Some(tracked(20, false));
        assert_eq!(presenter.render(&view).len(), 1);
    }

    #[test]
    fn presenter_follows_sequence_numbers_across_log_clears() {
        let mut presenter = Presenter::new(Sections {
            tracker: true,
            ..Sections::default()
        });
        let mut view = AppViewModel::default();
        view.tracker.log = vec![
            line(1, LogEntry::system("one", None)),
            line(2, LogEntry::system("two", None)),
        ];
        assert_eq!(presenter.render(&view).len(), 2);

        // A new tracking session empties the log; numbering keeps going.
        view.tracker.log = vec![line(3, LogEntry::system("three", None))];
        assert_eq!(
            presenter.render(&view),
            vec!["--:--:-- INFO      three".to_string()]
        );
        assert!(presenter.render(&view).is_empty());
    }

    #[test]
    fn jobs_table_lists_actions() {
        let row = JobRowView {
            job_id: 4,
            filename: "funds.xlsx".to_string(),
            status: JobStatus::Completed,
            total_items: 10,
            successful: 8,
            failed: 2,
            progress_percentage: 100.0,
            workers: 3,
            created_at: Some("2024-05-01T10:00:00.123456".to_string()),
            completed_at: None,
            actions: RowActions {
                start: false,
                download: true,
                retry: true,
            },
        };
        let table = jobs_table(&[row]);
        let rows: Vec<&str> = table.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].starts_with("4      completed"));
        assert!(rows[1].contains("8/2/10"));
        assert!(rows[1].contains("2024-05-01 10:00:00"));
        assert!(rows[1].ends_with("download,retry"));
        assert_eq!(jobs_table(&[]), "No jobs yet");
    }

    #[test]
    fn notices_are_tagged_by_severity() {
        let notice = Notice {
            severity: Severity::Error,
            text: "Error: Job is not running".to_string(),
        };
        assert_eq!(notice_line(&notice), "[error] Error: Job is not running");
    }
}
