use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use deck_logging::{deck_debug, deck_error};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::feed::{EventFeed, EventSink};
use crate::persist::AtomicFileWriter;
use crate::{
    ApiError, ClientEvent, ClientSettings, CommandApi, FailureKind, JobId, ReqwestCommandApi,
    TimerId, UploadOptions,
};

/// Work that produces exactly one [`ClientEvent`] when done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    Upload {
        path: PathBuf,
        options: UploadOptions,
        start: bool,
    },
    Start { job_id: JobId },
    Stop { job_id: JobId },
    Retry { job_id: JobId },
    FixStuck,
    ListJobs,
    Detail { job_id: JobId },
    Stats,
    Download { job_id: JobId, dest: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Request(ApiRequest),
    /// Report `ClientEvent::ClearTimerFired` after `delay` unless cancelled.
    ScheduleClear { timer: TimerId, delay: Duration },
    CancelClear { timer: TimerId },
}

/// Owns the client runtime thread. Dropping the handle shuts it down.
pub struct ClientHandle {
    cmd_tx: mpsc::Sender<ClientCommand>,
    cancel: CancellationToken,
}

impl ClientHandle {
    pub fn new(settings: ClientSettings, sink: Arc<dyn EventSink>) -> Result<Self, ApiError> {
        let api = Arc::new(ReqwestCommandApi::new(settings.clone())?);
        let feed = EventFeed::new(&settings)?;
        Ok(Self::with_parts(api, Some(feed), sink))
    }

    /// Builds a handle around any API implementation; `feed` is optional.
    pub fn with_parts(
        api: Arc<dyn CommandApi>,
        feed: Option<EventFeed>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let cancel = CancellationToken::new();
        let feed_cancel = cancel.clone();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            if let Some(feed) = feed {
                let sink = sink.clone();
                runtime.spawn(async move {
                    feed.run(sink.as_ref(), feed_cancel).await;
                });
            }

            let mut timers: HashMap<TimerId, JoinHandle<()>> = HashMap::new();
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    ClientCommand::Request(request) => {
                        let api = api.clone();
                        let sink = sink.clone();
                        runtime.spawn(async move {
                            let event = handle_request(api.as_ref(), request).await;
                            sink.emit(event);
                        });
                    }
                    ClientCommand::ScheduleClear { timer, delay } => {
                        timers.retain(|_, task| !task.is_finished());
                        let sink = sink.clone();
                        let task = runtime.spawn(async move {
                            tokio::time::sleep(delay).await;
                            sink.emit(ClientEvent::ClearTimerFired { timer });
                        });
                        if let Some(previous) = timers.insert(timer, task) {
                            previous.abort();
                        }
                    }
                    ClientCommand::CancelClear { timer } => {
                        if let Some(task) = timers.remove(&timer) {
                            deck_debug!("Cancelling clear timer {}", timer);
                            task.abort();
                        }
                    }
                }
            }
            runtime.shutdown_timeout(Duration::from_millis(200));
        });

        Self { cmd_tx, cancel }
    }

    pub fn send(&self, command: ClientCommand) {
        if self.cmd_tx.send(command).is_err() {
            deck_error!("Client runtime is gone; command dropped");
        }
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn handle_request(api: &dyn CommandApi, request: ApiRequest) -> ClientEvent {
    match request {
        ApiRequest::Upload {
            path,
            options,
            start,
        } => ClientEvent::Uploaded {
            start,
            result: api.upload(&path, &options).await,
        },
        ApiRequest::Start { job_id } => ClientEvent::Started {
            job_id,
            result: api.start_job(job_id).await,
        },
        ApiRequest::Stop { job_id } => ClientEvent::Stopped {
            job_id,
            result: api.stop_job(job_id).await,
        },
        ApiRequest::Retry { job_id } => ClientEvent::Retried {
            job_id,
            result: api.retry_job(job_id).await,
        },
        ApiRequest::FixStuck => ClientEvent::StuckFixed(api.fix_stuck_jobs().await),
        ApiRequest::ListJobs => ClientEvent::JobsListed(api.list_jobs().await),
        ApiRequest::Detail { job_id } => ClientEvent::DetailLoaded {
            job_id,
            result: api.job_detail(job_id).await,
        },
        ApiRequest::Stats => ClientEvent::StatsLoaded(api.stats().await),
        ApiRequest::Download { job_id, dest } => ClientEvent::Downloaded {
            job_id,
            result: download_to(api, job_id, dest).await,
        },
    }
}

async fn download_to(
    api: &dyn CommandApi,
    job_id: JobId,
    dest: PathBuf,
) -> Result<PathBuf, ApiError> {
    let artifact = api.download_result(job_id).await?;
    tokio::task::spawn_blocking(move || {
        AtomicFileWriter::new(dest).write_artifact(job_id, &artifact)
    })
    .await
    .map_err(|err| ApiError::new(FailureKind::Io, err.to_string()))?
    .map_err(|err| ApiError::new(FailureKind::Io, err.to_string()))
}
