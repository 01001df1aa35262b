use std::path::Path;
use std::time::Duration;

use deck_logging::{deck_debug, deck_info};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{multipart, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::{
    ApiError, Artifact, FailureKind, JobDetailReply, JobId, JobSummary, StatsReply,
    UploadOptions, UploadReply,
};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Socket.IO endpoint path, relative to `base_url`.
    pub events_path: String,
    pub reconnect_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            events_path: "/socket.io/".to_string(),
            reconnect_delay: Duration::from_secs(2),
        }
    }
}

impl ClientSettings {
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let base = Url::parse(&self.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        base.join(path)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}

/// Request/response half of the backend contract.
#[async_trait::async_trait]
pub trait CommandApi: Send + Sync {
    async fn upload(&self, path: &Path, options: &UploadOptions)
        -> Result<UploadReply, ApiError>;
    async fn start_job(&self, job_id: JobId) -> Result<String, ApiError>;
    async fn stop_job(&self, job_id: JobId) -> Result<String, ApiError>;
    async fn retry_job(&self, job_id: JobId) -> Result<String, ApiError>;
    async fn list_jobs(&self) -> Result<Vec<JobSummary>, ApiError>;
    async fn job_detail(&self, job_id: JobId) -> Result<JobDetailReply, ApiError>;
    async fn stats(&self) -> Result<StatsReply, ApiError>;
    async fn fix_stuck_jobs(&self) -> Result<Vec<JobId>, ApiError>;
    async fn download_result(&self, job_id: JobId) -> Result<Artifact, ApiError>;
}

#[derive(Debug, Deserialize)]
struct MessageReply {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct JobsReply {
    jobs: Vec<JobSummary>,
}

#[derive(Deserialize)]
struct StatsEnvelope {
    stats: StatsReply,
}

#[derive(Deserialize)]
struct FixedReply {
    #[serde(default)]
    fixed_jobs: Vec<JobId>,
}

#[derive(Debug, Clone)]
pub struct ReqwestCommandApi {
    settings: ClientSettings,
    client: reqwest::Client,
}

impl ReqwestCommandApi {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        decode_envelope(status, &body)
    }

    async fn post_action(&self, job_id: JobId, action: &str) -> Result<String, ApiError> {
        let url = self.settings.endpoint(&format!("/api/jobs/{job_id}/{action}"))?;
        deck_debug!("POST {}", url);
        let reply: MessageReply = self.send(self.client.post(url)).await?;
        Ok(reply.message)
    }
}

#[async_trait::async_trait]
impl CommandApi for ReqwestCommandApi {
    async fn upload(
        &self,
        path: &Path,
        options: &UploadOptions,
    ) -> Result<UploadReply, ApiError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| ApiError::new(FailureKind::Io, format!("{}: {err}", path.display())))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.xlsx".to_string());
        deck_info!("Uploading {} ({} bytes)", filename, bytes.len());

        let mut form = multipart::Form::new()
            .part("file", multipart::Part::bytes(bytes).file_name(filename))
            .text("use_stealth", if options.use_stealth { "true" } else { "false" });
        if let Some(workers) = options.workers {
            form = form.text("workers", workers.to_string());
        }

        let url = self.settings.endpoint("/api/upload")?;
        self.send(self.client.post(url).multipart(form)).await
    }

    async fn start_job(&self, job_id: JobId) -> Result<String, ApiError> {
        self.post_action(job_id, "start").await
    }

    async fn stop_job(&self, job_id: JobId) -> Result<String, ApiError> {
        self.post_action(job_id, "stop").await
    }

    async fn retry_job(&self, job_id: JobId) -> Result<String, ApiError> {
        self.post_action(job_id, "retry").await
    }

    async fn list_jobs(&self) -> Result<Vec<JobSummary>, ApiError> {
        let url = self.settings.endpoint("/api/jobs")?;
        let reply: JobsReply = self.send(self.client.get(url)).await?;
        Ok(reply.jobs)
    }

    async fn job_detail(&self, job_id: JobId) -> Result<JobDetailReply, ApiError> {
        let url = self.settings.endpoint(&format!("/api/jobs/{job_id}"))?;
        self.send(self.client.get(url)).await
    }

    async fn stats(&self) -> Result<StatsReply, ApiError> {
        let url = self.settings.endpoint("/api/stats")?;
        let reply: StatsEnvelope = self.send(self.client.get(url)).await?;
        Ok(reply.stats)
    }

    async fn fix_stuck_jobs(&self) -> Result<Vec<JobId>, ApiError> {
        let url = self.settings.endpoint("/api/jobs/fix-stuck")?;
        let reply: FixedReply = self.send(self.client.post(url)).await?;
        Ok(reply.fixed_jobs)
    }

    async fn download_result(&self, job_id: JobId) -> Result<Artifact, ApiError> {
        let url = self.settings.endpoint(&format!("/api/jobs/{job_id}/download"))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_disposition);
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        if !status.is_success() || is_json {
            // Errors come back as an envelope instead of a file.
            return Err(match decode_envelope::<serde_json::Value>(status, &body) {
                Err(err) => err,
                Ok(_) => ApiError::new(FailureKind::Decode, "expected a file, got JSON"),
            });
        }

        Ok(Artifact {
            filename,
            bytes: body.to_vec(),
        })
    }
}

/// Unwraps the `{success, error, ...payload}` envelope every endpoint uses.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
) -> Result<T, ApiError> {
    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) if status.is_success() => {
            return Err(ApiError::new(FailureKind::Decode, err.to_string()));
        }
        Err(_) => {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
    };

    match value.get("success").and_then(serde_json::Value::as_bool) {
        Some(false) => {
            let error = value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("request rejected");
            Err(ApiError::new(FailureKind::Rejected, error))
        }
        _ if !status.is_success() => Err(ApiError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        )),
        Some(true) => serde_json::from_value(value)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string())),
        None => Err(ApiError::new(FailureKind::Decode, "missing success flag")),
    }
}

fn filename_from_disposition(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"'))
        .and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ApiError::new(FailureKind::InvalidUrl, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
