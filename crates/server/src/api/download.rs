//! Download endpoint: gate, extract, stream the artifact back.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::Stream;
use serde::Deserialize;
use tokio::fs::File;
use tokio::sync::broadcast;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use vidl_core::{
    metrics, Artifact, ArtifactRegistry, ExtractError, InUseGuard, Job, RejectReason,
};

use super::ErrorBody;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
}

/// Handle one download request end to end.
///
/// The in-use hold is taken before extraction starts, so the artifact is
/// protected from the sweeper the moment it appears on disk. The hold
/// travels with the response body and is released when the stream drops,
/// whether the client read it all or disconnected early.
pub async fn download(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<DownloadRequest>,
) -> Response {
    let client = client_id(&headers, addr);

    let admission = match state.gate().admit(&client, &body.url) {
        Ok(admission) => {
            metrics::GATE_DECISIONS.with_label_values(&["admitted"]).inc();
            admission
        }
        Err(reason) => return reject(&client, reason),
    };

    // Wait for a job slot; requests queue here rather than being refused.
    metrics::JOBS_IN_FLIGHT.inc();
    let permit = match state.job_slots().clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            metrics::JOBS_IN_FLIGHT.dec();
            return ErrorBody::new("internal_error", "job pool is closed").into_response();
        }
    };

    let mut job = Job::new(admission.url, &state.config().downloads.dir);
    info!(
        job_id = %job.id,
        url = %admission.command_safe_url,
        client = %client,
        "starting extraction"
    );

    let guard = state.registry().guard(&job.output_path);

    let started = Instant::now();
    let result = state.extractor().run(&mut job).await;
    drop(permit);
    metrics::JOBS_IN_FLIGHT.dec();

    let result_label = job.state.state_type();
    metrics::JOBS_TOTAL.with_label_values(&[result_label]).inc();
    metrics::EXTRACTION_DURATION
        .with_label_values(&[result_label])
        .observe(started.elapsed().as_secs_f64());

    match result {
        Ok(artifact) => {
            info!(
                job_id = %job.id,
                size_bytes = artifact.size_bytes,
                duration_secs = started.elapsed().as_secs(),
                "extraction succeeded"
            );
            deliver(&state, guard, &job, &artifact).await
        }
        Err(e) => {
            drop(guard);
            extraction_error(&job, e)
        }
    }
}

/// Client identity for rate limiting: first X-Forwarded-For hop when
/// present, the socket peer address otherwise.
fn client_id(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

fn reject(client: &str, reason: RejectReason) -> Response {
    metrics::GATE_DECISIONS.with_label_values(&[reason.code()]).inc();
    debug!(client, code = reason.code(), "request rejected");

    match reason {
        RejectReason::InvalidUrl => {
            ErrorBody::new("invalid_url", "URL is missing, malformed or not http(s)")
                .into_response()
        }
        RejectReason::UnsupportedDomain => {
            ErrorBody::new("unsupported_domain", "domain is not on the allow-list")
                .into_response()
        }
        RejectReason::RateLimited { retry_after } => {
            let (status, body) = ErrorBody::new("rate_limited", "too many requests");
            (
                status,
                [(
                    header::RETRY_AFTER,
                    retry_after.as_secs().max(1).to_string(),
                )],
                body,
            )
                .into_response()
        }
    }
}

fn extraction_error(job: &Job, err: ExtractError) -> Response {
    match err {
        ExtractError::Timeout { timeout_secs } => {
            warn!(job_id = %job.id, timeout_secs, "extraction timed out");
            ErrorBody::new(
                "timed_out",
                format!("extraction exceeded {} seconds", timeout_secs),
            )
            .into_response()
        }
        ExtractError::ExtractionFailed {
            reason,
            stderr_tail,
        } => {
            warn!(job_id = %job.id, reason, "extraction failed");
            if let Some(tail) = stderr_tail {
                debug!(job_id = %job.id, "extractor stderr tail:\n{}", tail);
            }
            ErrorBody::new("extraction_failed", "no media could be extracted from the URL")
                .into_response()
        }
        other => {
            warn!(job_id = %job.id, "extraction error: {}", other);
            ErrorBody::new("internal_error", "extraction could not be run").into_response()
        }
    }
}

/// Build the streaming artifact response.
async fn deliver(
    state: &Arc<AppState>,
    guard: InUseGuard,
    job: &Job,
    artifact: &Artifact,
) -> Response {
    let file = match File::open(&artifact.path).await {
        Ok(file) => file,
        Err(e) => {
            warn!(job_id = %job.id, "artifact vanished before delivery: {}", e);
            return ErrorBody::new("internal_error", "artifact is no longer available")
                .into_response();
        }
    };

    metrics::BYTES_DELIVERED.inc_by(artifact.size_bytes);

    let filename = format!("dl_{}.mp4", job.id);
    let stream = DeliveryStream {
        inner: ReaderStream::new(file),
        guard: Some(guard),
        path: artifact.path.clone(),
        registry: Arc::clone(state.registry()),
        grace: Duration::from_secs(state.config().downloads.grace_secs),
        shutdown: state.shutdown_tx().clone(),
    };

    let built = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, artifact.size_bytes)
        .header(header::CONTENT_DISPOSITION, content_disposition(&filename))
        .body(Body::from_stream(stream));

    match built {
        Ok(response) => response,
        Err(e) => {
            warn!(job_id = %job.id, "failed to build delivery response: {}", e);
            ErrorBody::new("internal_error", "failed to build response").into_response()
        }
    }
}

/// Attachment disposition with both the plain and the RFC 5987 form.
fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(filename)
    )
}

/// Response body stream that owns the in-use hold on the artifact.
///
/// Dropping the stream releases the hold and schedules deletion of the file
/// after the configured grace period, unless another delivery still holds it
/// or the server is shutting down.
struct DeliveryStream {
    inner: ReaderStream<File>,
    guard: Option<InUseGuard>,
    path: PathBuf,
    registry: Arc<ArtifactRegistry>,
    grace: Duration,
    shutdown: broadcast::Sender<()>,
}

impl Stream for DeliveryStream {
    type Item = <ReaderStream<File> as Stream>::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for DeliveryStream {
    fn drop(&mut self) {
        drop(self.guard.take());

        let path = self.path.clone();
        let registry = Arc::clone(&self.registry);
        let grace = self.grace;
        let mut shutdown_rx = self.shutdown.subscribe();

        // Outside a runtime (abnormal teardown) the sweeper picks the file
        // up later instead.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                tokio::select! {
                    _ = shutdown_rx.recv() => return,
                    _ = tokio::time::sleep(grace) => {}
                }

                if registry.is_in_use(&path) {
                    debug!(path = %path.display(), "grace delete skipped, artifact back in use");
                    return;
                }

                match tokio::fs::remove_file(&path).await {
                    Ok(()) => debug!(path = %path.display(), "artifact deleted after grace period"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!(path = %path.display(), "grace delete failed: {}", e),
                }
            });
        }
    }
}
