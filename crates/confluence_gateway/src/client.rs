//! Blocking client for the rendering/mixing service.
//!
//! The client is synchronous: a second call of the same operation cannot be
//! issued while one is outstanding, so duplicate in-flight requests are
//! impossible by construction. Every call carries a generated request id in
//! its tracing span for log correlation.

use crate::error::{GatewayError, Result};
use crate::multipart::{self, Part};
use confluence_core::payload::{ExportPayload, MixPayload};
use confluence_core::types::SLOTS;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UploadResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DurationsResponse {
    /// Slot order 1..=5; 0 for missing or unmeasurable tracks.
    pub durations_ms: Vec<i64>,
}

impl DurationsResponse {
    /// The five slot durations, or a malformed-response error if the service
    /// sent the wrong count.
    pub fn slot_durations(&self) -> Result<[i64; SLOTS]> {
        <[i64; SLOTS]>::try_from(self.durations_ms.as_slice()).map_err(|_| {
            GatewayError::MalformedResponse(format!(
                "expected {SLOTS} durations, got {}",
                self.durations_ms.len()
            ))
        })
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RenderReport {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<RenderDetails>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RenderDetails {
    #[serde(default)]
    pub affluents_count: Option<u32>,
    /// Seconds.
    pub total_duration: f64,
    #[serde(default)]
    pub format: Option<String>,
    pub file_size: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct HealthResponse {
    ok: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

// ---------------------------------------------------------------------------
// ServiceClient
// ---------------------------------------------------------------------------

pub struct ServiceClient {
    base_url: String,
    agent: ureq::Agent,
}

impl ServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            // Renders of long timelines can take a while.
            .timeout(Duration::from_secs(600))
            .build();
        Self { base_url, agent }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Liveness probe.
    pub fn health(&self) -> Result<bool> {
        let resp = self
            .agent
            .get(&self.url("/health"))
            .call()
            .map_err(map_ureq_err)?;
        Ok(decode_json::<HealthResponse>(resp)?.ok)
    }

    /// Upload source files as `file{slot}` attachments. The service purges
    /// any previously stored slot that is not part of this upload.
    pub fn upload(&self, files: &[(usize, &Path)]) -> Result<UploadResponse> {
        if files.is_empty() {
            return Err(GatewayError::NoFiles);
        }

        let mut parts = Vec::with_capacity(files.len());
        for &(slot, path) in files {
            if !(1..=SLOTS).contains(&slot) {
                return Err(GatewayError::InvalidSlot(slot));
            }
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("file{slot}"));
            parts.push(Part {
                name: format!("file{slot}"),
                filename,
                data: std::fs::read(path)?,
            });
        }

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("upload", %request_id, files = files.len());
        let _guard = span.enter();

        let boundary = format!("confluence-{}", Uuid::new_v4().simple());
        let (content_type, body) = multipart::encode(&boundary, &parts);

        let resp = self
            .agent
            .post(&self.url("/upload"))
            .set("Content-Type", &content_type)
            .send_bytes(&body)
            .map_err(map_ureq_err)?;

        decode_json(resp)
    }

    /// Query measured durations for all five slots.
    pub fn durations(&self) -> Result<DurationsResponse> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("durations", %request_id);
        let _guard = span.enter();

        let resp = self
            .agent
            .get(&self.url("/status/durations"))
            .call()
            .map_err(map_ureq_err)?;
        let decoded: DurationsResponse = decode_json(resp)?;
        decoded.slot_durations()?;
        Ok(decoded)
    }

    /// Request a preview render; returns the WAV byte stream.
    pub fn preview(&self, payload: &MixPayload) -> Result<Vec<u8>> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("preview", %request_id, engine = ?payload.engine);
        let _guard = span.enter();

        let resp = self
            .agent
            .post(&self.url("/preview"))
            .send_json(payload)
            .map_err(map_ureq_err)?;
        read_bytes(resp)
    }

    /// Run a full render server-side; the result stays on the server until
    /// exported.
    pub fn render(&self, payload: &MixPayload) -> Result<RenderReport> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("render", %request_id, engine = ?payload.engine);
        let _guard = span.enter();

        let resp = self
            .agent
            .post(&self.url("/render"))
            .send_json(payload)
            .map_err(map_ureq_err)?;
        let report: RenderReport = decode_json(resp)?;
        tracing::info!(success = report.success, "render complete");
        Ok(report)
    }

    /// Dry concatenation of all stored tracks; no timeline state travels.
    pub fn concat(&self) -> Result<RenderReport> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("concat", %request_id);
        let _guard = span.enter();

        let resp = self
            .agent
            .post(&self.url("/concat"))
            .call()
            .map_err(map_ureq_err)?;
        decode_json(resp)
    }

    /// Re-encode the last rendered mix; returns the audio byte stream.
    pub fn export(&self, payload: &ExportPayload) -> Result<Vec<u8>> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("export", %request_id, format = ?payload.format);
        let _guard = span.enter();

        let resp = self
            .agent
            .post(&self.url("/export"))
            .send_json(payload)
            .map_err(map_ureq_err)?;
        read_bytes(resp)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Map a ureq error into the gateway taxonomy. Non-2xx statuses become
/// `Rejected`, with the server's own error string surfaced verbatim when the
/// body carries one.
fn map_ureq_err(err: ureq::Error) -> GatewayError {
    match err {
        ureq::Error::Status(status, resp) => {
            let message = resp
                .into_json::<ErrorBody>()
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("service returned status {status}"));
            GatewayError::Rejected { status, message }
        }
        ureq::Error::Transport(t) => GatewayError::Transport(t.to_string()),
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(resp: ureq::Response) -> Result<T> {
    resp.into_json::<T>()
        .map_err(|e| GatewayError::MalformedResponse(e.to_string()))
}

fn read_bytes(resp: ureq::Response) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    resp.into_reader().read_to_end(&mut buf)?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
