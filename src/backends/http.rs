//! Remote HTTP scanner adapter.
//!
//! This module provides an engine that submits file contents to a
//! scanning service over HTTP as a multipart upload, in the style of
//! REST front-ends for commercial engines.
//!
//! # Protocol
//!
//! The target's bytes are POSTed as one multipart part (field name
//! `malware` by default, matching the common REST AV convention). A
//! non-success status is a failed scan. A success status means the scan
//! ran, but the body still decides the verdict: services report
//! detections with HTTP 200 and an `infected` flag (or a `FOUND` marker)
//! in the response, so the body is always inspected before an item is
//! declared clean.
//!
//! Directories cannot be submitted over this transport and always
//! produce an error verdict; pair directory-capable local engines with
//! HTTP engines when the watched directory receives folders.

use crate::core::error::{EngineError, EngineResult};
use crate::core::traits::ScanEngine;
use crate::core::types::EngineVerdict;

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

const DEFAULT_FIELD_NAME: &str = "malware";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DETAIL_MAX_CHARS: usize = 200;

/// Scan engine backed by a remote HTTP scanning service.
///
/// # Example
///
/// ```rust,ignore
/// use fileward::backends::HttpEngine;
/// use std::time::Duration;
///
/// let engine = HttpEngine::new("escan", "http://10.0.0.5:9000/scan")?
///     .with_timeout(Duration::from_secs(60));
/// ```
#[derive(Debug)]
pub struct HttpEngine {
    name: String,
    endpoint: String,
    field_name: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpEngine {
    /// Creates a new engine posting to the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if the HTTP client cannot
    /// be constructed.
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> EngineResult<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            EngineError::configuration(format!("failed to create http client: {e}"))
        })?;

        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
            timeout: DEFAULT_TIMEOUT,
            client,
        })
    }

    /// Sets the multipart field name the service expects.
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    /// Sets the per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the endpoint this engine posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn try_scan(&self, target: &Path) -> EngineResult<EngineVerdict> {
        let meta = tokio::fs::metadata(target)
            .await
            .map_err(|e| EngineError::invalid_input(format!("cannot stat target: {e}")))?;
        if meta.is_dir() {
            return Err(EngineError::invalid_input(
                "directories cannot be submitted over http",
            ));
        }

        let data = tokio::fs::read(target)
            .await
            .map_err(|e| EngineError::invalid_input(format!("cannot read target: {e}")))?;
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let part = reqwest::multipart::Part::bytes(data).file_name(file_name);
        let form = reqwest::multipart::Form::new().part(self.field_name.clone(), part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::timeout(self.timeout)
                } else {
                    EngineError::http(&self.endpoint, e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::http(&self.endpoint, format!("reading body: {e}")))?;

        if !status.is_success() {
            return Ok(EngineVerdict::error(format!(
                "service returned {status}: {}",
                snippet(&body)
            )));
        }
        Ok(classify_body(&body))
    }
}

#[async_trait]
impl ScanEngine for HttpEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan_timeout(&self) -> Duration {
        self.timeout
    }

    async fn scan(&self, target: &Path) -> EngineVerdict {
        match self.try_scan(target).await {
            Ok(verdict) => verdict,
            Err(err) => {
                tracing::debug!(
                    engine = %self.name,
                    target = %target.display(),
                    error = %err,
                    "http scan failed"
                );
                EngineVerdict::error(err.to_string())
            }
        }
    }
}

/// Classifies a success-status response body.
fn classify_body(body: &str) -> EngineVerdict {
    let trimmed = body.trim();

    if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
        if json_reports_infection(&json) {
            let threat = json_threat_name(&json).unwrap_or_else(|| "unknown threat".to_string());
            return EngineVerdict::infected(threat);
        }
        return EngineVerdict::clean(snippet(trimmed));
    }

    if trimmed.contains("FOUND") {
        let threat =
            crate::backends::local::parse_threat(trimmed).unwrap_or_else(|| snippet(trimmed));
        return EngineVerdict::infected(threat);
    }

    EngineVerdict::clean(snippet(trimmed))
}

/// Checks the infection markers used by common REST scanning services.
fn json_reports_infection(json: &Value) -> bool {
    if json.get("infected").and_then(Value::as_bool) == Some(true) {
        return true;
    }
    if json
        .get("data")
        .and_then(|d| d.get("infected"))
        .and_then(Value::as_bool)
        == Some(true)
    {
        return true;
    }
    if let Some(status) = json.get("status").and_then(Value::as_str) {
        if status.eq_ignore_ascii_case("infected") || status.eq_ignore_ascii_case("found") {
            return true;
        }
    }
    json.get("viruses")
        .and_then(Value::as_array)
        .is_some_and(|v| !v.is_empty())
}

fn json_threat_name(json: &Value) -> Option<String> {
    for key in ["threat", "virus", "signature", "description"] {
        if let Some(name) = json.get(key).and_then(Value::as_str) {
            return Some(name.to_string());
        }
    }
    if let Some(first) = json
        .get("viruses")
        .and_then(Value::as_array)
        .and_then(|v| v.first())
        .and_then(Value::as_str)
    {
        return Some(first.to_string());
    }
    json.get("data")
        .and_then(|d| d.get("threat"))
        .and_then(Value::as_str)
        .map(String::from)
}

fn snippet(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("ok");
    if line.chars().count() > DETAIL_MAX_CHARS {
        line.chars().take(DETAIL_MAX_CHARS).collect()
    } else {
        line.to_string()
    }
}
