//! Thin HTTP wrapper over the controller's `path` / `status` / `cancel`
//! endpoints and the wire DTOs they exchange.

use cable_core::CablePoint;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::retry::{classify_reqwest_error, classify_status};

/// Body of a `POST {controllerUrl}` batch send, serialized into the `plain`
/// form field as JSON (firmware historically parses a form field, not a raw
/// JSON body — this wire shape is part of the contract, not an implementation detail).
#[derive(Debug, Serialize)]
pub(crate) struct BatchPayload {
    pub(crate) reset: bool,
    pub(crate) speed: u32,
    pub(crate) points: Vec<CablePoint>,
    #[serde(rename = "startPosition", skip_serializing_if = "Option::is_none")]
    pub(crate) start_position: Option<CablePoint>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub(crate) struct StateTelemetry {
    #[serde(default)]
    pub(crate) x_mm: f64,
    #[serde(default)]
    pub(crate) y_mm: f64,
    #[serde(default, rename = "penDown")]
    pub(crate) pen_down: bool,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub(crate) struct QueueTelemetry {
    pub(crate) size: usize,
    #[serde(default, rename = "isExecuting")]
    pub(crate) is_executing: bool,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub(crate) struct MotorTelemetry {
    #[serde(default)]
    pub(crate) busy: bool,
}

/// Parsed controller status payload. Every field is optional; the flow
/// controller degrades gracefully when any are missing.
#[derive(Debug, Deserialize, Default, Clone)]
pub(crate) struct ControllerTelemetry {
    pub(crate) state: Option<StateTelemetry>,
    pub(crate) queue: Option<QueueTelemetry>,
    pub(crate) status: Option<String>,
    #[serde(default)]
    pub(crate) motors: Vec<MotorTelemetry>,
}

/// One of the three controller operations. Owns no URLs — callers pass the
/// already-derived endpoint for each call, as the coordinator resolves them
/// once per job at construction time.
pub(crate) struct ControllerClient {
    http: reqwest::Client,
}

impl ControllerClient {
    pub(crate) fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub(crate) async fn send_batch(&self, url: &Url, payload: &BatchPayload) -> Result<(), TransportError> {
        let body = serde_json::to_string(payload)
            .map_err(|err| TransportError::Terminal(format!("serialize batch payload: {err}")))?;

        let res = self
            .http
            .post(url.clone())
            .form(&[("plain", body)])
            .send()
            .await
            .map_err(|err| classify_reqwest_error(&err))?;

        let status = res.status();
        let text = res.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        validate_ack(&text).map_err(TransportError::Rejected)
    }

    /// `404` is treated as "no telemetry" rather than an error; callers see
    /// `Ok(None)` and proceed as if the endpoint doesn't exist.
    pub(crate) async fn fetch_status(&self, url: &Url) -> Result<Option<ControllerTelemetry>, TransportError> {
        let res = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|err| classify_reqwest_error(&err))?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        let telemetry: ControllerTelemetry = serde_json::from_str(&text)
            .map_err(|err| TransportError::Terminal(format!("malformed status body: {err}")))?;
        Ok(Some(telemetry))
    }

    /// Best-effort: failures are logged by the caller but never propagate
    /// once cancellation has already been locally requested.
    pub(crate) async fn cancel(&self, url: &Url) -> Result<(), reqwest::Error> {
        self.http.post(url.clone()).send().await.map(|_| ())
    }
}

/// Validate a controller acknowledgement body, grounded in the original
/// project's `_validate_controller_ack`: empty or non-JSON bodies are
/// accepted unconditionally; a parsed JSON object is rejected only when it
/// carries a truthy `error` field, an unrecognized `status` string, or an
/// explicit `success: false`.
fn validate_ack(body: &str) -> Result<(), String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => return Ok(()),
    };

    let Some(obj) = value.as_object() else {
        return Ok(());
    };

    if let Some(error) = obj.get("error") {
        let truthy = match error {
            serde_json::Value::Null => false,
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => !s.is_empty(),
            _ => true,
        };
        if truthy {
            return Err(format!("controller reported error: {error}"));
        }
    }

    if let Some(status) = obj.get("status").and_then(serde_json::Value::as_str) {
        if !matches!(status.to_ascii_lowercase().as_str(), "ok" | "success") {
            return Err(format!("unrecognized controller status: {status}"));
        }
    }

    if let Some(false) = obj.get("success").and_then(serde_json::Value::as_bool) {
        return Err("controller reported success: false".to_string());
    }

    Ok(())
}

/// One of the three controller endpoint kinds, used to derive one from another.
#[derive(Debug, Clone, Copy)]
pub(crate) enum EndpointKind {
    Path,
    Status,
    Cancel,
}

impl EndpointKind {
    fn segment(self) -> &'static str {
        match self {
            EndpointKind::Path => "path",
            EndpointKind::Status => "status",
            EndpointKind::Cancel => "cancel",
        }
    }
}

/// Derive the URL for `kind` from any of the three controller endpoints by
/// replacing the trailing path segment. If `base` has no path, defaults to
/// `/api/{kind}`. A trailing slash (an empty final segment) is dropped
/// before replacement, so `.../api/path/` derives `.../api/status`, not
/// `.../api/path/status`.
pub(crate) fn derive_endpoint(base: &Url, kind: EndpointKind) -> Url {
    let mut url = base.clone();
    let mut segments: Vec<String> = base
        .path_segments()
        .map(|segs| segs.map(str::to_string).collect())
        .unwrap_or_default();
    while segments.last().is_some_and(String::is_empty) {
        segments.pop();
    }

    let new_segments = if segments.is_empty() {
        vec!["api".to_string(), kind.segment().to_string()]
    } else {
        let last = segments.len() - 1;
        segments[last] = kind.segment().to_string();
        segments
    };

    url.set_path(&new_segments.join("/"));
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_ack_accepts_empty_body() {
        assert!(validate_ack("").is_ok());
        assert!(validate_ack("   ").is_ok());
    }

    #[test]
    fn validate_ack_accepts_non_json_body() {
        assert!(validate_ack("ACK").is_ok());
    }

    #[test]
    fn validate_ack_accepts_bare_json_array() {
        assert!(validate_ack("[1,2,3]").is_ok());
    }

    #[test]
    fn validate_ack_rejects_truthy_error_field() {
        assert!(validate_ack(r#"{"error": "queue full"}"#).is_err());
    }

    #[test]
    fn validate_ack_ignores_falsy_error_field() {
        assert!(validate_ack(r#"{"error": null}"#).is_ok());
        assert!(validate_ack(r#"{"error": false}"#).is_ok());
    }

    #[test]
    fn validate_ack_accepts_ok_and_success_status_case_insensitive() {
        assert!(validate_ack(r#"{"status": "OK"}"#).is_ok());
        assert!(validate_ack(r#"{"status": "Success"}"#).is_ok());
    }

    #[test]
    fn validate_ack_rejects_unrecognized_status() {
        assert!(validate_ack(r#"{"status": "busy"}"#).is_err());
    }

    #[test]
    fn validate_ack_rejects_explicit_success_false() {
        assert!(validate_ack(r#"{"success": false}"#).is_err());
    }

    #[test]
    fn derive_endpoint_swaps_trailing_segment() {
        let base = Url::parse("http://device.local/api/path").unwrap();
        assert_eq!(
            derive_endpoint(&base, EndpointKind::Status).as_str(),
            "http://device.local/api/status"
        );
        assert_eq!(
            derive_endpoint(&base, EndpointKind::Cancel).as_str(),
            "http://device.local/api/cancel"
        );
    }

    #[test]
    fn derive_endpoint_defaults_when_base_has_no_path() {
        let base = Url::parse("http://device.local").unwrap();
        assert_eq!(
            derive_endpoint(&base, EndpointKind::Path).as_str(),
            "http://device.local/api/path"
        );
    }

    #[test]
    fn derive_endpoint_drops_trailing_slash_before_replacing() {
        let base = Url::parse("http://device.local/api/path/").unwrap();
        assert_eq!(
            derive_endpoint(&base, EndpointKind::Status).as_str(),
            "http://device.local/api/status"
        );
    }
}

