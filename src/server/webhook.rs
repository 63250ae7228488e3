//! Form submission proxy to the workflow-automation webhooks.
//!
//! The upstream service is opaque: the JSON body is forwarded unchanged and
//! the upstream status and body are relayed back to the caller.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::core::errors::{AgdError, Result};

/// What the upstream answered.
#[derive(Debug, Clone, PartialEq)]
pub struct Relayed {
    pub status: StatusCode,
    pub body: Value,
}

/// POST `payload` to `url` and capture the reply.
///
/// Transport failures and timeouts become `Upstream` errors; any HTTP status,
/// including 4xx/5xx, is relayed as-is. Non-JSON replies are wrapped as
/// `{"raw": "..."}`.
pub async fn forward(
    client: &reqwest::Client,
    form: &str,
    url: &str,
    payload: &Value,
    timeout: Duration,
) -> Result<Relayed> {
    tracing::info!(form, "forwarding form submission");
    let upstream = |details: String| AgdError::Upstream {
        target: form.to_string(),
        details,
    };

    let response = client
        .post(url)
        .timeout(timeout)
        .json(payload)
        .send()
        .await
        .map_err(|error| upstream(error.to_string()))?;

    let status = StatusCode::from_u16(response.status().as_u16())
        .map_err(|error| upstream(error.to_string()))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|error| upstream(error.to_string()))?;

    let body = if bytes.iter().all(u8::is_ascii_whitespace) {
        json!({ "forwarded": status.is_success() })
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes) }))
    };

    if !status.is_success() {
        tracing::warn!(form, status = status.as_u16(), "webhook answered with an error status");
    }
    Ok(Relayed { status, body })
}
