//! Canonical log entries from heterogeneous stored documents.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::parse::{parse_date_in, parse_duration_minutes};
use crate::records::fields::{
    AIGENT_ID_ALIASES, BANDWIDTH_ALIASES, CLIENT_ADDRESS_ALIASES, DURATION_CHAIN,
    KIT_CONFIRMATION_ALIASES, Sources, TIMESTAMP_CHAIN,
};

/// One execution-log record in canonical form.
///
/// Built fresh from the stored document on every read; never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// When the execution happened.
    pub timestamp: DateTime<Utc>,
    /// Non-negative finite duration in minutes, when one was recorded.
    pub execution_minutes: Option<f64>,
    /// Workflow-run identifier assigned by the automation service.
    pub aigent_id: Option<String>,
    /// Address of the client the run served.
    pub client_address: Option<String>,
    /// Contracted bandwidth, as written by the producer.
    pub bandwidth: Option<String>,
    /// Free-text label of the equipment kit confirmed for the run.
    pub kit_confirmation: Option<String>,
}

/// Normalize `doc`, reading offset-less timestamps as process-local time.
#[must_use]
pub fn normalize_document(doc: &Value) -> Option<LogEntry> {
    normalize_document_in(doc, &Local)
}

/// Normalize `doc`, reading offset-less timestamps in `tz`.
///
/// Returns `None` for non-object documents and for documents with no
/// resolvable timestamp.
#[must_use]
pub fn normalize_document_in<Tz: TimeZone>(doc: &Value, tz: &Tz) -> Option<LogEntry> {
    let sources = Sources::new(doc.as_object()?);

    let timestamp = sources.first_parsed(TIMESTAMP_CHAIN, |v| parse_date_in(v, tz))?;
    let execution_minutes = sources.first_parsed(DURATION_CHAIN, |v| {
        parse_duration_minutes(v).filter(|minutes| *minutes >= 0.0)
    });

    Some(LogEntry {
        timestamp,
        execution_minutes,
        aigent_id: sources.first_text(AIGENT_ID_ALIASES),
        client_address: sources.first_text(CLIENT_ADDRESS_ALIASES),
        bandwidth: sources.first_text(BANDWIDTH_ALIASES),
        kit_confirmation: sources.first_text(KIT_CONFIRMATION_ALIASES),
    })
}

/// Normalize a batch, dropping documents that do not resolve.
pub fn normalize_all<'a, Tz, I>(docs: I, tz: &Tz) -> Vec<LogEntry>
where
    Tz: TimeZone,
    I: IntoIterator<Item = &'a Value>,
{
    let mut seen = 0_usize;
    let entries: Vec<LogEntry> = docs
        .into_iter()
        .inspect(|_| seen += 1)
        .filter_map(|doc| normalize_document_in(doc, tz))
        .collect();
    let dropped = seen - entries.len();
    if dropped > 0 {
        tracing::debug!(seen, dropped, "dropped log documents without a timestamp");
    }
    entries
}
