//! History exports: raw JSON, Postman collection, Markdown report, JSON summary

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use super::cell;
use crate::constants::{APP_NAME, POSTMAN_COLLECTION_SCHEMA};
use crate::models::{HistoryEntry, StatusClass};

/// Longest response body reproduced in the Markdown report
const MAX_BODY_CHARS: usize = 2000;

/// Entries as stored
pub fn to_json(entries: &[HistoryEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(entries)
}

/// Postman v2.1 collection of the requests only; no response or timing data
pub fn to_postman(entries: &[HistoryEntry], name: &str, now: DateTime<Utc>) -> Value {
    let items: Vec<Value> = entries
        .iter()
        .map(|entry| {
            let headers: Vec<Value> = entry
                .request_headers
                .iter()
                .map(|(k, v)| json!({"key": k, "value": v, "type": "text"}))
                .collect();

            let mut request = json!({
                "method": entry.method,
                "header": headers,
                "url": {"raw": entry.endpoint},
            });
            if !entry.request_body.is_empty() {
                request["body"] = json!({"mode": "raw", "raw": entry.request_body});
            }

            json!({
                "name": format!("{} {}", entry.method, entry.endpoint),
                "request": request,
                "response": [],
            })
        })
        .collect();

    json!({
        "info": {
            "_postman_id": uuid::Uuid::new_v4().to_string(),
            "name": name,
            "description": format!(
                "Exported from {} request history on {}",
                APP_NAME,
                now.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            "schema": POSTMAN_COLLECTION_SCHEMA,
        },
        "item": items,
    })
}

/// Summary, table and one narrative section per entry
pub fn to_markdown(entries: &[HistoryEntry], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Request History Report\n");
    let _ = writeln!(out, "Generated on: {}\n", now.format("%Y-%m-%d %H:%M:%S"));

    let count = |class: StatusClass| entries.iter().filter(|e| e.status_class() == class).count();
    let avg_ms = if entries.is_empty() {
        0
    } else {
        entries.iter().map(|e| e.elapsed_ms).sum::<i64>() / entries.len() as i64
    };

    let _ = writeln!(out, "## Summary\n");
    let _ = writeln!(out, "- Total requests: {}", entries.len());
    let _ = writeln!(out, "- Successful (2xx): {}", count(StatusClass::Success));
    let _ = writeln!(out, "- Client errors (4xx): {}", count(StatusClass::ClientError));
    let _ = writeln!(out, "- Server errors (5xx): {}", count(StatusClass::ServerError));
    let _ = writeln!(out, "- Failed (no response): {}", count(StatusClass::Failed));
    let _ = writeln!(out, "- Average response time: {} ms\n", avg_ms);

    if entries.is_empty() {
        let _ = writeln!(out, "No requests recorded.");
        return out;
    }

    let _ = writeln!(out, "## Requests\n");
    let _ = writeln!(out, "| # | Time | Method | Endpoint | Status | Time (ms) |");
    let _ = writeln!(out, "|---|------|--------|----------|--------|-----------|");
    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            i + 1,
            entry.executed_at.format("%Y-%m-%d %H:%M:%S"),
            entry.method,
            cell(&entry.endpoint),
            status_text(entry),
            entry.elapsed_ms
        );
    }

    let _ = writeln!(out, "\n## Details");
    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(out, "\n### {}. {} {}\n", i + 1, entry.method, entry.endpoint);
        let _ = writeln!(out, "- Executed at: {}", entry.executed_at.to_rfc3339_opts(SecondsFormat::Secs, true));
        let _ = writeln!(out, "- Status: {}", status_text(entry));
        let _ = writeln!(out, "- Response time: {} ms", entry.elapsed_ms);
        if let Some(error) = &entry.error {
            let _ = writeln!(out, "- Error: {}", error);
        }

        if !entry.request_headers.is_empty() {
            let _ = writeln!(out, "\n**Request headers:**\n```");
            for (k, v) in &entry.request_headers {
                let _ = writeln!(out, "{}: {}", k, v);
            }
            let _ = writeln!(out, "```");
        }
        if !entry.request_body.is_empty() {
            let _ = writeln!(out, "\n**Request body:**\n```\n{}\n```", entry.request_body);
        }
        if !entry.response_body.is_empty() {
            let _ = writeln!(out, "\n**Response body:**\n```\n{}\n```", truncate(&entry.response_body));
        }
    }

    out
}

/// Counts by status class and method, plus timing figures
pub fn report(entries: &[HistoryEntry], now: DateTime<Utc>) -> Value {
    let mut by_class: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_method: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in entries {
        *by_class.entry(entry.status_class().as_str()).or_default() += 1;
        *by_method.entry(entry.method.as_str()).or_default() += 1;
    }
    let times: Vec<i64> = entries.iter().map(|e| e.elapsed_ms).collect();
    let average = if times.is_empty() {
        0
    } else {
        times.iter().sum::<i64>() / times.len() as i64
    };

    json!({
        "summary": {
            "total_requests": entries.len(),
            "failed_requests": entries.iter().filter(|e| e.is_failure()).count(),
            "export_date": now.to_rfc3339_opts(SecondsFormat::Secs, true),
        },
        "status_classes": by_class,
        "methods": by_method,
        "response_time_ms": {
            "average": average,
            "min": times.iter().min().copied().unwrap_or(0),
            "max": times.iter().max().copied().unwrap_or(0),
        },
    })
}

fn status_text(entry: &HistoryEntry) -> String {
    match entry.response_status {
        Some(status) => status.to_string(),
        None => "failed".to_string(),
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_BODY_CHARS) {
        Some((cut, _)) => format!("{}\n... (truncated)", &text[..cut]),
        None => text.to_string(),
    }
}
