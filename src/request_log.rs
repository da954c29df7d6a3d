//! Append-only request logging and analytics
//!
//! Development runs persist records as JSON lines in a file; production runs
//! log to the console only. Persistence failures are swallowed: losing a log
//! line must never fail a request. Injected through `AppState` so tests get
//! their own instance and lifecycle.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;

use crate::models::{RequestLogEntry, RequestStatus};

/// Aggregate analytics computed over the retained log
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAnalytics {
    pub total_requests: usize,
    pub completed_requests: usize,
    pub failed_requests: usize,
    /// Request counts keyed by technology
    pub technology_counts: HashMap<String, usize>,
    /// Average duration of completed requests, milliseconds
    pub average_duration_ms: Option<f64>,
    /// Request counts keyed by day (YYYY-MM-DD)
    pub requests_per_day: HashMap<String, usize>,
}

/// File-or-console request logger
pub struct RequestLogger {
    /// JSON-lines file path; `None` means console-only (production)
    path: Option<PathBuf>,
    /// Serializes appends from concurrent requests
    write_lock: Mutex<()>,
}

impl RequestLogger {
    /// File-backed logger for development environments
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            write_lock: Mutex::new(()),
        }
    }

    /// Console-only logger for production
    pub fn console_only() -> Self {
        Self {
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Append a record. Fire-and-forget: failures are logged and swallowed.
    pub fn log_request(&self, entry: &RequestLogEntry) {
        log::info!(
            "[request-log] {:?} {:?} '{}'{}",
            entry.request_type,
            entry.status,
            entry.user_request,
            entry
                .error_message
                .as_ref()
                .map(|e| format!(" error: {}", e))
                .unwrap_or_default()
        );

        let Some(ref path) = self.path else {
            return;
        };

        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Failed to serialize request log entry: {}", e);
                return;
            }
        };

        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{}", line));
        if let Err(e) = result {
            log::warn!("Failed to persist request log entry: {}", e);
        }
    }

    /// Read every retained record, skipping unparseable lines
    fn read_all(&self) -> Vec<RequestLogEntry> {
        let Some(ref path) = self.path else {
            return Vec::new();
        };
        let Ok(file) = std::fs::File::open(path) else {
            return Vec::new();
        };
        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect()
    }

    /// The most recent `limit` records, in original insertion order
    pub fn get_request_logs(&self, limit: usize) -> Vec<RequestLogEntry> {
        let all = self.read_all();
        let skip = all.len().saturating_sub(limit);
        all.into_iter().skip(skip).collect()
    }

    /// Scan all retained records and compute aggregate analytics
    pub fn get_analytics(&self) -> RequestAnalytics {
        let all = self.read_all();

        let total_requests = all.len();
        let completed: Vec<_> = all
            .iter()
            .filter(|e| e.status == RequestStatus::Completed)
            .collect();
        let failed_requests = all
            .iter()
            .filter(|e| e.status == RequestStatus::Failed)
            .count();

        let mut technology_counts: HashMap<String, usize> = HashMap::new();
        let mut requests_per_day: HashMap<String, usize> = HashMap::new();
        for entry in &all {
            if let Some(ref tech) = entry.technology {
                *technology_counts.entry(tech.clone()).or_default() += 1;
            }
            let day = entry.timestamp.format("%Y-%m-%d").to_string();
            *requests_per_day.entry(day).or_default() += 1;
        }

        let durations: Vec<u64> = completed.iter().filter_map(|e| e.duration).collect();
        let average_duration_ms = if durations.is_empty() {
            None
        } else {
            Some(durations.iter().sum::<u64>() as f64 / durations.len() as f64)
        };

        RequestAnalytics {
            total_requests,
            completed_requests: completed.len(),
            failed_requests,
            technology_counts,
            average_duration_ms,
            requests_per_day,
        }
    }
}
