//! In-memory structured audit trail of pipeline decisions.
//!
//! Stores per-subject entries capped at a configurable maximum (default 500)
//! with FIFO eviction. Uses `std::sync::RwLock` so both the single-threaded
//! engine and tokio workers can write to it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ENTRIES: usize = 500;

/// Severity level for audit log entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Numeric severity for comparison (higher = more severe).
    pub fn as_severity(&self) -> u8 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
        }
    }
}

/// Pipeline stage that produced the entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditPhase {
    Ingestion,
    Anomaly,
    Risk,
    Zone,
    Classification,
    Dispatch,
    Notification,
    NotifyError,
    Acknowledge,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub subject_id: String,
    pub level: LogLevel,
    pub phase: AuditPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Filter for [`AuditLog::query`].
#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    /// Minimum level (inclusive).
    pub level: Option<LogLevel>,
    pub phase: Option<AuditPhase>,
    /// Maximum number of entries to return (default 100).
    pub limit: Option<u32>,
    /// Only entries at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

/// Per-subject audit log with FIFO eviction. Cloning shares the storage.
#[derive(Debug, Clone)]
pub struct AuditLog {
    entries: Arc<RwLock<HashMap<String, VecDeque<AuditEntry>>>>,
    max_entries_per_subject: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries_per_subject: max.max(1),
        }
    }

    pub fn log(
        &self,
        subject_id: &str,
        level: LogLevel,
        phase: AuditPhase,
        message: impl Into<String>,
    ) {
        self.log_with_details(subject_id, level, phase, message, None);
    }

    pub fn log_with_details(
        &self,
        subject_id: &str,
        level: LogLevel,
        phase: AuditPhase,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            subject_id: subject_id.to_string(),
            level,
            phase,
            message: message.into(),
            details,
        };

        let mut guard = self.write();
        let deque = guard.entry(subject_id.to_string()).or_default();
        deque.push_back(entry);
        while deque.len() > self.max_entries_per_subject {
            deque.pop_front();
        }
    }

    /// Entries for one subject, newest first.
    pub fn query(&self, subject_id: &str, params: &AuditQuery) -> Vec<AuditEntry> {
        let guard = self.read();
        let Some(deque) = guard.get(subject_id) else {
            return Vec::new();
        };

        let min_severity = params.level.map(|l| l.as_severity()).unwrap_or(0);
        let limit = params.limit.unwrap_or(100) as usize;

        deque
            .iter()
            .rev()
            .filter(|e| e.level.as_severity() >= min_severity)
            .filter(|e| params.phase.map_or(true, |p| e.phase == p))
            .filter(|e| params.since.map_or(true, |s| e.timestamp >= s))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Subjects with at least one entry, sorted.
    pub fn subjects(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn clear(&self, subject_id: &str) {
        self.write().remove(subject_id);
    }

    // A panicking writer cannot leave a half-pushed entry behind, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, VecDeque<AuditEntry>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, VecDeque<AuditEntry>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
