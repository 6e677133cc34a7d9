//! Two-tier audit trail for agent sessions
//!
//! Every session owns an `AuditLog`: an append-only sequence of typed
//! entries split across two tiers. The debug tier captures raw exchanges
//! with the reasoning engine and the payment capability for operator
//! troubleshooting; the info tier is the filtered trace surfaced to the
//! end-user panel and never carries secrets. Entries touching the payment
//! capability are prefixed with a sandbox marker so the operating mode is
//! unambiguous at a glance.
//!
//! The log is an owned handle per session rather than process-global
//! state; the only shared piece is the thread-safe append-only sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Marker prepended to every action- and api-kind entry.
pub const SANDBOX_MARKER: &str = "[SANDBOX]";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogTier {
    Debug,
    Info,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Reasoning,
    Action,
    Api,
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub tier: LogTier,
    pub kind: LogKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Session-scoped audit log. Cloning yields another handle to the same
/// append-only sink, so the loop controller, adapter, and providers can all
/// record entries for the session they serve.
#[derive(Clone, Default)]
pub struct AuditLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, tier: LogTier, kind: LogKind, message: String, details: Option<Value>) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            tier,
            kind,
            message,
            details,
        };
        self.entries
            .lock()
            .expect("audit log lock poisoned")
            .push(entry);
    }

    /// Record a user-visible entry.
    pub fn info(&self, kind: LogKind, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.push(LogTier::Info, kind, message, None);
    }

    /// Record a user-visible entry for an action dispatched to the payment
    /// capability. The sandbox marker is applied here so no call site can
    /// forget it.
    pub fn action(&self, message: impl Into<String>) {
        self.info(LogKind::Action, format!("{} {}", SANDBOX_MARKER, message.into()));
    }

    /// Record a user-visible entry for a payment API outcome.
    pub fn api(&self, message: impl Into<String>) {
        self.info(LogKind::Api, format!("{} {}", SANDBOX_MARKER, message.into()));
    }

    pub fn reasoning(&self, message: impl Into<String>) {
        self.info(LogKind::Reasoning, message);
    }

    /// Record a user-visible error entry.
    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{}", message);
        self.push(LogTier::Info, LogKind::Error, message, None);
    }

    /// Record a debug-tier entry. Raw request/response details belong here,
    /// with credentials already stripped by the caller.
    pub fn debug(&self, kind: LogKind, message: impl Into<String>, details: Option<Value>) {
        let message = message.into();
        match &details {
            Some(d) => log::debug!("{}: {}", message, d),
            None => log::debug!("{}", message),
        }
        self.push(LogTier::Debug, kind, message, details);
    }

    /// Full ordered trace, both tiers.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().expect("audit log lock poisoned").clone()
    }

    /// The info-tier subset consumed by the UI panel.
    pub fn user_visible(&self) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.tier == LogTier::Info)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("audit log lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_and_api_entries_carry_sandbox_marker() {
        let audit = AuditLog::new();
        audit.action("Executing action: send_money");
        audit.api("Completed action: send_money");

        let visible = audit.user_visible();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|e| e.message.starts_with(SANDBOX_MARKER)));
    }

    #[test]
    fn user_visible_filters_debug_tier() {
        let audit = AuditLog::new();
        audit.debug(
            LogKind::Api,
            "raw provider response",
            Some(json!({"status": 200})),
        );
        audit.info(LogKind::Info, "Processing request");

        assert_eq!(audit.entries().len(), 2);
        let visible = audit.user_visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].message, "Processing request");
    }

    #[test]
    fn entries_preserve_append_order() {
        let audit = AuditLog::new();
        audit.info(LogKind::Info, "first");
        audit.error("second");
        audit.reasoning("third");

        let messages: Vec<_> = audit.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn clones_share_one_sink() {
        let audit = AuditLog::new();
        let handle = audit.clone();
        handle.info(LogKind::Info, "from the clone");
        assert_eq!(audit.len(), 1);
    }
}
