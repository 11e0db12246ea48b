//! Reduces faults to the closed [`ErrorKind`] taxonomy and keeps the run's
//! append-only list of records.

use std::sync::{Mutex, PoisonError};

use accord_common::error::{ErrorKind, ErrorRecord, Fault, Origin};
use thiserror::Error;
use tracing::{debug, warn};

/// Caller mistakes. The only failures that abort a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("attempt space is empty: no addresses were given")]
    EmptyAttemptSpace,
    #[error("no URL generators configured")]
    NoUrlGenerators,
}

/// Server fault strings that mean the credentials were refused.
const AUTHENTICATION_SIGNALS: &[&str] = &["InvalidLogin", "incorrect user name or password"];
/// Server fault strings that mean a privilege is missing.
const AUTHORIZATION_SIGNALS: &[&str] = &["NoPermission"];

/// The single writer of the run's error and warning list.
#[derive(Debug, Default)]
pub struct ErrorClassifier {
    records: Mutex<Vec<ErrorRecord>>,
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(fault: &Fault) -> ErrorKind {
        match fault {
            Fault::Authentication(_) => ErrorKind::AuthenticationFailed,
            Fault::Authorization { .. } => ErrorKind::AuthorizationDenied,
            Fault::Malformed(_) => ErrorKind::MalformedResponse,
            Fault::Transport(_) | Fault::Timeout(_) => ErrorKind::TransportFailure,
            Fault::UnknownVersion { .. } => ErrorKind::UnknownVersion,
            Fault::Remote(message) => classify_server_fault(message),
            Fault::Other(_) => ErrorKind::Unclassified,
        }
    }

    /// Builds the record a fault would be filed as, without storing it.
    pub fn to_record(fault: &Fault, origin: Origin) -> ErrorRecord {
        let privilege = match fault {
            Fault::Authorization { privilege, .. } => privilege.clone(),
            _ => None,
        };
        ErrorRecord::new(Self::classify(fault), fault.to_string(), origin).with_privilege(privilege)
    }

    /// Classifies `fault`, records it, and returns the kind it was filed under.
    pub fn record_fault(&self, fault: &Fault, origin: Origin) -> ErrorKind {
        let record = Self::to_record(fault, origin);
        let kind = record.kind;
        self.record(record);
        kind
    }

    pub fn record(&self, record: ErrorRecord) {
        if record.is_warning() {
            debug!(kind = %record.kind, "{record}");
        } else {
            warn!(kind = %record.kind, "{record}");
        }
        self.lock().push(record);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<ErrorRecord> {
        self.lock().clone()
    }

    pub fn into_records(self) -> Vec<ErrorRecord> {
        self.records
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ErrorRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn classify_server_fault(message: &str) -> ErrorKind {
    if AUTHENTICATION_SIGNALS.iter().any(|s| message.contains(s)) {
        ErrorKind::AuthenticationFailed
    } else if AUTHORIZATION_SIGNALS.iter().any(|s| message.contains(s)) {
        ErrorKind::AuthorizationDenied
    } else {
        ErrorKind::Unclassified
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
