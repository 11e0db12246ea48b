//! # Failure Taxonomy
//!
//! Every failure a collaborator can report is a [`Fault`]. Before a fault is
//! kept it is reduced to one of the closed set of [`ErrorKind`]s and wrapped in an
//! append-only [`ErrorRecord`] that remembers where it came from.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::attempt::ConnectionAttempt;
use crate::network::address::Address;

/// A failure reported by a transport, a peer, or a caller-supplied routine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// The peer rejected the credentials.
    #[error("authentication rejected: {0}")]
    Authentication(String),

    /// The peer accepted the credentials but the account lacks a privilege.
    #[error("permission denied{}: {message}", privilege_suffix(.privilege))]
    Authorization {
        privilege: Option<String>,
        message: String,
    },

    /// The peer answered with something the protocol cannot parse.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Network or IO failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// An operation ran past its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// A fault raised by the remote service itself, carried verbatim.
    #[error("server fault: {0}")]
    Remote(String),

    /// The session opened but its reported version matched nothing.
    #[error("unknown version '{version}' reported by peer type '{peer_type}'")]
    UnknownVersion { version: String, peer_type: String },

    #[error("{0}")]
    Other(String),
}

fn privilege_suffix(privilege: &Option<String>) -> String {
    privilege
        .as_deref()
        .map(|p| format!(" (missing {p})"))
        .unwrap_or_default()
}

impl From<std::io::Error> for Fault {
    fn from(err: std::io::Error) -> Self {
        Fault::Transport(err.to_string())
    }
}

/// The closed set of failure classes an operator can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoCredentials,
    AuthenticationFailed,
    AuthorizationDenied,
    MalformedResponse,
    TransportFailure,
    UnknownVersion,
    Unclassified,
}

impl ErrorKind {
    pub fn default_severity(self) -> Severity {
        match self {
            ErrorKind::NoCredentials => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NoCredentials => "no credentials",
            ErrorKind::AuthenticationFailed => "authentication failed",
            ErrorKind::AuthorizationDenied => "authorization denied",
            ErrorKind::MalformedResponse => "malformed response",
            ErrorKind::TransportFailure => "transport failure",
            ErrorKind::UnknownVersion => "unknown version",
            ErrorKind::Unclassified => "unclassified",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// Where in the run a record was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Run-level work that belongs to no address (e.g. the final sink flush).
    Run,
    /// Planning for one address, before any attempt existed.
    Address(Address),
    Attempt(ConnectionAttempt),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Run => f.write_str("run"),
            Origin::Address(address) => write!(f, "{address}"),
            Origin::Attempt(attempt) => write!(f, "{attempt}"),
        }
    }
}

/// One classified failure. Records are created once and never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub origin: Origin,
    /// The missing privilege, for [`ErrorKind::AuthorizationDenied`] when the transport names it.
    pub privilege: Option<String>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>, origin: Origin) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            origin,
            privilege: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_privilege(mut self, privilege: Option<String>) -> Self {
        self.privilege = privilege;
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.origin, self.message)
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
