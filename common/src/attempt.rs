//! # Attempts and their Context
//!
//! A [`ConnectionAttempt`] names one trial; a [`ConnectionContext`] accumulates
//! everything that happens to it, from opening the session to releasing it.

use std::fmt;

use thiserror::Error;

use crate::capability::CapabilityModule;
use crate::credentials::CredentialRef;
use crate::error::{ErrorKind, ErrorRecord, Origin, Severity};
use crate::network::address::{Address, Endpoint};
use crate::session::{PeerDescription, Session};

/// One (address, credential, endpoint variant) triple, tried once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionAttempt {
    pub address: Address,
    pub credential: CredentialRef,
    pub endpoint: Endpoint,
}

impl ConnectionAttempt {
    pub fn new(address: Address, credential: CredentialRef, endpoint: Endpoint) -> Self {
        Self {
            address,
            credential,
            endpoint,
        }
    }
}

impl fmt::Display for ConnectionAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {}", self.endpoint, self.credential)
    }
}

/// Lifecycle stages of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptStage {
    Attempting,
    Connected,
    Classified,
    Dispatched,
    Failed,
    Recorded,
    Closed,
}

impl AttemptStage {
    /// Legal edges of the attempt state graph:
    /// ```text
    /// Attempting → Connected | Failed
    /// Connected  → Classified | Failed
    /// Classified → Dispatched | Failed
    /// Dispatched → Closed | Failed
    /// Failed     → Recorded
    /// Recorded   → Closed
    /// ```
    pub fn can_advance_to(self, to: AttemptStage) -> bool {
        use AttemptStage::*;

        matches!(
            (self, to),
            (Attempting, Connected)
                | (Attempting, Failed)
                | (Connected, Classified)
                | (Connected, Failed)
                | (Classified, Dispatched)
                | (Classified, Failed)
                | (Dispatched, Closed)
                | (Dispatched, Failed)
                | (Failed, Recorded)
                | (Recorded, Closed)
        )
    }
}

impl fmt::Display for AttemptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal attempt transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: AttemptStage,
    pub to: AttemptStage,
}

/// Mutable accumulator for one attempt's lifecycle.
pub struct ConnectionContext {
    attempt: ConnectionAttempt,
    session: Option<Box<dyn Session>>,
    peer: Option<PeerDescription>,
    capability: Option<CapabilityModule>,
    records: Vec<ErrorRecord>,
    stages: Vec<AttemptStage>,
    succeeded: bool,
}

impl ConnectionContext {
    pub fn new(attempt: ConnectionAttempt) -> Self {
        Self {
            attempt,
            session: None,
            peer: None,
            capability: None,
            records: Vec::new(),
            stages: vec![AttemptStage::Attempting],
            succeeded: false,
        }
    }

    pub fn attempt(&self) -> &ConnectionAttempt {
        &self.attempt
    }

    pub fn stage(&self) -> AttemptStage {
        // `stages` is seeded with `Attempting` and only ever grows.
        self.stages.last().copied().unwrap_or(AttemptStage::Attempting)
    }

    /// Every stage the attempt went through, in order.
    pub fn stages(&self) -> &[AttemptStage] {
        &self.stages
    }

    /// Moves to `to`, refusing any edge outside the stage graph.
    pub fn advance(&mut self, to: AttemptStage) -> Result<(), IllegalTransition> {
        let from = self.stage();
        if !from.can_advance_to(to) {
            return Err(IllegalTransition { from, to });
        }
        self.stages.push(to);
        Ok(())
    }

    pub fn attach_session(&mut self, session: Box<dyn Session>) {
        self.session = Some(session);
    }

    /// The open session, for discovery routines to query.
    pub fn session_mut(&mut self) -> Option<&mut (dyn Session + 'static)> {
        self.session.as_deref_mut()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Hands the session back for release. Returns `None` once it has been taken.
    pub fn take_session(&mut self) -> Option<Box<dyn Session>> {
        self.session.take()
    }

    pub fn set_peer(&mut self, peer: PeerDescription) {
        self.peer = Some(peer);
    }

    pub fn peer(&self) -> Option<&PeerDescription> {
        self.peer.as_ref()
    }

    pub fn version(&self) -> Option<&str> {
        self.peer.as_ref().map(|p| p.version.as_str())
    }

    pub fn peer_type(&self) -> Option<&str> {
        self.peer.as_ref().map(|p| p.peer_type.as_str())
    }

    /// Sets the resolved capability module. A module, once set, is never replaced.
    pub fn set_capability(&mut self, module: CapabilityModule) -> Result<(), CapabilityModule> {
        if self.capability.is_some() {
            return Err(module);
        }
        self.capability = Some(module);
        Ok(())
    }

    pub fn capability(&self) -> Option<&CapabilityModule> {
        self.capability.as_ref()
    }

    /// Adds an attempt-scoped warning, e.g. from a discovery routine that skipped something.
    pub fn warn(&mut self, message: impl Into<String>) {
        let record = ErrorRecord::new(
            ErrorKind::Unclassified,
            message,
            Origin::Attempt(self.attempt.clone()),
        )
        .with_severity(Severity::Warning);
        self.records.push(record);
    }

    pub fn push_record(&mut self, record: ErrorRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn mark_succeeded(&mut self) {
        self.succeeded = true;
    }

    /// True when the attempt was dispatched and its results were delivered.
    pub fn is_success(&self) -> bool {
        self.succeeded
    }
}

impl fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("attempt", &self.attempt)
            .field("session_open", &self.session.is_some())
            .field("peer", &self.peer)
            .field("capability", &self.capability)
            .field("records", &self.records)
            .field("stages", &self.stages)
            .field("succeeded", &self.succeeded)
            .finish()
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
