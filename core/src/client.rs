//! # Client Factory
//!
//! Opens one session per attempt. When the peer refuses the preferred protocol
//! version with a recognized incompatibility signature, the factory retries
//! exactly once with the designated fallback version. Nothing else is retried.

use std::sync::Arc;
use std::time::Duration;

use accord_common::attempt::ConnectionAttempt;
use accord_common::error::Fault;
use accord_common::network::address::Endpoint;
use accord_common::session::{ClientBackend, PeerDescription, ProtocolVersion, Session};
use async_trait::async_trait;
use tracing::{info, warn};

/// Fault signatures that mean "this peer does not speak the requested version".
///
/// The set is closed. Adding a signature widens what gets retried, so unrelated
/// faults must never be matched here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompatibilitySignature {
    /// `Unsupported namespace "urn:..."` returned by the peer's login call.
    UnsupportedNamespace,
}

impl IncompatibilitySignature {
    pub const RECOGNIZED: &'static [IncompatibilitySignature] =
        &[IncompatibilitySignature::UnsupportedNamespace];

    pub fn matches(self, fault: &Fault) -> bool {
        match self {
            IncompatibilitySignature::UnsupportedNamespace => {
                matches!(fault, Fault::Remote(message) if message.contains("Unsupported namespace"))
            }
        }
    }

    pub fn detect(fault: &Fault) -> Option<IncompatibilitySignature> {
        Self::RECOGNIZED.iter().copied().find(|s| s.matches(fault))
    }
}

pub struct ClientFactory {
    backend: Arc<dyn ClientBackend>,
    preferred: ProtocolVersion,
    fallback: ProtocolVersion,
    timeout: Duration,
}

impl ClientFactory {
    pub fn new(
        backend: Arc<dyn ClientBackend>,
        preferred: ProtocolVersion,
        fallback: ProtocolVersion,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            preferred,
            fallback,
            timeout,
        }
    }

    /// Opens a session for `attempt`. The caller owns the returned session and must close it.
    pub async fn open(&self, attempt: &ConnectionAttempt) -> Result<NegotiatedSession, Fault> {
        match self.open_with(attempt, &self.preferred).await {
            Ok(session) => Ok(session),
            Err(fault) => match IncompatibilitySignature::detect(&fault) {
                Some(signature) => {
                    info!(
                        ?signature,
                        "{} refused {}, retrying with {}",
                        attempt.endpoint,
                        self.preferred,
                        self.fallback
                    );
                    self.open_with(attempt, &self.fallback).await
                }
                None => Err(fault),
            },
        }
    }

    async fn open_with(
        &self,
        attempt: &ConnectionAttempt,
        version: &ProtocolVersion,
    ) -> Result<NegotiatedSession, Fault> {
        let session = tokio::time::timeout(self.timeout, self.backend.open(attempt, version))
            .await
            .map_err(|_| Fault::Timeout(self.timeout))??;

        Ok(NegotiatedSession::new(session, version.clone()))
    }
}

/// Explicit adapter over a backend session.
///
/// Forwards every [`Session`] method to the inner session except `close`, which
/// is made idempotent so the transport is released exactly once.
pub struct NegotiatedSession {
    inner: Box<dyn Session>,
    negotiated: ProtocolVersion,
    closed: bool,
}

impl NegotiatedSession {
    pub fn new(inner: Box<dyn Session>, negotiated: ProtocolVersion) -> Self {
        Self {
            inner,
            negotiated,
            closed: false,
        }
    }

    /// The version the factory actually succeeded with (preferred or fallback).
    pub fn negotiated_version(&self) -> &ProtocolVersion {
        &self.negotiated
    }
}

#[async_trait]
impl Session for NegotiatedSession {
    fn endpoint(&self) -> &Endpoint {
        self.inner.endpoint()
    }

    fn protocol_version(&self) -> &ProtocolVersion {
        self.inner.protocol_version()
    }

    async fn describe_self(&mut self) -> Result<PeerDescription, Fault> {
        self.inner.describe_self().await
    }

    async fn call(&mut self, method: &str) -> Result<String, Fault> {
        self.inner.call(method).await
    }

    async fn close(&mut self) -> Result<(), Fault> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner.close().await
    }
}

impl Drop for NegotiatedSession {
    fn drop(&mut self) {
        if !self.closed {
            warn!("session to {} dropped without being closed", self.inner.endpoint());
        }
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
