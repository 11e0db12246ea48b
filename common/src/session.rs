//! # Session Ports
//!
//! The engine is transport-agnostic. It only knows how to ask a [`ClientBackend`]
//! for a [`Session`] and what a session can do once open.

use std::fmt;

use async_trait::async_trait;

use crate::attempt::ConnectionAttempt;
use crate::error::Fault;
use crate::network::address::Endpoint;

/// A protocol/API version hint sent while opening a session (e.g. `urn:vim25`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtocolVersion(String);

impl ProtocolVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a peer says about itself when probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDescription {
    pub version: String,
    pub peer_type: String,
}

impl PeerDescription {
    pub fn new(version: impl Into<String>, peer_type: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            peer_type: peer_type.into(),
        }
    }
}

/// A live, authenticated connection to a peer.
///
/// Whoever receives a session owns it and must call [`Session::close`].
#[async_trait]
pub trait Session: Send {
    fn endpoint(&self) -> &Endpoint;

    /// The version the session was opened with.
    fn protocol_version(&self) -> &ProtocolVersion;

    /// Single capability probe returning the peer's version and type strings.
    async fn describe_self(&mut self) -> Result<PeerDescription, Fault>;

    /// Issues one protocol call on behalf of a discovery routine.
    async fn call(&mut self, method: &str) -> Result<String, Fault>;

    /// Releases the underlying transport.
    async fn close(&mut self) -> Result<(), Fault>;
}

/// Opens sessions. Implemented per transport.
#[async_trait]
pub trait ClientBackend: Send + Sync {
    async fn open(
        &self,
        attempt: &ConnectionAttempt,
        version: &ProtocolVersion,
    ) -> Result<Box<dyn Session>, Fault>;
}
