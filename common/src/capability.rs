//! # Capability Modules
//!
//! Once a session is classified, a [`CapabilityModule`] tells discovery code which
//! version-specific behavior set applies to the peer.

use std::fmt;

use crate::session::ProtocolVersion;
use crate::config::{DEFAULT_FALLBACK_VERSION, DEFAULT_PREFERRED_VERSION};

/// The known API revisions, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiRevision {
    R2_0,
    R2_5,
    R4_0,
    R4_1,
    R5_0,
    R5_1,
    R5_5,
    R6_0,
}

impl ApiRevision {
    pub const ALL: [ApiRevision; 8] = [
        ApiRevision::R2_0,
        ApiRevision::R2_5,
        ApiRevision::R4_0,
        ApiRevision::R4_1,
        ApiRevision::R5_0,
        ApiRevision::R5_1,
        ApiRevision::R5_5,
        ApiRevision::R6_0,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ApiRevision::R2_0 => "2.0",
            ApiRevision::R2_5 => "2.5",
            ApiRevision::R4_0 => "4.0",
            ApiRevision::R4_1 => "4.1",
            ApiRevision::R5_0 => "5.0",
            ApiRevision::R5_1 => "5.1",
            ApiRevision::R5_5 => "5.5",
            ApiRevision::R6_0 => "6.0",
        }
    }

    /// 2.0 peers only understand the legacy namespace.
    pub fn protocol_version(self) -> ProtocolVersion {
        match self {
            ApiRevision::R2_0 => ProtocolVersion::new(DEFAULT_FALLBACK_VERSION),
            _ => ProtocolVersion::new(DEFAULT_PREFERRED_VERSION),
        }
    }
}

impl fmt::Display for ApiRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Peers sharing a version can still differ in what they expose.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PeerKind {
    /// A single managed host (`HostAgent`).
    Host,
    /// A management server fronting many hosts (`VirtualCenter`).
    Manager,
    Other(String),
}

impl PeerKind {
    pub fn from_type_string(peer_type: &str) -> Self {
        match peer_type {
            "HostAgent" => PeerKind::Host,
            "VirtualCenter" => PeerKind::Manager,
            other => PeerKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PeerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerKind::Host => f.write_str("host"),
            PeerKind::Manager => f.write_str("manager"),
            PeerKind::Other(other) => write!(f, "other({other})"),
        }
    }
}

/// The behavior set governing one successfully classified session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityModule {
    pub revision: ApiRevision,
    pub peer: PeerKind,
}

impl CapabilityModule {
    pub fn new(revision: ApiRevision, peer: PeerKind) -> Self {
        Self { revision, peer }
    }

    /// Managers own an inventory of hosts that discovery should walk.
    pub fn manages_inventory(&self) -> bool {
        self.peer == PeerKind::Manager
    }

    pub fn supports_extended_queries(&self) -> bool {
        self.revision >= ApiRevision::R4_0
    }
}

impl fmt::Display for CapabilityModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "api-{} ({})", self.revision, self.peer)
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
