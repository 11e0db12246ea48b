//! # Version Classification
//!
//! Resolves what a freshly opened peer reports about itself into a
//! [`CapabilityModule`]. The version string is checked against an ordered
//! [`MatcherRegistry`] (first match wins); the type string is resolved on its
//! own so peers that share a version can still be told apart.

use accord_common::attempt::ConnectionContext;
use accord_common::capability::{ApiRevision, CapabilityModule, PeerKind};
use accord_common::error::Fault;
use accord_common::session::PeerDescription;
use regex::Regex;
use tracing::debug;

/// A predicate over reported version strings.
#[derive(Debug, Clone)]
pub enum Matcher {
    Exact(String),
    Pattern(Regex),
}

impl Matcher {
    pub fn exact(version: impl Into<String>) -> Self {
        Matcher::Exact(version.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Matcher::Pattern(Regex::new(pattern)?))
    }

    pub fn matches(&self, version: &str) -> bool {
        match self {
            Matcher::Exact(expected) => expected == version,
            Matcher::Pattern(regex) => regex.is_match(version),
        }
    }
}

/// Patterns of the standard table, in lookup order. `2.0` is matched exactly.
const STANDARD_PATTERNS: &[(&str, ApiRevision)] = &[
    (r"^2\.5(\.\d+)*$", ApiRevision::R2_5),
    (r"^4\.0(\.\d+)*$", ApiRevision::R4_0),
    (r"^4\.1(\.\d+)*$", ApiRevision::R4_1),
    (r"^5\.0(\.\d+)*$", ApiRevision::R5_0),
    (r"^5\.1(\.\d+)*$", ApiRevision::R5_1),
    (r"^5\.5(\.\d+)*$", ApiRevision::R5_5),
    (r"^6\.0(\.\d+)*$", ApiRevision::R6_0),
];

/// Ordered `Matcher -> ApiRevision` table. Built once, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct MatcherRegistry {
    entries: Vec<(Matcher, ApiRevision)>,
}

impl MatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, matcher: Matcher, revision: ApiRevision) -> Self {
        self.entries.push((matcher, revision));
        self
    }

    /// The table covering every known revision from 2.0 to 6.0.
    pub fn standard() -> Self {
        STANDARD_PATTERNS.iter().fold(
            Self::new().with(Matcher::exact("2.0"), ApiRevision::R2_0),
            |registry, (pattern, revision)| match Matcher::pattern(pattern) {
                Ok(matcher) => registry.with(matcher, *revision),
                Err(_) => registry,
            },
        )
    }

    pub fn resolve(&self, version: &str) -> Option<ApiRevision> {
        self.entries
            .iter()
            .find(|(matcher, _)| matcher.matches(version))
            .map(|(_, revision)| *revision)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct VersionClassifier {
    matchers: MatcherRegistry,
}

impl VersionClassifier {
    pub fn new(matchers: MatcherRegistry) -> Self {
        Self { matchers }
    }

    /// Resolves a peer description without touching the network.
    pub fn resolve(&self, peer: &PeerDescription) -> Result<CapabilityModule, Fault> {
        let version = peer.version.trim();
        let revision = self
            .matchers
            .resolve(version)
            .ok_or_else(|| Fault::UnknownVersion {
                version: version.to_string(),
                peer_type: peer.peer_type.clone(),
            })?;

        Ok(CapabilityModule::new(
            revision,
            PeerKind::from_type_string(peer.peer_type.trim()),
        ))
    }

    /// Probes the context's open session once and stores what it reported.
    ///
    /// The session is left open whatever the outcome.
    pub async fn classify(&self, ctx: &mut ConnectionContext) -> Result<CapabilityModule, Fault> {
        let session = ctx
            .session_mut()
            .ok_or_else(|| Fault::Other("classification requires an open session".into()))?;

        let peer = session.describe_self().await?;
        debug!(version = %peer.version, peer_type = %peer.peer_type, "peer described itself");
        ctx.set_peer(peer.clone());

        self.resolve(&peer)
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
