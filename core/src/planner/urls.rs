//! Strategies that turn an (address, credential) pair into endpoint variants.
//!
//! Generators must be deterministic: the same address, credential and store
//! contents always yield the same endpoints in the same order.

use accord_common::credentials::{CredentialRef, CredentialStore, keys};
use accord_common::network::address::{Address, Endpoint};
use tracing::debug;

pub const DEFAULT_PATH: &str = "sdk";

pub trait UrlGenerator: Send + Sync {
    fn generate(
        &self,
        address: &Address,
        credential: &CredentialRef,
        store: &dyn CredentialStore,
    ) -> Vec<Endpoint>;
}

fn default_port(scheme: &str) -> u16 {
    match scheme {
        "http" => 80,
        _ => 443,
    }
}

/// Builds one endpoint from the credential's `protocol` and `port` properties.
#[derive(Debug, Clone)]
pub struct CredentialUrlGenerator {
    path: String,
}

impl CredentialUrlGenerator {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for CredentialUrlGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_PATH)
    }
}

impl UrlGenerator for CredentialUrlGenerator {
    fn generate(
        &self,
        address: &Address,
        credential: &CredentialRef,
        store: &dyn CredentialStore,
    ) -> Vec<Endpoint> {
        let scheme = store
            .credential_property(credential, keys::SCHEME)
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_else(|| "https".to_string());

        let port = match store.credential_property(credential, keys::PORT) {
            Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
                debug!(%credential, "ignoring unparsable port '{raw}'");
                default_port(&scheme)
            }),
            None => default_port(&scheme),
        };

        vec![Endpoint::new(scheme, address.clone(), port, self.path.clone())]
    }
}

/// Emits the same scheme/port list for every pair, e.g. https:443 then http:80.
#[derive(Debug, Clone)]
pub struct FixedUrlGenerator {
    variants: Vec<(String, u16)>,
    path: String,
}

impl FixedUrlGenerator {
    pub fn new(variants: Vec<(String, u16)>, path: impl Into<String>) -> Self {
        Self {
            variants,
            path: path.into(),
        }
    }

    pub fn web_defaults() -> Self {
        Self::new(
            vec![("https".to_string(), 443), ("http".to_string(), 80)],
            DEFAULT_PATH,
        )
    }
}

impl UrlGenerator for FixedUrlGenerator {
    fn generate(
        &self,
        address: &Address,
        _credential: &CredentialRef,
        _store: &dyn CredentialStore,
    ) -> Vec<Endpoint> {
        self.variants
            .iter()
            .map(|(scheme, port)| Endpoint::new(scheme.clone(), address.clone(), *port, self.path.clone()))
            .collect()
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
