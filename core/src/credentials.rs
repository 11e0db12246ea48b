//! A credential store backed by a TOML file.
//!
//! ```toml
//! [[credential]]
//! id = "lab-root"
//! protocol = "vim"
//! username = "root"
//! password = "secret"
//! scheme = "https"          # optional
//! port = 443                # optional
//! addresses = ["10.0.0.1"]  # optional, empty means every address
//! ```

use std::collections::HashSet;
use std::path::Path;

use accord_common::credentials::{CredentialRef, CredentialStore, keys};
use accord_common::error::Fault;
use accord_common::network::address::Address;
use anyhow::{Context, bail};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct StoredCredential {
    pub id: String,
    pub protocol: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub addresses: Vec<String>,
}

impl StoredCredential {
    fn applies_to(&self, address: &Address, protocol_tag: &str) -> bool {
        self.protocol.eq_ignore_ascii_case(protocol_tag)
            && (self.addresses.is_empty() || self.addresses.iter().any(|a| a == address.as_str()))
    }
}

#[derive(Debug, Deserialize)]
struct CredentialFile {
    #[serde(default, rename = "credential")]
    credentials: Vec<StoredCredential>,
}

/// Read-only credentials, listed in file order.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    credentials: Vec<StoredCredential>,
}

impl StaticCredentialStore {
    pub fn new(credentials: Vec<StoredCredential>) -> anyhow::Result<Self> {
        let mut ids = HashSet::new();
        for credential in &credentials {
            if !ids.insert(credential.id.as_str()) {
                bail!("duplicate credential id '{}'", credential.id);
            }
        }
        Ok(Self { credentials })
    }

    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let file: CredentialFile = toml::from_str(raw).context("invalid credential file")?;
        Self::new(file.credentials)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read credentials from {}", path.display()))?;
        let store = Self::from_toml_str(&raw)?;
        debug!(count = store.len(), "loaded credentials from {}", path.display());
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    fn find(&self, credential: &CredentialRef) -> Option<&StoredCredential> {
        self.credentials.iter().find(|c| c.id == credential.as_str())
    }
}

impl CredentialStore for StaticCredentialStore {
    fn list_credentials(&self, address: &Address, protocol_tag: &str) -> Result<Vec<CredentialRef>, Fault> {
        Ok(self
            .credentials
            .iter()
            .filter(|c| c.applies_to(address, protocol_tag))
            .map(|c| CredentialRef::new(c.id.clone()))
            .collect())
    }

    fn credential_property(&self, credential: &CredentialRef, key: &str) -> Option<String> {
        let stored = self.find(credential)?;
        match key {
            keys::USERNAME => Some(stored.username.clone()),
            keys::PASSWORD => Some(stored.password.clone()),
            keys::SCHEME => stored.scheme.clone(),
            keys::PORT => stored.port.map(|p| p.to_string()),
            _ => None,
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
