use std::fmt;

use crate::error::Fault;
use crate::network::address::Address;

/// Identifies a stored credential. Never carries secret material.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CredentialRef(String);

impl CredentialRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CredentialRef {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Well-known property keys a credential may carry.
pub mod keys {
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const SCHEME: &str = "scheme";
    pub const PORT: &str = "port";
}

/// Defines the contract for looking up connection credentials.
pub trait CredentialStore: Send + Sync {
    /// Lists, in preference order, the credentials usable against `address` for `protocol_tag`.
    fn list_credentials(&self, address: &Address, protocol_tag: &str) -> Result<Vec<CredentialRef>, Fault>;

    /// Reads a single property of a credential, `None` if it is not set.
    fn credential_property(&self, credential: &CredentialRef, key: &str) -> Option<String>;
}
