use std::time::Duration;

use crate::credentials::CredentialRef;
use crate::session::ProtocolVersion;

pub const DEFAULT_PROTOCOL_TAG: &str = "vim";
pub const DEFAULT_PREFERRED_VERSION: &str = "urn:vim25";
pub const DEFAULT_FALLBACK_VERSION: &str = "urn:vim2";
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct Config {
    /// Stops enumerating once one attempt has been dispatched successfully.
    pub stop_on_first_success: bool,
    /// Uses this credential for every address instead of asking the credential store.
    pub explicit_credential: Option<CredentialRef>,
    /// Protocol tag the credential store filters by.
    pub protocol_tag: String,
    /// Deadline applied to each connect, classify, dispatch and close call.
    pub per_attempt_timeout: Duration,
    pub preferred_version: ProtocolVersion,
    /// Tried once, only when the preferred version is refused with a recognized signature.
    pub fallback_version: ProtocolVersion,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stop_on_first_success: true,
            explicit_credential: None,
            protocol_tag: DEFAULT_PROTOCOL_TAG.to_string(),
            per_attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            preferred_version: ProtocolVersion::new(DEFAULT_PREFERRED_VERSION),
            fallback_version: ProtocolVersion::new(DEFAULT_FALLBACK_VERSION),
        }
    }
}
