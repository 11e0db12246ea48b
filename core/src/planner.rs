//! # Attempt Planning
//!
//! Expands addresses × credentials × URL generators into the ordered attempt
//! space a run walks through. Planning performs no I/O beyond credential lookups,
//! so the same inputs always produce the same plan.

use std::collections::HashSet;
use std::sync::Arc;

use accord_common::attempt::ConnectionAttempt;
use accord_common::credentials::{keys, CredentialRef, CredentialStore};
use accord_common::error::{ErrorKind, ErrorRecord, Origin, Severity};
use accord_common::network::address::{Address, Endpoint};
use tracing::debug;

use crate::errors::EngineError;

pub mod urls;

use urls::UrlGenerator;

/// Where the credentials for each address come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// One credential used against every address.
    Explicit(CredentialRef),
    /// Asks the credential store per address, filtered by protocol tag.
    Store { protocol_tag: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPlan {
    pub credential: CredentialRef,
    /// De-duplicated, first-seen order.
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPlan {
    pub address: Address,
    pub credentials: Vec<CredentialPlan>,
}

impl AddressPlan {
    pub fn attempt_count(&self) -> usize {
        self.credentials.iter().map(|c| c.endpoints.len()).sum()
    }
}

/// The full ordered attempt space plus any warnings raised while building it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptPlan {
    pub addresses: Vec<AddressPlan>,
    pub warnings: Vec<ErrorRecord>,
}

impl AttemptPlan {
    /// Attempts in execution order: address, then credential, then endpoint.
    pub fn attempts(&self) -> impl Iterator<Item = ConnectionAttempt> + '_ {
        self.addresses.iter().flat_map(|address_plan| {
            address_plan.credentials.iter().flat_map(move |credential_plan| {
                credential_plan.endpoints.iter().map(move |endpoint| {
                    ConnectionAttempt::new(
                        address_plan.address.clone(),
                        credential_plan.credential.clone(),
                        endpoint.clone(),
                    )
                })
            })
        })
    }

    pub fn len(&self) -> usize {
        self.addresses.iter().map(AddressPlan::attempt_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct AttemptPlanner {
    store: Arc<dyn CredentialStore>,
    generators: Vec<Arc<dyn UrlGenerator>>,
}

impl AttemptPlanner {
    pub fn new(store: Arc<dyn CredentialStore>, generators: Vec<Arc<dyn UrlGenerator>>) -> Self {
        Self { store, generators }
    }

    pub fn plan(&self, addresses: &[Address], source: &CredentialSource) -> Result<AttemptPlan, EngineError> {
        if addresses.is_empty() {
            return Err(EngineError::EmptyAttemptSpace);
        }
        if self.generators.is_empty() {
            return Err(EngineError::NoUrlGenerators);
        }

        let mut plan = AttemptPlan::default();
        let mut seen_addresses = HashSet::new();

        for address in addresses {
            if !seen_addresses.insert(address) {
                continue;
            }

            let credentials = match self.resolve_credentials(address, source) {
                Ok(credentials) if !credentials.is_empty() => credentials,
                Ok(_) => {
                    plan.warnings.push(no_credentials(address, "no credentials available".into()));
                    continue;
                }
                Err(message) => {
                    plan.warnings.push(no_credentials(address, message));
                    continue;
                }
            };

            let mut address_plan = AddressPlan {
                address: address.clone(),
                credentials: Vec::with_capacity(credentials.len()),
            };

            for credential in credentials {
                let endpoints = self.endpoints_for(address, &credential);
                if endpoints.is_empty() {
                    plan.warnings.push(
                        ErrorRecord::new(
                            ErrorKind::Unclassified,
                            format!("no endpoint variants generated for credential {credential}"),
                            Origin::Address(address.clone()),
                        )
                        .with_severity(Severity::Warning),
                    );
                    continue;
                }
                address_plan.credentials.push(CredentialPlan { credential, endpoints });
            }

            debug!(%address, attempts = address_plan.attempt_count(), "address planned");
            plan.addresses.push(address_plan);
        }

        Ok(plan)
    }

    fn resolve_credentials(
        &self,
        address: &Address,
        source: &CredentialSource,
    ) -> Result<Vec<CredentialRef>, String> {
        match source {
            CredentialSource::Explicit(credential) => {
                if self.store.credential_property(credential, keys::USERNAME).is_none() {
                    return Err(format!("credential {credential} is not in the store"));
                }
                Ok(vec![credential.clone()])
            }
            CredentialSource::Store { protocol_tag } => {
                let listed = self
                    .store
                    .list_credentials(address, protocol_tag)
                    .map_err(|fault| format!("credential lookup failed: {fault}"))?;

                let mut seen = HashSet::new();
                Ok(listed.into_iter().filter(|c| seen.insert(c.clone())).collect())
            }
        }
    }

    fn endpoints_for(&self, address: &Address, credential: &CredentialRef) -> Vec<Endpoint> {
        let mut seen = HashSet::new();
        self.generators
            .iter()
            .flat_map(|generator| generator.generate(address, credential, self.store.as_ref()))
            .filter(|endpoint| seen.insert(endpoint.clone()))
            .collect()
    }
}

fn no_credentials(address: &Address, message: String) -> ErrorRecord {
    ErrorRecord::new(ErrorKind::NoCredentials, message, Origin::Address(address.clone()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
