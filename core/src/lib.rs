//! # Accord Core
//!
//! The negotiation engine and the components it drives.
//!
//! * **[`planner`]**: expands addresses and credentials into ordered attempts.
//! * **[`client`]**: opens sessions with a single version fallback.
//! * **[`classifier`]**: maps what a peer reports to a capability module.
//! * **[`errors`]**: the error taxonomy and the run's record list.
//! * **[`engine`]**: walks every attempt through its lifecycle.
//!
//! [`credentials`] and [`network`] hold the concrete file store and TCP backend.

pub mod classifier;
pub mod client;
pub mod credentials;
pub mod engine;
pub mod errors;
pub mod network;
pub mod planner;

#[cfg(test)]
pub(crate) mod testing;
