//! # Accord Common
//!
//! Shared vocabulary of the negotiation workspace: value types, the failure
//! taxonomy, plain configuration, and the traits every collaborator implements.
//!
//! * **[`network`]**: addresses, endpoints and target parsing.
//! * **[`credentials`]**, **[`session`]**, **[`discovery`]**: the ports the engine talks through.
//! * **[`attempt`]**: a single trial and the context it accumulates.
//! * **[`error`]**: faults, error kinds and append-only records.

pub mod attempt;
pub mod capability;
pub mod config;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod network;
pub mod session;
