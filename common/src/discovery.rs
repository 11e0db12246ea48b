//! # Discovery Ports
//!
//! What the engine hands a successful session to, and where the results go.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::attempt::{ConnectionAttempt, ConnectionContext};
use crate::error::Fault;

/// One discovered entity, as flat attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredItem {
    pub kind: String,
    pub attributes: BTreeMap<String, String>,
}

impl DiscoveredItem {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Everything one discovery run produced for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultBatch {
    pub source: ConnectionAttempt,
    pub items: Vec<DiscoveredItem>,
}

impl ResultBatch {
    pub fn new(source: ConnectionAttempt) -> Self {
        Self {
            source,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, item: DiscoveredItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Version-specific discovery logic, run once per classified session.
#[async_trait]
pub trait DiscoveryCallback: Send + Sync {
    async fn discover(&self, ctx: &mut ConnectionContext) -> Result<ResultBatch, Fault>;
}

/// Receives result batches.
///
/// Implementations must be safe to call from several tasks; the engine never
/// calls `send` concurrently but does not promise to stay on one thread.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn send(&self, batch: ResultBatch) -> Result<(), Fault>;

    async fn flush(&self) -> Result<(), Fault>;
}
