//! The CLI's discovery routine and result sink.

use std::sync::Mutex;

use accord_common::attempt::ConnectionContext;
use accord_common::discovery::{DiscoveredItem, DiscoveryCallback, OutputSink, ResultBatch};
use accord_common::error::Fault;
use async_trait::async_trait;
use tracing::{debug, info};

/// Asks the peer for its inventory; managers are also asked for their hosts.
pub struct InventoryCallback;

#[async_trait]
impl DiscoveryCallback for InventoryCallback {
    async fn discover(&self, ctx: &mut ConnectionContext) -> Result<ResultBatch, Fault> {
        let module = ctx
            .capability()
            .cloned()
            .ok_or_else(|| Fault::Other("peer was not classified".into()))?;
        let version = ctx.version().unwrap_or_default().to_string();
        let peer_type = ctx.peer_type().unwrap_or_default().to_string();
        let mut batch = ResultBatch::new(ctx.attempt().clone());

        let session = ctx
            .session_mut()
            .ok_or_else(|| Fault::Other("no open session".into()))?;
        let summary = session.call("inventory").await?;
        let hosts = if module.manages_inventory() {
            Some(session.call("hosts").await?)
        } else {
            None
        };

        batch.push(
            DiscoveredItem::new("peer")
                .with("module", module.to_string())
                .with("version", version)
                .with("type", peer_type)
                .with("summary", summary),
        );
        for host in hosts.iter().flat_map(|h| h.split(',')).map(str::trim).filter(|h| !h.is_empty()) {
            batch.push(DiscoveredItem::new("managed-host").with("name", host));
        }

        if !module.supports_extended_queries() {
            ctx.warn(format!("{module} predates extended queries, inventory is partial"));
        }
        Ok(batch)
    }
}

/// Collects batches for the final report.
#[derive(Default)]
pub struct TerminalSink {
    batches: Mutex<Vec<ResultBatch>>,
}

impl TerminalSink {
    pub fn take(&self) -> Vec<ResultBatch> {
        std::mem::take(&mut *self.batches.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn len(&self) -> usize {
        self.batches.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl OutputSink for TerminalSink {
    async fn send(&self, batch: ResultBatch) -> Result<(), Fault> {
        info!("{} item(s) from {}", batch.len(), batch.source.endpoint);
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(batch);
        Ok(())
    }

    async fn flush(&self) -> Result<(), Fault> {
        debug!(batches = self.len(), "sink flushed");
        Ok(())
    }
}
