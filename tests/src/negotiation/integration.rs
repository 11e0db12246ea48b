use std::sync::{Arc, Mutex};
use std::time::Duration;

use accord_common::attempt::ConnectionContext;
use accord_common::capability::{ApiRevision, PeerKind};
use accord_common::config::Config;
use accord_common::discovery::{DiscoveredItem, DiscoveryCallback, OutputSink, ResultBatch};
use accord_common::error::{ErrorKind, Fault};
use accord_common::network::address::Address;
use accord_core::credentials::StaticCredentialStore;
use accord_core::engine::{EngineConfig, NegotiationEngine, NegotiationResult, Outcome};
use accord_core::network::tcp::TcpBackend;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::fake_peer::{FakePeer, PeerBehavior};

struct InventoryProbe;

#[async_trait]
impl DiscoveryCallback for InventoryProbe {
    async fn discover(&self, ctx: &mut ConnectionContext) -> Result<ResultBatch, Fault> {
        let mut batch = ResultBatch::new(ctx.attempt().clone());
        let session = ctx
            .session_mut()
            .ok_or_else(|| Fault::Other("no session".into()))?;
        let inventory = session.call("inventory").await?;
        batch.push(DiscoveredItem::new("inventory").with("raw", inventory));
        Ok(batch)
    }
}

#[derive(Default)]
struct CollectingSink {
    batches: Mutex<Vec<ResultBatch>>,
}

#[async_trait]
impl OutputSink for CollectingSink {
    async fn send(&self, batch: ResultBatch) -> Result<(), Fault> {
        self.batches.lock().unwrap().push(batch);
        Ok(())
    }

    async fn flush(&self) -> Result<(), Fault> {
        Ok(())
    }
}

/// Credentials file where every entry points at the peer's port.
fn credentials(port: u16, entries: &[(&str, &str, &str)]) -> StaticCredentialStore {
    let raw: String = entries
        .iter()
        .map(|(id, username, password)| {
            format!(
                "[[credential]]\nid = \"{id}\"\nprotocol = \"vim\"\nusername = \"{username}\"\npassword = \"{password}\"\nscheme = \"https\"\nport = {port}\n\n"
            )
        })
        .collect();
    StaticCredentialStore::from_toml_str(&raw).unwrap()
}

async fn negotiate(
    store: StaticCredentialStore,
    settings: Config,
    addresses: &[&str],
) -> (NegotiationResult, Arc<CollectingSink>) {
    let store = Arc::new(store);
    let backend = Arc::new(TcpBackend::new(store.clone()).with_connect_timeout(Duration::from_secs(2)));
    let sink = Arc::new(CollectingSink::default());
    let engine = NegotiationEngine::new(EngineConfig::new(settings), store, backend, sink.clone());

    let addresses: Vec<Address> = addresses.iter().map(|a| Address::from(*a)).collect();
    let result = engine
        .run(&addresses, &InventoryProbe, &CancellationToken::new())
        .await
        .unwrap();
    (result, sink)
}

fn quick() -> Config {
    Config {
        per_attempt_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

#[tokio::test]
async fn wrong_password_then_valid_login() {
    let peer = FakePeer::start(PeerBehavior::host("5.5.0").account("root", "vmware")).await;
    let store = credentials(
        peer.addr.port(),
        &[("stale", "root", "old-password"), ("current", "root", "vmware")],
    );

    let (result, sink) = negotiate(store, quick(), &["127.0.0.1"]).await;

    assert_eq!(result.attempted.len(), 2);
    assert_eq!(result.success_count(), 1);
    assert_eq!(result.outcome(), Outcome::Connected);

    let errors: Vec<ErrorKind> = result.errors().map(|r| r.kind).collect();
    assert_eq!(errors, vec![ErrorKind::AuthenticationFailed]);

    let ctx = result.successes()[0];
    assert_eq!(ctx.attempt().credential.as_str(), "current");
    let module = ctx.capability().unwrap();
    assert_eq!(module.revision, ApiRevision::R5_5);
    assert_eq!(module.peer, PeerKind::Host);

    let batches = sink.batches.lock().unwrap().clone();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].items[0].attributes["raw"], "vms=3 datastores=1");
    assert_eq!(peer.wait_for("LOGOUT", 1).await, 1);
}

#[tokio::test]
async fn old_peer_is_reached_through_the_fallback_version() {
    let peer = FakePeer::start(
        PeerBehavior::host("2.0")
            .accepting_only("urn:vim2")
            .account("root", "vmware"),
    )
    .await;
    let store = credentials(peer.addr.port(), &[("lab", "root", "vmware")]);

    let (result, _) = negotiate(store, quick(), &["127.0.0.1"]).await;

    assert_eq!(result.success_count(), 1);
    assert_eq!(result.records.len(), 0);
    let logins: Vec<String> = peer
        .transcript()
        .into_iter()
        .filter(|line| line.starts_with("LOGIN"))
        .collect();
    assert_eq!(
        logins,
        vec!["LOGIN urn:vim25 root vmware", "LOGIN urn:vim2 root vmware"]
    );
    assert_eq!(
        result.successes()[0].capability().unwrap().revision,
        ApiRevision::R2_0
    );
}

#[tokio::test]
async fn missing_privilege_is_reported_for_the_operator() {
    let peer = FakePeer::start(
        PeerBehavior::host("6.0")
            .manager()
            .unprivileged("auditor", "secret", "System.View"),
    )
    .await;
    let store = credentials(peer.addr.port(), &[("audit", "auditor", "secret")]);

    let (result, _) = negotiate(store, quick(), &["127.0.0.1"]).await;

    assert_eq!(result.success_count(), 0);
    assert_eq!(
        result.outcome(),
        Outcome::AuthorizationDenied {
            privileges: vec!["System.View".to_string()]
        }
    );
}

#[tokio::test]
async fn unknown_version_is_closed_and_recorded() {
    let peer = FakePeer::start(PeerBehavior::host("7.0.3").account("root", "vmware")).await;
    let store = credentials(peer.addr.port(), &[("lab", "root", "vmware")]);

    let (result, sink) = negotiate(store, quick(), &["127.0.0.1"]).await;

    assert_eq!(result.success_count(), 0);
    let errors: Vec<ErrorKind> = result.errors().map(|r| r.kind).collect();
    assert_eq!(errors, vec![ErrorKind::UnknownVersion]);
    assert!(sink.batches.lock().unwrap().is_empty());
    assert_eq!(peer.wait_for("LOGOUT", 1).await, 1);
    assert_eq!(peer.count("CALL"), 0);
}

#[tokio::test]
async fn refused_connection_is_a_transport_failure() {
    let closed_port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let store = credentials(closed_port, &[("lab", "root", "vmware")]);

    let (result, _) = negotiate(store, quick(), &["127.0.0.1"]).await;

    let errors: Vec<ErrorKind> = result.errors().map(|r| r.kind).collect();
    assert_eq!(errors, vec![ErrorKind::TransportFailure]);
    assert_eq!(result.outcome(), Outcome::Failed);
}

#[tokio::test]
async fn exhaustive_mode_tries_every_credential() {
    let peer = FakePeer::start(
        PeerBehavior::host("5.1")
            .account("root", "vmware")
            .account("backup", "hunter2"),
    )
    .await;
    let store = credentials(
        peer.addr.port(),
        &[("primary", "root", "vmware"), ("secondary", "backup", "hunter2")],
    );
    let settings = Config {
        stop_on_first_success: false,
        ..quick()
    };

    let (result, sink) = negotiate(store, settings, &["127.0.0.1"]).await;

    assert_eq!(result.success_count(), 2);
    assert_eq!(sink.batches.lock().unwrap().len(), 2);
    assert_eq!(peer.wait_for("LOGOUT", 2).await, 2);
}

#[tokio::test]
async fn unknown_explicit_credential_is_reported_as_missing() {
    let peer = FakePeer::start(PeerBehavior::host("5.5.0").account("root", "vmware")).await;
    let store = credentials(peer.addr.port(), &[("lab", "root", "vmware")]);
    let settings = Config {
        explicit_credential: Some("ghost".into()),
        ..quick()
    };

    let (result, _) = negotiate(store, settings, &["127.0.0.1"]).await;

    assert!(result.attempted.is_empty());
    assert_eq!(result.errors().count(), 0);
    let warnings: Vec<ErrorKind> = result.warnings().map(|r| r.kind).collect();
    assert_eq!(warnings, vec![ErrorKind::NoCredentials]);
    assert_eq!(result.outcome(), Outcome::NothingToTry);
    assert_eq!(peer.count("LOGIN"), 0);
}
