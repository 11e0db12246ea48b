//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use accord_common::attempt::{ConnectionAttempt, ConnectionContext};
use accord_common::credentials::{CredentialRef, CredentialStore};
use accord_common::discovery::{DiscoveredItem, DiscoveryCallback, OutputSink, ResultBatch};
use accord_common::error::Fault;
use accord_common::network::address::{Address, Endpoint};
use accord_common::session::{ClientBackend, PeerDescription, ProtocolVersion, Session};
use async_trait::async_trait;

pub fn attempt(address: &str, credential: &str) -> ConnectionAttempt {
    let address = Address::from(address);
    ConnectionAttempt::new(
        address.clone(),
        CredentialRef::from(credential),
        Endpoint::new("https", address, 443, "sdk"),
    )
}

fn label(attempt: &ConnectionAttempt) -> String {
    format!("{}|{}", attempt.credential, attempt.endpoint)
}

#[derive(Default)]
pub struct MapCredentialStore {
    by_address: BTreeMap<String, Vec<CredentialRef>>,
    properties: HashMap<(String, String), String>,
    failing: HashSet<String>,
}

impl MapCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(mut self, address: &str, credential: &str) -> Self {
        self.by_address
            .entry(address.to_string())
            .or_default()
            .push(CredentialRef::from(credential));
        self
    }

    pub fn with_property(mut self, credential: &str, key: &str, value: &str) -> Self {
        self.properties
            .insert((credential.to_string(), key.to_string()), value.to_string());
        self
    }

    pub fn failing_for(mut self, address: &str) -> Self {
        self.failing.insert(address.to_string());
        self
    }
}

impl CredentialStore for MapCredentialStore {
    fn list_credentials(&self, address: &Address, _protocol_tag: &str) -> Result<Vec<CredentialRef>, Fault> {
        if self.failing.contains(address.as_str()) {
            return Err(Fault::Transport("credential store offline".into()));
        }
        Ok(self
            .by_address
            .get(address.as_str())
            .cloned()
            .unwrap_or_default())
    }

    fn credential_property(&self, credential: &CredentialRef, key: &str) -> Option<String> {
        self.properties
            .get(&(credential.as_str().to_string(), key.to_string()))
            .cloned()
    }
}

/// Shared view of what happened to every scripted session.
#[derive(Clone, Default)]
pub struct SessionProbe {
    opened: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<Vec<String>>>,
}

impl SessionProbe {
    fn note_open(&self, label: String) {
        self.opened.lock().unwrap().push(label);
    }

    fn note_close(&self, label: String) {
        self.closed.lock().unwrap().push(label);
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closed.lock().unwrap().len()
    }
}

/// How the backend behaves for one credential.
#[derive(Clone)]
pub struct OpenScript {
    open_fault: Option<Fault>,
    fault_on_version: Option<(String, Fault)>,
    delay: Option<Duration>,
    peer: PeerDescription,
    describe_fault: Option<Fault>,
    close_fault: Option<Fault>,
}

impl OpenScript {
    pub fn ok() -> Self {
        Self {
            open_fault: None,
            fault_on_version: None,
            delay: None,
            peer: PeerDescription::new("6.0", "HostAgent"),
            describe_fault: None,
            close_fault: None,
        }
    }

    pub fn failing(fault: Fault) -> Self {
        Self {
            open_fault: Some(fault),
            ..Self::ok()
        }
    }

    pub fn failing_on(version: &str, fault: Fault) -> Self {
        Self {
            fault_on_version: Some((version.to_string(), fault)),
            ..Self::ok()
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn reporting(mut self, version: &str, peer_type: &str) -> Self {
        self.peer = PeerDescription::new(version, peer_type);
        self
    }

    pub fn describe_failing(mut self, fault: Fault) -> Self {
        self.describe_fault = Some(fault);
        self
    }

    pub fn close_failing(mut self, fault: Fault) -> Self {
        self.close_fault = Some(fault);
        self
    }
}

#[derive(Default)]
pub struct ScriptedBackend {
    scripts: HashMap<String, OpenScript>,
    opened_versions: Mutex<Vec<String>>,
    attempts: Mutex<Vec<ConnectionAttempt>>,
    probe: SessionProbe,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, credential: &str, script: OpenScript) -> Self {
        self.scripts.insert(credential.to_string(), script);
        self
    }

    pub fn opened_versions(&self) -> Vec<String> {
        self.opened_versions.lock().unwrap().clone()
    }

    /// Every attempt the backend was asked to open, fallbacks included.
    pub fn attempts(&self) -> Vec<ConnectionAttempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn probe(&self) -> SessionProbe {
        self.probe.clone()
    }
}

#[async_trait]
impl ClientBackend for ScriptedBackend {
    async fn open(
        &self,
        attempt: &ConnectionAttempt,
        version: &ProtocolVersion,
    ) -> Result<Box<dyn Session>, Fault> {
        self.opened_versions
            .lock()
            .unwrap()
            .push(version.as_str().to_string());
        self.attempts.lock().unwrap().push(attempt.clone());

        let script = self
            .scripts
            .get(attempt.credential.as_str())
            .cloned()
            .ok_or_else(|| Fault::Authentication(format!("unknown credential {}", attempt.credential)))?;

        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(fault) = script.open_fault.clone() {
            return Err(fault);
        }
        if let Some((failing_version, fault)) = &script.fault_on_version {
            if failing_version == version.as_str() {
                return Err(fault.clone());
            }
        }

        let session = ScriptedSession::new(attempt, version.clone(), script, self.probe.clone());
        Ok(Box::new(session))
    }
}

pub struct ScriptedSession {
    label: String,
    endpoint: Endpoint,
    version: ProtocolVersion,
    script: OpenScript,
    probe: SessionProbe,
}

impl ScriptedSession {
    fn new(attempt: &ConnectionAttempt, version: ProtocolVersion, script: OpenScript, probe: SessionProbe) -> Self {
        let label = label(attempt);
        probe.note_open(label.clone());
        Self {
            label,
            endpoint: attempt.endpoint.clone(),
            version,
            script,
            probe,
        }
    }

    /// A standalone open session reporting the given version and type.
    pub fn reporting(version: &str, peer_type: &str) -> (Self, SessionProbe) {
        let probe = SessionProbe::default();
        let session = Self::new(
            &attempt("10.0.0.1", "standalone"),
            ProtocolVersion::new("urn:vim25"),
            OpenScript::ok().reporting(version, peer_type),
            probe.clone(),
        );
        (session, probe)
    }
}

#[async_trait]
impl Session for ScriptedSession {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn protocol_version(&self) -> &ProtocolVersion {
        &self.version
    }

    async fn describe_self(&mut self) -> Result<PeerDescription, Fault> {
        match &self.script.describe_fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(self.script.peer.clone()),
        }
    }

    async fn call(&mut self, method: &str) -> Result<String, Fault> {
        Ok(format!("{method}@{}", self.endpoint))
    }

    async fn close(&mut self) -> Result<(), Fault> {
        self.probe.note_close(self.label.clone());
        match &self.script.close_fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<ResultBatch>>,
    flushes: AtomicUsize,
    failing: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<ResultBatch> {
        self.batches.lock().unwrap().clone()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutputSink for RecordingSink {
    async fn send(&self, batch: ResultBatch) -> Result<(), Fault> {
        if self.failing {
            return Err(Fault::Other("sink rejected batch".into()));
        }
        self.batches.lock().unwrap().push(batch);
        Ok(())
    }

    async fn flush(&self) -> Result<(), Fault> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records every invocation; fails for the listed credentials.
#[derive(Default)]
pub struct ScriptedCallback {
    invocations: Mutex<Vec<ConnectionAttempt>>,
    failing_for: HashSet<String>,
    warn_with: Option<String>,
}

impl ScriptedCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, credential: &str) -> Self {
        self.failing_for.insert(credential.to_string());
        self
    }

    pub fn warning(mut self, message: &str) -> Self {
        self.warn_with = Some(message.to_string());
        self
    }

    pub fn invocations(&self) -> Vec<ConnectionAttempt> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiscoveryCallback for ScriptedCallback {
    async fn discover(&self, ctx: &mut ConnectionContext) -> Result<ResultBatch, Fault> {
        let attempt = ctx.attempt().clone();
        self.invocations.lock().unwrap().push(attempt.clone());

        if let Some(message) = &self.warn_with {
            ctx.warn(message.clone());
        }
        if self.failing_for.contains(attempt.credential.as_str()) {
            return Err(Fault::Other("discovery routine failed".into()));
        }

        let summary = match ctx.session_mut() {
            Some(session) => session.call("summary").await?,
            None => return Err(Fault::Other("no session".into())),
        };
        let module = ctx
            .capability()
            .map(ToString::to_string)
            .unwrap_or_default();

        let mut batch = ResultBatch::new(attempt);
        batch.push(DiscoveredItem::new("peer").with("module", module).with("summary", summary));
        Ok(batch)
    }
}
