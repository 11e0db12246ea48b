//! # Negotiation Engine
//!
//! Drives every planned attempt through
//! `Attempting → Connected → Classified → Dispatched → Closed`, diverting to
//! `Failed → Recorded` (and then `Closed` if a session was open) whenever a stage
//! fails. Remote-side failures never abort the run; they are classified,
//! recorded, and enumeration moves on.
//!
//! Attempts run strictly one after another, so "first success" is deterministic
//! and a session is never shared between tasks.

use std::future::Future;
use std::sync::Arc;

use accord_common::attempt::{AttemptStage, ConnectionAttempt, ConnectionContext};
use accord_common::config::Config;
use accord_common::credentials::CredentialStore;
use accord_common::discovery::{DiscoveryCallback, OutputSink};
use accord_common::error::{ErrorKind, ErrorRecord, Fault, Origin, Severity};
use accord_common::network::address::Address;
use accord_common::session::ClientBackend;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};

use crate::classifier::{MatcherRegistry, VersionClassifier};
use crate::client::ClientFactory;
use crate::errors::{EngineError, ErrorClassifier};
use crate::planner::urls::{CredentialUrlGenerator, UrlGenerator};
use crate::planner::{AttemptPlan, AttemptPlanner, CredentialSource};

/// Everything the engine needs besides its collaborators. Built once per engine.
#[derive(Clone)]
pub struct EngineConfig {
    pub settings: Config,
    pub url_generators: Vec<Arc<dyn UrlGenerator>>,
    pub version_matchers: MatcherRegistry,
}

impl EngineConfig {
    pub fn new(settings: Config) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn credential_source(&self) -> CredentialSource {
        match &self.settings.explicit_credential {
            Some(credential) => CredentialSource::Explicit(credential.clone()),
            None => CredentialSource::Store {
                protocol_tag: self.settings.protocol_tag.clone(),
            },
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settings: Config::default(),
            url_generators: vec![Arc::new(CredentialUrlGenerator::default())],
            version_matchers: MatcherRegistry::standard(),
        }
    }
}

#[derive(Debug)]
pub enum Resolution {
    /// Early-stop mode: the attempt that succeeded, if any did.
    FirstSuccess(Option<ConnectionContext>),
    /// Exhaustive mode: every attempt that was started, in order.
    Exhaustive(Vec<ConnectionContext>),
}

/// What an operator should do next when nothing connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Connected,
    /// The run was cancelled before anything connected.
    Cancelled,
    /// No attempt could even be planned (only missing credentials).
    NothingToTry,
    AuthenticationFailed,
    /// Some credential authenticated but lacked privileges.
    AuthorizationDenied { privileges: Vec<String> },
    Failed,
}

#[derive(Debug)]
pub struct NegotiationResult {
    /// Every error and warning of the run, in the order they were recorded.
    pub records: Vec<ErrorRecord>,
    /// Every attempt that was started, in order.
    pub attempted: Vec<ConnectionAttempt>,
    pub resolution: Resolution,
    pub cancelled: bool,
}

impl NegotiationResult {
    pub fn errors(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter().filter(|r| r.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter().filter(|r| r.severity == Severity::Warning)
    }

    pub fn contexts(&self) -> Vec<&ConnectionContext> {
        match &self.resolution {
            Resolution::FirstSuccess(ctx) => ctx.iter().collect(),
            Resolution::Exhaustive(contexts) => contexts.iter().collect(),
        }
    }

    pub fn successes(&self) -> Vec<&ConnectionContext> {
        self.contexts().into_iter().filter(|c| c.is_success()).collect()
    }

    pub fn success_count(&self) -> usize {
        self.successes().len()
    }

    pub fn outcome(&self) -> Outcome {
        if self.success_count() > 0 {
            return Outcome::Connected;
        }
        if self.cancelled {
            return Outcome::Cancelled;
        }
        if self.attempted.is_empty() {
            return Outcome::NothingToTry;
        }

        let denied: Vec<&ErrorRecord> = self
            .errors()
            .filter(|r| r.kind == ErrorKind::AuthorizationDenied)
            .collect();
        if !denied.is_empty() {
            let mut privileges: Vec<String> = denied.iter().filter_map(|r| r.privilege.clone()).collect();
            privileges.sort();
            privileges.dedup();
            return Outcome::AuthorizationDenied { privileges };
        }

        if self.errors().any(|r| r.kind == ErrorKind::AuthenticationFailed) {
            return Outcome::AuthenticationFailed;
        }
        Outcome::Failed
    }
}

pub struct NegotiationEngine {
    planner: AttemptPlanner,
    factory: ClientFactory,
    classifier: VersionClassifier,
    sink: Arc<dyn OutputSink>,
    source: CredentialSource,
    settings: Config,
}

impl NegotiationEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn CredentialStore>,
        backend: Arc<dyn ClientBackend>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        let source = config.credential_source();
        let EngineConfig {
            settings,
            url_generators,
            version_matchers,
        } = config;

        Self {
            planner: AttemptPlanner::new(store, url_generators),
            factory: ClientFactory::new(
                backend,
                settings.preferred_version.clone(),
                settings.fallback_version.clone(),
                settings.per_attempt_timeout,
            ),
            classifier: VersionClassifier::new(version_matchers),
            sink,
            source,
            settings,
        }
    }

    /// Builds the attempt space without opening anything.
    pub fn plan(&self, addresses: &[Address]) -> Result<AttemptPlan, EngineError> {
        self.planner.plan(addresses, &self.source)
    }

    /// Runs a full negotiation. Only caller mistakes produce an `Err`.
    pub async fn run(
        &self,
        addresses: &[Address],
        callback: &dyn DiscoveryCallback,
        cancel: &CancellationToken,
    ) -> Result<NegotiationResult, EngineError> {
        let plan = self.plan(addresses)?;
        info!(attempts = plan.len(), addresses = plan.addresses.len(), "attempt space planned");

        let errors = ErrorClassifier::new();
        for warning in &plan.warnings {
            errors.record(warning.clone());
        }

        let mut attempted = Vec::with_capacity(plan.len());
        let mut contexts = Vec::new();
        let mut cancelled = false;

        for attempt in plan.attempts() {
            if cancel.is_cancelled() {
                info!("negotiation cancelled, {} attempt(s) not started", plan.len() - attempted.len());
                cancelled = true;
                break;
            }

            attempted.push(attempt.clone());
            let span = info_span!(
                "attempt",
                address = %attempt.address,
                credential = %attempt.credential,
                endpoint = %attempt.endpoint
            );
            let ctx = self.run_attempt(attempt, callback, &errors).instrument(span).await;

            let succeeded = ctx.is_success();
            contexts.push(ctx);
            if succeeded && self.settings.stop_on_first_success {
                debug!("stopping at first success");
                break;
            }
        }

        if let Err(fault) = self.bounded(self.sink.flush()).await {
            errors.record_fault(&fault, Origin::Run);
        }

        let resolution = if self.settings.stop_on_first_success {
            Resolution::FirstSuccess(contexts.into_iter().find(ConnectionContext::is_success))
        } else {
            Resolution::Exhaustive(contexts)
        };

        Ok(NegotiationResult {
            records: errors.into_records(),
            attempted,
            resolution,
            cancelled,
        })
    }

    async fn run_attempt(
        &self,
        attempt: ConnectionAttempt,
        callback: &dyn DiscoveryCallback,
        errors: &ErrorClassifier,
    ) -> ConnectionContext {
        let mut ctx = ConnectionContext::new(attempt);

        match self.factory.open(ctx.attempt()).await {
            Ok(session) => {
                ctx.attach_session(Box::new(session));
                advance(&mut ctx, AttemptStage::Connected);
            }
            Err(fault) => {
                fail(&mut ctx, &fault, errors);
                return ctx;
            }
        }

        if let Err(fault) = self.drive(&mut ctx, callback, errors).await {
            fail(&mut ctx, &fault, errors);
        }

        self.release(&mut ctx, errors).await;
        ctx
    }

    /// Classifies the open session, dispatches it, and forwards the results.
    async fn drive(
        &self,
        ctx: &mut ConnectionContext,
        callback: &dyn DiscoveryCallback,
        errors: &ErrorClassifier,
    ) -> Result<(), Fault> {
        let module = self.bounded(self.classifier.classify(ctx)).await?;
        debug!(%module, "peer classified");
        if let Err(module) = ctx.set_capability(module) {
            debug!(%module, "capability already resolved, keeping the first");
        }
        advance(ctx, AttemptStage::Classified);

        advance(ctx, AttemptStage::Dispatched);
        let scoped_before = ctx.records().len();
        let dispatched = self.bounded(callback.discover(ctx)).await;
        for record in &ctx.records()[scoped_before..] {
            errors.record(record.clone());
        }
        let batch = dispatched?;

        let items = batch.len();
        self.bounded(self.sink.send(batch)).await?;
        ctx.mark_succeeded();
        info!(items, "negotiated {}", ctx.attempt());
        Ok(())
    }

    async fn release(&self, ctx: &mut ConnectionContext, errors: &ErrorClassifier) {
        if let Some(mut session) = ctx.take_session() {
            match self.bounded(session.close()).await {
                Ok(()) => debug!("session released"),
                Err(fault) => {
                    let origin = Origin::Attempt(ctx.attempt().clone());
                    let record = ErrorClassifier::to_record(&fault, origin).with_severity(Severity::Warning);
                    errors.record(record.clone());
                    ctx.push_record(record);
                }
            }
        }
        advance(ctx, AttemptStage::Closed);
    }

    async fn bounded<T>(&self, operation: impl Future<Output = Result<T, Fault>>) -> Result<T, Fault> {
        let limit = self.settings.per_attempt_timeout;
        tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| Fault::Timeout(limit))?
    }
}

fn advance(ctx: &mut ConnectionContext, stage: AttemptStage) {
    if let Err(err) = ctx.advance(stage) {
        error!(attempt = %ctx.attempt(), "{err}");
    }
}

fn fail(ctx: &mut ConnectionContext, fault: &Fault, errors: &ErrorClassifier) {
    advance(ctx, AttemptStage::Failed);
    let record = ErrorClassifier::to_record(fault, Origin::Attempt(ctx.attempt().clone()));
    errors.record(record.clone());
    ctx.push_record(record);
    advance(ctx, AttemptStage::Recorded);
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
