//! KernelBuilder - wiring and startup validation.
//!
//! Every collaborator has a config-driven default; tests and deployments
//! override individual ports with the `with_*` methods. `build()` validates
//! the configuration first, so a bad policy table or regex fails at startup
//! rather than on the first request.

use std::sync::Arc;

use tracing::info;

use crate::app::audit_trail::AuditTrail;
use crate::app::kernel::Kernel;
use crate::app::lock_service::LockService;
use crate::app::task_queue::TaskQueue;
use crate::config::KernelConfig;
use crate::domain::KernelError;
use crate::impls::{
    InMemoryAuditLog, InMemoryLockStore, InMemoryTaskStore, JsonlAuditSink, RuleTableEvaluator,
    StaticTrustRegistry,
};
use crate::policy::{Guardrails, PolicyGate};
use crate::ports::{
    AuditSink, Clock, IdGenerator, LockStore, PolicyEvaluator, SystemClock, TaskStore, TrustRegistry,
    UlidGenerator,
};

/// # Example
/// ```ignore
/// let kernel = KernelBuilder::new(KernelConfig::from_yaml_file("weft.yaml")?)
///     .with_audit_sink(Arc::new(InMemoryAuditLog::new()))
///     .build()?;
/// ```
#[derive(Default)]
pub struct KernelBuilder {
    config: KernelConfig,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    lock_store: Option<Arc<dyn LockStore>>,
    task_store: Option<Arc<dyn TaskStore>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    trust: Option<Arc<dyn TrustRegistry>>,
    evaluator: Option<Arc<dyn PolicyEvaluator>>,
    guardrails: Option<Guardrails>,
}

impl KernelBuilder {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_lock_store(mut self, store: Arc<dyn LockStore>) -> Self {
        self.lock_store = Some(store);
        self
    }

    pub fn with_task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.task_store = Some(store);
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn with_trust_registry(mut self, trust: Arc<dyn TrustRegistry>) -> Self {
        self.trust = Some(trust);
        self
    }

    pub fn with_policy_evaluator(mut self, evaluator: Arc<dyn PolicyEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn with_guardrails(mut self, guardrails: Guardrails) -> Self {
        self.guardrails = Some(guardrails);
        self
    }

    pub fn build(self) -> Result<Kernel, KernelError> {
        let config = self.config;
        config.validate()?;

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(Arc::clone(&clock))),
        };
        let lock_store: Arc<dyn LockStore> = match self.lock_store {
            Some(store) => store,
            None => Arc::new(InMemoryLockStore::new()),
        };
        let task_store: Arc<dyn TaskStore> = match self.task_store {
            Some(store) => store,
            None => Arc::new(InMemoryTaskStore::new()),
        };
        let audit_sink: Arc<dyn AuditSink> = match (self.audit_sink, &config.audit.path) {
            (Some(sink), _) => sink,
            (None, Some(path)) => Arc::new(JsonlAuditSink::new(path)),
            (None, None) => Arc::new(InMemoryAuditLog::new()),
        };
        let trust: Arc<dyn TrustRegistry> = match self.trust {
            Some(trust) => trust,
            None => Arc::new(StaticTrustRegistry::from_config(&config.trust)),
        };
        let evaluator: Arc<dyn PolicyEvaluator> = match self.evaluator {
            Some(evaluator) => evaluator,
            None => Arc::new(RuleTableEvaluator::from_config(&config.policy)?),
        };
        let guardrails = match self.guardrails {
            Some(guardrails) => guardrails,
            None => Guardrails::from_config(&config.guardrails)?,
        };

        let audit = AuditTrail::new(audit_sink, Arc::clone(&clock), Arc::clone(&ids));
        let locks = Arc::new(LockService::new(
            lock_store,
            audit.clone(),
            Arc::clone(&clock),
            &config.locks,
        ));
        let tasks = TaskQueue::new(
            task_store,
            audit.clone(),
            Arc::clone(&clock),
            ids,
        );
        let gate = PolicyGate::new(trust, evaluator, guardrails, audit.clone(), clock);

        info!(
            policy_version = gate.policy_version(),
            audit = ?config.audit.path,
            "kernel ready"
        );
        Ok(Kernel::new(gate, locks, tasks, audit, config.locks.sweep_interval))
    }
}
