//! Service client contract
//!
//! The narrow set of operations the core expects from the hosted workflow
//! service and its object-store sidecar. The wire transport lives outside
//! this workspace; these traits are what actors and deciders program
//! against, and [`memory`] provides in-process implementations for tests
//! and local runs.

pub mod memory;
pub mod retry;

use async_trait::async_trait;

use crate::decide::Decision;
use crate::history::HistoryEvent;
use crate::plan::{Plan, Spec};
use crate::uid::Uid;

pub use retry::{call_with_retries, ensure_registered, RetryConfig};

/// Errors surfaced by the workflow service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The resource is already registered; benign at registration time
    #[error("resource already exists")]
    AlreadyExists,

    /// The service asked the caller to back off
    #[error("request throttled by the service")]
    Throttling,

    /// Stale token or vanished workflow; a benign race during churn
    #[error("unknown resource")]
    UnknownResource,

    /// Anything transport-level
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors surfaced by the object store
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("no object with key {0}")]
    NotFound(String),

    #[error("request throttled by the store")]
    Throttling,

    #[error("transport error: {0}")]
    Transport(String),
}

/// An activity task handed to an actor
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityWork {
    /// Single-use token; consumed by exactly one `respond_activity_*` call
    pub token: String,

    /// The activity invocation's uid; namespaces its object-store prefix
    pub uid: Uid,

    /// Input metadata, if any
    pub input: Option<String>,
}

/// A decision task handed to a decider
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionWork {
    /// Single-use token; consumed by one `respond_decision_completed` call
    pub token: String,

    /// The full event history for the execution
    pub events: Vec<HistoryEvent>,
}

/// The workflow service operations the core consumes
///
/// All operations are idempotent or idempotence-tolerant from the
/// caller's perspective; registration may answer
/// [`ServiceError::AlreadyExists`], which callers swallow.
#[async_trait]
pub trait WorkflowService: Send + Sync + 'static {
    async fn register_domain(&self) -> Result<(), ServiceError>;

    async fn register_workflow_type(&self, name: &str, version: &str)
        -> Result<(), ServiceError>;

    async fn register_activity_type(&self, name: &str, version: &str)
        -> Result<(), ServiceError>;

    async fn start_workflow(
        &self,
        uid: &Uid,
        name: &str,
        version: &str,
        queue: &str,
        input: Option<String>,
    ) -> Result<(), ServiceError>;

    /// Long-poll the activity queue; `None` means no work
    async fn poll_activity(&self, queue: &str) -> Result<Option<ActivityWork>, ServiceError>;

    /// Long-poll the decision queue; `None` means no work
    async fn poll_decision(&self, queue: &str) -> Result<Option<DecisionWork>, ServiceError>;

    async fn respond_activity_completed(
        &self,
        token: &str,
        result: Option<String>,
    ) -> Result<(), ServiceError>;

    async fn respond_activity_failed(
        &self,
        token: &str,
        reason: Option<String>,
    ) -> Result<(), ServiceError>;

    async fn respond_activity_canceled(
        &self,
        token: &str,
        details: Option<String>,
    ) -> Result<(), ServiceError>;

    async fn respond_decision_completed(
        &self,
        token: &str,
        decisions: Vec<Decision>,
    ) -> Result<(), ServiceError>;
}

/// The object store operations the core consumes: a flat key→bytes map
/// under a per-uid prefix
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// All keys under the prefix
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError>;

    async fn get(&self, prefix: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    async fn put(&self, prefix: &str, key: &str, bytes: Vec<u8>) -> Result<(), ObjectStoreError>;
}

/// Register the domain plus every type the plan references.
///
/// `AlreadyExists` answers are swallowed; anything else propagates.
pub async fn register_plan(
    service: &dyn WorkflowService,
    plan: &Plan,
) -> Result<(), ServiceError> {
    ensure_registered("domain", service.register_domain()).await?;
    ensure_registered(
        "workflow type",
        service.register_workflow_type(&plan.start.name, &plan.start.version),
    )
    .await?;
    for spec in &plan.specs {
        if let Spec::Work(task) = spec {
            ensure_registered(
                "activity type",
                service.register_activity_type(&task.name, &task.version),
            )
            .await?;
        }
    }
    Ok(())
}
