//! In-memory implementations of the service client contract
//!
//! These back the test suites and local CLI runs. They keep the same
//! observable semantics as the hosted services: single-use tokens,
//! per-prefix object namespaces, and `AlreadyExists` on duplicate
//! registration.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{
    ActivityWork, DecisionWork, ObjectStore, ObjectStoreError, ServiceError, WorkflowService,
};
use crate::decide::Decision;
use crate::history::HistoryEvent;
use crate::uid::Uid;

/// A respond-* call observed by the in-memory service
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedResponse {
    ActivityCompleted {
        token: String,
        result: Option<String>,
    },
    ActivityFailed {
        token: String,
        reason: Option<String>,
    },
    ActivityCanceled {
        token: String,
        details: Option<String>,
    },
    DecisionCompleted {
        token: String,
        decisions: Vec<Decision>,
    },
}

/// A workflow start observed by the in-memory service
#[derive(Debug, Clone, PartialEq)]
pub struct StartedWorkflow {
    pub uid: Uid,
    pub name: String,
    pub version: String,
    pub queue: String,
    pub input: Option<String>,
}

#[derive(Default)]
struct ServiceState {
    domain_registered: bool,
    types: HashSet<(String, String)>,
    activity_queues: HashMap<String, VecDeque<ActivityWork>>,
    decision_queues: HashMap<String, VecDeque<DecisionWork>>,
    started: Vec<StartedWorkflow>,
    responses: Vec<RecordedResponse>,
    injected_errors: VecDeque<ServiceError>,
}

/// In-memory workflow service
///
/// Tests enqueue work with [`enqueue_activity`](Self::enqueue_activity) /
/// [`enqueue_decision`](Self::enqueue_decision) and assert on
/// [`responses`](Self::responses). Errors queued with
/// [`inject_error`](Self::inject_error) are answered by the next
/// operation, in order, before any real work happens.
#[derive(Default)]
pub struct InMemoryWorkflowService {
    state: RwLock<ServiceState>,
}

impl InMemoryWorkflowService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_activity(&self, queue: &str, token: &str, uid: Uid, input: Option<String>) {
        self.state
            .write()
            .activity_queues
            .entry(queue.to_string())
            .or_default()
            .push_back(ActivityWork {
                token: token.to_string(),
                uid,
                input,
            });
    }

    pub fn enqueue_decision(&self, queue: &str, token: &str, events: Vec<HistoryEvent>) {
        self.state
            .write()
            .decision_queues
            .entry(queue.to_string())
            .or_default()
            .push_back(DecisionWork {
                token: token.to_string(),
                events,
            });
    }

    /// Answer the next operation with `err` instead of running it
    pub fn inject_error(&self, err: ServiceError) {
        self.state.write().injected_errors.push_back(err);
    }

    pub fn responses(&self) -> Vec<RecordedResponse> {
        self.state.read().responses.clone()
    }

    pub fn started_workflows(&self) -> Vec<StartedWorkflow> {
        self.state.read().started.clone()
    }

    pub fn is_registered(&self, name: &str, version: &str) -> bool {
        self.state
            .read()
            .types
            .contains(&(name.to_string(), version.to_string()))
    }

    fn take_injected(&self) -> Option<ServiceError> {
        self.state.write().injected_errors.pop_front()
    }
}

#[async_trait]
impl WorkflowService for InMemoryWorkflowService {
    async fn register_domain(&self) -> Result<(), ServiceError> {
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        let mut state = self.state.write();
        if state.domain_registered {
            return Err(ServiceError::AlreadyExists);
        }
        state.domain_registered = true;
        Ok(())
    }

    async fn register_workflow_type(
        &self,
        name: &str,
        version: &str,
    ) -> Result<(), ServiceError> {
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        let mut state = self.state.write();
        if !state.types.insert((name.to_string(), version.to_string())) {
            return Err(ServiceError::AlreadyExists);
        }
        Ok(())
    }

    async fn register_activity_type(
        &self,
        name: &str,
        version: &str,
    ) -> Result<(), ServiceError> {
        self.register_workflow_type(name, version).await
    }

    async fn start_workflow(
        &self,
        uid: &Uid,
        name: &str,
        version: &str,
        queue: &str,
        input: Option<String>,
    ) -> Result<(), ServiceError> {
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        self.state.write().started.push(StartedWorkflow {
            uid: uid.clone(),
            name: name.to_string(),
            version: version.to_string(),
            queue: queue.to_string(),
            input,
        });
        Ok(())
    }

    async fn poll_activity(&self, queue: &str) -> Result<Option<ActivityWork>, ServiceError> {
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        Ok(self
            .state
            .write()
            .activity_queues
            .get_mut(queue)
            .and_then(VecDeque::pop_front))
    }

    async fn poll_decision(&self, queue: &str) -> Result<Option<DecisionWork>, ServiceError> {
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        Ok(self
            .state
            .write()
            .decision_queues
            .get_mut(queue)
            .and_then(VecDeque::pop_front))
    }

    async fn respond_activity_completed(
        &self,
        token: &str,
        result: Option<String>,
    ) -> Result<(), ServiceError> {
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        self.state
            .write()
            .responses
            .push(RecordedResponse::ActivityCompleted {
                token: token.to_string(),
                result,
            });
        Ok(())
    }

    async fn respond_activity_failed(
        &self,
        token: &str,
        reason: Option<String>,
    ) -> Result<(), ServiceError> {
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        self.state
            .write()
            .responses
            .push(RecordedResponse::ActivityFailed {
                token: token.to_string(),
                reason,
            });
        Ok(())
    }

    async fn respond_activity_canceled(
        &self,
        token: &str,
        details: Option<String>,
    ) -> Result<(), ServiceError> {
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        self.state
            .write()
            .responses
            .push(RecordedResponse::ActivityCanceled {
                token: token.to_string(),
                details,
            });
        Ok(())
    }

    async fn respond_decision_completed(
        &self,
        token: &str,
        decisions: Vec<Decision>,
    ) -> Result<(), ServiceError> {
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        self.state
            .write()
            .responses
            .push(RecordedResponse::DecisionCompleted {
                token: token.to_string(),
                decisions,
            });
        Ok(())
    }
}

/// In-memory object store: prefix → key → bytes
///
/// Listing returns keys in lexicographic order.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects stored under a prefix
    pub fn count(&self, prefix: &str) -> usize {
        self.objects.read().get(prefix).map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        Ok(self
            .objects
            .read()
            .get(prefix)
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.objects
            .read()
            .get(prefix)
            .and_then(|keys| keys.get(key).cloned())
            .ok_or_else(|| ObjectStoreError::NotFound(format!("{prefix}/{key}")))
    }

    async fn put(&self, prefix: &str, key: &str, bytes: Vec<u8>) -> Result<(), ObjectStoreError> {
        self.objects
            .write()
            .entry(prefix.to_string())
            .or_default()
            .insert(key.to_string(), bytes);
        Ok(())
    }
}
