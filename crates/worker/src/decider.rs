//! The decider loop
//!
//! Polls the decision queue, interprets the returned event history
//! against the plan, and answers with the next decision(s). The engine
//! itself lives in `windlass_core::decide`; this loop only moves tasks
//! and tokens.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use windlass_core::client::{call_with_retries, RetryConfig};
use windlass_core::{decide, DecideError, Plan, ServiceError, UidMinter, WorkflowService};

use crate::worker::quiesce_requested;

#[derive(Debug, thiserror::Error)]
pub enum DeciderError {
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// The history could not be interpreted; the token stays unanswered
    /// so the service re-dispatches the decision task
    #[error("decision error: {0}")]
    Decide(#[from] DecideError),
}

/// Settings for one decider worker
#[derive(Debug, Clone)]
pub struct DeciderConfig {
    /// Decision queue to poll
    pub queue: String,

    /// Stop cleanly when this path exists
    pub quiesce: Option<PathBuf>,

    /// Pause after an empty poll
    pub idle_delay: Duration,

    /// Transient-error handling
    pub retry: RetryConfig,
}

impl DeciderConfig {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            quiesce: None,
            idle_delay: Duration::from_secs(1),
            retry: RetryConfig::default(),
        }
    }
}

/// A decision worker
pub struct Decider {
    service: Arc<dyn WorkflowService>,
    plan: Plan,
    uids: Arc<dyn UidMinter>,
    config: DeciderConfig,
}

impl Decider {
    pub fn new(
        service: Arc<dyn WorkflowService>,
        plan: Plan,
        uids: Arc<dyn UidMinter>,
        config: DeciderConfig,
    ) -> Self {
        Self {
            service,
            plan,
            uids,
            config,
        }
    }

    /// Poll once and decide if a task was handed out.
    ///
    /// Returns the number of decisions sent, or `None` when the queue
    /// was empty.
    pub async fn run_once(&self) -> Result<Option<usize>, DeciderError> {
        let polled = call_with_retries(&self.config.retry, "poll_decision", || {
            self.service.poll_decision(&self.config.queue)
        })
        .await?;
        let Some(work) = polled else {
            return Ok(None);
        };

        let decisions = decide(&self.plan, &work.events, self.uids.as_ref())?;
        info!(
            events = work.events.len(),
            decisions = decisions.len(),
            "responding to decision task"
        );

        call_with_retries(&self.config.retry, "respond_decision_completed", || {
            self.service
                .respond_decision_completed(&work.token, decisions.clone())
        })
        .await?;

        Ok(Some(decisions.len()))
    }

    /// Loop until the quiesce file appears
    pub async fn run(&self) {
        loop {
            if quiesce_requested(self.config.quiesce.as_deref()) {
                info!("quiesce file present, decider stopping");
                return;
            }
            match self.run_once().await {
                Ok(Some(_)) => {}
                Ok(None) => tokio::time::sleep(self.config.idle_delay).await,
                Err(err) => {
                    error!(error = %err, "decider iteration failed");
                    tokio::time::sleep(self.config.idle_delay).await;
                }
            }
        }
    }
}
