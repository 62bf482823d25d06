//! The actor loop
//!
//! One iteration: poll the activity queue, stage inputs into a fresh
//! workspace, run the user command there, publish outputs, and answer
//! the service with exactly one respond-* call per received token.
//!
//! Iteration failures after the poll leave the token unanswered on
//! purpose; the service times the task out and re-dispatches it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use windlass_core::client::{call_with_retries, RetryConfig};
use windlass_core::{ObjectStore, ServiceError, WorkflowService};

use crate::process::{run_command, Disposition};
use crate::stage::{StageError, Stager};
use crate::worker::quiesce_requested;
use crate::workspace::{Workspace, WorkspaceOptions};

#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    #[error("staging error: {0}")]
    Stage(#[from] StageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Settings for one actor worker
#[derive(Debug, Clone)]
pub struct ActorConfig {
    /// Activity queue to poll
    pub queue: String,

    /// The user command, tokenized on whitespace at run time
    pub command: String,

    /// Stop cleanly when this path exists
    pub quiesce: Option<PathBuf>,

    /// Workspace provisioning options
    pub workspace: WorkspaceOptions,

    /// Whether stored artifacts are gzip streams
    pub gzip: bool,

    /// Pause after an empty poll
    pub idle_delay: Duration,

    /// Transient-error handling
    pub retry: RetryConfig,
}

impl ActorConfig {
    pub fn new(queue: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            command: command.into(),
            quiesce: None,
            workspace: WorkspaceOptions::default(),
            gzip: true,
            idle_delay: Duration::from_secs(1),
            retry: RetryConfig::default(),
        }
    }
}

/// An activity worker
pub struct Actor {
    service: Arc<dyn WorkflowService>,
    store: Arc<dyn ObjectStore>,
    config: ActorConfig,
}

impl Actor {
    pub fn new(
        service: Arc<dyn WorkflowService>,
        store: Arc<dyn ObjectStore>,
        config: ActorConfig,
    ) -> Self {
        Self {
            service,
            store,
            config,
        }
    }

    /// Poll once and execute the task if one was handed out.
    ///
    /// Returns `None` when the queue was empty, otherwise the command's
    /// disposition.
    pub async fn run_once(&self) -> Result<Option<Disposition>, ActorError> {
        let polled = call_with_retries(&self.config.retry, "poll_activity", || {
            self.service.poll_activity(&self.config.queue)
        })
        .await?;
        let Some(work) = polled else {
            return Ok(None);
        };

        info!(uid = %work.uid, "activity received");

        let workspace = Workspace::create(&work.uid, &self.config.workspace)?;
        workspace.write_control(&work.uid)?;
        if let Some(input) = &work.input {
            workspace.write_input(input)?;
        }

        let stager = Stager::new(self.config.gzip);
        stager
            .stage_in(self.store.as_ref(), &work.uid, &workspace.input_dir())
            .await?;

        let disposition = run_command(&self.config.command, workspace.root()).await;

        // Stage-out runs even when the command failed; partial outputs
        // are part of the contract.
        stager
            .stage_out(self.store.as_ref(), &work.uid, &workspace.output_dir())
            .await?;

        let output = workspace.read_output()?;

        match &disposition {
            Disposition::Success => {
                call_with_retries(&self.config.retry, "respond_activity_completed", || {
                    self.service
                        .respond_activity_completed(&work.token, output.clone())
                })
                .await?;
            }
            Disposition::Canceled => {
                info!(uid = %work.uid, "command asked for cancellation");
                call_with_retries(&self.config.retry, "respond_activity_canceled", || {
                    self.service.respond_activity_canceled(&work.token, None)
                })
                .await?;
            }
            Disposition::Failed(code) => {
                warn!(uid = %work.uid, code, "command failed");
                let reason = format!("exit status {code}");
                call_with_retries(&self.config.retry, "respond_activity_failed", || {
                    self.service
                        .respond_activity_failed(&work.token, Some(reason.clone()))
                })
                .await?;
            }
            Disposition::SpawnFailed(message) => {
                warn!(uid = %work.uid, message, "command could not be launched");
                call_with_retries(&self.config.retry, "respond_activity_failed", || {
                    self.service
                        .respond_activity_failed(&work.token, Some(message.clone()))
                })
                .await?;
            }
        }

        Ok(Some(disposition))
    }

    /// Loop until the quiesce file appears.
    ///
    /// Iteration errors are logged and the loop carries on; the
    /// unanswered token is the service's signal to re-dispatch.
    pub async fn run(&self) {
        loop {
            if quiesce_requested(self.config.quiesce.as_deref()) {
                info!("quiesce file present, actor stopping");
                return;
            }
            match self.run_once().await {
                Ok(Some(_)) => {}
                Ok(None) => tokio::time::sleep(self.config.idle_delay).await,
                Err(err) => {
                    error!(error = %err, "actor iteration failed");
                    tokio::time::sleep(self.config.idle_delay).await;
                }
            }
        }
    }
}
