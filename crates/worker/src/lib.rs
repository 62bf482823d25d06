//! # windlass-worker
//!
//! The process-facing half of windlass: long-lived actor and decider
//! loops over the service client contract from `windlass-core`.
//!
//! An **actor** polls an activity queue, stages input artifacts from
//! the object store into a scratch workspace, runs a user-supplied
//! command there, publishes the resulting artifacts, and answers the
//! service with the command's verdict. A **decider** polls a decision
//! queue and answers with the decisions computed by the core engine.
//!
//! Both loops run N-wide via [`worker::WorkerPool`] and stop cleanly
//! when the configured quiesce file appears.

pub mod actor;
pub mod decider;
pub mod process;
pub mod stage;
pub mod worker;
pub mod workspace;

pub use actor::{Actor, ActorConfig, ActorError};
pub use decider::{Decider, DeciderConfig, DeciderError};
pub use process::{run_command, Disposition, CANCEL_EXIT_CODE};
pub use stage::{Artifact, StageError, Stager};
pub use worker::{quiesce_requested, WorkerPool};
pub use workspace::{Workspace, WorkspaceOptions};
