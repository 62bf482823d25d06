//! # windlass-core
//!
//! The protocol brain of windlass, a client for a hosted workflow
//! service with an object-store sidecar. Workflow state lives entirely
//! in the service's append-only event log; this crate interprets that
//! log against a static [`Plan`] and produces the next [`Decision`]s.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     decide::decide                       │
//! │   (plan + event history → schedule / timer / terminal)   │
//! └──────────────────────────────────────────────────────────┘
//!                             │
//!                             ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │          client::{WorkflowService, ObjectStore}          │
//! │    (the narrow contract the hosted services provide)     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is stateless between ticks and pure with respect to
//! `(plan, events)`; the only effect is uid minting, injected through
//! [`UidMinter`] so replays are reproducible in tests.

pub mod client;
pub mod config;
pub mod decide;
pub mod history;
pub mod plan;
pub mod uid;

pub use client::{
    ActivityWork, DecisionWork, ObjectStore, ObjectStoreError, RetryConfig, ServiceError,
    WorkflowService,
};
pub use config::{Config, ConfigError};
pub use decide::{decide, DecideError, Decision, DecisionContext};
pub use history::{EventAttrs, HistoryEvent};
pub use plan::{End, Plan, PlanError, Spec, SpecKind, Task, Timer};
pub use uid::{SequenceMinter, Uid, UidMinter, UuidMinter};
