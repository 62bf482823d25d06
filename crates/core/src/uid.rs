//! Opaque unique identifiers
//!
//! Every workflow execution, scheduled activity, timer, and child
//! workflow gets a fresh [`Uid`]. Minting is behind a trait so the
//! decision engine stays a pure function of `(plan, events)` in tests.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque identifier, never reused within one process
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of fresh identifiers
pub trait UidMinter: Send + Sync {
    /// Mint an identifier that has not been handed out before
    fn mint(&self) -> Uid;
}

/// Production minter backed by time-ordered UUIDs
#[derive(Debug, Default)]
pub struct UuidMinter;

impl UidMinter for UuidMinter {
    fn mint(&self) -> Uid {
        Uid::new(Uuid::now_v7().to_string())
    }
}

/// Deterministic minter for tests: `uid-1`, `uid-2`, ...
#[derive(Debug, Default)]
pub struct SequenceMinter {
    next: std::sync::atomic::AtomicU64,
}

impl SequenceMinter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UidMinter for SequenceMinter {
    fn mint(&self) -> Uid {
        let n = self
            .next
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Uid::new(format!("uid-{}", n + 1))
    }
}
