//! Event history supplied by the workflow service
//!
//! The service returns the full, append-only event log for a workflow on
//! every decision poll. Events are totally ordered by id and are the sole
//! source of truth for the decision engine; nothing about workflow
//! progress is persisted locally.

use serde::{Deserialize, Serialize};

/// One entry of the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// Position in the log; strictly increasing, assigned by the service
    pub id: i64,

    /// Type-specific payload
    #[serde(flatten)]
    pub attrs: EventAttrs,
}

impl HistoryEvent {
    pub fn new(id: i64, attrs: EventAttrs) -> Self {
        Self { id, attrs }
    }

    /// Whether the decision engine dispatches on this event.
    ///
    /// Everything else in the log is bookkeeping the service interleaves
    /// (schedules, decision-task lifecycle, ...) and is only consulted
    /// through parent-id lookups.
    pub fn is_actionable(&self) -> bool {
        matches!(
            self.attrs,
            EventAttrs::WorkflowExecutionStarted { .. }
                | EventAttrs::ActivityTaskCompleted { .. }
                | EventAttrs::ActivityTaskFailed { .. }
                | EventAttrs::ActivityTaskCanceled { .. }
                | EventAttrs::TimerFired { .. }
                | EventAttrs::StartChildWorkflowExecutionInitiated { .. }
        )
    }
}

/// Type-specific event attributes
///
/// Parent references (`scheduled_event_id`, `started_event_id`) are
/// assigned by the service and are the only sanctioned way to correlate
/// completions with their scheduling events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventAttrs {
    /// The execution began with the given input
    WorkflowExecutionStarted { input: Option<String> },

    /// An activity was scheduled by an earlier decision
    ActivityTaskScheduled {
        name: String,
        version: String,
        input: Option<String>,
    },

    /// A worker picked up a scheduled activity
    ActivityTaskStarted { scheduled_event_id: i64 },

    /// An activity finished successfully
    ActivityTaskCompleted {
        scheduled_event_id: i64,
        result: Option<String>,
    },

    /// An activity reported failure
    ActivityTaskFailed {
        scheduled_event_id: i64,
        reason: Option<String>,
    },

    /// An activity was canceled
    ActivityTaskCanceled {
        scheduled_event_id: i64,
        details: Option<String>,
    },

    /// A timer began counting down; `control` carries the sleep step's
    /// name so the fired event can be mapped back to the plan
    TimerStarted {
        timer_id: String,
        control: Option<String>,
    },

    /// A timer's duration elapsed
    TimerFired {
        timer_id: String,
        started_event_id: i64,
    },

    /// A continue-as-new child execution was requested
    StartChildWorkflowExecutionInitiated { input: Option<String> },

    /// Decision-task lifecycle events, ignored by the engine
    DecisionTaskScheduled,
    DecisionTaskStarted,
    DecisionTaskCompleted,

    /// Any event type this client does not model
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actionable_covers_the_dispatch_set() {
        let actionable = [
            EventAttrs::WorkflowExecutionStarted { input: None },
            EventAttrs::ActivityTaskCompleted {
                scheduled_event_id: 1,
                result: None,
            },
            EventAttrs::ActivityTaskFailed {
                scheduled_event_id: 1,
                reason: None,
            },
            EventAttrs::ActivityTaskCanceled {
                scheduled_event_id: 1,
                details: None,
            },
            EventAttrs::TimerFired {
                timer_id: "t".into(),
                started_event_id: 1,
            },
            EventAttrs::StartChildWorkflowExecutionInitiated { input: None },
        ];
        for attrs in actionable {
            assert!(HistoryEvent::new(9, attrs).is_actionable());
        }

        let bookkeeping = [
            EventAttrs::ActivityTaskScheduled {
                name: "a".into(),
                version: "1".into(),
                input: None,
            },
            EventAttrs::ActivityTaskStarted {
                scheduled_event_id: 1,
            },
            EventAttrs::TimerStarted {
                timer_id: "t".into(),
                control: None,
            },
            EventAttrs::DecisionTaskScheduled,
            EventAttrs::Other,
        ];
        for attrs in bookkeeping {
            assert!(!HistoryEvent::new(9, attrs).is_actionable());
        }
    }

    #[test]
    fn events_round_trip_through_json() {
        let event = HistoryEvent::new(
            3,
            EventAttrs::ActivityTaskCompleted {
                scheduled_event_id: 2,
                result: Some("y".into()),
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"activity_task_completed\""));
        let parsed: HistoryEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }

    #[test]
    fn unknown_event_types_deserialize_as_other() {
        let json = r#"{"id": 7, "type": "workflow_execution_signaled"}"#;
        let parsed: HistoryEvent = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.attrs, EventAttrs::Other);
        assert!(!parsed.is_actionable());
    }
}
