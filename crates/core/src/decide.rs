//! The decision engine
//!
//! Given a plan and the event history for one workflow execution, compute
//! the next decision(s). This is a replay-from-log model: the engine keeps
//! no state between ticks, never mutates its inputs, and is deterministic
//! up to the injected [`UidMinter`].
//!
//! Dispatch finds the most recent actionable event (descending event id)
//! and acts on it:
//!
//! | latest actionable                      | action                                   |
//! |----------------------------------------|------------------------------------------|
//! | `WorkflowExecutionStarted`             | schedule the first step                  |
//! | `ActivityTaskCompleted`                | schedule the step after the finished one |
//! | `ActivityTaskFailed`                   | fail the workflow                        |
//! | `ActivityTaskCanceled`                 | cancel the workflow                      |
//! | `TimerFired`                           | schedule the step after the sleep        |
//! | `StartChildWorkflowExecutionInitiated` | complete the parent execution            |
//!
//! Parent lookups go through the service-assigned `scheduled_event_id` /
//! `started_event_id` references, never through names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::history::{EventAttrs, HistoryEvent};
use crate::plan::{End, Plan, Spec, SpecKind};
use crate::uid::{Uid, UidMinter};

/// Errors from one decision tick
///
/// All of these mean the history cannot be interpreted against the plan;
/// the caller logs the error and leaves the decision token unanswered so
/// the service re-dispatches it.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecideError {
    /// The history holds no event the engine can dispatch on
    #[error("history contains no actionable event")]
    NoActionableEvent,

    /// A parent-id reference points outside the supplied history
    #[error("no event with id {0} in history")]
    UnknownEventId(i64),

    /// A completion's parent is not an `ActivityTaskScheduled` event
    #[error("no activity schedule information on event {0}")]
    NoScheduleInfo(i64),

    /// A fired timer's parent is not a `TimerStarted` event, or the
    /// started event carries no control payload
    #[error("no timer information on event {0}")]
    NoTimerInfo(i64),

    /// A fired timer has no payload-bearing event beneath it
    #[error("no payload-bearing event below event {0}")]
    NoPriorPayload(i64),

    /// Continue-as-new requested but the history has no start event
    #[error("no workflow start information in history")]
    NoStartInfo,
}

/// One instruction sent back to the workflow service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    /// Schedule an activity on its task queue
    ScheduleActivity {
        activity_id: Uid,
        name: String,
        version: String,
        queue: String,
        timeout_secs: u64,
        input: Option<String>,
    },

    /// Start a timer; `control` carries the sleep step's name
    StartTimer {
        timer_id: Uid,
        control: String,
        timeout_secs: u64,
    },

    /// Complete the workflow execution
    CompleteWorkflow { result: Option<String> },

    /// Fail the workflow execution
    FailWorkflow { reason: Option<String> },

    /// Cancel the workflow execution
    CancelWorkflow { details: Option<String> },

    /// Continue-as-new: launch a child execution of the start task
    StartChildWorkflow {
        workflow_id: Uid,
        name: String,
        version: String,
        queue: String,
        input: Option<String>,
    },
}

/// Everything one decision tick looks at: the plan, the event log, and an
/// id index for parent lookups
pub struct DecisionContext<'a> {
    plan: &'a Plan,
    /// Events ordered by descending id
    newest_first: Vec<&'a HistoryEvent>,
    index: HashMap<i64, &'a HistoryEvent>,
}

impl<'a> DecisionContext<'a> {
    pub fn new(plan: &'a Plan, events: &'a [HistoryEvent]) -> Self {
        let mut newest_first: Vec<&HistoryEvent> = events.iter().collect();
        newest_first.sort_by_key(|event| std::cmp::Reverse(event.id));
        let index = events.iter().map(|event| (event.id, event)).collect();
        Self {
            plan,
            newest_first,
            index,
        }
    }

    /// Parent lookup by service-assigned event id
    pub fn event(&self, id: i64) -> Result<&'a HistoryEvent, DecideError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(DecideError::UnknownEventId(id))
    }

    /// The most recent actionable event
    pub fn newest_actionable(&self) -> Option<&'a HistoryEvent> {
        self.newest_first
            .iter()
            .copied()
            .find(|event| event.is_actionable())
    }

    /// The payload flowing into the step that a fired timer unblocks:
    /// the nearest started/completed event strictly below `below_id`.
    fn payload_below(&self, below_id: i64) -> Result<Option<String>, DecideError> {
        for event in self
            .newest_first
            .iter()
            .copied()
            .filter(|event| event.id < below_id)
        {
            match &event.attrs {
                EventAttrs::WorkflowExecutionStarted { input } => return Ok(input.clone()),
                EventAttrs::ActivityTaskCompleted { result, .. } => return Ok(result.clone()),
                _ => continue,
            }
        }
        Err(DecideError::NoPriorPayload(below_id))
    }

    /// The input the execution was originally started with
    fn original_input(&self) -> Result<Option<String>, DecideError> {
        for event in self.newest_first.iter().rev() {
            if let EventAttrs::WorkflowExecutionStarted { input } = &event.attrs {
                return Ok(input.clone());
            }
        }
        Err(DecideError::NoStartInfo)
    }
}

/// Compute the next decision(s) for a workflow execution.
///
/// Returns at least one decision or an error; never an empty list.
pub fn decide(
    plan: &Plan,
    events: &[HistoryEvent],
    uids: &dyn UidMinter,
) -> Result<Vec<Decision>, DecideError> {
    let ctx = DecisionContext::new(plan, events);
    let latest = ctx
        .newest_actionable()
        .ok_or(DecideError::NoActionableEvent)?;

    debug!(event_id = latest.id, "dispatching on actionable event");

    match &latest.attrs {
        EventAttrs::WorkflowExecutionStarted { input } => match plan.first_spec() {
            Some(spec) => Ok(vec![schedule(spec, input.clone(), uids)]),
            None => end_workflow(&ctx, input.clone(), uids),
        },

        EventAttrs::ActivityTaskCompleted {
            scheduled_event_id,
            result,
        } => {
            let scheduled = ctx.event(*scheduled_event_id)?;
            let EventAttrs::ActivityTaskScheduled { name, .. } = &scheduled.attrs else {
                return Err(DecideError::NoScheduleInfo(scheduled.id));
            };
            match plan.spec_after(SpecKind::Work, name) {
                Some(spec) => Ok(vec![schedule(spec, result.clone(), uids)]),
                None => end_workflow(&ctx, result.clone(), uids),
            }
        }

        EventAttrs::ActivityTaskFailed { reason, .. } => Ok(vec![Decision::FailWorkflow {
            reason: reason.clone(),
        }]),

        EventAttrs::ActivityTaskCanceled { details, .. } => Ok(vec![Decision::CancelWorkflow {
            details: details.clone(),
        }]),

        EventAttrs::TimerFired {
            started_event_id, ..
        } => {
            let started = ctx.event(*started_event_id)?;
            let EventAttrs::TimerStarted {
                control: Some(control),
                ..
            } = &started.attrs
            else {
                return Err(DecideError::NoTimerInfo(started.id));
            };
            let payload = ctx.payload_below(latest.id)?;
            match plan.spec_after(SpecKind::Sleep, control) {
                Some(spec) => Ok(vec![schedule(spec, payload, uids)]),
                None => end_workflow(&ctx, payload, uids),
            }
        }

        EventAttrs::StartChildWorkflowExecutionInitiated { input } => {
            // The child has been handed off; the parent completes,
            // echoing the input it forwarded.
            Ok(vec![Decision::CompleteWorkflow {
                result: input.clone(),
            }])
        }

        // newest_actionable only yields the variants above
        _ => Err(DecideError::NoActionableEvent),
    }
}

/// Turn a plan step into its scheduling decision
fn schedule(spec: &Spec, input: Option<String>, uids: &dyn UidMinter) -> Decision {
    match spec {
        Spec::Work(task) => Decision::ScheduleActivity {
            activity_id: uids.mint(),
            name: task.name.clone(),
            version: task.version.clone(),
            queue: task.queue.clone(),
            timeout_secs: task.timeout_secs,
            input,
        },
        Spec::Sleep(timer) => Decision::StartTimer {
            timer_id: uids.mint(),
            control: timer.name.clone(),
            timeout_secs: timer.timeout_secs,
        },
    }
}

/// Apply the plan's terminal policy with the final payload
fn end_workflow(
    ctx: &DecisionContext<'_>,
    payload: Option<String>,
    uids: &dyn UidMinter,
) -> Result<Vec<Decision>, DecideError> {
    match ctx.plan.end {
        End::Stop => Ok(vec![Decision::CompleteWorkflow { result: payload }]),
        End::Continue => {
            let input = ctx.original_input()?;
            let start = &ctx.plan.start;
            Ok(vec![Decision::StartChildWorkflow {
                workflow_id: uids.mint(),
                name: start.name.clone(),
                version: start.version.clone(),
                queue: start.queue.clone(),
                input,
            }])
        }
    }
}
