//! Static workflow plans
//!
//! A [`Plan`] declares a workflow as a linear program: a start task that
//! names the workflow type, an ordered list of steps, and a policy for
//! what happens after the last step. Plans are immutable for the lifetime
//! of the process; the decision engine measures progress against the plan
//! purely from the event history.

use serde::{Deserialize, Serialize};

/// Errors raised by [`Plan::validate`]
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// A task or timer has an empty name
    #[error("plan contains a step with an empty name")]
    EmptyName,

    /// Two steps share a name
    #[error("duplicate step name in plan: {0}")]
    DuplicateName(String),

    /// A task or timer declares a zero timeout
    #[error("step {0} has a zero timeout")]
    ZeroTimeout(String),
}

/// An activity task: a named unit of work dispatched to a queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Activity type name
    pub name: String,

    /// Activity type version
    pub version: String,

    /// Task queue the activity is dispatched to
    pub queue: String,

    /// Start-to-close timeout enforced by the service
    pub timeout_secs: u64,
}

/// A timer: a named pause between steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    /// Timer name, carried as the timer's control payload so replay can
    /// locate the step again
    pub name: String,

    /// Seconds until the timer fires
    pub timeout_secs: u64,
}

/// One step of a plan: either work or sleep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Spec {
    /// Schedule an activity and wait for its completion
    Work(Task),

    /// Start a timer and wait for it to fire
    Sleep(Timer),
}

/// Step variant filter used by successor lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    Work,
    Sleep,
}

impl Spec {
    /// The step's name (task name or timer name)
    pub fn name(&self) -> &str {
        match self {
            Spec::Work(task) => &task.name,
            Spec::Sleep(timer) => &timer.name,
        }
    }

    /// The step's variant
    pub fn kind(&self) -> SpecKind {
        match self {
            Spec::Work(_) => SpecKind::Work,
            Spec::Sleep(_) => SpecKind::Sleep,
        }
    }

    fn timeout_secs(&self) -> u64 {
        match self {
            Spec::Work(task) => task.timeout_secs,
            Spec::Sleep(timer) => timer.timeout_secs,
        }
    }
}

/// What to do after the last step completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum End {
    /// Complete the workflow with the final payload
    Stop,

    /// Re-launch the workflow as a child execution with the original input
    Continue,
}

/// A static workflow declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// The task naming the workflow type; continue-as-new re-launches it
    pub start: Task,

    /// Ordered steps
    pub specs: Vec<Spec>,

    /// Terminal policy
    pub end: End,
}

impl Plan {
    /// Check the invariants the decision engine relies on.
    ///
    /// Step names must be unique across the whole plan (successor lookup
    /// is by name) and timeouts must be non-zero.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut seen = std::collections::HashSet::new();
        for spec in &self.specs {
            if spec.name().is_empty() {
                return Err(PlanError::EmptyName);
            }
            if spec.timeout_secs() == 0 {
                return Err(PlanError::ZeroTimeout(spec.name().to_string()));
            }
            if !seen.insert(spec.name()) {
                return Err(PlanError::DuplicateName(spec.name().to_string()));
            }
        }
        if self.start.name.is_empty() {
            return Err(PlanError::EmptyName);
        }
        Ok(())
    }

    /// The first step, if the plan has any
    pub fn first_spec(&self) -> Option<&Spec> {
        self.specs.first()
    }

    /// Successor lookup: the step immediately following the first step
    /// whose variant is `kind` and whose name equals `name`.
    ///
    /// Returns `None` when no step matches or the match is the last step.
    pub fn spec_after(&self, kind: SpecKind, name: &str) -> Option<&Spec> {
        let mut specs = self.specs.iter();
        specs.find(|spec| spec.kind() == kind && spec.name() == name)?;
        specs.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str) -> Task {
        Task {
            name: name.to_string(),
            version: "1.0".to_string(),
            queue: "work".to_string(),
            timeout_secs: 60,
        }
    }

    fn timer(name: &str) -> Timer {
        Timer {
            name: name.to_string(),
            timeout_secs: 10,
        }
    }

    fn plan(specs: Vec<Spec>) -> Plan {
        Plan {
            start: task("root"),
            specs,
            end: End::Stop,
        }
    }

    #[test]
    fn spec_after_returns_immediate_successor() {
        let plan = plan(vec![
            Spec::Work(task("a")),
            Spec::Sleep(timer("s")),
            Spec::Work(task("b")),
        ]);

        assert_eq!(
            plan.spec_after(SpecKind::Work, "a"),
            Some(&Spec::Sleep(timer("s")))
        );
        assert_eq!(
            plan.spec_after(SpecKind::Sleep, "s"),
            Some(&Spec::Work(task("b")))
        );
    }

    #[test]
    fn spec_after_last_step_is_none() {
        let plan = plan(vec![Spec::Work(task("a")), Spec::Work(task("b"))]);
        assert_eq!(plan.spec_after(SpecKind::Work, "b"), None);
    }

    #[test]
    fn spec_after_unknown_name_is_none() {
        let plan = plan(vec![Spec::Work(task("a"))]);
        assert_eq!(plan.spec_after(SpecKind::Work, "missing"), None);
    }

    #[test]
    fn spec_after_filters_by_variant() {
        // A sleep step named like a work step must not satisfy a work lookup.
        let plan = plan(vec![Spec::Sleep(timer("a")), Spec::Work(task("b"))]);
        assert_eq!(plan.spec_after(SpecKind::Work, "a"), None);
        assert_eq!(
            plan.spec_after(SpecKind::Sleep, "a"),
            Some(&Spec::Work(task("b")))
        );
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let plan = plan(vec![Spec::Work(task("a")), Spec::Sleep(timer("a"))]);
        assert!(matches!(
            plan.validate(),
            Err(PlanError::DuplicateName(name)) if name == "a"
        ));
    }

    #[test]
    fn validate_rejects_zero_timeouts() {
        let mut bad = task("a");
        bad.timeout_secs = 0;
        let plan = plan(vec![Spec::Work(bad)]);
        assert!(matches!(plan.validate(), Err(PlanError::ZeroTimeout(_))));
    }

    #[test]
    fn validate_accepts_well_formed_plans() {
        let plan = plan(vec![Spec::Work(task("a")), Spec::Sleep(timer("s"))]);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn plan_round_trips_through_yaml() {
        let plan = plan(vec![Spec::Work(task("a")), Spec::Sleep(timer("s"))]);
        let yaml = serde_yaml::to_string(&plan).unwrap();
        let parsed: Plan = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(plan, parsed);
    }

    #[test]
    fn plan_round_trips_through_json() {
        let plan = plan(vec![Spec::Sleep(timer("s")), Spec::Work(task("a"))]);
        let json = serde_json::to_string(&plan).unwrap();
        assert!(json.contains("\"kind\":\"sleep\""));
        let parsed: Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, parsed);
    }
}
