//! Pre-flight checks of a plan against a registry.

use orderplan_core::{Plan, StepError};
use orderplan_registry::FunctionRegistry;
use serde::Serialize;
use tracing::debug;

/// Operation a generated plan is expected to finish with.
pub const COMPLETION_OPERATION: &str = "instructionsComplete";

/// A problem found in one step without executing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanIssue {
    pub step_id: u32,
    pub operation: String,
    pub error: StepError,
}

/// Result of [`check_plan`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCheck {
    pub issues: Vec<PlanIssue>,

    /// Whether the last step is [`COMPLETION_OPERATION`].
    pub ends_with_completion: bool,
}

impl PlanCheck {
    /// True when every step resolves and has valid arguments.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Resolve every step and validate its arguments, without touching any
/// context. Business rules are not evaluated.
pub fn check_plan(plan: &Plan, registry: &FunctionRegistry) -> PlanCheck {
    let issues: Vec<PlanIssue> = plan
        .steps()
        .iter()
        .filter_map(|step| {
            let problem = registry
                .resolve(&step.operation)
                .and_then(|entry| registry.validate_arguments(entry, &step.arguments))
                .err()?;
            Some(PlanIssue {
                step_id: step.step_id,
                operation: step.operation.clone(),
                error: StepError::from(&problem),
            })
        })
        .collect();

    let ends_with_completion = plan
        .steps()
        .last()
        .is_some_and(|s| s.operation == COMPLETION_OPERATION);

    debug!(
        "Checked {} steps: {} issues",
        plan.len(),
        issues.len()
    );
    PlanCheck {
        issues,
        ends_with_completion,
    }
}
