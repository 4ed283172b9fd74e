//! Plan executor.
//!
//! An [`Executor`] owns one run: a plan, the context it mutates and the
//! trace it records. The run moves `Ready -> Running -> Completed | Aborted`
//! and every transition is driven by [`Executor::step`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use orderplan_core::{
    Context, ContextSnapshot, EngineError, ExecutionTrace, Plan, Result, RunState, Step,
    StepResult, StepStatus,
};
use orderplan_registry::{FunctionRegistry, StepOutcome};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ExecutorConfig;

/// Final record of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub state: RunState,
    pub trace: ExecutionTrace,
    pub initial: ContextSnapshot,
    pub terminal: ContextSnapshot,
    pub trace_digest: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }

    pub fn statuses(&self) -> Vec<StepStatus> {
        self.trace.statuses()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Drives one plan against one context.
pub struct Executor {
    run_id: Uuid,
    registry: Arc<FunctionRegistry>,
    plan: Plan,
    config: ExecutorConfig,
    context: Context,
    initial: ContextSnapshot,
    state: RunState,
    cursor: usize,
    trace: ExecutionTrace,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Executor {
    /// Create an executor in the `Ready` state.
    pub fn new(
        registry: Arc<FunctionRegistry>,
        plan: Plan,
        context: Context,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            registry,
            plan,
            config,
            initial: context.snapshot(),
            context,
            state: RunState::Ready,
            cursor: 0,
            trace: ExecutionTrace::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn trace(&self) -> &ExecutionTrace {
        &self.trace
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// The step the next call to [`step`](Self::step) will attempt.
    pub fn next_step(&self) -> Option<&Step> {
        if self.state.is_terminal() {
            return None;
        }
        self.plan.steps().get(self.cursor)
    }

    /// Attempt the next step and return the resulting run state.
    ///
    /// A plan with no steps completes on the first call.
    pub fn step(&mut self) -> Result<RunState> {
        if self.state.is_terminal() {
            return Err(EngineError::InvalidState {
                state: self.state,
                action: "step".to_string(),
            });
        }

        if self.state == RunState::Ready {
            self.start();
        }

        let Some(step) = self.plan.steps().get(self.cursor).cloned() else {
            self.finish(RunState::Completed);
            return Ok(self.state);
        };
        self.cursor += 1;

        let result = self.attempt(&step);
        let failed = result.status == StepStatus::Failed;
        self.trace.push(result);

        if failed && !self.config.continue_on_error {
            self.finish(RunState::Aborted);
        } else if self.cursor == self.plan.len() {
            self.finish(RunState::Completed);
        }

        Ok(self.state)
    }

    /// Drive the run to a terminal state.
    pub fn run(&mut self) -> Result<RunOutcome> {
        if self.state.is_terminal() {
            return Err(EngineError::InvalidState {
                state: self.state,
                action: "run".to_string(),
            });
        }

        while !self.state.is_terminal() {
            self.step()?;
        }
        Ok(self.outcome())
    }

    /// Consume a finished executor.
    pub fn into_outcome(self) -> Result<RunOutcome> {
        if !self.state.is_terminal() {
            return Err(EngineError::InvalidState {
                state: self.state,
                action: "into_outcome".to_string(),
            });
        }
        Ok(self.outcome())
    }

    fn start(&mut self) {
        self.state = RunState::Running;
        self.started_at = Some(Utc::now());
        info!(
            run_id = %self.run_id,
            steps = self.plan.len(),
            continue_on_error = self.config.continue_on_error,
            "Run started"
        );
    }

    fn finish(&mut self, state: RunState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
        info!(
            run_id = %self.run_id,
            state = %state,
            attempted = self.trace.len(),
            failed = self.trace.failed().len(),
            "Run finished"
        );
    }

    fn attempt(&mut self, step: &Step) -> StepResult {
        if self.config.continue_on_error {
            if let Some(blocker) = self.blocker(step) {
                debug!(
                    run_id = %self.run_id,
                    step = step.step_id,
                    blocked_by = blocker,
                    "Skipping {}", step.operation
                );
                return StepResult::skipped(step, blocker);
            }
        }

        match self.invoke(step) {
            Ok(output) => {
                debug!(run_id = %self.run_id, step = step.step_id, "{} succeeded", step.operation);
                StepResult::succeeded(step, output)
            }
            Err(err) => {
                warn!(run_id = %self.run_id, step = step.step_id, "{} failed: {}", step.operation, err);
                StepResult::failed(step, &err)
            }
        }
    }

    /// First prerequisite of `step` that failed or was skipped.
    fn blocker(&self, step: &Step) -> Option<u32> {
        step.depends_on.iter().copied().find(|id| {
            self.trace
                .get(*id)
                .is_some_and(|r| r.status.blocks_dependents())
        })
    }

    /// Run the operation against a staged copy and commit it on success.
    fn invoke(&mut self, step: &Step) -> StepOutcome {
        let registry = Arc::clone(&self.registry);
        let entry = registry.resolve(&step.operation)?;
        registry.validate_arguments(entry, &step.arguments)?;

        let mut staged = self.context.clone();
        let output = entry.invoke(&mut staged, &step.arguments)?;
        staged
            .check_invariants()
            .map_err(|message| EngineError::InvariantViolation { message })?;

        self.context = staged;
        Ok(output)
    }

    fn outcome(&self) -> RunOutcome {
        let finished_at = self.finished_at.unwrap_or_else(Utc::now);
        RunOutcome {
            run_id: self.run_id,
            state: self.state,
            trace: self.trace.clone(),
            initial: self.initial.clone(),
            terminal: self.context.snapshot(),
            trace_digest: self.trace.digest(),
            started_at: self.started_at.unwrap_or(finished_at),
            finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderplan_core::{Arguments, ContextConfig, Priority, StepErrorKind};
    use orderplan_registry::ParameterSchema;
    use serde_json::json;

    fn builtins() -> Arc<FunctionRegistry> {
        Arc::new(FunctionRegistry::with_builtins().unwrap())
    }

    fn widgets(stock: u64) -> Context {
        ContextConfig::new()
            .with_item("widget", stock)
            .with_capacity(10)
            .build()
            .unwrap()
    }

    /// Reserve 3, reserve 3 again, then check what is left.
    fn widget_plan() -> Plan {
        Plan::builder()
            .step("reserveInventory", json!({"item": "widget", "qty": 3}))
            .step("reserveInventory", json!({"item": "widget", "qty": 3}))
            .step("checkInventory", json!({"item": "widget"}))
            .build()
            .unwrap()
    }

    #[test]
    fn test_widget_plan_aborts_by_default() {
        let mut executor = Executor::new(
            builtins(),
            widget_plan(),
            widgets(5),
            ExecutorConfig::default(),
        );
        let outcome = executor.run().unwrap();

        assert_eq!(outcome.state, RunState::Aborted);
        assert_eq!(
            outcome.statuses(),
            vec![StepStatus::Succeeded, StepStatus::Failed]
        );
        let error = outcome.trace.get(2).unwrap().error.as_ref().unwrap();
        assert_eq!(error.kind, StepErrorKind::BusinessRule);
        assert_eq!(outcome.terminal.quantity("widget"), 2);
        assert_eq!(outcome.initial.quantity("widget"), 5);
    }

    #[test]
    fn test_widget_plan_continues_on_error() {
        let mut executor = Executor::new(
            builtins(),
            widget_plan(),
            widgets(5),
            ExecutorConfig::continue_on_error(),
        );
        let outcome = executor.run().unwrap();

        assert_eq!(outcome.state, RunState::Completed);
        assert_eq!(
            outcome.statuses(),
            vec![StepStatus::Succeeded, StepStatus::Failed, StepStatus::Succeeded]
        );
        assert_eq!(outcome.trace.get(3).unwrap().output, Some(json!({"item": "widget", "quantity": 2})));
        assert_eq!(outcome.terminal.quantity("widget"), 2);
    }

    #[test]
    fn test_oversized_second_reservation_under_both_policies() {
        let ctx = ContextConfig::new()
            .with_item("widget", 5)
            .with_capacity(2)
            .build()
            .unwrap();
        let plan = Plan::builder()
            .step("reserveInventory", json!({"item": "widget", "qty": 3}))
            .step("reserveInventory", json!({"item": "widget", "qty": 4}))
            .build()
            .unwrap();

        let halted = Executor::new(builtins(), plan.clone(), ctx.clone(), ExecutorConfig::default())
            .run()
            .unwrap();
        assert_eq!(halted.state, RunState::Aborted);
        assert_eq!(
            halted.statuses(),
            vec![StepStatus::Succeeded, StepStatus::Failed]
        );
        assert_eq!(
            halted.trace.get(2).unwrap().error.as_ref().unwrap().message,
            "insufficient inventory for widget: requested 4, available 2"
        );
        assert_eq!(halted.terminal.quantity("widget"), 2);

        let continued = Executor::new(builtins(), plan, ctx, ExecutorConfig::continue_on_error())
            .run()
            .unwrap();
        assert_eq!(continued.state, RunState::Completed);
        assert_eq!(
            continued.statuses(),
            vec![StepStatus::Succeeded, StepStatus::Failed]
        );
        assert_eq!(continued.terminal.quantity("widget"), 2);
        assert_eq!(continued.trace_digest, halted.trace_digest);
    }

    #[test]
    fn test_dependents_of_failed_step_are_skipped() {
        let plan = Plan::builder()
            .step("reserveInventory", json!({"item": "widget", "qty": 9}))
            .step_after("checkInventory", json!({"item": "widget"}), vec![1])
            .step_after("checkInventory", json!({"item": "widget"}), vec![2])
            .step("checkInventory", json!({"item": "widget"}))
            .build()
            .unwrap();

        let mut executor = Executor::new(
            builtins(),
            plan,
            widgets(5),
            ExecutorConfig::continue_on_error(),
        );
        let outcome = executor.run().unwrap();

        assert_eq!(
            outcome.statuses(),
            vec![
                StepStatus::Failed,
                StepStatus::Skipped,
                StepStatus::Skipped,
                StepStatus::Succeeded
            ]
        );
        assert_eq!(outcome.trace.get(2).unwrap().blocked_by, Some(1));
        assert_eq!(outcome.trace.get(3).unwrap().blocked_by, Some(2));
    }

    #[test]
    fn test_unknown_operation_fails_without_mutation() {
        let plan = Plan::builder()
            .step("teleportInventory", json!({"item": "widget"}))
            .build()
            .unwrap();
        let ctx = widgets(5);

        let mut executor = Executor::new(builtins(), plan, ctx.clone(), ExecutorConfig::default());
        let outcome = executor.run().unwrap();

        assert_eq!(outcome.state, RunState::Aborted);
        let error = outcome.trace.get(1).unwrap().error.as_ref().unwrap();
        assert_eq!(error.kind, StepErrorKind::UnknownOperation);
        assert_eq!(outcome.terminal.to_context(), ctx);
    }

    #[test]
    fn test_argument_error_names_parameter() {
        let plan = Plan::builder()
            .step("reserveInventory", json!({"item": "widget"}))
            .build()
            .unwrap();

        let mut executor = Executor::new(builtins(), plan, widgets(5), ExecutorConfig::default());
        let outcome = executor.run().unwrap();

        let error = outcome.trace.get(1).unwrap().error.as_ref().unwrap();
        assert_eq!(error.kind, StepErrorKind::ArgumentValidation);
        assert_eq!(error.parameter.as_deref(), Some("qty"));
    }

    #[test]
    fn test_deterministic_across_clones() {
        let ctx = Context::preset("default").unwrap();
        let plan = Plan::builder()
            .step("getPendingOrders", json!({}))
            .step(
                "allocateInventory",
                json!({"orderId": "ORD001", "item": "SKU001", "qty": 30}),
            )
            .step(
                "scheduleProcessing",
                json!({"orderId": "ORD001", "priority": "Standard"}),
            )
            .step(
                "createPurchaseOrder",
                json!({"supplier": "SUP002", "item": "SKU003", "qty": 40}),
            )
            .step("instructionsComplete", json!({}))
            .build()
            .unwrap();

        let registry = builtins();
        let a = Executor::new(registry.clone(), plan.clone(), ctx.clone(), ExecutorConfig::default())
            .run()
            .unwrap();
        let b = Executor::new(registry, plan, ctx.clone(), ExecutorConfig::default())
            .run()
            .unwrap();

        assert_eq!(a.state, RunState::Completed);
        assert_eq!(a.trace, b.trace);
        assert_eq!(a.trace_digest, b.trace_digest);
        assert_eq!(a.terminal, b.terminal);
        assert_ne!(a.run_id, b.run_id);

        // The caller's context is untouched by both runs.
        assert_eq!(ctx, Context::preset("default").unwrap());
    }

    #[test]
    fn test_zero_step_plan() {
        let ctx = widgets(1);
        let mut executor = Executor::new(
            builtins(),
            Plan::empty(),
            ctx.clone(),
            ExecutorConfig::default(),
        );
        assert_eq!(executor.state(), RunState::Ready);
        assert_eq!(executor.step().unwrap(), RunState::Completed);
        assert!(executor.trace().is_empty());

        let outcome = executor.into_outcome().unwrap();
        assert_eq!(outcome.trace_digest, "0".repeat(64));
        assert_eq!(outcome.terminal.to_context(), ctx);
        assert_eq!(outcome.initial.to_context(), ctx);
    }

    #[test]
    fn test_incremental_stepping() {
        let mut executor = Executor::new(
            builtins(),
            widget_plan(),
            widgets(10),
            ExecutorConfig::default(),
        );

        assert_eq!(executor.next_step().unwrap().step_id, 1);
        assert_eq!(executor.step().unwrap(), RunState::Running);
        assert_eq!(executor.context().quantity("widget"), 7);
        assert_eq!(executor.step().unwrap(), RunState::Running);
        assert_eq!(executor.step().unwrap(), RunState::Completed);
        assert!(executor.next_step().is_none());
    }

    #[test]
    fn test_terminal_executor_rejects_work() {
        let mut executor = Executor::new(
            builtins(),
            Plan::empty(),
            widgets(1),
            ExecutorConfig::default(),
        );
        executor.run().unwrap();

        let err = executor.step().unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidState {
                state: RunState::Completed,
                action: "step".into()
            }
        );
        assert!(matches!(executor.run(), Err(EngineError::InvalidState { .. })));
    }

    #[test]
    fn test_into_outcome_requires_terminal_state() {
        let executor = Executor::new(
            builtins(),
            widget_plan(),
            widgets(10),
            ExecutorConfig::default(),
        );
        let err = executor.into_outcome().unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidState {
                state: RunState::Ready,
                ..
            }
        ));
    }

    #[test]
    fn test_failed_operation_discards_partial_mutation() {
        let mut registry = FunctionRegistry::new();
        registry
            .register(
                "overbook",
                ParameterSchema::new("Schedules three orders one at a time"),
                |ctx: &mut Context, _: &Arguments| -> StepOutcome {
                    ctx.record_notification("CUST", "X0", "scheduling");
                    for n in 0..3 {
                        ctx.occupy_capacity(&format!("X{n}"), Priority::Standard)?;
                    }
                    Ok(json!(null))
                },
            )
            .unwrap();
        let plan = Plan::builder().step("overbook", json!({})).build().unwrap();
        let ctx = ContextConfig::new().with_capacity(2).build().unwrap();

        let outcome = Executor::new(Arc::new(registry), plan, ctx.clone(), ExecutorConfig::default())
            .run()
            .unwrap();

        assert_eq!(outcome.state, RunState::Aborted);
        assert_eq!(outcome.terminal.to_context(), ctx);
        assert!(outcome.terminal.notifications().is_empty());
    }
}
