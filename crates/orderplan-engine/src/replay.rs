//! Replaying one plan against several contexts.
//!
//! Every context gets its own [`Executor`] on a blocking task. The
//! registry is shared read-only; nothing else crosses runs.

use std::sync::Arc;

use orderplan_core::{Context, EngineError, Plan, Result, RunState, StepStatus};
use orderplan_registry::FunctionRegistry;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::ExecutorConfig;
use crate::executor::{Executor, RunOutcome};

/// Outcome of the plan in one named context.
#[derive(Debug, Clone, Serialize)]
pub struct ContextRun {
    pub context: String,
    pub outcome: RunOutcome,
}

/// A step whose status is not the same in every context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Divergence {
    pub step_id: u32,
    /// Status per context, in replay order; `None` if never attempted.
    pub statuses: Vec<(String, Option<StepStatus>)>,
}

/// Outcomes of one plan across contexts, in the order they were given.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: usize,
    pub runs: Vec<ContextRun>,
}

impl ReplayReport {
    pub fn run(&self, context: &str) -> Option<&RunOutcome> {
        self.runs
            .iter()
            .find(|r| r.context == context)
            .map(|r| &r.outcome)
    }

    /// Steps whose status differs between at least two contexts.
    pub fn divergence(&self) -> Vec<Divergence> {
        (1..=self.steps as u32)
            .filter_map(|step_id| {
                let statuses: Vec<(String, Option<StepStatus>)> = self
                    .runs
                    .iter()
                    .map(|r| {
                        let status = r.outcome.trace.get(step_id).map(|s| s.status);
                        (r.context.clone(), status)
                    })
                    .collect();

                let first = statuses.first().map(|(_, s)| *s);
                if statuses.iter().all(|(_, s)| Some(*s) == first) {
                    return None;
                }
                Some(Divergence { step_id, statuses })
            })
            .collect()
    }

    /// True when the plan completed everywhere with identical step statuses.
    pub fn generalizes(&self) -> bool {
        !self.runs.is_empty()
            && self.runs.iter().all(|r| r.outcome.state == RunState::Completed)
            && self.divergence().is_empty()
    }

    pub fn completed(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| r.outcome.state == RunState::Completed)
            .count()
    }
}

/// Run `plan` against each context concurrently.
pub async fn replay(
    registry: Arc<FunctionRegistry>,
    plan: Plan,
    contexts: Vec<(String, Context)>,
    config: ExecutorConfig,
) -> Result<ReplayReport> {
    info!(
        "Replaying {}-step plan against {} contexts",
        plan.len(),
        contexts.len()
    );

    let steps = plan.len();
    let mut tasks = JoinSet::new();
    for (index, (name, context)) in contexts.into_iter().enumerate() {
        let registry = Arc::clone(&registry);
        let plan = plan.clone();
        let config = config.clone();
        tasks.spawn_blocking(move || {
            let outcome = Executor::new(registry, plan, context, config).run();
            (index, name, outcome)
        });
    }

    let mut runs: Vec<(usize, ContextRun)> = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let (index, context, outcome) =
            joined.map_err(|e| EngineError::Internal(format!("replay task failed: {e}")))?;
        let outcome = outcome?;
        if outcome.state != RunState::Completed {
            warn!("Plan {} in context {}", outcome.state, context);
        }
        runs.push((index, ContextRun { context, outcome }));
    }
    runs.sort_by_key(|(index, _)| *index);

    let report = ReplayReport {
        steps,
        runs: runs.into_iter().map(|(_, run)| run).collect(),
    };
    info!(
        "Replay finished: {}/{} contexts completed",
        report.completed(),
        report.runs.len()
    );
    Ok(report)
}

/// Replay against named context presets.
pub async fn replay_presets(
    registry: Arc<FunctionRegistry>,
    plan: Plan,
    presets: &[String],
    config: ExecutorConfig,
) -> Result<ReplayReport> {
    let mut contexts = Vec::with_capacity(presets.len());
    for name in presets {
        contexts.push((name.clone(), Context::preset(name)?));
    }
    replay(registry, plan, contexts, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderplan_core::ContextConfig;
    use serde_json::json;

    fn builtins() -> Arc<FunctionRegistry> {
        Arc::new(FunctionRegistry::with_builtins().unwrap())
    }

    fn fulfillment_plan() -> Plan {
        Plan::builder()
            .step("checkInventory", json!({"item": "SKU001"}))
            .step_after(
                "allocateInventory",
                json!({"orderId": "ORD001", "item": "SKU001", "qty": 30}),
                vec![1],
            )
            .step_after(
                "scheduleProcessing",
                json!({"orderId": "ORD001", "priority": "Standard"}),
                vec![2],
            )
            .step("instructionsComplete", json!({}))
            .build()
            .unwrap()
    }

    fn presets(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_replay_preserves_order() {
        let report = replay_presets(
            builtins(),
            fulfillment_plan(),
            &presets(&["high_capacity", "default", "low_inventory"]),
            ExecutorConfig::default(),
        )
        .await
        .unwrap();

        let names: Vec<&str> = report.runs.iter().map(|r| r.context.as_str()).collect();
        assert_eq!(names, vec!["high_capacity", "default", "low_inventory"]);
    }

    #[tokio::test]
    async fn test_low_inventory_diverges() {
        let report = replay_presets(
            builtins(),
            fulfillment_plan(),
            &presets(&["default", "low_inventory"]),
            ExecutorConfig::continue_on_error(),
        )
        .await
        .unwrap();

        assert_eq!(report.run("default").unwrap().state, RunState::Completed);
        let low = report.run("low_inventory").unwrap();
        assert_eq!(
            low.statuses(),
            vec![
                StepStatus::Succeeded,
                StepStatus::Failed,
                StepStatus::Skipped,
                StepStatus::Succeeded
            ]
        );

        let divergence = report.divergence();
        let ids: Vec<u32> = divergence.iter().map(|d| d.step_id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(!report.generalizes());
    }

    #[tokio::test]
    async fn test_generalizing_plan() {
        let report = replay_presets(
            builtins(),
            fulfillment_plan(),
            &presets(&["default", "high_capacity"]),
            ExecutorConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.completed(), 2);
        assert!(report.divergence().is_empty());
        assert!(report.generalizes());

        // Same statuses, but outputs still reflect each context.
        let default = report.run("default").unwrap();
        let high = report.run("high_capacity").unwrap();
        assert_eq!(default.statuses(), high.statuses());
        assert_ne!(default.trace_digest, high.trace_digest);
    }

    #[tokio::test]
    async fn test_aborted_runs_diverge_on_unattempted_steps() {
        let report = replay_presets(
            builtins(),
            fulfillment_plan(),
            &presets(&["default", "low_inventory"]),
            ExecutorConfig::default(),
        )
        .await
        .unwrap();

        let divergence = report.divergence();
        assert_eq!(divergence.len(), 3);
        assert_eq!(
            divergence[1].statuses,
            vec![
                ("default".to_string(), Some(StepStatus::Succeeded)),
                ("low_inventory".to_string(), None)
            ]
        );
    }

    #[tokio::test]
    async fn test_contexts_are_isolated() {
        let ctx = ContextConfig::new()
            .with_item("widget", 3)
            .with_capacity(1)
            .build()
            .unwrap();
        let plan = Plan::builder()
            .step("reserveInventory", json!({"item": "widget", "qty": 3}))
            .build()
            .unwrap();

        let contexts = vec![("a".to_string(), ctx.clone()), ("b".to_string(), ctx)];
        let report = replay(builtins(), plan, contexts, ExecutorConfig::default())
            .await
            .unwrap();

        assert!(report.generalizes());
        for run in &report.runs {
            assert_eq!(run.outcome.terminal.quantity("widget"), 0);
        }
    }

    #[tokio::test]
    async fn test_unknown_preset() {
        let err = replay_presets(
            builtins(),
            fulfillment_plan(),
            &presets(&["moon_base"]),
            ExecutorConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_no_contexts() {
        let report = replay(builtins(), fulfillment_plan(), Vec::new(), ExecutorConfig::default())
            .await
            .unwrap();
        assert!(report.runs.is_empty());
        assert!(!report.generalizes());
    }
}
