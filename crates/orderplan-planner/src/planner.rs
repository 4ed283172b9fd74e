//! Plan source trait and configuration.

use std::collections::HashMap;

use async_trait::async_trait;
use orderplan_core::{EngineError, Plan, Result};
use orderplan_registry::FunctionRegistry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Prompt used to ask a model for a fulfillment plan.
///
/// `{functions_description}` and `{scenario}` are substituted by
/// [`render_prompt`].
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"
You are an order fulfillment assistant. Your task is to create a detailed plan for processing orders,
managing inventory, and coordinating with suppliers.

The available functions and their descriptions are:
{functions_description}

Please create a detailed plan for the following scenario:
{scenario}

Respond with a JSON object of the form {"steps": [{"stepId": 1, "operation": "...", "arguments": {...}}]}.
Number the steps from 1 and only use the functions listed above.
*** Ensure that 'instructionsComplete' is the last step. Don't run indefinitely, even if an error occurs. ***
"#;

/// Configuration for plan generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlannerConfig {
    /// Model identifier recorded in generated plan metadata.
    pub planner_model: String,

    /// Prompt template with `{functions_description}` and `{scenario}`.
    pub prompt_template: String,

    /// Maximum number of steps accepted in a plan.
    pub max_steps: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            planner_model: "o1-mini".to_string(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            max_steps: 100,
        }
    }
}

/// Fill the prompt template for `goal` with the registry's operations.
pub fn render_prompt(config: &PlannerConfig, goal: &str, registry: &FunctionRegistry) -> String {
    config
        .prompt_template
        .replace("{functions_description}", &registry.functions_description())
        .replace("{scenario}", goal)
}

/// Anything that can turn a goal into a plan.
///
/// Model-backed generators live outside the engine and implement this
/// trait; the engine only ever sees the resulting [`Plan`].
#[async_trait]
pub trait PlanSource: Send + Sync {
    /// Produce a plan for `goal` using the operations in `registry`.
    async fn generate(&self, goal: &str, registry: &FunctionRegistry) -> Result<Plan>;

    /// Get the planner configuration.
    fn config(&self) -> &PlannerConfig;
}

/// Serves plans generated earlier, keyed by goal.
#[derive(Debug, Clone, Default)]
pub struct StoredPlanSource {
    config: PlannerConfig,
    plans: HashMap<String, Plan>,
}

impl StoredPlanSource {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            plans: HashMap::new(),
        }
    }

    /// Store a plan for `goal`, replacing any earlier one.
    pub fn insert(&mut self, goal: impl Into<String>, plan: Plan) {
        self.plans.insert(goal.into(), plan);
    }

    pub fn with_plan(mut self, goal: impl Into<String>, plan: Plan) -> Self {
        self.insert(goal, plan);
        self
    }

    /// Parse a plan document and store it for `goal`.
    pub fn insert_json(&mut self, goal: impl Into<String>, document: &str) -> Result<()> {
        let plan = Plan::from_json(document)?;
        self.insert(goal, plan);
        Ok(())
    }

    pub fn goals(&self) -> Vec<&str> {
        let mut goals: Vec<&str> = self.plans.keys().map(String::as_str).collect();
        goals.sort_unstable();
        goals
    }
}

#[async_trait]
impl PlanSource for StoredPlanSource {
    async fn generate(&self, goal: &str, registry: &FunctionRegistry) -> Result<Plan> {
        let plan = self.plans.get(goal).ok_or_else(|| EngineError::Planning {
            message: format!("no stored plan for goal '{goal}'"),
        })?;

        if plan.len() > self.config.max_steps {
            return Err(EngineError::Planning {
                message: format!(
                    "plan has {} steps, limit is {}",
                    plan.len(),
                    self.config.max_steps
                ),
            });
        }

        let unknown = plan
            .operations()
            .into_iter()
            .filter(|op| !registry.contains(op))
            .count();
        debug!(goal, unknown, "Serving stored plan");
        info!("Loaded stored plan with {} steps", plan.len());
        Ok(plan.clone())
    }

    fn config(&self) -> &PlannerConfig {
        &self.config
    }
}
