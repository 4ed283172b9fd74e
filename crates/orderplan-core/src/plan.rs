//! Plan model.
//!
//! A [`Plan`] is an ordered, immutable list of [`Step`]s. Step ids are
//! 1-based and contiguous, so `step_id == position + 1` for every step.
//! Plans are validated when they are built or parsed; an invalid plan never
//! reaches an executor.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::args::Arguments;
use crate::error::{EngineError, Result};

/// First step id of every plan.
pub const FIRST_STEP_ID: u32 = 1;

/// One operation invocation in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Position in the plan, starting at [`FIRST_STEP_ID`].
    pub step_id: u32,

    /// Registry name of the operation to invoke.
    pub operation: String,

    /// Named arguments passed to the operation.
    #[serde(default)]
    pub arguments: Arguments,

    /// Earlier steps this step relies on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<u32>,
}

impl Step {
    /// Create a step with no arguments.
    pub fn new(step_id: u32, operation: impl Into<String>) -> Self {
        Self {
            step_id,
            operation: operation.into(),
            arguments: Arguments::new(),
            depends_on: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    /// Add a dependency on an earlier step.
    pub fn depends_on(mut self, step_id: u32) -> Self {
        self.depends_on.push(step_id);
        self
    }
}

/// Provenance of a plan produced by a planning collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetadata {
    /// The goal or scenario the plan was generated for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,

    /// Model that produced the plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,

    /// When the plan was generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PlanMetadata {
    pub fn is_empty(&self) -> bool {
        self.scenario.is_none() && self.model_used.is_none() && self.created_at.is_none()
    }
}

/// A validated, ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PlanDocument")]
pub struct Plan {
    steps: Vec<Step>,

    #[serde(skip_serializing_if = "PlanMetadata::is_empty")]
    metadata: PlanMetadata,
}

/// Accepted wire shapes: `{"steps": [...], "metadata": {...}}` or a bare
/// array of steps.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PlanDocument {
    Full {
        steps: Vec<Step>,
        #[serde(default)]
        metadata: PlanMetadata,
    },
    Bare(Vec<Step>),
}

impl TryFrom<PlanDocument> for Plan {
    type Error = EngineError;

    fn try_from(doc: PlanDocument) -> Result<Self> {
        match doc {
            PlanDocument::Full { steps, metadata } => Plan::with_metadata(steps, metadata),
            PlanDocument::Bare(steps) => Plan::new(steps),
        }
    }
}

impl Plan {
    /// Validate and wrap a list of steps.
    pub fn new(steps: Vec<Step>) -> Result<Self> {
        Self::with_metadata(steps, PlanMetadata::default())
    }

    /// Validate and wrap a list of steps together with provenance.
    pub fn with_metadata(steps: Vec<Step>, metadata: PlanMetadata) -> Result<Self> {
        validate_steps(&steps)?;
        Ok(Self { steps, metadata })
    }

    /// A plan with no steps.
    pub fn empty() -> Self {
        Self {
            steps: Vec::new(),
            metadata: PlanMetadata::default(),
        }
    }

    /// Start building a plan with automatically numbered steps.
    pub fn builder() -> PlanBuilder {
        PlanBuilder::default()
    }

    /// Parse the plan interchange format.
    ///
    /// Malformed JSON is a serialization error; well-formed JSON with the
    /// wrong shape or step numbering is a structural plan error.
    pub fn from_json(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_value(value)
    }

    /// Convert an already-parsed JSON document.
    pub fn from_value(value: Value) -> Result<Self> {
        let doc: PlanDocument =
            serde_json::from_value(value).map_err(|e| EngineError::PlanInvalid {
                step_id: None,
                message: format!("malformed plan document: {e}"),
            })?;
        Plan::try_from(doc)
    }

    /// Serialize to the interchange format.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn metadata(&self) -> &PlanMetadata {
        &self.metadata
    }

    /// Look up a step by id.
    pub fn step(&self, step_id: u32) -> Option<&Step> {
        let index = step_id.checked_sub(FIRST_STEP_ID)? as usize;
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Distinct operation names in first-use order.
    pub fn operations(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.steps
            .iter()
            .map(|s| s.operation.as_str())
            .filter(|op| seen.insert(*op))
            .collect()
    }
}

fn validate_steps(steps: &[Step]) -> Result<()> {
    let mut seen = HashSet::new();

    for (index, step) in steps.iter().enumerate() {
        let invalid = |message: String| EngineError::PlanInvalid {
            step_id: Some(step.step_id),
            message,
        };

        if step.operation.trim().is_empty() {
            return Err(invalid("operation name is empty".to_string()));
        }

        if !seen.insert(step.step_id) {
            return Err(invalid("duplicate step id".to_string()));
        }

        let expected = FIRST_STEP_ID + index as u32;
        if step.step_id != expected {
            return Err(invalid(format!(
                "step ids must be contiguous from {FIRST_STEP_ID}: expected {expected}, found {}",
                step.step_id
            )));
        }

        for dep in &step.depends_on {
            if *dep < FIRST_STEP_ID || *dep >= step.step_id {
                return Err(invalid(format!(
                    "depends on step {dep}, which does not precede it"
                )));
            }
        }
    }

    Ok(())
}

/// Builder that numbers steps in insertion order.
#[derive(Debug, Default)]
pub struct PlanBuilder {
    steps: Vec<(String, Value, Vec<u32>)>,
    metadata: PlanMetadata,
}

impl PlanBuilder {
    /// Append a step. `arguments` must be a JSON object or `null`.
    pub fn step(self, operation: impl Into<String>, arguments: Value) -> Self {
        self.step_after(operation, arguments, Vec::new())
    }

    /// Append a step that depends on earlier steps.
    pub fn step_after(
        mut self,
        operation: impl Into<String>,
        arguments: Value,
        depends_on: Vec<u32>,
    ) -> Self {
        self.steps.push((operation.into(), arguments, depends_on));
        self
    }

    pub fn scenario(mut self, scenario: impl Into<String>) -> Self {
        self.metadata.scenario = Some(scenario.into());
        self
    }

    pub fn model_used(mut self, model: impl Into<String>) -> Self {
        self.metadata.model_used = Some(model.into());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.created_at = Some(at);
        self
    }

    /// Build the plan.
    pub fn build(self) -> Result<Plan> {
        let mut steps = Vec::with_capacity(self.steps.len());

        for (index, (operation, arguments, depends_on)) in self.steps.into_iter().enumerate() {
            let step_id = FIRST_STEP_ID + index as u32;
            let arguments = match arguments {
                Value::Object(map) => map,
                Value::Null => Arguments::new(),
                _ => {
                    return Err(EngineError::PlanInvalid {
                        step_id: Some(step_id),
                        message: "arguments must be an object".to_string(),
                    })
                }
            };
            steps.push(Step {
                step_id,
                operation,
                arguments,
                depends_on,
            });
        }

        Plan::with_metadata(steps, self.metadata)
    }
}
