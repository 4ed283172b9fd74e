//! Execution trace types.
//!
//! A trace holds one [`StepResult`] per attempted step, in attempt order.
//! It is append-only: recorded results are never rewritten.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::EngineError;
use crate::plan::Step;
use crate::types::StepStatus;

/// Classification of a step failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    UnknownOperation,
    ArgumentValidation,
    BusinessRule,
    InvariantViolation,
    /// The operation returned an error outside the step-level taxonomy.
    Internal,
}

/// Why a step failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepError {
    pub kind: StepErrorKind,

    /// Offending parameter for argument errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,

    pub message: String,
}

impl From<&EngineError> for StepError {
    fn from(err: &EngineError) -> Self {
        let kind = match err {
            EngineError::UnknownOperation { .. } => StepErrorKind::UnknownOperation,
            EngineError::ArgumentValidation { .. } => StepErrorKind::ArgumentValidation,
            EngineError::BusinessRule(_) => StepErrorKind::BusinessRule,
            EngineError::InvariantViolation { .. } => StepErrorKind::InvariantViolation,
            _ => StepErrorKind::Internal,
        };
        let message = match err {
            EngineError::BusinessRule(violation) => violation.to_string(),
            other => other.to_string(),
        };

        Self {
            kind,
            parameter: err.parameter().map(str::to_string),
            message,
        }
    }
}

/// Outcome of one attempted step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_id: u32,
    pub operation: String,
    pub status: StepStatus,

    /// Operation-specific result of a succeeded step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,

    /// Populated when the step failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,

    /// Prerequisite step that caused a skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<u32>,
}

impl StepResult {
    pub fn succeeded(step: &Step, output: serde_json::Value) -> Self {
        Self {
            step_id: step.step_id,
            operation: step.operation.clone(),
            status: StepStatus::Succeeded,
            output: Some(output),
            error: None,
            blocked_by: None,
        }
    }

    pub fn failed(step: &Step, error: &EngineError) -> Self {
        Self {
            step_id: step.step_id,
            operation: step.operation.clone(),
            status: StepStatus::Failed,
            output: None,
            error: Some(StepError::from(error)),
            blocked_by: None,
        }
    }

    pub fn skipped(step: &Step, blocked_by: u32) -> Self {
        Self {
            step_id: step.step_id,
            operation: step.operation.clone(),
            status: StepStatus::Skipped,
            output: None,
            error: None,
            blocked_by: Some(blocked_by),
        }
    }

    fn hash(&self) -> Vec<u8> {
        let json = serde_json::to_string(self).unwrap_or_default();
        Sha256::digest(json.as_bytes()).to_vec()
    }
}

/// Ordered record of step outcomes for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionTrace {
    results: Vec<StepResult>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the result of the next attempted step.
    pub fn push(&mut self, result: StepResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn last(&self) -> Option<&StepResult> {
        self.results.last()
    }

    /// Result recorded for a step, if it was attempted.
    pub fn get(&self, step_id: u32) -> Option<&StepResult> {
        self.results.iter().find(|r| r.step_id == step_id)
    }

    /// Statuses in attempt order.
    pub fn statuses(&self) -> Vec<StepStatus> {
        self.results.iter().map(|r| r.status).collect()
    }

    pub fn succeeded(&self) -> Vec<&StepResult> {
        self.with_status(StepStatus::Succeeded)
    }

    pub fn failed(&self) -> Vec<&StepResult> {
        self.with_status(StepStatus::Failed)
    }

    pub fn skipped(&self) -> Vec<&StepResult> {
        self.with_status(StepStatus::Skipped)
    }

    fn with_status(&self, status: StepStatus) -> Vec<&StepResult> {
        self.results.iter().filter(|r| r.status == status).collect()
    }

    /// Fraction of attempted steps that succeeded (0.0 to 1.0).
    pub fn success_rate(&self) -> f32 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.succeeded().len() as f32 / self.results.len() as f32
    }

    /// SHA-256 Merkle root over the recorded results, hex-encoded.
    ///
    /// Equal traces always have equal digests, so runs can be compared
    /// without shipping the whole trace.
    pub fn digest(&self) -> String {
        if self.results.is_empty() {
            return "0".repeat(64);
        }

        let mut hashes: Vec<Vec<u8>> = self.results.iter().map(StepResult::hash).collect();

        while hashes.len() > 1 {
            hashes = hashes
                .chunks(2)
                .map(|pair| {
                    let mut hasher = Sha256::new();
                    hasher.update(&pair[0]);
                    // Odd node is paired with itself.
                    hasher.update(pair.get(1).unwrap_or(&pair[0]));
                    hasher.finalize().to_vec()
                })
                .collect();
        }

        hashes[0].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusinessRuleViolation;
    use serde_json::json;

    fn step(id: u32) -> Step {
        Step::new(id, "reserveInventory")
    }

    #[test]
    fn test_failed_result_carries_detail() {
        let err = EngineError::ArgumentValidation {
            operation: "reserveInventory".into(),
            parameter: "qty".into(),
            message: "missing required parameter".into(),
        };
        let result = StepResult::failed(&step(1), &err);

        assert_eq!(result.status, StepStatus::Failed);
        let detail = result.error.unwrap();
        assert_eq!(detail.kind, StepErrorKind::ArgumentValidation);
        assert_eq!(detail.parameter.as_deref(), Some("qty"));
        assert!(result.output.is_none());
    }

    #[test]
    fn test_business_rule_message() {
        let err = EngineError::from(BusinessRuleViolation::InsufficientInventory {
            item: "widget".into(),
            requested: 4,
            available: 2,
        });
        let detail = StepError::from(&err);
        assert_eq!(detail.kind, StepErrorKind::BusinessRule);
        assert_eq!(
            detail.message,
            "insufficient inventory for widget: requested 4, available 2"
        );
    }

    #[test]
    fn test_trace_queries() {
        let mut trace = ExecutionTrace::new();
        trace.push(StepResult::succeeded(&step(1), json!({"remaining": 2})));
        trace.push(StepResult::failed(
            &step(2),
            &EngineError::UnknownOperation { name: "x".into() },
        ));
        trace.push(StepResult::skipped(&step(3), 2));

        assert_eq!(trace.len(), 3);
        assert_eq!(
            trace.statuses(),
            vec![StepStatus::Succeeded, StepStatus::Failed, StepStatus::Skipped]
        );
        assert_eq!(trace.get(3).unwrap().blocked_by, Some(2));
        assert!(trace.get(4).is_none());
        assert!((trace.success_rate() - 0.333).abs() < 0.01);
    }

    #[test]
    fn test_results_serialize_camel_case() {
        let skipped = serde_json::to_value(StepResult::skipped(&step(2), 1)).unwrap();
        assert_eq!(skipped["stepId"], 2);
        assert_eq!(skipped["blockedBy"], 1);
        assert_eq!(skipped["status"], "skipped");
        assert!(skipped.get("step_id").is_none());

        let err = EngineError::ArgumentValidation {
            operation: "reserveInventory".into(),
            parameter: "qty".into(),
            message: "missing required parameter".into(),
        };
        let failed = serde_json::to_value(StepResult::failed(&step(1), &err)).unwrap();
        assert_eq!(failed["stepId"], 1);
        assert_eq!(failed["error"]["kind"], "argument_validation");
        assert_eq!(failed["error"]["parameter"], "qty");

        let back: StepResult = serde_json::from_value(skipped).unwrap();
        assert_eq!(back.blocked_by, Some(1));
    }

    #[test]
    fn test_digest_tracks_content() {
        let empty = ExecutionTrace::new();
        assert_eq!(empty.digest(), "0".repeat(64));

        let mut a = ExecutionTrace::new();
        a.push(StepResult::succeeded(&step(1), json!(1)));
        a.push(StepResult::succeeded(&step(2), json!(2)));
        a.push(StepResult::succeeded(&step(3), json!(3)));

        let b = a.clone();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);

        let mut c = ExecutionTrace::new();
        c.push(StepResult::succeeded(&step(1), json!(1)));
        c.push(StepResult::succeeded(&step(2), json!(2)));
        c.push(StepResult::succeeded(&step(3), json!(4)));
        assert_ne!(a.digest(), c.digest());
    }
}
