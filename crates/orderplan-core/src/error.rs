//! Error types for the Orderplan engine.

use thiserror::Error;

use crate::types::RunState;

/// Main error type for Orderplan operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The plan is structurally malformed and cannot be executed.
    #[error("Plan invalid{}: {message}", step_suffix(.step_id))]
    PlanInvalid { step_id: Option<u32>, message: String },

    /// No operation with this name is registered.
    #[error("Unknown operation: {name}")]
    UnknownOperation { name: String },

    /// An operation with this name is already registered.
    #[error("Operation already registered: {name}")]
    DuplicateRegistration { name: String },

    /// A supplied argument is missing or does not match the parameter schema.
    #[error("Invalid argument '{parameter}' for {operation}: {message}")]
    ArgumentValidation {
        operation: String,
        parameter: String,
        message: String,
    },

    /// An operation refused to run because a business rule would be broken.
    #[error("Business rule violated: {0}")]
    BusinessRule(#[from] BusinessRuleViolation),

    /// The context no longer satisfies its invariants.
    #[error("Context invariant violated: {message}")]
    InvariantViolation { message: String },

    /// The executor was driven from a state that does not allow the action.
    #[error("Cannot {action} while executor is {state}")]
    InvalidState { state: RunState, action: String },

    /// A context configuration does not satisfy the context invariants.
    #[error("Context invalid: {message}")]
    ContextInvalid { message: String },

    /// Resource not found.
    #[error("Resource not found: {resource_type} '{id}'")]
    NotFound { resource_type: String, id: String },

    /// A plan source could not produce a plan.
    #[error("Planning failed: {message}")]
    Planning { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

fn step_suffix(step_id: &Option<u32>) -> String {
    step_id.map(|id| format!(" at step {id}")).unwrap_or_default()
}

impl EngineError {
    /// Returns true for errors that are recorded against a single step and
    /// do not by themselves terminate the process.
    pub fn is_step_level(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownOperation { .. }
                | EngineError::ArgumentValidation { .. }
                | EngineError::BusinessRule(_)
                | EngineError::InvariantViolation { .. }
        )
    }

    /// Returns the offending parameter name, if the error names one.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            EngineError::ArgumentValidation { parameter, .. } => Some(parameter),
            _ => None,
        }
    }

    pub(crate) fn argument(
        operation: impl Into<String>,
        parameter: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EngineError::ArgumentValidation {
            operation: operation.into(),
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

/// Domain failures raised by context mutation primitives.
///
/// These are ordinary values: a violation leaves the context untouched and is
/// recorded in the trace as a failed step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusinessRuleViolation {
    #[error("insufficient inventory for {item}: requested {requested}, available {available}")]
    InsufficientInventory {
        item: String,
        requested: u64,
        available: u64,
    },

    #[error("warehouse capacity exceeded: {active} of {capacity} slots in use")]
    CapacityExceeded { capacity: u64, active: u64 },

    #[error("no active orders to release")]
    NoActiveOrders,

    #[error("order {order_id} is already scheduled")]
    AlreadyScheduled { order_id: String },

    #[error("order {order_id} is not scheduled")]
    NotScheduled { order_id: String },

    #[error("supplier {supplier} not found")]
    UnknownSupplier { supplier: String },

    #[error("{item} not available from supplier {supplier}")]
    ItemNotStocked { supplier: String, item: String },

    #[error("quantity {requested} of {item} is below the minimum order of {minimum} for {supplier}")]
    BelowMinimumOrder {
        supplier: String,
        item: String,
        minimum: u64,
        requested: u64,
    },

    #[error("quantity must be positive")]
    ZeroQuantity,
}

/// Convenience Result type for Orderplan operations.
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
