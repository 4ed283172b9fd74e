//! # Orderplan Core
//!
//! Core primitives for executing fulfillment plans deterministically.
//!
//! This crate provides the fundamental building blocks:
//! - [`Plan`] - Validated, ordered list of operation invocations
//! - [`Context`] - Simulated business state a plan runs against
//! - [`ExecutionTrace`] - Per-step record of a run
//! - [`EngineError`] - Error taxonomy shared by every crate

pub mod args;
pub mod context;
pub mod error;
pub mod plan;
pub mod preset;
pub mod trace;
pub mod types;

// Re-exports for convenience
pub use args::{ArgReader, Arguments};
pub use context::{
    CatalogEntry, Context, ContextSnapshot, Notification, OrderLine, PendingOrder, PurchaseOrder,
    ScheduledOrder, SupplierTerms,
};
pub use error::{BusinessRuleViolation, EngineError, Result};
pub use plan::{Plan, PlanBuilder, PlanMetadata, Step, FIRST_STEP_ID};
pub use preset::{ContextConfig, PRESET_NAMES};
pub use trace::{ExecutionTrace, StepError, StepErrorKind, StepResult};
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::args::{ArgReader, Arguments};
    pub use crate::context::{Context, ContextSnapshot};
    pub use crate::error::{BusinessRuleViolation, EngineError, Result};
    pub use crate::plan::{Plan, Step};
    pub use crate::preset::ContextConfig;
    pub use crate::trace::{ExecutionTrace, StepResult};
    pub use crate::types::{Priority, RunState, StepStatus};
}
