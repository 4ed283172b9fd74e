//! # Orderplan Registry
//!
//! The set of named business operations a plan may invoke.
//!
//! - [`FunctionRegistry`] - name to implementation lookup, shared read-only
//! - [`ParameterSchema`] - declared parameters and argument validation
//! - [`catalog`] - the built-in fulfillment operations

pub mod catalog;
pub mod registry;
pub mod schema;

pub use registry::{FunctionRegistry, Operation, OperationDescriptor, RegistryEntry, StepOutcome};
pub use schema::{ParamSpec, ParamType, ParameterSchema};
