//! Named operations available to plans.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use orderplan_core::{Arguments, Context, EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::catalog;
use crate::schema::ParameterSchema;

/// What one invocation of an operation produced.
pub type StepOutcome = Result<Value>;

/// A business operation callable from a plan step.
///
/// Implementations must be deterministic given the same context and
/// arguments, and must leave the context untouched when they fail.
pub trait Operation: Send + Sync {
    fn execute(&self, context: &mut Context, args: &Arguments) -> StepOutcome;
}

impl<F> Operation for F
where
    F: Fn(&mut Context, &Arguments) -> StepOutcome + Send + Sync,
{
    fn execute(&self, context: &mut Context, args: &Arguments) -> StepOutcome {
        self(context, args)
    }
}

/// A registered operation.
#[derive(Clone)]
pub struct RegistryEntry {
    pub name: String,
    pub schema: ParameterSchema,
    implementation: Arc<dyn Operation>,
}

impl RegistryEntry {
    pub fn invoke(&self, context: &mut Context, args: &Arguments) -> StepOutcome {
        self.implementation.execute(context, args)
    }

    pub fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor {
            name: self.name.clone(),
            description: self.schema.description.clone(),
            parameters: self.schema.to_json_schema(),
        }
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Exported description of an operation, for planners and tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Lookup table from operation name to implementation.
///
/// Populated during setup and then shared read-only, usually behind an
/// `Arc`, by every run.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in fulfillment operations.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        catalog::register_builtins(&mut registry)?;
        Ok(registry)
    }

    /// Add an operation under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        schema: ParameterSchema,
        implementation: impl Operation + 'static,
    ) -> Result<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(EngineError::DuplicateRegistration { name });
        }

        debug!("Registered operation {} ({} params)", name, schema.params.len());
        self.entries.insert(
            name.clone(),
            RegistryEntry {
                name,
                schema,
                implementation: Arc::new(implementation),
            },
        );
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&RegistryEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| EngineError::UnknownOperation {
                name: name.to_string(),
            })
    }

    /// Check `args` against the entry's parameter schema.
    pub fn validate_arguments(&self, entry: &RegistryEntry, args: &Arguments) -> Result<()> {
        entry.schema.validate(&entry.name, args)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn descriptors(&self) -> Vec<OperationDescriptor> {
        self.entries.values().map(RegistryEntry::descriptor).collect()
    }

    /// Operations rendered as a function-calling tool list.
    pub fn tools_json(&self) -> Value {
        let tools: Vec<Value> = self
            .descriptors()
            .into_iter()
            .map(|d| {
                json!({
                    "type": "function",
                    "function": {
                        "name": d.name,
                        "description": d.description,
                        "parameters": d.parameters,
                    }
                })
            })
            .collect();
        Value::Array(tools)
    }

    /// One `    - name(): description` line per operation.
    pub fn functions_description(&self) -> String {
        self.entries
            .values()
            .map(|e| format!("    - {}(): {}", e.name, e.schema.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
