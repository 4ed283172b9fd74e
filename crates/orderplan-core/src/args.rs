//! Step arguments.
//!
//! Arguments are JSON objects so plans produced by a model can be carried
//! through unmodified. [`ArgReader`] gives operations typed access.

use serde_json::Value;

use crate::error::{EngineError, Result};

/// Named arguments of a plan step.
pub type Arguments = serde_json::Map<String, Value>;

/// Human-readable name of a JSON value's kind.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Typed accessor over the arguments of one operation invocation.
pub struct ArgReader<'a> {
    operation: &'a str,
    args: &'a Arguments,
}

impl<'a> ArgReader<'a> {
    pub fn new(operation: &'a str, args: &'a Arguments) -> Self {
        Self { operation, args }
    }

    /// Required string argument.
    pub fn string(&self, name: &str) -> Result<&'a str> {
        self.opt_string(name)?
            .ok_or_else(|| EngineError::argument(self.operation, name, "missing required parameter"))
    }

    /// Optional string argument; `null` counts as absent.
    pub fn opt_string(&self, name: &str) -> Result<Option<&'a str>> {
        match self.args.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.mismatch(name, "string", other)),
        }
    }

    /// Required non-negative integer argument.
    pub fn count(&self, name: &str) -> Result<u64> {
        match self.args.get(name) {
            None | Some(Value::Null) => Err(EngineError::argument(
                self.operation,
                name,
                "missing required parameter",
            )),
            Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
                EngineError::argument(
                    self.operation,
                    name,
                    format!("expected a non-negative integer, got {n}"),
                )
            }),
            Some(other) => Err(self.mismatch(name, "integer", other)),
        }
    }

    fn mismatch(&self, name: &str, expected: &str, got: &Value) -> EngineError {
        EngineError::argument(
            self.operation,
            name,
            format!("expected {expected}, got {}", kind_of(got)),
        )
    }
}
