//! Parameter schemas and argument validation.

use orderplan_core::args::kind_of;
use orderplan_core::{Arguments, EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Expected JSON kind of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    /// Any number; integers are accepted.
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    /// JSON-schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }

    /// Returns true if `value` is type-compatible with this parameter type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }
}

/// Declaration of one operation parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
    pub description: String,

    /// Closed set of accepted string values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,

    /// Inclusive lower bound for numeric parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
}

impl ParamSpec {
    /// A required parameter.
    pub fn new(name: impl Into<String>, ty: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            description: description.into(),
            allowed: None,
            minimum: None,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::String, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer, description)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    fn check(&self, operation: &str, value: &Value) -> Result<()> {
        let invalid = |message: String| EngineError::ArgumentValidation {
            operation: operation.to_string(),
            parameter: self.name.clone(),
            message,
        };

        if !self.ty.accepts(value) {
            return Err(invalid(format!(
                "expected {}, got {}",
                self.ty.as_str(),
                kind_of(value)
            )));
        }

        if let (Some(allowed), Some(s)) = (&self.allowed, value.as_str()) {
            if !allowed.iter().any(|a| a == s) {
                return Err(invalid(format!(
                    "'{s}' is not one of {}",
                    allowed.join(", ")
                )));
            }
        }

        if let (Some(minimum), Some(n)) = (self.minimum, value.as_f64()) {
            if n < minimum {
                return Err(invalid(format!("{value} is below the minimum of {minimum}")));
            }
        }

        Ok(())
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = json!({
            "type": self.ty.as_str(),
            "description": self.description,
        });
        if let Some(allowed) = &self.allowed {
            schema["enum"] = json!(allowed);
        }
        if let Some(minimum) = self.minimum {
            schema["minimum"] = json!(minimum);
        }
        schema
    }
}

/// Ordered parameter list of an operation, plus its one-line description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ParameterSchema {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Check supplied arguments against the schema.
    ///
    /// Parameters are checked in declaration order, then any argument the
    /// schema does not declare is rejected. `null` counts as absent.
    pub fn validate(&self, operation: &str, args: &Arguments) -> Result<()> {
        for spec in &self.params {
            match args.get(&spec.name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(EngineError::ArgumentValidation {
                        operation: operation.to_string(),
                        parameter: spec.name.clone(),
                        message: "missing required parameter".to_string(),
                    });
                }
                None | Some(Value::Null) => {}
                Some(value) => spec.check(operation, value)?,
            }
        }

        if let Some(unknown) = args.keys().find(|k| self.get(k).is_none()) {
            return Err(EngineError::ArgumentValidation {
                operation: operation.to_string(),
                parameter: unknown.clone(),
                message: "unknown parameter".to_string(),
            });
        }

        Ok(())
    }

    /// JSON-schema object describing the parameters.
    pub fn to_json_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    fn reserve_schema() -> ParameterSchema {
        ParameterSchema::new("Reserve stock")
            .param(ParamSpec::string("item", "The item"))
            .param(ParamSpec::integer("qty", "How many").minimum(1.0))
            .param(
                ParamSpec::string("priority", "Urgency")
                    .optional()
                    .one_of(&["Standard", "Rush"]),
            )
    }

    fn parameter_of(result: Result<()>) -> String {
        match result {
            Err(EngineError::ArgumentValidation { parameter, .. }) => parameter,
            other => panic!("expected argument error, got {other:?}"),
        }
    }

    #[test]
    fn test_accepts_valid_arguments() {
        let schema = reserve_schema();
        assert!(schema
            .validate("reserve", &args(json!({"item": "w", "qty": 2})))
            .is_ok());
        assert!(schema
            .validate("reserve", &args(json!({"item": "w", "qty": 2, "priority": "Rush"})))
            .is_ok());
        assert!(schema
            .validate("reserve", &args(json!({"item": "w", "qty": 2, "priority": null})))
            .is_ok());
    }

    #[test]
    fn test_missing_required() {
        let schema = reserve_schema();
        let result = schema.validate("reserve", &args(json!({"item": "w"})));
        assert_eq!(parameter_of(result), "qty");

        let result = schema.validate("reserve", &args(json!({"item": null, "qty": 1})));
        assert_eq!(parameter_of(result), "item");
    }

    #[test]
    fn test_type_mismatch() {
        let schema = reserve_schema();
        let result = schema.validate("reserve", &args(json!({"item": "w", "qty": "3"})));
        assert_eq!(parameter_of(result), "qty");

        let result = schema.validate("reserve", &args(json!({"item": "w", "qty": 2.5})));
        assert_eq!(parameter_of(result), "qty");
    }

    #[test]
    fn test_number_accepts_integer() {
        assert!(ParamType::Number.accepts(&json!(3)));
        assert!(ParamType::Number.accepts(&json!(3.5)));
        assert!(!ParamType::Integer.accepts(&json!(3.5)));
    }

    #[test]
    fn test_enum_and_minimum() {
        let schema = reserve_schema();
        let result = schema.validate(
            "reserve",
            &args(json!({"item": "w", "qty": 1, "priority": "Whenever"})),
        );
        assert_eq!(parameter_of(result), "priority");

        let result = schema.validate("reserve", &args(json!({"item": "w", "qty": 0})));
        assert_eq!(parameter_of(result), "qty");
    }

    #[test]
    fn test_unknown_parameter() {
        let schema = reserve_schema();
        let result = schema.validate("reserve", &args(json!({"item": "w", "qty": 1, "color": "red"})));
        assert_eq!(parameter_of(result), "color");
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = reserve_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["item", "qty"]));
        assert_eq!(schema["properties"]["qty"]["type"], "integer");
        assert_eq!(schema["properties"]["priority"]["enum"], json!(["Standard", "Rush"]));
        assert_eq!(schema["additionalProperties"], false);
    }
}
