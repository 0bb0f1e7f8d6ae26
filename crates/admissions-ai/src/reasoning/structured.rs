use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Reasoner, ReasoningError, Throttle};
use crate::prompt::PromptRequest;

/// Typed adapter every workflow goes through: throttle, invoke, validate
/// against the request schema, then deserialize.
pub struct StructuredReasoner {
    inner: Arc<dyn Reasoner>,
    throttle: Throttle,
}

impl StructuredReasoner {
    pub fn new(inner: Arc<dyn Reasoner>, throttle: Throttle) -> Self {
        Self { inner, throttle }
    }

    pub async fn complete<T: DeserializeOwned>(
        &self,
        request: &PromptRequest,
    ) -> Result<T, ReasoningError> {
        let _permit = self.throttle.acquire().await?;
        debug!(prompt = %request.name, "invoking reasoner");
        let mut output = self.inner.invoke(request).await?;

        if let Err(error) = validate_output(&request.schema, &output) {
            warn!(prompt = %request.name, %error, "reasoner output rejected");
            return Err(error);
        }
        normalize_integers(&request.schema, &mut output);
        Ok(serde_json::from_value(output)?)
    }
}

fn declares_integer(schema: &Value) -> bool {
    match &schema["type"] {
        Value::String(kind) => kind == "integer",
        Value::Array(kinds) => kinds.iter().any(|kind| kind == "integer"),
        _ => false,
    }
}

/// JSON Schema counts `85.0` as an integer but serde's integer types do not;
/// rewrite whole-valued floats wherever the schema declares `integer`.
fn normalize_integers(schema: &Value, output: &mut Value) {
    match output {
        Value::Number(number)
            if declares_integer(schema) && !number.is_i64() && !number.is_u64() =>
        {
            if let Some(value) = number.as_f64() {
                if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
                    *output = Value::from(value as i64);
                }
            }
        }
        Value::Object(fields) => {
            if let Some(Value::Object(properties)) = schema.get("properties") {
                for (name, value) in fields.iter_mut() {
                    if let Some(field_schema) = properties.get(name) {
                        normalize_integers(field_schema, value);
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items {
                    normalize_integers(item_schema, item);
                }
            }
        }
        _ => {}
    }
}

/// Check `output` against `schema`, collecting every violation.
pub fn validate_output(schema: &Value, output: &Value) -> Result<(), ReasoningError> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|error| ReasoningError::InvalidSchema(error.to_string()))?;
    let errors: Vec<String> = validator
        .iter_errors(output)
        .map(|error| format!("{}: {}", error.instance_path, error))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ReasoningError::Validation { errors })
    }
}
