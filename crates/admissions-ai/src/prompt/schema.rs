use serde_json::{json, Map, Value};

/// JSON-schema contract handed to the reasoner next to the prompt text.
#[derive(Debug, Clone, Default)]
pub struct OutputSchema {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl OutputSchema {
    pub fn object() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, field: Field) -> Self {
        self.properties.insert(name.to_string(), field.0);
        self.required.push(name.to_string());
        self
    }

    /// Optional properties also accept `null`.
    pub fn optional(mut self, name: &str, field: Field) -> Self {
        self.properties.insert(name.to_string(), field.nullable().0);
        self
    }

    pub fn into_value(self) -> Value {
        json!({
            "type": "object",
            "properties": Value::Object(self.properties),
            "required": self.required,
        })
    }
}

/// One property of an [`OutputSchema`].
#[derive(Debug, Clone)]
pub struct Field(Value);

impl Field {
    pub fn string() -> Self {
        Self(json!({ "type": "string" }))
    }

    pub fn integer() -> Self {
        Self(json!({ "type": "integer" }))
    }

    pub fn number() -> Self {
        Self(json!({ "type": "number" }))
    }

    pub fn boolean() -> Self {
        Self(json!({ "type": "boolean" }))
    }

    /// String restricted to the listed values.
    pub fn one_of(values: &[&str]) -> Self {
        Self(json!({ "type": "string", "enum": values }))
    }

    pub fn array(items: Field) -> Self {
        Self(json!({ "type": "array", "items": items.0 }))
    }

    pub fn object(schema: OutputSchema) -> Self {
        Self(schema.into_value())
    }

    /// Inclusive numeric bounds; only meaningful on integer and number fields.
    pub fn range(mut self, minimum: f64, maximum: f64) -> Self {
        if let Value::Object(map) = &mut self.0 {
            map.insert("minimum".to_string(), json!(minimum));
            map.insert("maximum".to_string(), json!(maximum));
        }
        self
    }

    fn nullable(mut self) -> Self {
        if let Value::Object(map) = &mut self.0 {
            if let Some(Value::String(kind)) = map.get("type").cloned() {
                map.insert("type".to_string(), json!([kind, "null"]));
            }
        }
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        if let Value::Object(map) = &mut self.0 {
            map.insert("description".to_string(), json!(description));
        }
        self
    }
}
