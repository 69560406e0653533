//! Declarative tool input schemas.
//!
//! A [`ToolDescriptor`] owns an ordered list of [`FieldSpec`]s. The same field list drives
//! argument validation ([`ArgumentValidator`]) and the JSON Schema advertised to agents
//! through `tools/list` ([`ToolDescriptor::input_schema`]).

pub mod error;
pub mod validator;

pub use error::{FieldError, ValidatedArguments};
pub use validator::ArgumentValidator;

use serde_json::{json, Map, Value};

/// Value type accepted by a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// String constrained to a fixed set of values.
    Enum(Vec<String>),
    Array(Box<FieldType>),
    /// Nested object. An empty field list means free-form.
    Object(Vec<FieldSpec>),
}

impl FieldType {
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Enum(values.into_iter().map(Into::into).collect())
    }

    pub fn array_of(item: FieldType) -> Self {
        FieldType::Array(Box::new(item))
    }

    /// Name used in validation messages and JSON Schema.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String | FieldType::Enum(_) => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array(_) => "array",
            FieldType::Object(_) => "object",
        }
    }

    fn json_schema(&self) -> Value {
        match self {
            FieldType::Enum(values) => json!({ "type": "string", "enum": values }),
            FieldType::Array(item) => json!({ "type": "array", "items": item.json_schema() }),
            FieldType::Object(fields) if fields.is_empty() => {
                json!({ "type": "object", "additionalProperties": true })
            }
            FieldType::Object(fields) => object_schema(fields),
            other => json!({ "type": other.type_name() }),
        }
    }
}

/// Where a validated argument ends up in the outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLocation {
    /// JSON request body (default).
    Body,
    /// Substituted into the `{name}` placeholder of the endpoint path.
    Path,
    /// Appended to the query string.
    Query,
    /// Sent as the named outbound header.
    Header(String),
}

/// One input field of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: String,
    pub location: FieldLocation,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            default: None,
            description: String::new(),
            location: FieldLocation::Body,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, FieldType::enumeration(values))
    }

    pub fn object(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self::new(name, FieldType::Object(fields))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn in_path(mut self) -> Self {
        self.location = FieldLocation::Path;
        self
    }

    pub fn in_query(mut self) -> Self {
        self.location = FieldLocation::Query;
        self
    }

    pub fn in_header(mut self, header: impl Into<String>) -> Self {
        self.location = FieldLocation::Header(header.into());
        self
    }

    fn property_schema(&self) -> Value {
        let mut schema = self.field_type.json_schema();
        if let Value::Object(ref mut obj) = schema {
            if !self.description.is_empty() {
                obj.insert("description".into(), Value::String(self.description.clone()));
            }
            if let Some(default) = &self.default {
                obj.insert("default".into(), default.clone());
            }
        }
        schema
    }
}

fn object_schema(fields: &[FieldSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        properties.insert(field.name.clone(), field.property_schema());
        if field.required {
            required.push(Value::String(field.name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Immutable description of one tool: its name, prose description and input fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldSpec>,
    /// Optional JSON Schema of the upstream response, appended to the advertised
    /// description when the server is configured to include it.
    pub response_schema: Option<Value>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            fields: Vec::new(),
            response_schema: None,
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldSpec>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_response_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// JSON Schema (`type: object`) for the tool's arguments.
    pub fn input_schema(&self) -> Value {
        object_schema(&self.fields)
    }

    /// Description advertised to agents, optionally followed by the response schema.
    pub fn advertised_description(&self, include_response_schema: bool) -> String {
        match (&self.response_schema, include_response_schema) {
            (Some(schema), true) => format!(
                "{}\n\nResponse schema:\n{}",
                self.description,
                serde_json::to_string_pretty(schema).unwrap_or_default()
            ),
            _ => self.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_status() -> ToolDescriptor {
        ToolDescriptor::new("order_status_api_juspay", "Order status").with_fields(vec![
            FieldSpec::string("order_id")
                .required()
                .in_path()
                .describe("Merchant order id"),
            FieldSpec::enumeration("format", ["json"]).with_default("json"),
            FieldSpec::object(
                "order",
                vec![FieldSpec::string("amount").required()],
            ),
        ])
    }

    #[test]
    fn test_input_schema_shape() {
        let schema = order_status().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["order_id"]));
        assert_eq!(schema["properties"]["order_id"]["type"], "string");
        assert_eq!(
            schema["properties"]["order_id"]["description"],
            "Merchant order id"
        );
        assert_eq!(schema["properties"]["format"]["enum"], json!(["json"]));
        assert_eq!(schema["properties"]["format"]["default"], "json");
        assert_eq!(
            schema["properties"]["order"]["required"],
            json!(["amount"])
        );
    }

    #[test]
    fn test_free_form_object_schema() {
        let schema = FieldType::Object(vec![]).json_schema();
        assert_eq!(schema["additionalProperties"], true);
    }

    #[test]
    fn test_advertised_description_with_response_schema() {
        let tool = order_status().with_response_schema(json!({"type": "object"}));
        assert_eq!(tool.advertised_description(false), "Order status");
        assert!(tool
            .advertised_description(true)
            .contains("Response schema:"));
    }
}
