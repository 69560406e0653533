//! Argument validator for tool calls.
//!
//! Checks an argument object against a tool's [`FieldSpec`] list:
//! - Required field presence (`null` counts as absent)
//! - Type conformance with coercion (numeric strings, `"true"`/`"false"`, scalars to text)
//! - Enum membership
//! - Nested objects and arrays, recursively
//! - Unknown fields: rejected in strict mode, dropped in lenient mode

use crate::schema::error::{FieldError, ValidatedArguments};
use crate::schema::{FieldSpec, FieldType};
use serde_json::{Map, Number, Value};

/// Validator for tool arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgumentValidator {
    /// Reject unknown fields instead of dropping them
    strict: bool,
}

impl ArgumentValidator {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// Unknown fields are a validation error.
    pub fn strict() -> Self {
        Self::new(true)
    }

    /// Unknown fields are silently removed from the validated set.
    pub fn lenient() -> Self {
        Self::new(false)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Validate `arguments` against `fields`.
    ///
    /// `arguments` must be a JSON object; `null` is treated as an empty object.
    /// On success the returned set is coerced, has defaults applied and contains only
    /// declared fields.
    pub fn validate(
        &self,
        fields: &[FieldSpec],
        arguments: &Value,
    ) -> Result<ValidatedArguments, Vec<FieldError>> {
        let empty = Map::new();
        let obj = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(vec![FieldError::without_path(format!(
                    "arguments must be an object, got {}",
                    json_type_name(other)
                ))])
            }
        };

        let mut errors = Vec::new();
        let validated = self.validate_object(fields, obj, "", &mut errors);
        if errors.is_empty() {
            Ok(ValidatedArguments::new(validated))
        } else {
            Err(errors)
        }
    }

    fn validate_object(
        &self,
        fields: &[FieldSpec],
        obj: &Map<String, Value>,
        path: &str,
        errors: &mut Vec<FieldError>,
    ) -> Map<String, Value> {
        let mut out = Map::new();

        for field in fields {
            let field_path = join_path(path, &field.name);
            match obj.get(&field.name) {
                Some(value) if !value.is_null() => {
                    if let Some(coerced) =
                        self.coerce(&field.field_type, value, &field_path, errors)
                    {
                        out.insert(field.name.clone(), coerced);
                    }
                }
                _ => {
                    if field.required {
                        errors.push(FieldError::with_path(
                            "required field is missing",
                            field_path,
                        ));
                    } else if let Some(default) = &field.default {
                        out.insert(field.name.clone(), default.clone());
                    }
                }
            }
        }

        for key in obj.keys() {
            if fields.iter().any(|f| &f.name == key) {
                continue;
            }
            if self.strict {
                errors.push(FieldError::with_path(
                    "unknown field is not allowed",
                    join_path(path, key),
                ));
            } else {
                tracing::debug!(field = %join_path(path, key), "dropping unknown argument");
            }
        }

        out
    }

    /// Coerce `value` into `expected`, recording an error and returning `None` on mismatch.
    fn coerce(
        &self,
        expected: &FieldType,
        value: &Value,
        path: &str,
        errors: &mut Vec<FieldError>,
    ) -> Option<Value> {
        let coerced = match (expected, value) {
            (FieldType::String, Value::String(_)) => Some(value.clone()),
            (FieldType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (FieldType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

            (FieldType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
                Some(value.clone())
            }
            (FieldType::Integer, Value::Number(n)) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| Value::from(f as i64)),
            (FieldType::Integer, Value::String(s)) => {
                s.trim().parse::<i64>().ok().map(Value::from)
            }

            (FieldType::Number, Value::Number(_)) => Some(value.clone()),
            (FieldType::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),

            (FieldType::Boolean, Value::Bool(_)) => Some(value.clone()),
            (FieldType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str()
            {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },

            (FieldType::Enum(allowed), Value::String(s)) => {
                if allowed.iter().any(|a| a == s) {
                    Some(value.clone())
                } else {
                    errors.push(FieldError::with_path(
                        format!("value '{}' is not one of [{}]", s, allowed.join(", ")),
                        path,
                    ));
                    return None;
                }
            }

            (FieldType::Array(item), Value::Array(items)) => {
                let before = errors.len();
                let coerced: Vec<Value> = items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| self.coerce(item, v, &format!("{}[{}]", path, i), errors))
                    .collect();
                if errors.len() > before {
                    return None;
                }
                Some(Value::Array(coerced))
            }

            (FieldType::Object(fields), Value::Object(map)) if fields.is_empty() => {
                Some(Value::Object(map.clone()))
            }
            (FieldType::Object(fields), Value::Object(map)) => {
                let before = errors.len();
                let nested = self.validate_object(fields, map, path, errors);
                if errors.len() > before {
                    return None;
                }
                Some(Value::Object(nested))
            }

            _ => None,
        };

        if coerced.is_none() {
            errors.push(FieldError::with_path(
                format!(
                    "expected {}, got {}",
                    expected.type_name(),
                    describe_value(value)
                ),
                path,
            ));
        }
        coerced
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Null => "null",
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string '{}'", s),
        other => json_type_name(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn txn_fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::string("order_id").required(),
            FieldSpec::integer("offset").with_default(0),
            FieldSpec::boolean("save_to_locker"),
            FieldSpec::enumeration("payment_method_type", ["CARD", "NB", "UPI"]),
            FieldSpec::object(
                "order",
                vec![
                    FieldSpec::string("amount").required(),
                    FieldSpec::string("currency"),
                ],
            ),
            FieldSpec::object("qFilters", vec![]),
            FieldSpec::new("tags", FieldType::array_of(FieldType::String)),
        ]
    }

    #[test]
    fn test_minimal_valid_set() {
        let args = ArgumentValidator::lenient()
            .validate(&txn_fields(), &json!({"order_id": "ORD123"}))
            .unwrap();
        assert_eq!(args.get_str("order_id").as_deref(), Some("ORD123"));
        assert_eq!(args.get("offset"), Some(&json!(0)));
        assert!(!args.contains("save_to_locker"));
    }

    #[test]
    fn test_missing_required_field() {
        let errors = ArgumentValidator::lenient()
            .validate(&txn_fields(), &json!({}))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.as_deref(), Some("order_id"));
        assert!(errors[0].message.contains("required"));
    }

    #[test]
    fn test_null_required_field_is_missing() {
        let errors = ArgumentValidator::lenient()
            .validate(&txn_fields(), &json!({"order_id": null}))
            .unwrap_err();
        assert_eq!(errors[0].path.as_deref(), Some("order_id"));
    }

    #[test]
    fn test_coercion() {
        let args = ArgumentValidator::lenient()
            .validate(
                &txn_fields(),
                &json!({"order_id": 42, "offset": "10", "save_to_locker": "TRUE"}),
            )
            .unwrap();
        assert_eq!(args.get("order_id"), Some(&json!("42")));
        assert_eq!(args.get("offset"), Some(&json!(10)));
        assert_eq!(args.get("save_to_locker"), Some(&json!(true)));
    }

    #[test]
    fn test_type_mismatch() {
        let errors = ArgumentValidator::lenient()
            .validate(
                &txn_fields(),
                &json!({"order_id": "A", "offset": "ten", "save_to_locker": 1}),
            )
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("offset: expected integer"));
        assert!(errors[1].to_string().contains("save_to_locker: expected boolean"));
    }

    #[test]
    fn test_enum_membership() {
        let errors = ArgumentValidator::lenient()
            .validate(
                &txn_fields(),
                &json!({"order_id": "A", "payment_method_type": "CASH"}),
            )
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("not one of"));
    }

    #[test]
    fn test_nested_object_validation() {
        let errors = ArgumentValidator::lenient()
            .validate(
                &txn_fields(),
                &json!({"order_id": "A", "order": {"currency": "INR"}}),
            )
            .unwrap_err();
        assert_eq!(errors[0].path.as_deref(), Some("order.amount"));

        let args = ArgumentValidator::lenient()
            .validate(
                &txn_fields(),
                &json!({"order_id": "A", "order": {"amount": 100, "note": "x"}}),
            )
            .unwrap();
        assert_eq!(args.get("order"), Some(&json!({"amount": "100"})));
    }

    #[test]
    fn test_free_form_object_passes_through() {
        let filters = json!({"and": {"left": {"field": "order_status"}}});
        let args = ArgumentValidator::strict()
            .validate(&txn_fields(), &json!({"order_id": "A", "qFilters": filters}))
            .unwrap();
        assert_eq!(args.get("qFilters"), Some(&filters));
    }

    #[test]
    fn test_array_items() {
        let errors = ArgumentValidator::lenient()
            .validate(&txn_fields(), &json!({"order_id": "A", "tags": ["a", {}]}))
            .unwrap_err();
        assert_eq!(errors[0].path.as_deref(), Some("tags[1]"));
    }

    #[test]
    fn test_unknown_fields_strict_vs_lenient() {
        let args = json!({"order_id": "A", "extra": 1});

        let lenient = ArgumentValidator::lenient()
            .validate(&txn_fields(), &args)
            .unwrap();
        assert!(!lenient.contains("extra"));

        let errors = ArgumentValidator::strict()
            .validate(&txn_fields(), &args)
            .unwrap_err();
        assert_eq!(errors[0].path.as_deref(), Some("extra"));
    }

    #[test]
    fn test_non_object_arguments() {
        let errors = ArgumentValidator::lenient()
            .validate(&txn_fields(), &json!(["order_id"]))
            .unwrap_err();
        assert!(errors[0].message.contains("must be an object"));
    }
}
