use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use vigil_core::{VigilError, VigilResult};

/// Validated tool arguments, keyed by parameter name.
pub type Arguments = serde_json::Map<String, Value>;

/// Static type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    /// An integer offset/epoch or a string such as `"now"` or an RFC 3339
    /// timestamp. Interpretation is left to the skill.
    Time,
}

impl ParamKind {
    fn name(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Time => "integer or string",
        }
    }

    fn json_type(self) -> Value {
        match self {
            ParamKind::String => Value::from("string"),
            ParamKind::Integer => Value::from("integer"),
            ParamKind::Number => Value::from("number"),
            ParamKind::Boolean => Value::from("boolean"),
            ParamKind::Time => serde_json::json!(["integer", "string"]),
        }
    }

    /// Coerce a supplied value into this kind, or `None` on mismatch.
    ///
    /// Models regularly quote numbers and booleans, so numeric and boolean
    /// strings are accepted for the matching kinds.
    fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ParamKind::String, Value::String(_)) => Some(value.clone()),
            (ParamKind::Integer, Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Value::from),
            (ParamKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (ParamKind::Number, Value::Number(_)) => Some(value.clone()),
            (ParamKind::Number, Value::String(s)) => s.trim().parse::<f64>().ok().map(Value::from),
            (ParamKind::Boolean, Value::Bool(_)) => Some(value.clone()),
            (ParamKind::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            (ParamKind::Time, Value::Number(n)) if n.is_i64() => Some(value.clone()),
            (ParamKind::Time, Value::String(s)) if !s.trim().is_empty() => {
                Some(Value::String(s.trim().to_string()))
            }
            _ => None,
        }
    }
}

/// Declaration of a single tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(
        name: impl Into<String>,
        kind: ParamKind,
        default: Value,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            default: Some(default),
            required: false,
            description: description.into(),
        }
    }

    pub(crate) fn schema(&self) -> Value {
        let mut schema = serde_json::json!({
            "type": self.kind.json_type(),
            "description": self.description,
        });
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        schema
    }
}

/// Check `arguments` against `params`, filling defaults and coercing types.
///
/// A `null` payload is treated as an empty object. Keys that are not
/// declared are dropped.
pub fn validate_arguments(params: &[ParamSpec], arguments: &Value) -> VigilResult<Arguments> {
    let supplied = match arguments {
        Value::Object(map) => map.clone(),
        Value::Null => Arguments::new(),
        other => {
            return Err(VigilError::Validation(format!(
                "arguments must be a JSON object, got {other}"
            )))
        }
    };

    let mut validated = Arguments::new();
    for spec in params {
        match supplied.get(&spec.name).filter(|v| !v.is_null()) {
            Some(value) => {
                let coerced = spec.kind.coerce(value).ok_or_else(|| {
                    VigilError::Validation(format!(
                        "parameter '{}' expects {}, got {value}",
                        spec.name,
                        spec.kind.name()
                    ))
                })?;
                validated.insert(spec.name.clone(), coerced);
            }
            None => {
                if let Some(default) = &spec.default {
                    validated.insert(spec.name.clone(), default.clone());
                } else if spec.required {
                    return Err(VigilError::Validation(format!(
                        "missing required parameter '{}'",
                        spec.name
                    )));
                }
            }
        }
    }

    for key in supplied.keys() {
        if !params.iter().any(|p| &p.name == key) {
            debug!(parameter = %key, "Ignoring undeclared tool argument");
        }
    }

    Ok(validated)
}

/// String argument, or an error if absent.
pub fn str_arg<'a>(args: &'a Arguments, name: &str) -> VigilResult<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| VigilError::Validation(format!("missing string parameter '{name}'")))
}

/// Integer argument, or an error if absent.
pub fn int_arg(args: &Arguments, name: &str) -> VigilResult<i64> {
    args.get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| VigilError::Validation(format!("missing integer parameter '{name}'")))
}

/// Boolean argument; absent means `false`.
pub fn bool_arg(args: &Arguments, name: &str) -> bool {
    args.get(name).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart_data_params() -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("chart", ParamKind::String, "Chart id"),
            ParamSpec::optional("after", ParamKind::Time, json!(-60), "Start"),
            ParamSpec::optional("points", ParamKind::Integer, json!(60), "Points"),
            ParamSpec::optional("active", ParamKind::Boolean, json!(false), "Active only"),
        ]
    }

    #[test]
    fn test_defaults_are_filled() {
        let args = validate_arguments(&chart_data_params(), &json!({"chart": "system.cpu"})).unwrap();
        assert_eq!(args["chart"], "system.cpu");
        assert_eq!(args["after"], -60);
        assert_eq!(args["points"], 60);
        assert_eq!(args["active"], false);
    }

    #[test]
    fn test_missing_required_is_rejected() {
        let err = validate_arguments(&chart_data_params(), &json!({})).unwrap_err();
        assert!(err.to_string().contains("missing required parameter 'chart'"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let args = validate_arguments(&chart_data_params(), &json!({"chart": "a", "points": null})).unwrap();
        assert_eq!(args["points"], 60);
    }

    #[test]
    fn test_quoted_numbers_and_booleans_coerce() {
        let args = validate_arguments(
            &chart_data_params(),
            &json!({"chart": "a", "points": "120", "active": "TRUE", "after": "-300"}),
        )
        .unwrap();
        assert_eq!(args["points"], 120);
        assert_eq!(args["active"], true);
        assert_eq!(args["after"], "-300");
    }

    #[test]
    fn test_type_mismatch_names_parameter() {
        let err = validate_arguments(&chart_data_params(), &json!({"chart": "a", "points": "lots"}))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'points'"));
        assert!(msg.contains("integer"));
    }

    #[test]
    fn test_string_param_rejects_number() {
        let err = validate_arguments(&chart_data_params(), &json!({"chart": 42})).unwrap_err();
        assert!(matches!(err, VigilError::Validation(_)));
    }

    #[test]
    fn test_non_object_arguments_rejected() {
        assert!(validate_arguments(&chart_data_params(), &json!(["system.cpu"])).is_err());
    }

    #[test]
    fn test_null_payload_with_no_params() {
        let args = validate_arguments(&[], &Value::Null).unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn test_extra_keys_dropped() {
        let args = validate_arguments(&chart_data_params(), &json!({"chart": "a", "color": "red"})).unwrap();
        assert!(!args.contains_key("color"));
    }

    #[test]
    fn test_typed_accessors() {
        let args = validate_arguments(&chart_data_params(), &json!({"chart": "disk.sda"})).unwrap();
        assert_eq!(str_arg(&args, "chart").unwrap(), "disk.sda");
        assert_eq!(int_arg(&args, "points").unwrap(), 60);
        assert!(!bool_arg(&args, "active"));
        assert!(str_arg(&args, "nope").is_err());
    }
}
