use crate::params::ParamSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vigil_core::{ToolCall, ToolResult, VigilResult};

/// Metadata describing a skill's interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

impl SkillDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter declaration.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    /// JSON Schema object describing the parameters, as sent to model backends.
    pub fn parameters_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for p in &self.parameters {
            properties.insert(p.name.clone(), p.schema());
            if p.required {
                required.push(serde_json::Value::String(p.name.clone()));
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Trait that every tool implements.
///
/// `execute` receives a call whose `arguments` have already been validated
/// and defaulted by the registry, so it is always a JSON object.
#[async_trait]
pub trait Skill: Send + Sync {
    fn descriptor(&self) -> &SkillDescriptor;

    async fn execute(&self, call: ToolCall) -> VigilResult<ToolResult>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::params::ParamKind;

    #[test]
    fn test_parameters_schema_lists_required() {
        let desc = SkillDescriptor::new("get_chart_info", "Chart metadata")
            .param(ParamSpec::required("chart", ParamKind::String, "Chart id"))
            .param(ParamSpec::optional(
                "points",
                ParamKind::Integer,
                serde_json::json!(60),
                "Number of points",
            ));

        let schema = desc.parameters_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["chart"]["type"], "string");
        assert_eq!(schema["properties"]["points"]["default"], 60);
        assert_eq!(schema["required"], serde_json::json!(["chart"]));
    }

    #[test]
    fn test_empty_descriptor_schema() {
        let schema = SkillDescriptor::new("get_info", "Node info").parameters_schema();
        assert!(schema["properties"].as_object().unwrap().is_empty());
        assert!(schema["required"].as_array().unwrap().is_empty());
    }
}
