use crate::params::validate_arguments;
use crate::skill::{Skill, SkillDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use vigil_core::{ToolCall, ToolResult};

/// Central registry for all available skills.
///
/// Populated once at startup and then shared as `Arc<SkillRegistry>`; it is
/// never mutated while a conversation is running.
pub struct SkillRegistry {
    skills: HashMap<String, Arc<dyn Skill>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self {
            skills: HashMap::new(),
        }
    }

    pub fn register(&mut self, skill: Arc<dyn Skill>) {
        let name = skill.descriptor().name.clone();
        info!(skill = %name, "Registered skill");
        if self.skills.insert(name.clone(), skill).is_some() {
            warn!(skill = %name, "Skill registered twice, previous definition replaced");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Skill>> {
        self.skills.get(name)
    }

    /// Descriptors sorted by name.
    pub fn list_descriptors(&self) -> Vec<&SkillDescriptor> {
        let mut descriptors: Vec<_> = self.skills.values().map(|s| s.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Execute a tool call.
    ///
    /// Always yields a result carrying `call.id`: an unknown tool, invalid
    /// arguments and a failing skill all become error results.
    pub async fn execute(&self, call: ToolCall) -> ToolResult {
        let Some(skill) = self.skills.get(&call.name) else {
            warn!(tool = %call.name, call_id = %call.id, "Model requested an unknown tool");
            return ToolResult::error(&call.id, format!("Unknown tool: {}", call.name));
        };

        let args = match validate_arguments(&skill.descriptor().parameters, &call.arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Rejected tool arguments");
                return ToolResult::error(&call.id, e.to_string());
            }
        };

        let call_id = call.id.clone();
        let validated = ToolCall {
            arguments: serde_json::Value::Object(args),
            ..call
        };

        match skill.execute(validated).await {
            Ok(mut result) => {
                // The result must answer the request it came from.
                result.call_id = call_id;
                result
            }
            Err(e) => ToolResult::failed(call_id, &e),
        }
    }

    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}
