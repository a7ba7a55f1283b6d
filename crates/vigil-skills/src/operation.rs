use crate::params::Arguments;
use crate::skill::{Skill, SkillDescriptor};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::sync::Arc;
use vigil_core::{ToolCall, ToolResult, VigilResult};

type OperationFn = Arc<dyn Fn(Arguments) -> BoxFuture<'static, VigilResult<String>> + Send + Sync>;

/// A skill assembled from a descriptor and an async closure.
///
/// This is what tool tables are built from: the closure receives the
/// validated argument map and returns the text handed back to the model.
/// An `Err` is turned into an error result by the registry.
#[derive(Clone)]
pub struct OperationSkill {
    descriptor: SkillDescriptor,
    op: OperationFn,
}

impl OperationSkill {
    pub fn new<F, Fut>(descriptor: SkillDescriptor, op: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = VigilResult<String>> + Send + 'static,
    {
        Self {
            descriptor,
            op: Arc::new(move |args| op(args).boxed()),
        }
    }
}

impl std::fmt::Debug for OperationSkill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationSkill")
            .field("name", &self.descriptor.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Skill for OperationSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    async fn execute(&self, call: ToolCall) -> VigilResult<ToolResult> {
        let args = match call.arguments {
            serde_json::Value::Object(map) => map,
            _ => Arguments::new(),
        };
        let output = (self.op)(args).await?;
        Ok(ToolResult::success(call.id, output))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::params::{str_arg, ParamKind, ParamSpec};
    use vigil_core::VigilError;

    fn echo() -> OperationSkill {
        let desc = SkillDescriptor::new("echo", "Echo the text back")
            .param(ParamSpec::required("text", ParamKind::String, "Text"));
        OperationSkill::new(desc, |args| async move {
            let text = str_arg(&args, "text")?;
            if text == "boom" {
                return Err(VigilError::Skill("exploded".into()));
            }
            Ok(text.to_uppercase())
        })
    }

    #[tokio::test]
    async fn test_operation_returns_success_result() {
        let call = ToolCall {
            id: "c1".into(),
            name: "echo".into(),
            arguments: serde_json::json!({"text": "ping"}),
        };
        let result = echo().execute(call).await.unwrap();
        assert_eq!(result.call_id, "c1");
        assert_eq!(result.content, "PING");
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_operation_propagates_error() {
        let call = ToolCall {
            id: "c2".into(),
            name: "echo".into(),
            arguments: serde_json::json!({"text": "boom"}),
        };
        assert!(echo().execute(call).await.is_err());
    }
}
