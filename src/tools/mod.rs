// src/tools/mod.rs — Tool trait, registry and shared argument helpers

pub mod booking;
pub mod executor;
pub mod faq;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::types::ToolErrorKind;
use crate::provider::ToolDef;
use crate::scheduling::SchedulingError;

pub use executor::ToolExecutor;

/// A classified handler failure, turned into a ToolResult error by the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolFailure {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolFailure {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, message)
    }
}

impl From<SchedulingError> for ToolFailure {
    fn from(e: SchedulingError) -> Self {
        let kind = match &e {
            SchedulingError::Transient { .. } => ToolErrorKind::Transient,
            SchedulingError::Permanent { .. } if e.is_not_found() => ToolErrorKind::NotFound,
            SchedulingError::Permanent { .. } => ToolErrorKind::Permanent,
            SchedulingError::Ambiguous { .. } => ToolErrorKind::Ambiguous,
        };
        Self::new(kind, e.to_string())
    }
}

/// A named operation the capable model may request.
///
/// `validate` runs before `execute` and must reject every argument payload that
/// `execute` would not accept, so malformed calls never reach handler code.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the argument object.
    fn parameters(&self) -> Value;

    fn validate(&self, args: &Value) -> Result<(), String>;

    async fn execute(&self, args: Value) -> Result<Value, ToolFailure>;
}

/// Name-indexed tools, kept in registration order so the schema sent to the
/// model is stable.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later registration with the same name replaces the earlier one.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let tool: Arc<dyn Tool> = Arc::new(tool);
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn to_tool_defs(&self) -> Vec<ToolDef> {
        self.tools
            .iter()
            .map(|t| ToolDef {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect()
    }
}

/// Deserialize an argument object, rejecting anything that is not a JSON object.
pub(crate) fn parse_args<T: DeserializeOwned>(args: &Value) -> Result<T, String> {
    if !args.is_object() {
        return Err("arguments must be a JSON object".into());
    }
    serde_json::from_value(args.clone()).map_err(|e| format!("invalid arguments: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    struct Named(&'static str, &'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            self.1
        }
        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }
        fn validate(&self, _args: &Value) -> Result<(), String> {
            Ok(())
        }
        async fn execute(&self, _args: Value) -> Result<Value, ToolFailure> {
            Ok(json!(self.1))
        }
    }

    #[test]
    fn test_registry_keeps_order_and_replaces() {
        let mut reg = ToolRegistry::new();
        reg.register(Named("b", "first b"));
        reg.register(Named("a", "a"));
        reg.register(Named("b", "second b"));
        assert_eq!(reg.tool_names(), vec!["b", "a"]);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get("b").unwrap().description(), "second b");
        assert!(reg.get("missing").is_none());
    }

    #[test]
    fn test_to_tool_defs() {
        let mut reg = ToolRegistry::new();
        reg.register(Named("search_faq", "Search the FAQ"));
        let defs = reg.to_tool_defs();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "search_faq");
        assert_eq!(defs[0].parameters["type"], "object");
    }

    #[test]
    fn test_failure_from_scheduling_error() {
        let nf: ToolFailure = SchedulingError::Permanent {
            operation: "find".into(),
            status: Some(404),
            message: "gone".into(),
        }
        .into();
        assert_eq!(nf.kind, ToolErrorKind::NotFound);

        let t: ToolFailure = SchedulingError::Transient {
            operation: "create".into(),
            attempts: 3,
            message: "503".into(),
        }
        .into();
        assert_eq!(t.kind, ToolErrorKind::Transient);

        let a: ToolFailure = SchedulingError::Ambiguous {
            operation: "create".into(),
            message: "timeout".into(),
        }
        .into();
        assert_eq!(a.kind, ToolErrorKind::Ambiguous);
    }

    #[derive(Deserialize)]
    struct Q {
        #[allow(dead_code)]
        query: String,
    }

    #[test]
    fn test_parse_args() {
        assert!(parse_args::<Q>(&json!({"query": "x"})).is_ok());
        assert!(parse_args::<Q>(&json!("x")).is_err());
        assert!(parse_args::<Q>(&json!({"q": "x"})).is_err());
    }
}
