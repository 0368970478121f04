// src/tools/executor.rs — Validated, sequential tool dispatch
//
// Nothing here returns an error to the caller: unknown tools, bad arguments
// and handler failures all come back as ToolResult errors the model can read.
// Each dispatch emits one structured audit record.

use std::time::Instant;

use serde_json::{json, Value};

use super::ToolRegistry;
use crate::core::types::{ToolCall, ToolErrorKind, ToolOutcome, ToolResult};
use crate::provider::ToolDef;

const ARGS_PREVIEW_CHARS: usize = 200;

pub struct ToolExecutor {
    registry: ToolRegistry,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn definitions(&self) -> Vec<ToolDef> {
        self.registry.to_tool_defs()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let start = Instant::now();
        let result = self.run(call).await;

        let (ok, outcome) = match &result.outcome {
            ToolOutcome::Ok { .. } => (true, "ok"),
            ToolOutcome::Error { kind, .. } => (false, kind.as_str()),
        };
        let audit = json!({
            "event": "tool_audit",
            "tool": call.name,
            "call_id": call.id,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&call.arguments),
        });
        tracing::info!(audit = %audit, "tool");

        result
    }

    /// One call completes before the next starts; results keep call order.
    pub async fn dispatch_all(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.dispatch(call).await);
        }
        results
    }

    async fn run(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.registry.get(&call.name) else {
            return ToolResult::error(
                &call.id,
                ToolErrorKind::UnknownTool,
                format!(
                    "Unknown tool '{}'. Available tools: {}",
                    call.name,
                    self.registry.tool_names().join(", ")
                ),
            );
        };

        if let Err(message) = tool.validate(&call.arguments) {
            return ToolResult::error(&call.id, ToolErrorKind::Validation, message);
        }

        match tool.execute(call.arguments.clone()).await {
            Ok(payload) => ToolResult::ok(&call.id, payload),
            Err(failure) => ToolResult::error(&call.id, failure.kind, failure.message),
        }
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > ARGS_PREVIEW_CHARS {
        format!("{}...", s.chars().take(ARGS_PREVIEW_CHARS).collect::<String>())
    } else {
        s
    }
}
