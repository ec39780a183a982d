// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Built-in echo component
//!
//! A minimal agent hosted by `aegis-component serve`. It calls the `echo`
//! tool with the task goal and returns whatever the tool answered. Useful
//! for smoke-testing a deployment end to end.

use std::sync::Arc;

use aegis_component_sdk::{
    AgentStatus, Component, ComponentDescriptor, ComponentError, ComponentKind, Harness,
    HarnessError, StreamingHarness, Task, TaskResult, ToolDescriptor, ToolHandler,
};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const ECHO_AGENT_NAME: &str = "echo-agent";
pub const ECHO_TOOL_NAME: &str = "echo";

/// Returns its input unchanged
pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: ECHO_TOOL_NAME.to_string(),
            description: "Return the input unchanged".to_string(),
            tags: vec!["diagnostic".to_string()],
        }
    }

    async fn call(&self, input: Value) -> Result<Value, HarnessError> {
        Ok(input)
    }
}

pub struct EchoAgent;

impl EchoAgent {
    fn tool_input(task: &Task) -> Value {
        json!({ "goal": task.goal, "context": task.context })
    }
}

#[async_trait]
impl Component for EchoAgent {
    fn descriptor(&self) -> ComponentDescriptor {
        ComponentDescriptor::new(ECHO_AGENT_NAME, env!("CARGO_PKG_VERSION"), ComponentKind::Agent)
            .with_description("Echoes the task goal through the echo tool")
            .with_capability(ECHO_TOOL_NAME)
            .streaming()
    }

    async fn execute(&self, harness: Arc<dyn Harness>, task: Task) -> Result<TaskResult, ComponentError> {
        let output = harness.call_tool(ECHO_TOOL_NAME, Self::tool_input(&task)).await?;
        Ok(TaskResult::success(output))
    }

    async fn execute_streaming(
        &self,
        harness: Arc<StreamingHarness>,
        task: Task,
    ) -> Result<TaskResult, ComponentError> {
        let emit_failed = |e: aegis_component_sdk::EmitError| ComponentError::Failed(e.to_string());

        harness
            .emit_status(AgentStatus::Running, format!("echoing task {}", task.id))
            .await
            .map_err(emit_failed)?;

        let output = harness.call_tool(ECHO_TOOL_NAME, Self::tool_input(&task)).await?;

        // Acknowledge anything the operator queued while the tool ran
        while let Some(message) = harness.steering().try_recv() {
            harness
                .emit_output(format!("steering received: {}", message.content), false)
                .await
                .map_err(emit_failed)?;
        }

        harness
            .emit_status(AgentStatus::Completed, "echo complete")
            .await
            .map_err(emit_failed)?;
        Ok(TaskResult::success(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_component_sdk::{HarnessFactory, StandaloneHarnessFactory, TaskStatus};

    #[tokio::test]
    async fn test_echo_tool_returns_input() {
        let output = EchoTool.call(json!({"a": 1})).await.unwrap();
        assert_eq!(output, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_echo_agent_unary() {
        let factory = StandaloneHarnessFactory::new().with_tool(Arc::new(EchoTool));
        let task = Task::new("task-1", "say hello");
        let harness = factory.create(&task).unwrap();

        let result = EchoAgent.execute(harness, task).await.unwrap();
        assert_eq!(result.status, TaskStatus::Success);
        assert_eq!(result.output["goal"], "say hello");
    }

    #[tokio::test]
    async fn test_echo_agent_without_tool_fails() {
        let factory = StandaloneHarnessFactory::new();
        let task = Task::new("task-1", "say hello");
        let harness = factory.create(&task).unwrap();

        let err = EchoAgent.execute(harness, task).await.unwrap_err();
        assert!(matches!(err, ComponentError::Harness(HarnessError::ToolNotFound(_))));
    }

    #[test]
    fn test_descriptor_advertises_streaming() {
        let descriptor = EchoAgent.descriptor();
        assert_eq!(descriptor.name, ECHO_AGENT_NAME);
        assert!(descriptor.streaming);
        assert_eq!(descriptor.capabilities, vec![ECHO_TOOL_NAME.to_string()]);
    }
}
