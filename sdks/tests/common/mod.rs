// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared fixtures for the integration tests: a scriptable base harness,
//! a few components and helpers wiring a streaming harness to a channel.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use aegis_component_sdk::{
    steering_channel, AgentDescriptor, ChunkStream, Component, ComponentDescriptor, ComponentError,
    ComponentKind, CompletionOptions, CompletionResponse, ExecutionMode, FinishReason, Finding,
    Harness, HarnessError, HarnessFactory, MemoryStore, Message, MissionContext, PluginDescriptor,
    StandaloneHarness, SteeringMessage, StreamChunk, StreamEvent, StreamingHarness,
    StreamingSession, TargetInfo, Task, TaskResult, TokenUsage, ToolDescriptor,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Base harness with scripted behavior
pub struct MockHarness {
    pub fail_tools: bool,
    pub reject_findings: bool,
    pub completion: Result<String, String>,
    pub chunks: Vec<String>,
    pub tool_delay: Option<Duration>,
    pub findings: Mutex<Vec<Finding>>,
    pub tool_calls: Mutex<Vec<(String, Value)>>,
    pub mission: MissionContext,
    pub target: TargetInfo,
    pub standalone: StandaloneHarness,
}

impl Default for MockHarness {
    fn default() -> Self {
        Self {
            fail_tools: false,
            reject_findings: false,
            completion: Ok("hello".to_string()),
            chunks: Vec::new(),
            tool_delay: None,
            findings: Mutex::new(Vec::new()),
            tool_calls: Mutex::new(Vec::new()),
            mission: MissionContext {
                id: "mission-1".to_string(),
                name: "Assessment".to_string(),
                objective: "Find issues".to_string(),
            },
            target: TargetInfo::default(),
            standalone: StandaloneHarness::builder().build(),
        }
    }
}

#[async_trait]
impl Harness for MockHarness {
    async fn complete(
        &self,
        _slot: &str,
        _messages: Vec<Message>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, HarnessError> {
        match &self.completion {
            Ok(content) => Ok(CompletionResponse {
                content: content.clone(),
                model: "mock".to_string(),
                finish_reason: FinishReason::Stop,
                usage: TokenUsage::default(),
            }),
            Err(e) => Err(HarnessError::Llm(e.clone())),
        }
    }

    async fn stream(&self, _slot: &str, _messages: Vec<Message>) -> Result<ChunkStream, HarnessError> {
        let chunks: Vec<Result<StreamChunk, HarnessError>> =
            self.chunks.iter().map(|c| Ok(StreamChunk::new(c.clone()))).collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn call_tool(&self, name: &str, input: Value) -> Result<Value, HarnessError> {
        self.tool_calls.lock().push((name.to_string(), input.clone()));
        if let Some(delay) = self.tool_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_tools {
            return Err(HarnessError::ToolFailed {
                name: name.to_string(),
                message: "boom".to_string(),
            });
        }
        Ok(json!({ "tool": name, "echo": input }))
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, HarnessError> {
        Ok(vec![ToolDescriptor {
            name: "probe".to_string(),
            description: "Probe a target".to_string(),
            tags: vec![],
        }])
    }

    async fn query_plugin(&self, _name: &str, method: &str, _params: Value) -> Result<Value, HarnessError> {
        Ok(json!({ "method": method }))
    }

    async fn list_plugins(&self) -> Result<Vec<PluginDescriptor>, HarnessError> {
        Ok(Vec::new())
    }

    async fn delegate_to_agent(&self, _name: &str, _task: Task) -> Result<TaskResult, HarnessError> {
        Ok(TaskResult::success(json!("delegated")))
    }

    async fn list_agents(&self) -> Result<Vec<AgentDescriptor>, HarnessError> {
        Ok(Vec::new())
    }

    async fn submit_finding(&self, finding: Finding) -> Result<(), HarnessError> {
        if self.reject_findings {
            return Err(HarnessError::Finding("rejected".to_string()));
        }
        self.findings.lock().push(finding);
        Ok(())
    }

    fn memory(&self) -> Arc<dyn MemoryStore> {
        self.standalone.memory()
    }

    fn mission(&self) -> &MissionContext {
        &self.mission
    }

    fn target(&self) -> &TargetInfo {
        &self.target
    }

    fn span(&self) -> tracing::Span {
        tracing::Span::none()
    }

    fn token_usage(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: 3,
            completion_tokens: 4,
            total_tokens: 7,
        }
    }
}

pub struct Wired {
    pub harness: Arc<StreamingHarness>,
    pub events: mpsc::Receiver<StreamEvent>,
    pub steering: mpsc::Sender<SteeringMessage>,
}

/// Streaming harness over `inner` writing into a channel of `buffer` slots
pub fn wire(inner: Arc<dyn Harness>, buffer: usize) -> Wired {
    let (tx, events) = mpsc::channel(buffer);
    let (steering, steering_rx) = steering_channel(8);
    let session = Arc::new(StreamingSession::new(
        Arc::new(tx),
        steering_rx,
        ExecutionMode::Autonomous,
        CancellationToken::new(),
    ));
    session.activate().unwrap();
    Wired {
        harness: Arc::new(StreamingHarness::new(inner, session)),
        events,
        steering,
    }
}

/// Drain everything currently buffered
pub fn drain(events: &mut mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

pub struct MockFactory {
    pub fail_tools: bool,
    pub tool_delay: Option<Duration>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            fail_tools: false,
            tool_delay: None,
        }
    }
}

impl HarnessFactory for MockFactory {
    fn create(&self, _task: &Task) -> Result<Arc<dyn Harness>, HarnessError> {
        Ok(Arc::new(MockHarness {
            fail_tools: self.fail_tools,
            tool_delay: self.tool_delay,
            ..Default::default()
        }))
    }
}

/// Emits status, calls the `probe` tool, emits status again
pub struct ProbeAgent;

#[async_trait]
impl Component for ProbeAgent {
    fn descriptor(&self) -> ComponentDescriptor {
        ComponentDescriptor::new("probe-agent", "0.1.0", ComponentKind::Agent)
            .with_description("Calls one tool between two status updates")
            .streaming()
    }

    async fn execute(&self, harness: Arc<dyn Harness>, task: Task) -> Result<TaskResult, ComponentError> {
        let output = harness.call_tool("probe", json!({ "goal": task.goal })).await?;
        Ok(TaskResult::success(output))
    }

    async fn execute_streaming(
        &self,
        harness: Arc<StreamingHarness>,
        task: Task,
    ) -> Result<TaskResult, ComponentError> {
        use aegis_component_sdk::AgentStatus;

        harness
            .emit_status(AgentStatus::Running, "starting")
            .await
            .map_err(|e| ComponentError::Failed(e.to_string()))?;
        let output = harness.call_tool("probe", json!({ "goal": task.goal })).await?;
        harness
            .emit_status(AgentStatus::Completed, "done")
            .await
            .map_err(|e| ComponentError::Failed(e.to_string()))?;
        Ok(TaskResult::success(output))
    }
}

/// Waits for steering messages and echoes each one as output until the
/// queue closes or `stop` arrives
pub struct SteeredAgent;

#[async_trait]
impl Component for SteeredAgent {
    fn descriptor(&self) -> ComponentDescriptor {
        ComponentDescriptor::new("steered-agent", "0.1.0", ComponentKind::Agent).streaming()
    }

    async fn execute(&self, _harness: Arc<dyn Harness>, _task: Task) -> Result<TaskResult, ComponentError> {
        Err(ComponentError::Failed("streaming only".to_string()))
    }

    async fn execute_streaming(
        &self,
        harness: Arc<StreamingHarness>,
        _task: Task,
    ) -> Result<TaskResult, ComponentError> {
        while let Some(message) = harness.steering().recv().await {
            if message.content == "stop" {
                break;
            }
            harness
                .emit_output(format!("ack:{}", message.content), false)
                .await
                .map_err(|e| ComponentError::Failed(e.to_string()))?;
        }
        Ok(TaskResult::success(Value::Null))
    }
}

/// Sleeps for a fixed time, ignoring cancellation unless run through the
/// harness
pub struct SlowAgent {
    pub delay: Duration,
}

#[async_trait]
impl Component for SlowAgent {
    fn descriptor(&self) -> ComponentDescriptor {
        ComponentDescriptor::new("slow-agent", "0.1.0", ComponentKind::Agent)
    }

    async fn execute(&self, _harness: Arc<dyn Harness>, _task: Task) -> Result<TaskResult, ComponentError> {
        tokio::time::sleep(self.delay).await;
        Ok(TaskResult::success(json!("slept")))
    }
}

/// Always fails
pub struct FailingAgent;

#[async_trait]
impl Component for FailingAgent {
    fn descriptor(&self) -> ComponentDescriptor {
        ComponentDescriptor::new("failing-agent", "0.1.0", ComponentKind::Agent)
    }

    async fn execute(&self, _harness: Arc<dyn Harness>, _task: Task) -> Result<TaskResult, ComponentError> {
        Err(ComponentError::Failed("target unreachable".to_string()))
    }
}

/// Runs its two status updates and the `probe` tool call concurrently
pub struct ConcurrentAgent;

#[async_trait]
impl Component for ConcurrentAgent {
    fn descriptor(&self) -> ComponentDescriptor {
        ComponentDescriptor::new("concurrent-agent", "0.1.0", ComponentKind::Agent).streaming()
    }

    async fn execute(&self, harness: Arc<dyn Harness>, task: Task) -> Result<TaskResult, ComponentError> {
        let output = harness.call_tool("probe", json!({ "goal": task.goal })).await?;
        Ok(TaskResult::success(output))
    }

    async fn execute_streaming(
        &self,
        harness: Arc<StreamingHarness>,
        task: Task,
    ) -> Result<TaskResult, ComponentError> {
        use aegis_component_sdk::AgentStatus;

        let (running, output, completed) = tokio::join!(
            harness.emit_status(AgentStatus::Running, "starting"),
            harness.call_tool("probe", json!({ "goal": task.goal })),
            harness.emit_status(AgentStatus::Completed, "done"),
        );
        running.map_err(|e| ComponentError::Failed(e.to_string()))?;
        completed.map_err(|e| ComponentError::Failed(e.to_string()))?;
        Ok(TaskResult::success(output?))
    }
}
