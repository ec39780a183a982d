// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Streaming Harness
//!
//! Decorator over a base [`Harness`] that re-emits every observable action of
//! the hosted component onto the session's outbound stream.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Intercepts tool calls, findings and LLM traffic and emits
//!   paired, sequenced stream events
//!
//! # Interception
//!
//! | Operation | Events |
//! |-----------|--------|
//! | `call_tool` | `tool_call` before forwarding, `tool_result` after (always both) |
//! | `submit_finding` | `finding` before forwarding, regardless of outcome |
//! | `complete` | one `output` on success, nothing on failure |
//! | `stream` | one `output` per chunk, emitted as the chunk is pulled |
//! | everything else | none (pass-through) |
//!
//! Interception emits are best-effort: a transport failure is recorded on the
//! session and logged, and the delegated call proceeds and returns its own
//! result unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::application::session::{EmitError, SteeringReceiver, StreamingSession};
use crate::domain::capability::{
    AgentDescriptor, ChunkStream, CompletionOptions, CompletionResponse, Finding, Harness,
    HarnessError, MemoryStore, Message, MissionContext, PluginDescriptor, TargetInfo, TokenUsage,
    ToolDescriptor,
};
use crate::domain::component::{Task, TaskResult};
use crate::domain::events::{AgentStatus, EventPayload, ExecutionMode};

pub struct StreamingHarness {
    inner: Arc<dyn Harness>,
    session: Arc<StreamingSession>,
}

impl StreamingHarness {
    pub fn new(inner: Arc<dyn Harness>, session: Arc<StreamingSession>) -> Self {
        Self { inner, session }
    }

    pub fn session(&self) -> &Arc<StreamingSession> {
        &self.session
    }

    pub async fn emit_output(&self, content: impl Into<String>, is_reasoning: bool) -> Result<u64, EmitError> {
        self.session
            .emit(EventPayload::Output {
                content: content.into(),
                is_reasoning,
            })
            .await
    }

    pub async fn emit_tool_call(&self, name: &str, input: &Value, call_id: &str) -> Result<u64, EmitError> {
        self.session
            .emit(EventPayload::ToolCall {
                name: name.to_string(),
                input: serde_json::to_string(input)?,
                call_id: call_id.to_string(),
            })
            .await
    }

    pub async fn emit_tool_result(&self, call_id: &str, output: &Value, success: bool) -> Result<u64, EmitError> {
        self.session
            .emit(EventPayload::ToolResult {
                call_id: call_id.to_string(),
                output: serde_json::to_string(output)?,
                success,
            })
            .await
    }

    /// Serialization happens before the send lock is taken; a payload that
    /// fails to serialize never consumes a sequence number.
    pub async fn emit_finding(&self, finding: &Finding) -> Result<u64, EmitError> {
        let payload = serde_json::to_string(finding)?;
        self.session.emit(EventPayload::Finding { payload }).await
    }

    pub async fn emit_status(&self, status: AgentStatus, message: impl Into<String>) -> Result<u64, EmitError> {
        self.session
            .emit(EventPayload::Status {
                status,
                message: message.into(),
            })
            .await
    }

    pub async fn emit_error(
        &self,
        code: impl Into<String>,
        message: impl Into<String>,
        fatal: bool,
    ) -> Result<u64, EmitError> {
        self.session
            .emit(EventPayload::Error {
                code: code.into(),
                message: message.into(),
                fatal,
            })
            .await
    }

    pub fn mode(&self) -> ExecutionMode {
        self.session.mode()
    }

    pub fn set_mode(&self, mode: ExecutionMode) {
        self.session.set_mode(mode);
    }

    pub fn steering(&self) -> &SteeringReceiver {
        self.session.steering()
    }

    /// First transport error seen by an intercepted call, if any
    pub fn transport_error(&self) -> Option<String> {
        self.session.transport_error()
    }

    fn note(&self, result: Result<u64, EmitError>) {
        if let Err(e) = result {
            self.session.record_transport_error(&e);
        }
    }
}

#[async_trait]
impl Harness for StreamingHarness {
    async fn complete(
        &self,
        slot: &str,
        messages: Vec<Message>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, HarnessError> {
        let response = tokio::select! {
            _ = self.session.cancellation().cancelled() => return Err(HarnessError::Cancelled),
            result = self.inner.complete(slot, messages, options) => result?,
        };

        let emitted = self.emit_output(response.content.clone(), false).await;
        self.note(emitted);
        Ok(response)
    }

    async fn stream(&self, slot: &str, messages: Vec<Message>) -> Result<ChunkStream, HarnessError> {
        let cancel = self.session.cancellation().clone();
        let chunks = tokio::select! {
            _ = cancel.cancelled() => return Err(HarnessError::Cancelled),
            result = self.inner.stream(slot, messages) => result?,
        };

        let session = self.session.clone();
        let adapted = chunks
            .then(move |item| {
                let session = session.clone();
                async move {
                    if let Ok(chunk) = &item {
                        let emitted = session
                            .emit(EventPayload::Output {
                                content: chunk.delta.clone(),
                                is_reasoning: false,
                            })
                            .await;
                        if let Err(e) = emitted {
                            session.record_transport_error(&e);
                        }
                    }
                    item
                }
            })
            .take_until(cancel.cancelled_owned());

        Ok(Box::pin(adapted))
    }

    async fn call_tool(&self, name: &str, input: Value) -> Result<Value, HarnessError> {
        let call_id = Uuid::new_v4().to_string();
        debug!(tool = name, call_id = %call_id, "Intercepted tool call");

        let emitted = self.emit_tool_call(name, &input, &call_id).await;
        self.note(emitted);

        let result = tokio::select! {
            _ = self.session.cancellation().cancelled() => Err(HarnessError::Cancelled),
            result = self.inner.call_tool(name, input) => result,
        };

        let emitted = match &result {
            Ok(output) => self.emit_tool_result(&call_id, output, true).await,
            Err(e) => {
                self.emit_tool_result(&call_id, &json!({ "error": e.to_string() }), false)
                    .await
            }
        };
        self.note(emitted);

        result
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, HarnessError> {
        self.inner.list_tools().await
    }

    async fn query_plugin(&self, name: &str, method: &str, params: Value) -> Result<Value, HarnessError> {
        self.inner.query_plugin(name, method, params).await
    }

    async fn list_plugins(&self) -> Result<Vec<PluginDescriptor>, HarnessError> {
        self.inner.list_plugins().await
    }

    async fn delegate_to_agent(&self, name: &str, task: Task) -> Result<TaskResult, HarnessError> {
        self.inner.delegate_to_agent(name, task).await
    }

    async fn list_agents(&self) -> Result<Vec<AgentDescriptor>, HarnessError> {
        self.inner.list_agents().await
    }

    async fn submit_finding(&self, finding: Finding) -> Result<(), HarnessError> {
        let emitted = self.emit_finding(&finding).await;
        self.note(emitted);
        self.inner.submit_finding(finding).await
    }

    fn memory(&self) -> Arc<dyn MemoryStore> {
        self.inner.memory()
    }

    fn mission(&self) -> &MissionContext {
        self.inner.mission()
    }

    fn target(&self) -> &TargetInfo {
        self.inner.target()
    }

    fn span(&self) -> tracing::Span {
        self.inner.span()
    }

    fn token_usage(&self) -> TokenUsage {
        self.inner.token_usage()
    }
}
