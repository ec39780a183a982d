// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Standalone Harness
//!
//! A local capability provider for running a component without an
//! orchestrator: registered tool handlers, in-process working memory and
//! recorded findings. No LLM slot is bound and agent delegation is not
//! available.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements the `Harness` and `MemoryStore` ports locally

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

use crate::application::component::HarnessFactory;
use crate::domain::capability::{
    AgentDescriptor, ChunkStream, CompletionOptions, CompletionResponse, Finding, Harness,
    HarnessError, MemoryStore, Message, MissionContext, PluginDescriptor, TargetInfo, TokenUsage,
    ToolDescriptor,
};
use crate::domain::component::{Task, TaskResult};

/// A locally executed tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    async fn call(&self, input: Value) -> Result<Value, HarnessError>;
}

#[derive(Default)]
pub struct InMemoryMemoryStore {
    entries: DashMap<String, Value>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, HarnessError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), HarnessError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, HarnessError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, HarnessError> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}

pub struct StandaloneHarness {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
    memory: Arc<InMemoryMemoryStore>,
    findings: Mutex<Vec<Finding>>,
    mission: MissionContext,
    target: TargetInfo,
    span: tracing::Span,
}

impl StandaloneHarness {
    pub fn builder() -> StandaloneHarnessBuilder {
        StandaloneHarnessBuilder::default()
    }

    /// Findings submitted so far, oldest first
    pub fn findings(&self) -> Vec<Finding> {
        self.findings.lock().clone()
    }
}

#[async_trait]
impl Harness for StandaloneHarness {
    async fn complete(
        &self,
        slot: &str,
        _messages: Vec<Message>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, HarnessError> {
        Err(HarnessError::SlotUnavailable(slot.to_string()))
    }

    async fn stream(&self, slot: &str, _messages: Vec<Message>) -> Result<ChunkStream, HarnessError> {
        Err(HarnessError::SlotUnavailable(slot.to_string()))
    }

    async fn call_tool(&self, name: &str, input: Value) -> Result<Value, HarnessError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| HarnessError::ToolNotFound(name.to_string()))?;
        debug!(tool = name, "Calling local tool");
        tool.call(input).await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, HarnessError> {
        let mut tools: Vec<ToolDescriptor> = self.tools.values().map(|t| t.descriptor()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tools)
    }

    async fn query_plugin(&self, name: &str, _method: &str, _params: Value) -> Result<Value, HarnessError> {
        Err(HarnessError::Plugin(format!("plugin {} is not available standalone", name)))
    }

    async fn list_plugins(&self) -> Result<Vec<PluginDescriptor>, HarnessError> {
        Ok(Vec::new())
    }

    async fn delegate_to_agent(&self, name: &str, _task: Task) -> Result<TaskResult, HarnessError> {
        Err(HarnessError::Unsupported(format!("delegation to {}", name)))
    }

    async fn list_agents(&self) -> Result<Vec<AgentDescriptor>, HarnessError> {
        Ok(Vec::new())
    }

    async fn submit_finding(&self, finding: Finding) -> Result<(), HarnessError> {
        info!(
            finding_id = %finding.id,
            severity = ?finding.severity,
            title = %finding.title,
            "Finding submitted"
        );
        self.findings.lock().push(finding);
        Ok(())
    }

    fn memory(&self) -> Arc<dyn MemoryStore> {
        self.memory.clone()
    }

    fn mission(&self) -> &MissionContext {
        &self.mission
    }

    fn target(&self) -> &TargetInfo {
        &self.target
    }

    fn span(&self) -> tracing::Span {
        self.span.clone()
    }

    fn token_usage(&self) -> TokenUsage {
        TokenUsage::default()
    }
}

#[derive(Default)]
pub struct StandaloneHarnessBuilder {
    tools: Vec<Arc<dyn ToolHandler>>,
    mission: Option<MissionContext>,
    target: Option<TargetInfo>,
    span: Option<tracing::Span>,
}

impl StandaloneHarnessBuilder {
    pub fn tool(mut self, tool: Arc<dyn ToolHandler>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn mission(mut self, mission: MissionContext) -> Self {
        self.mission = Some(mission);
        self
    }

    pub fn target(mut self, target: TargetInfo) -> Self {
        self.target = Some(target);
        self
    }

    pub fn span(mut self, span: tracing::Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> StandaloneHarness {
        let tools = self
            .tools
            .into_iter()
            .map(|tool| (tool.descriptor().name, tool))
            .collect();

        StandaloneHarness {
            tools,
            memory: Arc::new(InMemoryMemoryStore::new()),
            findings: Mutex::new(Vec::new()),
            mission: self.mission.unwrap_or_default(),
            target: self.target.unwrap_or_default(),
            span: self.span.unwrap_or_else(tracing::Span::current),
        }
    }
}

/// Builds a fresh [`StandaloneHarness`] per task with a shared tool set
#[derive(Default, Clone)]
pub struct StandaloneHarnessFactory {
    tools: Vec<Arc<dyn ToolHandler>>,
}

impl StandaloneHarnessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, tool: Arc<dyn ToolHandler>) -> Self {
        self.tools.push(tool);
        self
    }
}

impl HarnessFactory for StandaloneHarnessFactory {
    fn create(&self, task: &Task) -> Result<Arc<dyn Harness>, HarnessError> {
        let mut builder = StandaloneHarness::builder()
            .span(tracing::info_span!("task", task_id = %task.id));
        for tool in &self.tools {
            builder = builder.tool(tool.clone());
        }
        if let Some(mission) = &task.mission {
            builder = builder.mission(mission.clone());
        }
        if let Some(target) = &task.target {
            builder = builder.target(target.clone());
        }
        Ok(Arc::new(builder.build()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::capability::Severity;
    use serde_json::json;

    struct Upper;

    #[async_trait]
    impl ToolHandler for Upper {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                name: "upper".to_string(),
                description: "Uppercase a string".to_string(),
                tags: vec![],
            }
        }

        async fn call(&self, input: Value) -> Result<Value, HarnessError> {
            let text = input["text"].as_str().ok_or_else(|| HarnessError::ToolFailed {
                name: "upper".to_string(),
                message: "missing text".to_string(),
            })?;
            Ok(json!({ "text": text.to_uppercase() }))
        }
    }

    #[tokio::test]
    async fn test_tool_dispatch() {
        let harness = StandaloneHarness::builder().tool(Arc::new(Upper)).build();

        let out = harness.call_tool("upper", json!({"text": "abc"})).await.unwrap();
        assert_eq!(out, json!({"text": "ABC"}));

        let err = harness.call_tool("upper", json!({})).await.unwrap_err();
        assert!(matches!(err, HarnessError::ToolFailed { .. }));

        let err = harness.call_tool("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, HarnessError::ToolNotFound(name) if name == "missing"));

        assert_eq!(harness.list_tools().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_llm_and_no_delegation() {
        let harness = StandaloneHarness::builder().build();
        let err = harness
            .complete("primary", vec![Message::user("hi")], CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::SlotUnavailable(_)));

        let err = harness.delegate_to_agent("helper", Task::new("t", "g")).await.unwrap_err();
        assert!(matches!(err, HarnessError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_memory_and_findings() {
        let harness = StandaloneHarness::builder().build();
        let memory = harness.memory();

        memory.set("b", json!(2)).await.unwrap();
        memory.set("a", json!(1)).await.unwrap();
        assert_eq!(memory.get("a").await.unwrap(), Some(json!(1)));
        assert_eq!(memory.keys().await.unwrap(), vec!["a", "b"]);
        assert!(memory.delete("a").await.unwrap());
        assert!(!memory.delete("a").await.unwrap());

        harness
            .submit_finding(Finding::new("Open redirect", Severity::Medium))
            .await
            .unwrap();
        assert_eq!(harness.findings().len(), 1);
    }

    #[test]
    fn test_factory_carries_task_context() {
        let factory = StandaloneHarnessFactory::new().with_tool(Arc::new(Upper));
        let mut task = Task::new("task-1", "probe");
        task.mission = Some(MissionContext {
            id: "m-1".to_string(),
            name: "Q3 assessment".to_string(),
            objective: "Find issues".to_string(),
        });

        let harness = factory.create(&task).unwrap();
        assert_eq!(harness.mission().id, "m-1");
        assert_eq!(harness.target(), &TargetInfo::default());
    }
}
