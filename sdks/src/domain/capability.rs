// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Capability
//!
//! The capability surface a hosted component sees: tool invocation, agent
//! delegation, LLM completion and streaming, finding submission, memory and
//! mission/target context.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Defines the `Harness` port shared by every capability provider

// Capability Provider Domain Interface
//
// Every concrete provider (the orchestrator callback client, the standalone
// harness, the streaming decorator) implements `Harness`. Components only
// ever see `Arc<dyn Harness>` or the streaming decorator.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::component::{Task, TaskResult};

/// Lazy sequence of completion chunks returned by [`Harness::stream`]
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, HarnessError>> + Send>>;

/// Capability provider interface
#[async_trait]
pub trait Harness: Send + Sync {
    /// Generate a completion from the LLM bound to `slot`
    async fn complete(
        &self,
        slot: &str,
        messages: Vec<Message>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, HarnessError>;

    /// Stream a completion from the LLM bound to `slot`
    async fn stream(&self, slot: &str, messages: Vec<Message>) -> Result<ChunkStream, HarnessError>;

    /// Invoke a tool by name
    async fn call_tool(&self, name: &str, input: Value) -> Result<Value, HarnessError>;

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, HarnessError>;

    /// Call a method on a plugin
    async fn query_plugin(&self, name: &str, method: &str, params: Value) -> Result<Value, HarnessError>;

    async fn list_plugins(&self) -> Result<Vec<PluginDescriptor>, HarnessError>;

    /// Hand a sub-task to another agent and wait for its result
    async fn delegate_to_agent(&self, name: &str, task: Task) -> Result<TaskResult, HarnessError>;

    async fn list_agents(&self) -> Result<Vec<AgentDescriptor>, HarnessError>;

    /// Record a finding with the controller
    async fn submit_finding(&self, finding: Finding) -> Result<(), HarnessError>;

    /// Key/value working memory scoped to the current task
    fn memory(&self) -> Arc<dyn MemoryStore>;

    fn mission(&self) -> &MissionContext;

    fn target(&self) -> &TargetInfo;

    /// Tracing span that scopes all logging for the current task
    fn span(&self) -> tracing::Span;

    /// Cumulative LLM token usage for the current task
    fn token_usage(&self) -> TokenUsage;
}

/// Working memory port
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, HarnessError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), HarnessError>;
    async fn delete(&self, key: &str) -> Result<bool, HarnessError>;
    async fn keys(&self) -> Result<Vec<String>, HarnessError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), name: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), name: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), name: None }
    }
}

/// Options for LLM completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 = deterministic, 1.0 = creative)
    pub temperature: Option<f32>,

    /// Sequences that stop generation
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: Some(4096),
            temperature: Some(0.7),
            stop_sequences: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated text
    pub content: String,

    /// Model used (e.g., "gpt-4o", "llama3.2")
    pub model: String,

    pub finish_reason: FinishReason,

    pub usage: TokenUsage,
}

/// One incremental piece of a streamed completion
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChunk {
    pub delta: String,
    pub finish_reason: Option<FinishReason>,
}

impl StreamChunk {
    pub fn new(delta: impl Into<String>) -> Self {
        Self { delta: delta.into(), finish_reason: None }
    }
}

/// Reason why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Natural completion (model decided to stop)
    Stop,

    /// Hit max_tokens limit
    Length,

    /// Model requested a tool call
    ToolCalls,

    /// Blocked by content filter
    ContentFilter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionContext {
    pub id: String,
    pub name: String,
    pub objective: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub id: String,
    pub name: String,
    /// Target type, e.g. "llm_api", "web_app"
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// Evidence attached to a finding (request/response pair, log excerpt, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub kind: String,
    pub content: String,
}

/// A security finding produced by a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub category: String,
    /// 0.0 - 1.0
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    pub created_at: DateTime<Utc>,
}

impl Finding {
    pub fn new(title: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            severity,
            category: String::new(),
            confidence: 1.0,
            evidence: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_evidence(mut self, kind: impl Into<String>, content: impl Into<String>) -> Self {
        self.evidence.push(Evidence { kind: kind.into(), content: content.into() });
        self
    }
}

/// Errors raised by a capability provider
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool {name} failed: {message}")]
    ToolFailed { name: String, message: String },

    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("Agent delegation failed: {0}")]
    Delegation(String),

    #[error("No LLM bound to slot: {0}")]
    SlotUnavailable(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Finding rejected: {0}")]
    Finding(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Operation cancelled")]
    Cancelled,
}
