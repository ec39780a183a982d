// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Component
//!
//! Value objects describing a hosted component and the tasks it runs.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements component descriptors, tasks and task results

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::capability::{HarnessError, MissionContext, TargetInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Agent,
    Tool,
    Plugin,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::Agent => write!(f, "agent"),
            ComponentKind::Tool => write!(f, "tool"),
            ComponentKind::Plugin => write!(f, "plugin"),
        }
    }
}

/// Static description of a hosted component, returned by `GetDescriptor`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub name: String,
    pub version: String,
    pub kind: ComponentKind,
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Whether the component supports `StreamExecute`
    pub streaming: bool,
}

impl ComponentDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            kind,
            description: String::new(),
            capabilities: Vec::new(),
            streaming: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }
}

/// A unit of work handed to a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub goal: String,
    #[serde(default)]
    pub context: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission: Option<MissionContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetInfo>,
}

impl Task {
    pub fn new(id: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            goal: goal.into(),
            context: Value::Null,
            mission: None,
            target: None,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Success,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub status: TaskStatus,
    #[serde(default)]
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    pub fn success(output: Value) -> Self {
        Self { status: TaskStatus::Success, output, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { status: TaskStatus::Failed, output: Value::Null, error: Some(error.into()) }
    }

    pub fn cancelled() -> Self {
        Self { status: TaskStatus::Cancelled, output: Value::Null, error: None }
    }
}

/// Errors a component reports from its run loop
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error("Execution failed: {0}")]
    Failed(String),
}
