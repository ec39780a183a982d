// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status reported by a running component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Running,
    Paused,
    WaitingForInput,
    Completed,
    Failed,
    Cancelled,
}

/// Session metadata controlling how much the component may do unattended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Autonomous,
    Interactive,
}

/// Observable activity of a hosted component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Output {
        content: String,
        is_reasoning: bool,
    },
    ToolCall {
        name: String,
        input: String, // JSON-encoded
        call_id: String,
    },
    ToolResult {
        call_id: String,
        output: String, // JSON-encoded
        success: bool,
    },
    Finding {
        payload: String, // JSON-encoded finding
    },
    Status {
        status: AgentStatus,
        message: String,
    },
    Error {
        code: String,
        message: String,
        fatal: bool,
    },
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::Output { .. } => "output",
            EventPayload::ToolCall { .. } => "tool_call",
            EventPayload::ToolResult { .. } => "tool_result",
            EventPayload::Finding { .. } => "finding",
            EventPayload::Status { .. } => "status",
            EventPayload::Error { .. } => "error",
        }
    }
}

/// A sequenced event on the outbound stream of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

/// Inbound control instruction from the remote controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteeringMessage {
    pub id: String,
    pub content: String,
}

impl SteeringMessage {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id: id.into(), content: content.into() }
    }
}
