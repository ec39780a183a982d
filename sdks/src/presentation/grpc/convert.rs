// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Conversions between domain types and their protobuf messages

use serde_json::Value;
use tonic::Status;

use super::proto;
use crate::domain::capability::{MissionContext, TargetInfo};
use crate::domain::component::{ComponentDescriptor, ComponentKind, Task, TaskResult, TaskStatus};
use crate::domain::events::{AgentStatus, EventPayload, ExecutionMode, StreamEvent};
use crate::domain::health::{HealthState, HealthStatus};

impl From<ComponentKind> for proto::ComponentKind {
    fn from(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Agent => proto::ComponentKind::Agent,
            ComponentKind::Tool => proto::ComponentKind::Tool,
            ComponentKind::Plugin => proto::ComponentKind::Plugin,
        }
    }
}

impl From<ComponentDescriptor> for proto::ComponentDescriptor {
    fn from(d: ComponentDescriptor) -> Self {
        Self {
            name: d.name,
            version: d.version,
            kind: proto::ComponentKind::from(d.kind) as i32,
            description: d.description,
            capabilities: d.capabilities,
            streaming: d.streaming,
        }
    }
}

/// Decode a task received on the wire. Empty context means `null`.
pub fn task_from_proto(task: proto::Task) -> Result<Task, Status> {
    let context = if task.context_json.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&task.context_json)
            .map_err(|e| Status::invalid_argument(format!("Invalid task context: {}", e)))?
    };

    Ok(Task {
        id: task.id,
        goal: task.goal,
        context,
        mission: task.mission.map(|m| MissionContext {
            id: m.id,
            name: m.name,
            objective: m.objective,
        }),
        target: task.target.map(|t| TargetInfo {
            id: t.id,
            name: t.name,
            kind: t.kind,
            url: t.url,
        }),
    })
}

impl From<&Task> for proto::Task {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            goal: task.goal.clone(),
            context_json: if task.context.is_null() {
                String::new()
            } else {
                task.context.to_string()
            },
            mission: task.mission.as_ref().map(|m| proto::Mission {
                id: m.id.clone(),
                name: m.name.clone(),
                objective: m.objective.clone(),
            }),
            target: task.target.as_ref().map(|t| proto::Target {
                id: t.id.clone(),
                name: t.name.clone(),
                kind: t.kind.clone(),
                url: t.url.clone(),
            }),
        }
    }
}

impl From<TaskResult> for proto::ExecuteResponse {
    fn from(result: TaskResult) -> Self {
        let status = match result.status {
            TaskStatus::Success => proto::TaskStatus::Success,
            TaskStatus::Failed => proto::TaskStatus::Failed,
            TaskStatus::Cancelled => proto::TaskStatus::Cancelled,
        };
        Self {
            status: status as i32,
            output_json: result.output.to_string(),
            error: result.error,
        }
    }
}

impl From<HealthStatus> for proto::HealthResponse {
    fn from(status: HealthStatus) -> Self {
        let state = match status.state {
            HealthState::Healthy => proto::HealthState::Healthy,
            HealthState::Degraded => proto::HealthState::Degraded,
            HealthState::Unhealthy => proto::HealthState::Unhealthy,
        };
        Self {
            state: state as i32,
            message: status.message,
            timestamp_ms: status.updated_at.timestamp_millis(),
        }
    }
}

/// Unspecified modes fall back to autonomous
impl From<proto::ExecutionMode> for ExecutionMode {
    fn from(mode: proto::ExecutionMode) -> Self {
        match mode {
            proto::ExecutionMode::Interactive => ExecutionMode::Interactive,
            proto::ExecutionMode::Autonomous | proto::ExecutionMode::Unspecified => {
                ExecutionMode::Autonomous
            }
        }
    }
}

impl From<AgentStatus> for proto::AgentStatus {
    fn from(status: AgentStatus) -> Self {
        match status {
            AgentStatus::Running => proto::AgentStatus::Running,
            AgentStatus::Paused => proto::AgentStatus::Paused,
            AgentStatus::WaitingForInput => proto::AgentStatus::WaitingForInput,
            AgentStatus::Completed => proto::AgentStatus::Completed,
            AgentStatus::Failed => proto::AgentStatus::Failed,
            AgentStatus::Cancelled => proto::AgentStatus::Cancelled,
        }
    }
}

impl From<StreamEvent> for proto::StreamEvent {
    fn from(event: StreamEvent) -> Self {
        use proto::stream_event::Payload;

        let payload = match event.payload {
            EventPayload::Output { content, is_reasoning } => {
                Payload::Output(proto::OutputEvent { content, is_reasoning })
            }
            EventPayload::ToolCall { name, input, call_id } => Payload::ToolCall(proto::ToolCallEvent {
                name,
                input_json: input,
                call_id,
            }),
            EventPayload::ToolResult { call_id, output, success } => {
                Payload::ToolResult(proto::ToolResultEvent {
                    call_id,
                    output_json: output,
                    success,
                })
            }
            EventPayload::Finding { payload } => Payload::Finding(proto::FindingEvent { finding_json: payload }),
            EventPayload::Status { status, message } => Payload::Status(proto::StatusEvent {
                status: proto::AgentStatus::from(status) as i32,
                message,
            }),
            EventPayload::Error { code, message, fatal } => {
                Payload::Error(proto::ErrorEvent { code, message, fatal })
            }
        };

        Self {
            sequence: event.sequence,
            timestamp_ms: event.timestamp.timestamp_millis(),
            payload: Some(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_task_context_decoding() {
        let task = Task::new("t-1", "enumerate").with_context(json!({"depth": 2}));
        let wire = proto::Task::from(&task);
        assert_eq!(task_from_proto(wire).unwrap(), task);

        let empty = proto::Task {
            id: "t-2".to_string(),
            goal: "g".to_string(),
            ..Default::default()
        };
        assert_eq!(task_from_proto(empty).unwrap().context, Value::Null);

        let broken = proto::Task {
            context_json: "{not json".to_string(),
            ..Default::default()
        };
        let status = task_from_proto(broken).unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn test_stream_event_payload_mapping() {
        let event = StreamEvent {
            sequence: 7,
            timestamp: Utc::now(),
            payload: EventPayload::ToolResult {
                call_id: "c-1".to_string(),
                output: "{\"error\":\"boom\"}".to_string(),
                success: false,
            },
        };

        let wire = proto::StreamEvent::from(event);
        assert_eq!(wire.sequence, 7);
        match wire.payload {
            Some(proto::stream_event::Payload::ToolResult(result)) => {
                assert_eq!(result.call_id, "c-1");
                assert!(!result.success);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_unspecified_mode_is_autonomous() {
        assert_eq!(ExecutionMode::from(proto::ExecutionMode::Unspecified), ExecutionMode::Autonomous);
        assert_eq!(ExecutionMode::from(proto::ExecutionMode::Interactive), ExecutionMode::Interactive);
    }
}
