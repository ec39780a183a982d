// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! gRPC service implementation for a hosted component
//!
//! Exposes GetDescriptor, Execute, Health and the bidirectional
//! StreamExecute. Each streaming call gets its own session, steering pump
//! and run-loop task; both tasks are tracked so graceful shutdown can wait
//! for them.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn, Instrument};

use super::convert::task_from_proto;
use super::proto;
use super::proto::client_message::Message as ClientPayload;
use super::proto::component_service_server::{ComponentService, ComponentServiceServer};
use crate::application::component::{Component, HarnessFactory};
use crate::application::session::{steering_channel, EmitError, EventSink, StreamingSession};
use crate::application::streaming_harness::StreamingHarness;
use crate::domain::capability::HarnessError;
use crate::domain::component::{ComponentError, TaskResult};
use crate::domain::events::{AgentStatus, ExecutionMode, SteeringMessage, StreamEvent};
use crate::infrastructure::health_reporter::HealthReporter;

/// Error code of the fatal event emitted when a streaming run loop fails
pub const EXECUTION_FAILED: &str = "EXECUTION_FAILED";

type EventSender = mpsc::Sender<Result<proto::StreamEvent, Status>>;

/// Writes session events onto the gRPC response stream
struct GrpcEventSink {
    tx: EventSender,
}

#[async_trait]
impl EventSink for GrpcEventSink {
    async fn send(&self, event: StreamEvent) -> Result<(), EmitError> {
        self.tx
            .send(Ok(event.into()))
            .await
            .map_err(|_| EmitError::StreamClosed)
    }
}

pub struct ComponentGrpcService {
    component: Arc<dyn Component>,
    factory: Arc<dyn HarnessFactory>,
    health: HealthReporter,
    tracker: TaskTracker,
    calls: CancellationToken,
    steering_capacity: usize,
    event_buffer: usize,
}

impl ComponentGrpcService {
    pub fn new(
        component: Arc<dyn Component>,
        factory: Arc<dyn HarnessFactory>,
        health: HealthReporter,
        tracker: TaskTracker,
        calls: CancellationToken,
    ) -> Self {
        Self {
            component,
            factory,
            health,
            tracker,
            calls,
            steering_capacity: crate::config::DEFAULT_STEERING_CAPACITY,
            event_buffer: crate::config::DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn with_buffers(mut self, steering_capacity: usize, event_buffer: usize) -> Self {
        self.steering_capacity = steering_capacity.max(1);
        self.event_buffer = event_buffer.max(1);
        self
    }

    /// Create a gRPC server instance
    pub fn into_server(self) -> ComponentServiceServer<Self> {
        ComponentServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl ComponentService for ComponentGrpcService {
    type StreamExecuteStream = ReceiverStream<Result<proto::StreamEvent, Status>>;

    async fn get_descriptor(
        &self,
        _request: Request<proto::GetDescriptorRequest>,
    ) -> Result<Response<proto::ComponentDescriptor>, Status> {
        Ok(Response::new(self.component.descriptor().into()))
    }

    async fn execute(
        &self,
        request: Request<proto::ExecuteRequest>,
    ) -> Result<Response<proto::ExecuteResponse>, Status> {
        let task = request
            .into_inner()
            .task
            .ok_or_else(|| Status::invalid_argument("Missing task"))
            .and_then(task_from_proto)?;

        let harness = self
            .factory
            .create(&task)
            .map_err(|e| Status::failed_precondition(format!("Failed to create harness: {}", e)))?;

        let span = tracing::info_span!("execute", task_id = %task.id);
        let result = tokio::select! {
            _ = self.calls.cancelled() => TaskResult::cancelled(),
            result = self.component.execute(harness, task).instrument(span) => {
                result.unwrap_or_else(|e| {
                    warn!(error = %e, "Task execution failed");
                    TaskResult::failed(e.to_string())
                })
            }
        };

        Ok(Response::new(result.into()))
    }

    async fn health(
        &self,
        _request: Request<proto::HealthRequest>,
    ) -> Result<Response<proto::HealthResponse>, Status> {
        Ok(Response::new(self.health.overall().into()))
    }

    async fn stream_execute(
        &self,
        request: Request<Streaming<proto::ClientMessage>>,
    ) -> Result<Response<Self::StreamExecuteStream>, Status> {
        let mut inbound = request.into_inner();

        let first = inbound
            .message()
            .await?
            .ok_or_else(|| Status::invalid_argument("Stream closed before start message"))?;
        let start = match first.message {
            Some(ClientPayload::Start(start)) => start,
            _ => return Err(Status::invalid_argument("First message must be start")),
        };
        let mode = ExecutionMode::from(start.mode());
        let task = start
            .task
            .ok_or_else(|| Status::invalid_argument("Start message is missing its task"))
            .and_then(task_from_proto)?;

        let base = self
            .factory
            .create(&task)
            .map_err(|e| Status::failed_precondition(format!("Failed to create harness: {}", e)))?;

        let (tx, rx) = mpsc::channel(self.event_buffer);
        // Resolves once the client drops the response stream
        let outbound = tx.clone();
        let (steering_tx, steering_rx) = steering_channel(self.steering_capacity);
        let session = Arc::new(StreamingSession::new(
            Arc::new(GrpcEventSink { tx }),
            steering_rx,
            mode,
            self.calls.child_token(),
        ));
        session
            .activate()
            .map_err(|e| Status::internal(e.to_string()))?;
        let harness = Arc::new(StreamingHarness::new(base, session.clone()));

        let span = tracing::info_span!("stream_execute", session_id = %session.id(), task_id = %task.id);
        info!(parent: &span, mode = ?mode, "Streaming session started");

        // Stops the pump once the run loop is done
        let finished = CancellationToken::new();

        self.tracker.spawn(
            pump_client_messages(inbound, session.clone(), steering_tx, finished.clone())
                .instrument(span.clone()),
        );

        let component = self.component.clone();
        self.tracker.spawn(
            async move {
                let cancel = session.cancellation().clone();
                let result = tokio::select! {
                    result = component.execute_streaming(harness.clone(), task) => result,
                    _ = cancel.cancelled() => Err(ComponentError::Harness(HarnessError::Cancelled)),
                    _ = outbound.closed() => {
                        info!("Client dropped the response stream");
                        cancel.cancel();
                        Err(ComponentError::Harness(HarnessError::Cancelled))
                    }
                };
                drop(outbound);
                let _ = session.begin_close();

                let emitted = match result {
                    Ok(result) => {
                        info!(status = ?result.status, "Streaming execution finished");
                        Ok(0)
                    }
                    Err(ComponentError::Harness(HarnessError::Cancelled)) => {
                        info!("Streaming execution cancelled");
                        harness
                            .emit_status(AgentStatus::Cancelled, "execution cancelled")
                            .await
                    }
                    Err(e) => {
                        warn!(error = %e, "Streaming execution failed");
                        harness.emit_error(EXECUTION_FAILED, e.to_string(), true).await
                    }
                };
                if let Err(e) = emitted {
                    session.record_transport_error(&e);
                }

                finished.cancel();
                session.close().await;
                debug!("Streaming session closed");
            }
            .instrument(span),
        );

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

/// Route inbound control messages into the session until the client
/// half-closes, the transport fails or the run loop finishes.
///
/// Steering messages the queue cannot take yet wait in a local buffer so
/// `set_mode` and `interrupt` are never stuck behind a component that stopped
/// draining steering. The buffer holds at most one queue's worth; beyond that
/// steering messages are dropped with a warning.
async fn pump_client_messages(
    mut inbound: Streaming<proto::ClientMessage>,
    session: Arc<StreamingSession>,
    steering: mpsc::Sender<SteeringMessage>,
    finished: CancellationToken,
) {
    let overflow_limit = steering.max_capacity();
    let mut pending: VecDeque<SteeringMessage> = VecDeque::new();
    let mut inbound_open = true;

    while inbound_open || !pending.is_empty() {
        tokio::select! {
            biased;
            _ = finished.cancelled() => break,
            permit = steering.reserve(), if !pending.is_empty() => match permit {
                Ok(permit) => {
                    if let Some(message) = pending.pop_front() {
                        permit.send(message);
                    }
                }
                Err(_) => break,
            },
            message = inbound.message(), if inbound_open => match message {
                Ok(Some(proto::ClientMessage { message: Some(payload) })) => match payload {
                    ClientPayload::Steering(s) => {
                        debug!(steering_id = %s.id, "Steering message received");
                        let message = SteeringMessage::new(s.id, s.content);
                        if !pending.is_empty() {
                            if pending.len() >= overflow_limit {
                                warn!(steering_id = %message.id, "Steering queue full; dropping message");
                            } else {
                                pending.push_back(message);
                            }
                            continue;
                        }
                        match steering.try_send(message) {
                            Ok(()) => {}
                            Err(TrySendError::Full(message)) => pending.push_back(message),
                            Err(TrySendError::Closed(_)) => break,
                        }
                    }
                    ClientPayload::SetMode(m) => {
                        let mode = ExecutionMode::from(m.mode());
                        debug!(mode = ?mode, "Execution mode changed");
                        session.set_mode(mode);
                    }
                    ClientPayload::Interrupt(i) => {
                        info!(reason = %i.reason, "Interrupt received");
                        session.cancellation().cancel();
                    }
                    ClientPayload::Start(_) => {
                        warn!("Ignoring duplicate start message");
                    }
                },
                Ok(Some(_)) => debug!("Ignoring empty client message"),
                Ok(None) => {
                    debug!("Client closed its side of the stream");
                    inbound_open = false;
                }
                Err(status) => {
                    info!(code = ?status.code(), "Inbound stream failed; cancelling session");
                    session.cancellation().cancel();
                    let _ = session.begin_close();
                    break;
                }
            },
        }
    }
}
