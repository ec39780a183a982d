// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Streaming Session
//!
//! Per-call state bound to one `StreamExecute` invocation: the outbound event
//! sink, the sequencer, the steering queue, the execution mode and the
//! session lifecycle.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Serializes concurrent emitters onto one ordered stream
//!
//! # Ordering
//!
//! Every emit takes `send_lock`, draws the next sequence number and writes the
//! event to the sink before releasing it. Delivered events are therefore
//! totally ordered by sequence, and that order is the order in which emitters
//! acquired the lock. A failed write burns its sequence number; it never
//! causes a duplicate or an inversion.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::sequencer::Sequencer;
use crate::domain::events::{EventPayload, ExecutionMode, SteeringMessage, StreamEvent};

/// Outbound half of a streaming session
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: StreamEvent) -> Result<(), EmitError>;
}

#[async_trait]
impl EventSink for mpsc::Sender<StreamEvent> {
    async fn send(&self, event: StreamEvent) -> Result<(), EmitError> {
        mpsc::Sender::send(self, event)
            .await
            .map_err(|_| EmitError::StreamClosed)
    }
}

/// Errors raised while emitting an event
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("Stream is closed")]
    StreamClosed,

    #[error("Stream is not active yet")]
    NotActive,

    #[error("Failed to serialize event payload: {0}")]
    Marshal(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid session transition from {from:?} to {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },
}

/// Session lifecycle: `Open -> Active -> Closing -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Open, SessionState::Active)
                | (SessionState::Active, SessionState::Closing)
                | (SessionState::Closing, SessionState::Closed)
        )
    }
}

/// Create a bounded steering queue
pub fn steering_channel(capacity: usize) -> (mpsc::Sender<SteeringMessage>, SteeringReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, SteeringReceiver { inner: Arc::new(tokio::sync::Mutex::new(rx)) })
}

/// Consumer handle on the steering queue.
///
/// Cloning shares the queue; every message is delivered to exactly one
/// consumer, in the order the transport pushed it.
#[derive(Clone)]
pub struct SteeringReceiver {
    inner: Arc<tokio::sync::Mutex<mpsc::Receiver<SteeringMessage>>>,
}

impl SteeringReceiver {
    /// Wait for the next message. `None` once the transport closed the queue
    /// and every pending message was consumed.
    pub async fn recv(&self) -> Option<SteeringMessage> {
        self.inner.lock().await.recv().await
    }

    /// Take the next message if one is ready right now.
    pub fn try_recv(&self) -> Option<SteeringMessage> {
        self.inner.try_lock().ok()?.try_recv().ok()
    }
}

pub struct StreamingSession {
    id: Uuid,
    sequencer: Sequencer,
    sink: Arc<dyn EventSink>,
    send_lock: tokio::sync::Mutex<()>,
    state: Mutex<SessionState>,
    mode: RwLock<ExecutionMode>,
    steering: SteeringReceiver,
    cancel: CancellationToken,
    transport_error: Mutex<Option<String>>,
}

impl StreamingSession {
    pub fn new(
        sink: Arc<dyn EventSink>,
        steering: SteeringReceiver,
        mode: ExecutionMode,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequencer: Sequencer::new(),
            sink,
            send_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(SessionState::Open),
            mode: RwLock::new(mode),
            steering,
            cancel,
            transport_error: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn activate(&self) -> Result<(), SessionError> {
        self.transition(SessionState::Active)
    }

    /// Either side initiated termination; emits are still attempted.
    pub fn begin_close(&self) -> Result<(), SessionError> {
        self.transition(SessionState::Closing)
    }

    /// Enter the terminal state, walking through any skipped intermediate
    /// states. Waits for an in-progress emit to finish so no event is
    /// written after this returns.
    pub async fn close(&self) {
        let _guard = self.send_lock.lock().await;
        let mut state = self.state.lock();
        if *state == SessionState::Closed {
            return;
        }
        debug!(session_id = %self.id, from = ?*state, "Closing streaming session");
        *state = SessionState::Closed;
    }

    fn transition(&self, next: SessionState) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            return Err(SessionError::InvalidTransition { from: *state, to: next });
        }
        debug!(session_id = %self.id, from = ?*state, to = ?next, "Session transition");
        *state = next;
        Ok(())
    }

    /// Assign the next sequence number and write the event to the sink.
    pub async fn emit(&self, payload: EventPayload) -> Result<u64, EmitError> {
        let _guard = self.send_lock.lock().await;
        match self.state() {
            SessionState::Open => return Err(EmitError::NotActive),
            SessionState::Closed => return Err(EmitError::StreamClosed),
            SessionState::Active | SessionState::Closing => {}
        }

        let sequence = self.sequencer.next();
        let kind = payload.kind();
        let event = StreamEvent {
            sequence,
            timestamp: Utc::now(),
            payload,
        };

        match self.sink.send(event).await {
            Ok(()) => {
                debug!(session_id = %self.id, sequence, kind, "Emitted stream event");
                Ok(sequence)
            }
            Err(e) => {
                debug!(session_id = %self.id, sequence, kind, error = %e, "Stream event not delivered");
                Err(e)
            }
        }
    }

    /// Remember the first transport failure seen by best-effort emitters.
    pub fn record_transport_error(&self, error: &EmitError) {
        let mut slot = self.transport_error.lock();
        if slot.is_none() {
            warn!(session_id = %self.id, error = %error, "Streaming session transport error");
            *slot = Some(error.to_string());
        }
    }

    pub fn transport_error(&self) -> Option<String> {
        self.transport_error.lock().clone()
    }

    pub fn mode(&self) -> ExecutionMode {
        *self.mode.read()
    }

    pub fn set_mode(&self, mode: ExecutionMode) {
        *self.mode.write() = mode;
    }

    pub fn steering(&self) -> &SteeringReceiver {
        &self.steering
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::AgentStatus;

    fn session(capacity: usize) -> (StreamingSession, mpsc::Receiver<StreamEvent>, mpsc::Sender<SteeringMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        let (steer_tx, steer_rx) = steering_channel(8);
        let session = StreamingSession::new(
            Arc::new(tx),
            steer_rx,
            ExecutionMode::Autonomous,
            CancellationToken::new(),
        );
        (session, rx, steer_tx)
    }

    fn status(message: &str) -> EventPayload {
        EventPayload::Status {
            status: AgentStatus::Running,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_lifecycle_transitions() {
        let (session, _rx, _steer) = session(4);
        assert_eq!(session.state(), SessionState::Open);

        // Closing requires passing through Active first
        assert!(session.begin_close().is_err());

        session.activate().unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.activate().is_err());

        session.begin_close().unwrap();
        assert_eq!(session.state(), SessionState::Closing);
    }

    #[tokio::test]
    async fn test_closed_is_terminal() {
        let (session, _rx, _steer) = session(4);
        session.activate().unwrap();
        session.close().await;

        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.activate().is_err());
        assert!(session.begin_close().is_err());

        let result = session.emit(status("late")).await;
        assert!(matches!(result, Err(EmitError::StreamClosed)));
    }

    #[tokio::test]
    async fn test_emit_before_activate_is_rejected() {
        let (session, mut rx, _steer) = session(4);

        let result = session.emit(status("early")).await;
        assert!(matches!(result, Err(EmitError::NotActive)));
        assert!(rx.try_recv().is_err());

        // No sequence number was drawn for the rejected emit
        session.activate().unwrap();
        assert_eq!(session.emit(status("first")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_emit_allowed_while_closing() {
        let (session, mut rx, _steer) = session(4);
        session.activate().unwrap();
        session.begin_close().unwrap();

        assert_eq!(session.emit(status("final")).await.unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap().sequence, 1);
    }

    #[tokio::test]
    async fn test_emit_assigns_increasing_sequences() {
        let (session, mut rx, _steer) = session(4);
        session.activate().unwrap();

        assert_eq!(session.emit(status("a")).await.unwrap(), 1);
        assert_eq!(session.emit(status("b")).await.unwrap(), 2);

        assert_eq!(rx.recv().await.unwrap().sequence, 1);
        assert_eq!(rx.recv().await.unwrap().sequence, 2);
    }

    #[tokio::test]
    async fn test_failed_send_burns_sequence_without_reuse() {
        let (session, rx, _steer) = session(4);
        session.activate().unwrap();
        assert_eq!(session.emit(status("a")).await.unwrap(), 1);

        drop(rx);
        assert!(matches!(session.emit(status("b")).await, Err(EmitError::StreamClosed)));
        assert!(matches!(session.emit(status("c")).await, Err(EmitError::StreamClosed)));

        // Counter kept advancing through the failures
        assert_eq!(session.sequencer.current(), 3);
    }

    #[tokio::test]
    async fn test_first_transport_error_is_kept() {
        let (session, _rx, _steer) = session(4);
        assert!(session.transport_error().is_none());

        session.record_transport_error(&EmitError::StreamClosed);
        let marshal = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        session.record_transport_error(&EmitError::Marshal(marshal));

        assert_eq!(session.transport_error().as_deref(), Some("Stream is closed"));
    }

    #[tokio::test]
    async fn test_mode_is_last_write_wins_and_silent() {
        let (session, mut rx, _steer) = session(4);
        session.activate().unwrap();
        assert_eq!(session.mode(), ExecutionMode::Autonomous);

        session.set_mode(ExecutionMode::Interactive);
        session.set_mode(ExecutionMode::Autonomous);
        session.set_mode(ExecutionMode::Interactive);
        assert_eq!(session.mode(), ExecutionMode::Interactive);

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_steering_fifo_and_close() {
        let (session, _rx, steer_tx) = session(4);

        steer_tx.send(SteeringMessage::new("1", "first")).await.unwrap();
        steer_tx.send(SteeringMessage::new("2", "second")).await.unwrap();
        drop(steer_tx);

        assert_eq!(session.steering().try_recv().unwrap().id, "1");
        assert_eq!(session.steering().recv().await.unwrap().id, "2");
        assert!(session.steering().recv().await.is_none());
        assert!(session.steering().try_recv().is_none());
    }
}
