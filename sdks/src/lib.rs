// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # AEGIS Component SDK
//!
//! Host an agent, tool or plugin as a gRPC component. The SDK owns the
//! server lifecycle (TCP and Unix socket listeners, TLS, health, graceful
//! and forced shutdown) and the streaming execution harness that turns every
//! tool call, finding and LLM completion into an ordered stream event.
//!
//! ```no_run
//! use std::sync::Arc;
//! use aegis_component_sdk::{
//!     ComponentServer, ServerConfig, StandaloneHarnessFactory,
//! };
//! # use aegis_component_sdk::Component;
//! # async fn run(component: Arc<dyn Component>) -> anyhow::Result<()> {
//! let server = ComponentServer::start(
//!     ServerConfig::builder().port(50051).socket_path("/run/aegis/agent.sock").build(),
//!     component,
//!     Arc::new(StandaloneHarnessFactory::new()),
//! )
//! .await?;
//! server.serve(tokio_util::sync::CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Capability port, component model, events, health, registry port |
//! | [`application`] | Sequencer, streaming session and harness, component contracts |
//! | [`infrastructure`] | Listener set, TLS, health reporter, registries, standalone harness |
//! | [`presentation`] | gRPC service and `ComponentServer` lifecycle |

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

pub use application::component::{Component, HarnessFactory};
pub use application::sequencer::Sequencer;
pub use application::session::{
    steering_channel, EmitError, EventSink, SessionError, SessionState, SteeringReceiver,
    StreamingSession,
};
pub use application::streaming_harness::StreamingHarness;
pub use config::{resolve_advertise_addr, resolve_port, ServerConfig, ServerConfigBuilder};
pub use domain::capability::*;
pub use domain::component::*;
pub use domain::events::*;
pub use domain::health::{HealthState, HealthStatus};
pub use domain::registry::{RegistryError, ServiceInfo, ServiceRegistry};
pub use error::{BindError, ConfigError, ServerError};
pub use infrastructure::health_reporter::HealthReporter;
pub use infrastructure::registry::{registry_from_env, InMemoryRegistry};
pub use infrastructure::standalone::{StandaloneHarness, StandaloneHarnessFactory, ToolHandler};
pub use presentation::grpc::proto;
pub use presentation::grpc::server::{ComponentServer, ShutdownOutcome};
