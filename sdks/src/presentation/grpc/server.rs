// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Component Server
//!
//! Lifecycle manager for a hosted component: binds the listener set, serves
//! the component and health services on every listener, and shuts down
//! gracefully within a bounded timeout or forcibly past it.
//!
//! # Shutdown
//!
//! 1. Overall health goes `Unhealthy("shutting down")` and accepting stops.
//! 2. In-flight RPCs and detached streaming run loops get up to
//!    `graceful_timeout` to finish.
//! 3. Past the deadline (or on [`ComponentServer::stop`]) every session's
//!    cancellation token fires and the serving tasks are aborted.
//! 4. The IPC socket file is removed, the registry is told, and the health
//!    table is torn down.
//!
//! Steps 1 and 4 run exactly once no matter how many callers race.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::signal;
use tokio::sync::{mpsc, OnceCell};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tonic::server::NamedService;
use tonic::service::Routes;
use tonic::transport::{Server, ServerTlsConfig};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::proto::component_service_server::ComponentServiceServer;
use super::service::ComponentGrpcService;
use crate::application::component::{Component, HarnessFactory};
use crate::config::{resolve_advertise_addr, ServerConfig};
use crate::domain::health::HealthStatus;
use crate::domain::registry::ServiceInfo;
use crate::error::{BindError, ServerError};
use crate::infrastructure::health_reporter::HealthReporter;
use crate::infrastructure::listener::ListenerSet;
use crate::infrastructure::tls::load_server_tls;

/// How a shutdown ended. A forced shutdown is a degradation, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight call finished within the timeout
    Graceful,
    /// The timeout elapsed or `stop` was called; remaining calls were cancelled
    Forced,
}

pub struct ComponentServer {
    config: ServerConfig,
    routes: Routes,
    tls: Option<ServerTlsConfig>,
    listeners: Mutex<ListenerSet>,
    local_addr: SocketAddr,
    health: HealthReporter,
    registration: Option<ServiceInfo>,
    tracker: TaskTracker,
    serving: Mutex<Vec<JoinHandle<()>>>,
    accept: CancellationToken,
    calls: CancellationToken,
    force: CancellationToken,
    health_bridge: CancellationToken,
    stopped: CancellationToken,
    shutdown: OnceCell<ShutdownOutcome>,
}

impl ComponentServer {
    /// Bind listeners, load TLS, mark health `Healthy` and register.
    ///
    /// Nothing is left behind on failure: listeners are closed and a created
    /// socket file is removed before the error is returned. Registration
    /// failures are logged and do not fail startup.
    pub async fn start(
        config: ServerConfig,
        component: Arc<dyn Component>,
        factory: Arc<dyn HarnessFactory>,
    ) -> Result<Self, BindError> {
        let listeners = ListenerSet::bind(config.bind_addr(), config.socket_path()).await?;
        let tls = load_server_tls(config.tls_cert(), config.tls_key()).await?;
        let local_addr = listeners.tcp_addr();

        let health = HealthReporter::new();
        let health_bridge = CancellationToken::new();
        let (grpc_health, health_service) = tonic_health::server::health_reporter();
        health.mirror_into(grpc_health, health_bridge.clone());

        let descriptor = component.descriptor();
        let tracker = TaskTracker::new();
        let calls = CancellationToken::new();
        let service = ComponentGrpcService::new(component, factory, health.clone(), tracker.clone(), calls.clone())
            .with_buffers(config.steering_capacity(), config.event_buffer());
        let routes = Routes::new(health_service).add_service(service.into_server());

        let serving = HealthStatus::healthy("serving");
        health.set(
            <ComponentServiceServer<ComponentGrpcService> as NamedService>::NAME,
            serving.clone(),
        );
        health.set_overall(serving);

        let mut registration = None;
        if let Some(registry) = config.registry() {
            let info = ServiceInfo {
                name: descriptor.name.clone(),
                version: descriptor.version.clone(),
                kind: descriptor.kind,
                instance_id: Uuid::new_v4().to_string(),
                endpoint: format!("{}:{}", resolve_advertise_addr(config.advertise_addr()), local_addr.port()),
            };
            match registry.register(&info).await {
                Ok(()) => {
                    info!(endpoint = %info.endpoint, instance = %info.instance_id, "Registered with service registry");
                    registration = Some(info);
                }
                Err(e) => warn!(error = %e, "Service registration failed; continuing unregistered"),
            }
        }

        info!(
            component = %descriptor.name,
            version = %descriptor.version,
            kind = %descriptor.kind,
            addr = %local_addr,
            socket = ?listeners.socket_path(),
            tls = tls.is_some(),
            "Component server started"
        );

        Ok(Self {
            config,
            routes,
            tls,
            listeners: Mutex::new(listeners),
            local_addr,
            health,
            registration,
            tracker,
            serving: Mutex::new(Vec::new()),
            accept: CancellationToken::new(),
            calls,
            force: CancellationToken::new(),
            health_bridge,
            stopped: CancellationToken::new(),
            shutdown: OnceCell::new(),
        })
    }

    /// Actual bound TCP port
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn socket_path(&self) -> Option<&Path> {
        self.config.socket_path()
    }

    pub fn health(&self) -> &HealthReporter {
        &self.health
    }

    /// Serve on every bound listener until `ctx` is cancelled, a signal
    /// arrives, a listener fails, or another task stops the server.
    ///
    /// - `ctx` cancelled: graceful stop, then `Err(ServerError::Cancelled)`
    /// - SIGINT / SIGTERM: graceful stop, then `Ok(())`
    /// - listener failure: immediate stop, then that error
    /// - `graceful_stop` / `stop` from elsewhere: `Ok(())` once it completes
    pub async fn serve(&self, ctx: CancellationToken) -> Result<(), ServerError> {
        let mut listener_errors = self.spawn_listeners()?;

        let trap_signals = self.config.trap_signals();
        let signalled = async {
            if trap_signals {
                shutdown_signal().await
            } else {
                std::future::pending::<()>().await
            }
        };

        tokio::select! {
            _ = ctx.cancelled() => {
                info!("Server context cancelled");
                self.graceful_stop().await;
                Err(ServerError::Cancelled)
            }
            _ = signalled => {
                self.graceful_stop().await;
                Ok(())
            }
            Some(err) = listener_errors.recv() => {
                error!(error = %err, "Listener failed; stopping server");
                self.stop().await;
                Err(err)
            }
            _ = self.stopped.cancelled() => Ok(()),
        }
    }

    fn spawn_listeners(&self) -> Result<mpsc::Receiver<ServerError>, ServerError> {
        let (err_tx, err_rx) = mpsc::channel(2);
        let mut listeners = self.listeners.lock();
        let tcp = listeners.take_tcp().ok_or(ServerError::AlreadyServing)?;
        let mut serving = self.serving.lock();

        let endpoint = format!("tcp://{}", self.local_addr);
        let mut builder = Server::builder();
        if let Some(tls) = &self.tls {
            builder = builder
                .tls_config(tls.clone())
                .map_err(|source| ServerError::Listener {
                    endpoint: endpoint.clone(),
                    source,
                })?;
        }
        let router = builder.add_routes(self.routes.clone());
        let shutdown = self.accept.clone().cancelled_owned();
        let errors = err_tx.clone();
        serving.push(tokio::spawn(async move {
            info!(endpoint = %endpoint, "Serving gRPC");
            if let Err(source) = router
                .serve_with_incoming_shutdown(TcpListenerStream::new(tcp), shutdown)
                .await
            {
                let _ = errors.send(ServerError::Listener { endpoint, source }).await;
            }
        }));

        #[cfg(unix)]
        {
            if let Some(unix) = listeners.take_unix() {
                use tokio_stream::wrappers::UnixListenerStream;

                let endpoint = listeners
                    .socket_path()
                    .map(|p| format!("unix://{}", p.display()))
                    .unwrap_or_else(|| "unix".to_string());
                let router = Server::builder().add_routes(self.routes.clone());
                let shutdown = self.accept.clone().cancelled_owned();
                let errors = err_tx.clone();
                serving.push(tokio::spawn(async move {
                    info!(endpoint = %endpoint, "Serving gRPC");
                    if let Err(source) = router
                        .serve_with_incoming_shutdown(UnixListenerStream::new(unix), shutdown)
                        .await
                    {
                        let _ = errors.send(ServerError::Listener { endpoint, source }).await;
                    }
                }));
            }
        }

        Ok(err_rx)
    }

    /// Stop accepting and wait up to the graceful timeout for in-flight work.
    ///
    /// Idempotent: concurrent and repeated callers share one shutdown and
    /// observe the same outcome.
    pub async fn graceful_stop(&self) -> ShutdownOutcome {
        *self.shutdown.get_or_init(|| self.shutdown_once()).await
    }

    /// Cancel every in-flight call and stop immediately
    pub async fn stop(&self) -> ShutdownOutcome {
        self.force.cancel();
        self.graceful_stop().await
    }

    async fn shutdown_once(&self) -> ShutdownOutcome {
        info!("Stopping component server");
        self.health.set_overall(HealthStatus::unhealthy("shutting down"));
        self.accept.cancel();
        self.tracker.close();

        let timeout = self.config.graceful_timeout();
        let mut handles = std::mem::take(&mut *self.serving.lock());
        let drained = {
            let tracker = &self.tracker;
            let drain = async {
                futures::future::join_all(handles.iter_mut()).await;
                tracker.wait().await;
            };
            tokio::select! {
                biased;
                _ = self.force.cancelled() => false,
                result = tokio::time::timeout(timeout, drain) => result.is_ok(),
            }
        };

        let outcome = if drained {
            ShutdownOutcome::Graceful
        } else {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                in_flight = self.tracker.len(),
                "Graceful shutdown did not finish; forcing termination"
            );
            self.calls.cancel();
            for handle in &handles {
                handle.abort();
            }
            ShutdownOutcome::Forced
        };

        self.listeners.lock().remove_socket();

        if let Some(registry) = self.config.registry() {
            if let Some(info) = &self.registration {
                if let Err(e) = registry.deregister(info).await {
                    warn!(error = %e, "Service deregistration failed");
                }
            }
            if let Err(e) = registry.close().await {
                warn!(error = %e, "Failed to close service registry");
            }
        }

        self.health.teardown();
        self.health_bridge.cancel();
        self.stopped.cancel();

        info!(outcome = ?outcome, "Component server stopped");
        outcome
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
