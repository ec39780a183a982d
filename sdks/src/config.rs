// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Server Configuration
//!
//! Immutable [`ServerConfig`] built through [`ServerConfigBuilder`], plus the
//! environment resolution helpers the host binary uses.
//!
//! Resolution precedence for every setting is explicit value, then
//! environment variable, then built-in default.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::registry::ServiceRegistry;
use crate::error::ConfigError;

/// Environment variable overriding the gRPC port
pub const PORT_ENV: &str = "AEGIS_COMPONENT_PORT";
/// Environment variable overriding the address advertised to the registry
pub const ADVERTISE_ADDR_ENV: &str = "AEGIS_ADVERTISE_ADDR";

pub const DEFAULT_PORT: u16 = 50051;
pub const DEFAULT_GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STEERING_CAPACITY: usize = 32;
pub const DEFAULT_EVENT_BUFFER: usize = 128;

#[derive(Clone)]
pub struct ServerConfig {
    host: IpAddr,
    port: u16,
    socket_path: Option<PathBuf>,
    tls_cert: Option<PathBuf>,
    tls_key: Option<PathBuf>,
    graceful_timeout: Duration,
    advertise_addr: Option<String>,
    steering_capacity: usize,
    event_buffer: usize,
    trap_signals: bool,
    registry: Option<Arc<dyn ServiceRegistry>>,
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }

    /// Requested TCP port. 0 asks the OS for an ephemeral port; use
    /// `ComponentServer::port` for the bound value.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn socket_path(&self) -> Option<&Path> {
        self.socket_path.as_deref()
    }

    pub fn tls_cert(&self) -> Option<&Path> {
        self.tls_cert.as_deref()
    }

    pub fn tls_key(&self) -> Option<&Path> {
        self.tls_key.as_deref()
    }

    pub fn graceful_timeout(&self) -> Duration {
        self.graceful_timeout
    }

    pub fn advertise_addr(&self) -> Option<&str> {
        self.advertise_addr.as_deref()
    }

    pub fn steering_capacity(&self) -> usize {
        self.steering_capacity
    }

    pub fn event_buffer(&self) -> usize {
        self.event_buffer
    }

    pub fn trap_signals(&self) -> bool {
        self.trap_signals
    }

    pub fn registry(&self) -> Option<&Arc<dyn ServiceRegistry>> {
        self.registry.as_ref()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfigBuilder::default().build()
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("socket_path", &self.socket_path)
            .field("tls_cert", &self.tls_cert)
            .field("tls_key", &self.tls_key)
            .field("graceful_timeout", &self.graceful_timeout)
            .field("advertise_addr", &self.advertise_addr)
            .field("steering_capacity", &self.steering_capacity)
            .field("event_buffer", &self.event_buffer)
            .field("trap_signals", &self.trap_signals)
            .field("registry", &self.registry.is_some())
            .finish()
    }
}

pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self {
            config: ServerConfig {
                host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                port: DEFAULT_PORT,
                socket_path: None,
                tls_cert: None,
                tls_key: None,
                graceful_timeout: DEFAULT_GRACEFUL_TIMEOUT,
                advertise_addr: None,
                steering_capacity: DEFAULT_STEERING_CAPACITY,
                event_buffer: DEFAULT_EVENT_BUFFER,
                trap_signals: true,
                registry: None,
            },
        }
    }
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.socket_path = Some(path.into());
        self
    }

    pub fn tls(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.config.tls_cert = Some(cert.into());
        self.config.tls_key = Some(key.into());
        self
    }

    pub fn tls_cert(mut self, cert: Option<PathBuf>) -> Self {
        self.config.tls_cert = cert;
        self
    }

    pub fn tls_key(mut self, key: Option<PathBuf>) -> Self {
        self.config.tls_key = key;
        self
    }

    pub fn graceful_timeout(mut self, timeout: Duration) -> Self {
        self.config.graceful_timeout = timeout;
        self
    }

    pub fn advertise_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.advertise_addr = Some(addr.into());
        self
    }

    pub fn steering_capacity(mut self, capacity: usize) -> Self {
        self.config.steering_capacity = capacity.max(1);
        self
    }

    pub fn event_buffer(mut self, buffer: usize) -> Self {
        self.config.event_buffer = buffer.max(1);
        self
    }

    /// Whether `serve` listens for SIGINT/SIGTERM itself
    pub fn trap_signals(mut self, trap: bool) -> Self {
        self.config.trap_signals = trap;
        self
    }

    pub fn registry(mut self, registry: Arc<dyn ServiceRegistry>) -> Self {
        self.config.registry = Some(registry);
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

/// Resolve the gRPC port: explicit value, then `AEGIS_COMPONENT_PORT`, then 50051.
pub fn resolve_port(explicit: Option<u16>) -> Result<u16, ConfigError> {
    let env_value = std::env::var(PORT_ENV).ok();
    resolve_port_from(explicit, env_value.as_deref())
}

pub fn resolve_port_from(explicit: Option<u16>, env_value: Option<&str>) -> Result<u16, ConfigError> {
    if let Some(port) = explicit {
        return Ok(port);
    }

    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidPort {
            value: raw.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(DEFAULT_PORT),
    }
}

/// Resolve the advertised host: explicit value, then `AEGIS_ADVERTISE_ADDR`,
/// then the machine host name, then `localhost`.
pub fn resolve_advertise_addr(explicit: Option<&str>) -> String {
    let env_value = std::env::var(ADVERTISE_ADDR_ENV).ok();
    let host_name = hostname::get().ok().and_then(|h| h.into_string().ok());
    resolve_advertise_addr_from(explicit, env_value.as_deref(), host_name)
}

pub fn resolve_advertise_addr_from(
    explicit: Option<&str>,
    env_value: Option<&str>,
    host_name: Option<String>,
) -> String {
    explicit
        .or(env_value)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| host_name.filter(|h| !h.is_empty()))
        .unwrap_or_else(|| "localhost".to_string())
}
