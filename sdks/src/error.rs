// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Server and configuration errors

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Failure while acquiring the listener set or TLS material. Fatal to
/// `ComponentServer::start`.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("Failed to bind TCP listener on {addr}: {source}")]
    Tcp { addr: SocketAddr, source: io::Error },

    #[error("Failed to create socket directory {}: {source}", .path.display())]
    SocketDirectory { path: PathBuf, source: io::Error },

    #[error("Failed to remove stale socket {}: {source}", .path.display())]
    StaleSocket { path: PathBuf, source: io::Error },

    #[error("Failed to bind unix socket {}: {source}", .path.display())]
    Socket { path: PathBuf, source: io::Error },

    #[error("Failed to restrict permissions on {}: {source}", .path.display())]
    Permissions { path: PathBuf, source: io::Error },

    #[error("Failed to read TLS material {}: {source}", .path.display())]
    TlsMaterial { path: PathBuf, source: io::Error },

    #[error("Invalid TLS configuration: {0}")]
    Tls(String),

    #[error("Unix domain sockets are not supported on this platform")]
    Unsupported,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("Listener {endpoint} failed: {source}")]
    Listener {
        endpoint: String,
        source: tonic::transport::Error,
    },

    #[error("Server context cancelled")]
    Cancelled,

    #[error("Server is already serving")]
    AlreadyServing,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port {value:?}: {reason}")]
    InvalidPort { value: String, reason: String },
}
