// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Listener Set
//!
//! One TCP listener plus an optional Unix-domain IPC socket, acquired
//! together and released together.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Owns listener setup (stale socket removal, `0600`
//!   permissions) and teardown (socket file removal on every exit path)

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;
use tracing::{debug, info, warn};

use crate::error::BindError;

/// Owner-only read/write
#[cfg(unix)]
const SOCKET_MODE: u32 = 0o600;

pub struct ListenerSet {
    tcp: Option<TcpListener>,
    tcp_addr: SocketAddr,
    #[cfg(unix)]
    unix: Option<UnixListener>,
    socket: Option<SocketFileGuard>,
}

impl ListenerSet {
    /// Bind TCP first, then the IPC socket if `socket_path` is set.
    ///
    /// On failure nothing stays behind: the TCP listener is closed and a
    /// socket file created by this call is removed.
    pub async fn bind(addr: SocketAddr, socket_path: Option<&Path>) -> Result<Self, BindError> {
        let tcp = TcpListener::bind(addr)
            .await
            .map_err(|source| BindError::Tcp { addr, source })?;
        let tcp_addr = tcp
            .local_addr()
            .map_err(|source| BindError::Tcp { addr, source })?;
        info!(addr = %tcp_addr, "TCP listener bound");

        let Some(path) = socket_path else {
            return Ok(Self {
                tcp: Some(tcp),
                tcp_addr,
                #[cfg(unix)]
                unix: None,
                socket: None,
            });
        };

        #[cfg(unix)]
        {
            let (unix, guard) = bind_unix(path)?;
            Ok(Self {
                tcp: Some(tcp),
                tcp_addr,
                unix: Some(unix),
                socket: Some(guard),
            })
        }

        #[cfg(not(unix))]
        {
            let _ = (tcp, path);
            Err(BindError::Unsupported)
        }
    }

    /// Actual bound TCP address (ephemeral port resolved)
    pub fn tcp_addr(&self) -> SocketAddr {
        self.tcp_addr
    }

    pub fn socket_path(&self) -> Option<&Path> {
        self.socket.as_ref().map(|guard| guard.path())
    }

    pub fn take_tcp(&mut self) -> Option<TcpListener> {
        self.tcp.take()
    }

    #[cfg(unix)]
    pub fn take_unix(&mut self) -> Option<UnixListener> {
        self.unix.take()
    }

    /// Remove the IPC socket file. Safe to call repeatedly.
    pub fn remove_socket(&mut self) {
        if let Some(guard) = self.socket.as_mut() {
            guard.remove();
        }
    }
}

#[cfg(unix)]
fn bind_unix(path: &Path) -> Result<(UnixListener, SocketFileGuard), BindError> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| BindError::SocketDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed stale socket file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(source) => {
            return Err(BindError::StaleSocket {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    // Bind inside an owner-only staging directory and tighten the mode there,
    // so the socket is never reachable at `path` with umask-derived bits
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let staging = tempfile::Builder::new()
        .prefix(".sock")
        .tempdir_in(parent)
        .map_err(|source| BindError::SocketDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    let staged = staging.path().join("s");

    let listener = UnixListener::bind(&staged).map_err(|source| BindError::Socket {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::set_permissions(&staged, std::fs::Permissions::from_mode(SOCKET_MODE)).map_err(|source| {
        BindError::Permissions {
            path: path.to_path_buf(),
            source,
        }
    })?;
    std::fs::rename(&staged, path).map_err(|source| BindError::Socket {
        path: path.to_path_buf(),
        source,
    })?;
    let guard = SocketFileGuard::new(path.to_path_buf());
    drop(staging);

    info!(path = %path.display(), "Unix socket listener bound");
    Ok((listener, guard))
}

/// Removes the socket file when dropped or when [`SocketFileGuard::remove`]
/// is called, whichever comes first.
pub struct SocketFileGuard {
    path: PathBuf,
    removed: bool,
}

impl SocketFileGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path, removed: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed socket file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove socket file"),
        }
    }
}

impl Drop for SocketFileGuard {
    fn drop(&mut self) {
        self.remove();
    }
}
