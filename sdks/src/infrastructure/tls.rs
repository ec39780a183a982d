// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! TLS material loading for the TCP listener

use std::path::Path;

use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::{info, warn};

use crate::error::BindError;

/// Build the server TLS configuration from PEM files.
///
/// Returns `None` when either path is missing; the TCP listener is then
/// served in the clear. Certificate and key are parsed here so a bad pair
/// fails `start` instead of the first handshake.
pub async fn load_server_tls(
    cert: Option<&Path>,
    key: Option<&Path>,
) -> Result<Option<ServerTlsConfig>, BindError> {
    let (cert, key) = match (cert, key) {
        (Some(cert), Some(key)) => (cert, key),
        (None, None) => return Ok(None),
        (Some(_), None) | (None, Some(_)) => {
            warn!("Both a TLS certificate and key are required; serving TCP without TLS");
            return Ok(None);
        }
    };

    let cert_pem = read_material(cert).await?;
    let key_pem = read_material(key).await?;

    let tls = ServerTlsConfig::new().identity(Identity::from_pem(cert_pem, key_pem));
    Server::builder()
        .tls_config(tls.clone())
        .map_err(|e| BindError::Tls(e.to_string()))?;

    info!(cert = %cert.display(), "TLS enabled on TCP listener");
    Ok(Some(tls))
}

async fn read_material(path: &Path) -> Result<Vec<u8>, BindError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| BindError::TlsMaterial {
            path: path.to_path_buf(),
            source,
        })
}
