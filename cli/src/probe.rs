// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Health probe for a running component
//!
//! Backs `aegis-component health`, which container orchestrators use as a
//! liveness command. Exit codes: 0 healthy, 1 reachable but not healthy,
//! 3 unreachable.

use std::time::Duration;

use aegis_component_sdk::proto::component_service_client::ComponentServiceClient;
use aegis_component_sdk::proto::{self, HealthRequest};
use anyhow::{Context, Result};
use tonic::transport::Endpoint;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    NotHealthy { state: String, message: String },
    Unreachable(String),
}

impl ProbeOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            ProbeOutcome::Healthy => 0,
            ProbeOutcome::NotHealthy { .. } => 1,
            ProbeOutcome::Unreachable(_) => 3,
        }
    }
}

/// Call the `Health` RPC at `endpoint`. An invalid endpoint is an error;
/// transport failures are reported as [`ProbeOutcome::Unreachable`].
pub async fn probe(endpoint: &str, timeout: Duration) -> Result<ProbeOutcome> {
    let endpoint = Endpoint::from_shared(endpoint.to_string())
        .with_context(|| format!("Invalid endpoint: {}", endpoint))?
        .connect_timeout(timeout)
        .timeout(timeout);

    let channel = match endpoint.connect().await {
        Ok(channel) => channel,
        Err(e) => {
            debug!(error = %e, "Health probe could not connect");
            return Ok(ProbeOutcome::Unreachable(e.to_string()));
        }
    };

    let response = match ComponentServiceClient::new(channel).health(HealthRequest {}).await {
        Ok(response) => response.into_inner(),
        Err(status) => return Ok(ProbeOutcome::Unreachable(status.message().to_string())),
    };

    Ok(match response.state() {
        proto::HealthState::Healthy => ProbeOutcome::Healthy,
        state => ProbeOutcome::NotHealthy {
            state: state.as_str_name().to_string(),
            message: response.message,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::echo::{EchoAgent, EchoTool};
    use aegis_component_sdk::{ComponentServer, ServerConfig, StandaloneHarnessFactory};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ProbeOutcome::Healthy.exit_code(), 0);
        let degraded = ProbeOutcome::NotHealthy {
            state: "HEALTH_STATE_DEGRADED".to_string(),
            message: String::new(),
        };
        assert_eq!(degraded.exit_code(), 1);
        assert_eq!(ProbeOutcome::Unreachable("refused".to_string()).exit_code(), 3);
    }

    #[tokio::test]
    async fn test_probe_unreachable() {
        // Reserve a port, then free it so nothing is listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let outcome = probe(&format!("http://127.0.0.1:{}", port), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(outcome.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_probe_invalid_endpoint() {
        assert!(probe("not a uri", Duration::from_secs(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_probe_running_component() {
        let config = ServerConfig::builder()
            .host(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .port(0)
            .trap_signals(false)
            .build();
        let factory = StandaloneHarnessFactory::new().with_tool(Arc::new(EchoTool));
        let server = Arc::new(
            ComponentServer::start(config, Arc::new(EchoAgent), Arc::new(factory))
                .await
                .unwrap(),
        );
        let serving = server.clone();
        tokio::spawn(async move { serving.serve(CancellationToken::new()).await });

        let endpoint = format!("http://127.0.0.1:{}", server.port());
        let outcome = probe(&endpoint, Duration::from_secs(2)).await.unwrap();
        assert_eq!(outcome, ProbeOutcome::Healthy);

        server.graceful_stop().await;
    }
}
