// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Health Reporter
//!
//! Process-scoped key/status table. The hosting component writes it, the RPC
//! layer reads it. The empty key holds the overall server status, matching
//! the `grpc.health.v1` convention.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Backs the component `Health` RPC and mirrors every change
//!   into the standard `tonic-health` service

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic_health::server::HealthReporter as GrpcHealthReporter;
use tonic_health::ServingStatus;
use tracing::debug;

use crate::domain::health::{HealthState, HealthStatus};

/// Key of the overall server status
pub const OVERALL: &str = "";

/// Cloneable handle on the health table; every clone sees the same entries.
#[derive(Clone)]
pub struct HealthReporter {
    table: Arc<watch::Sender<HashMap<String, HealthStatus>>>,
}

impl HealthReporter {
    /// A new table whose overall status is `Unhealthy("starting")`
    pub fn new() -> Self {
        let mut initial = HashMap::new();
        initial.insert(OVERALL.to_string(), HealthStatus::unhealthy("starting"));
        let (table, _) = watch::channel(initial);
        Self { table: Arc::new(table) }
    }

    /// Overwrite the status of `key`. Last write wins.
    pub fn set(&self, key: &str, status: HealthStatus) {
        debug!(key, state = ?status.state, message = %status.message, "Health status updated");
        self.table.send_modify(|table| {
            table.insert(key.to_string(), status);
        });
    }

    pub fn set_overall(&self, status: HealthStatus) {
        self.set(OVERALL, status);
    }

    pub fn get(&self, key: &str) -> Option<HealthStatus> {
        self.table.borrow().get(key).cloned()
    }

    pub fn overall(&self) -> HealthStatus {
        self.get(OVERALL)
            .unwrap_or_else(|| HealthStatus::unhealthy("no status reported"))
    }

    /// Copy of every entry
    pub fn snapshot(&self) -> HashMap<String, HealthStatus> {
        self.table.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<HashMap<String, HealthStatus>> {
        self.table.subscribe()
    }

    /// Mark every entry unhealthy. Called once the server has stopped.
    pub fn teardown(&self) {
        self.table.send_modify(|table| {
            for status in table.values_mut() {
                *status = HealthStatus::unhealthy("server stopped");
            }
        });
    }

    /// Mirror the table into a `tonic-health` reporter until `shutdown` fires.
    ///
    /// The final state is always flushed before the task exits, so callers
    /// that tear down and then cancel still publish `NOT_SERVING`.
    pub fn mirror_into(&self, mut grpc: GrpcHealthReporter, shutdown: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                let snapshot = rx.borrow_and_update().clone();
                for (key, status) in snapshot {
                    grpc.set_service_status(key, serving_status(status.state)).await;
                }

                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = shutdown.cancelled() => {
                        let snapshot = rx.borrow_and_update().clone();
                        for (key, status) in snapshot {
                            grpc.set_service_status(key, serving_status(status.state)).await;
                        }
                        break;
                    }
                }
            }
        })
    }
}

impl Default for HealthReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn serving_status(state: HealthState) -> ServingStatus {
    if state.is_serving() {
        ServingStatus::Serving
    } else {
        ServingStatus::NotServing
    }
}
