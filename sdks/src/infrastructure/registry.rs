// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Registry adapters
//!
//! [`InMemoryRegistry`] keeps registrations in process memory; it backs
//! local runs and tests. [`registry_from_env`] picks an adapter from
//! `AEGIS_REGISTRY` and never fails startup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::domain::registry::{RegistryError, ServiceInfo, ServiceRegistry};

/// Environment variable selecting the registry adapter
pub const REGISTRY_ENV: &str = "AEGIS_REGISTRY";

#[derive(Default)]
pub struct InMemoryRegistry {
    services: DashMap<String, ServiceInfo>,
    closed: AtomicBool,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered instances of `name`
    pub fn lookup(&self, name: &str) -> Vec<ServiceInfo> {
        self.services
            .iter()
            .filter(|entry| entry.value().name == name)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), RegistryError> {
        if self.is_closed() {
            return Err(RegistryError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceRegistry for InMemoryRegistry {
    async fn register(&self, info: &ServiceInfo) -> Result<(), RegistryError> {
        self.ensure_open()?;
        debug!(name = %info.name, instance = %info.instance_id, endpoint = %info.endpoint, "Registering service");
        self.services.insert(info.instance_id.clone(), info.clone());
        Ok(())
    }

    async fn deregister(&self, info: &ServiceInfo) -> Result<(), RegistryError> {
        self.ensure_open()?;
        self.services
            .remove(&info.instance_id)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotRegistered(info.instance_id.clone()))
    }

    async fn close(&self) -> Result<(), RegistryError> {
        self.closed.store(true, Ordering::SeqCst);
        self.services.clear();
        Ok(())
    }
}

/// Registry selected by `AEGIS_REGISTRY`, or `None` when unset or unknown
pub fn registry_from_env() -> Option<Arc<dyn ServiceRegistry>> {
    registry_from_value(std::env::var(REGISTRY_ENV).ok().as_deref())
}

pub fn registry_from_value(value: Option<&str>) -> Option<Arc<dyn ServiceRegistry>> {
    match value.map(str::trim) {
        None | Some("") | Some("none") => None,
        Some("memory") => {
            info!("Using in-memory service registry");
            Some(Arc::new(InMemoryRegistry::new()))
        }
        Some(other) => {
            warn!(registry = other, "Unknown registry adapter; continuing without registration");
            None
        }
    }
}
