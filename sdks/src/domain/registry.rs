// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Registry
//!
//! Port for the external service directory a component announces itself to.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Defines the `ServiceRegistry` collaborator interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::component::ComponentKind;

/// Registration record for one serving component instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub kind: ComponentKind,
    pub instance_id: String,
    /// `host:port` other services should dial
    pub endpoint: String,
}

#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    async fn register(&self, info: &ServiceInfo) -> Result<(), RegistryError>;
    async fn deregister(&self, info: &ServiceInfo) -> Result<(), RegistryError>;
    async fn close(&self) -> Result<(), RegistryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Registry unavailable: {0}")]
    Unavailable(String),

    #[error("Service not registered: {0}")]
    NotRegistered(String),

    #[error("Registry is closed")]
    Closed,
}
