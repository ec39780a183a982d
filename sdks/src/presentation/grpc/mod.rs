// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! gRPC transport for hosted components
//!
//! # Architecture
//!
//! - **Layer:** Presentation Layer
//! - **Purpose:** Maps `aegis.component.v1.ComponentService` onto the
//!   application layer and owns the server lifecycle

pub mod convert;
pub mod server;
pub mod service;

// Generated protobuf code
pub mod proto {
    tonic::include_proto!("aegis.component.v1");
}
