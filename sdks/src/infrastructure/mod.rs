// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Infrastructure Layer (`aegis-component-sdk`)
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`health_reporter`] | Health table mirrored into `grpc.health.v1` |
//! | [`listener`] | TCP + Unix socket listener set with socket file cleanup |
//! | [`registry`] | In-memory `ServiceRegistry` and environment selection |
//! | [`standalone`] | Local `Harness` for running without an orchestrator |
//! | [`tls`] | PEM identity loading |

pub mod health_reporter;
pub mod listener;
pub mod registry;
pub mod standalone;
pub mod tls;
