// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer (`aegis-component-sdk`)
//!
//! Pure types and ports. No I/O lives here.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`capability`] | `Harness` capability port, LLM / tool / finding value objects |
//! | [`component`] | Component descriptors, tasks, task results |
//! | [`events`] | Stream events, steering messages, execution mode |
//! | [`health`] | Health state and status |
//! | [`registry`] | `ServiceRegistry` collaborator port |

pub mod capability;
pub mod component;
pub mod events;
pub mod health;
pub mod registry;
