// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Layer (`aegis-component-sdk`)
//!
//! Per-call orchestration of a hosted component.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`component`] | `Component` and `HarnessFactory` contracts |
//! | [`sequencer`] | Lock-free per-session sequence counter |
//! | [`session`] | Streaming session: ordered emit path, steering queue, mode, lifecycle |
//! | [`streaming_harness`] | Capability decorator emitting stream events |

pub mod component;
pub mod sequencer;
pub mod session;
pub mod streaming_harness;
