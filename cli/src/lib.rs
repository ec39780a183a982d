// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! AEGIS component host library - exposes testable pieces of the binary
//!
//! - [`echo`]: the built-in echo agent and `echo` tool served by `serve`
//! - [`probe`]: the `Health` RPC probe behind `health`

pub mod echo;
pub mod probe;
