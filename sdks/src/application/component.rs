// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Component
//!
//! Contracts a hosted component and its capability provider factory
//! implement. The presentation layer drives these; component authors
//! implement them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::streaming_harness::StreamingHarness;
use crate::domain::capability::{Harness, HarnessError};
use crate::domain::component::{ComponentDescriptor, ComponentError, Task, TaskResult};

/// A hosted agent, tool or plugin
#[async_trait]
pub trait Component: Send + Sync + 'static {
    fn descriptor(&self) -> ComponentDescriptor;

    /// Run a task to completion against a plain capability provider
    async fn execute(&self, harness: Arc<dyn Harness>, task: Task) -> Result<TaskResult, ComponentError>;

    /// Run a task inside a streaming session.
    ///
    /// The default delegates to [`Component::execute`]; interception still
    /// emits tool, finding and LLM events because the streaming harness is
    /// what the component receives.
    async fn execute_streaming(
        &self,
        harness: Arc<StreamingHarness>,
        task: Task,
    ) -> Result<TaskResult, ComponentError> {
        self.execute(harness, task).await
    }
}

/// Builds the base capability provider for one call
pub trait HarnessFactory: Send + Sync + 'static {
    fn create(&self, task: &Task) -> Result<Arc<dyn Harness>, HarnessError>;
}
