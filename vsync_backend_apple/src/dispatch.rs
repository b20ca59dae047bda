// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Main dispatch queue task runner.

use dispatch2::DispatchQueue;
use objc2::MainThreadMarker;
use vsync_core::task::{Task, TaskRunner};

/// Posts tasks to the main dispatch queue.
///
/// This is where UI frameworks expect frame callbacks to run. Tasks execute
/// in FIFO order on the main thread once its run loop drains the queue.
#[derive(Clone, Copy, Debug, Default)]
pub struct MainQueueRunner;

impl MainQueueRunner {
    /// Creates a runner for the main queue.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TaskRunner for MainQueueRunner {
    fn post_task(&self, task: Task) {
        DispatchQueue::main().exec_async(task);
    }

    fn runs_tasks_on_current_thread(&self) -> bool {
        MainThreadMarker::new().is_some()
    }
}
