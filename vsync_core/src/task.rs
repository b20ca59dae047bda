// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The "post work here" capability the engine hands to a waiter.
//!
//! Vsync callbacks never run on the thread the display signal arrived on.
//! They are posted to a [`TaskRunner`] chosen by the engine (its UI thread,
//! a worker pool, the main dispatch queue). The waiter treats the runner as
//! opaque and makes no assumption about its internal concurrency.

/// A unit of work posted to a [`TaskRunner`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// An execution context that accepts posted work.
///
/// Running `task` inline from `post_task` is permitted: waiters never post
/// while holding their own locks.
pub trait TaskRunner: Send + Sync {
    /// Queues `task` for execution on this runner's context.
    fn post_task(&self, task: Task);

    /// Returns `true` if the calling thread is this runner's context.
    ///
    /// Used for diagnostics only. The default answers `false`.
    fn runs_tasks_on_current_thread(&self) -> bool {
        false
    }
}
