// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A [`TaskRunner`] backed by one worker thread.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::{Condvar, Mutex, MutexGuard};
use vsync_core::task::{Task, TaskRunner};

use crate::SoftTimerError;

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<Task>,
    shutdown: bool,
}

#[derive(Default)]
struct WorkQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

/// Runs posted tasks in order on a dedicated thread.
///
/// Dropping the runner finishes the tasks already queued, then joins the
/// thread. If the last reference is dropped by a task on the worker itself,
/// the thread is detached and exits after draining.
pub struct WorkerRunner {
    queue: Arc<WorkQueue>,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl WorkerRunner {
    /// Spawns a worker thread called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SoftTimerError::Spawn`] if the thread cannot be created.
    pub fn spawn(name: &str) -> Result<Self, SoftTimerError> {
        let queue = Arc::new(WorkQueue::default());
        let thread = {
            let queue = Arc::clone(&queue);
            thread::Builder::new()
                .name(name.to_owned())
                .spawn(move || work(&queue))?
        };
        Ok(Self {
            queue,
            thread_id: thread.thread().id(),
            thread: Some(thread),
        })
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.state.lock().tasks.len()
    }
}

fn work(queue: &WorkQueue) {
    let mut state = queue.state.lock();
    loop {
        if let Some(task) = state.tasks.pop_front() {
            MutexGuard::unlocked(&mut state, task);
            continue;
        }
        if state.shutdown {
            break;
        }
        queue.ready.wait(&mut state);
    }
}

impl TaskRunner for WorkerRunner {
    fn post_task(&self, task: Task) {
        self.queue.state.lock().tasks.push_back(task);
        self.queue.ready.notify_one();
    }

    fn runs_tasks_on_current_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

impl Drop for WorkerRunner {
    fn drop(&mut self) {
        self.queue.state.lock().shutdown = true;
        self.queue.ready.notify_one();
        let Some(thread) = self.thread.take() else {
            return;
        };
        if self.runs_tasks_on_current_thread() {
            return;
        }
        if thread.join().is_err() {
            log::warn!("worker runner thread panicked");
        }
    }
}

impl core::fmt::Debug for WorkerRunner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WorkerRunner")
            .field("thread_id", &self.thread_id)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn tasks_run_in_order_on_the_worker() {
        let runner = WorkerRunner::spawn("test-worker").unwrap();
        assert!(!runner.runs_tasks_on_current_thread());

        let runner = Arc::new(runner);
        let (tx, rx) = mpsc::channel();
        for n in 0..4 {
            let tx = tx.clone();
            let on_worker = Arc::clone(&runner);
            runner.post_task(Box::new(move || {
                tx.send((n, on_worker.runs_tasks_on_current_thread())).unwrap();
            }));
        }

        let seen: Vec<_> = (0..4)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(seen, [(0, true), (1, true), (2, true), (3, true)]);
    }

    #[test]
    fn drop_finishes_queued_work() {
        let runner = WorkerRunner::spawn("test-worker").unwrap();
        let gate = Arc::new(AtomicBool::new(false));
        let ran = Arc::new(AtomicUsize::new(0));

        let g = Arc::clone(&gate);
        runner.post_task(Box::new(move || {
            while !g.load(Ordering::Acquire) {
                thread::yield_now();
            }
        }));
        for _ in 0..3 {
            let ran = Arc::clone(&ran);
            runner.post_task(Box::new(move || {
                ran.fetch_add(1, Ordering::Relaxed);
            }));
        }

        gate.store(true, Ordering::Release);
        drop(runner);
        assert_eq!(ran.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn last_reference_dropped_on_the_worker_detaches() {
        let runner = Arc::new(WorkerRunner::spawn("test-worker").unwrap());
        let (go_tx, go_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel();

        let last = Arc::clone(&runner);
        runner.post_task(Box::new(move || {
            go_rx.recv().unwrap();
            // Runs `Drop` on the worker thread itself.
            drop(last);
            done_tx.send(()).unwrap();
        }));
        drop(runner);
        go_tx.send(()).unwrap();

        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
}
