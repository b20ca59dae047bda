// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic stand-ins for the display timer and the task runner.
//!
//! [`ManualDisplay`] plays the role of the hardware: the caller decides when
//! a signal fires and with which timestamps. [`ManualTaskRunner`] queues
//! posted work until [`run_pending`](ManualTaskRunner::run_pending) is called,
//! which makes the cross-thread handoff observable step by step.
//! [`InlineTaskRunner`] runs posted work immediately on the posting thread.
//!
//! These drive headless setups and tests; nothing here sleeps or spawns.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{RefreshRateProbe, SignalHandler, SignalSource};
use crate::task::{Task, TaskRunner};
use crate::time::HostTime;
use crate::timing::{FrameRateRange, RefreshRate};

#[derive(Debug, Default)]
struct DisplayState {
    handler: Option<SignalHandler>,
    armed: bool,
    invalidated: bool,
    arm_count: u64,
    disarm_count: u64,
    invalidate_count: u64,
    frame_rate_range: Option<FrameRateRange>,
}

/// A display whose signals are fired by hand.
///
/// Cloning yields another handle to the same display.
#[derive(Clone, Debug, Default)]
pub struct ManualDisplay {
    state: Arc<Mutex<DisplayState>>,
}

impl ManualDisplay {
    /// Creates a display with no source attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a source for `handler`. Use as the client's source factory.
    ///
    /// A display drives one source at a time; attaching again replaces the
    /// previous handler.
    #[must_use]
    pub fn source(&self, handler: SignalHandler) -> ManualSignalSource {
        let mut state = self.state.lock();
        state.handler = Some(handler);
        state.armed = false;
        state.invalidated = false;
        ManualSignalSource {
            state: Arc::clone(&self.state),
        }
    }

    /// Fires a signal the way real hardware would: only while armed and not
    /// invalidated. Returns whether the signal was reported.
    pub fn fire(&self, signal: HostTime, next_expected: HostTime) -> bool {
        let handler = {
            let state = self.state.lock();
            if !state.armed || state.invalidated {
                return false;
            }
            state.handler.clone()
        };
        Self::report(handler, signal, next_expected)
    }

    /// Fires a signal regardless of arm state, as if it was already in flight
    /// when the source was disarmed or invalidated. Returns whether a
    /// handler was attached.
    pub fn fire_in_flight(&self, signal: HostTime, next_expected: HostTime) -> bool {
        let handler = self.state.lock().handler.clone();
        Self::report(handler, signal, next_expected)
    }

    // The handler is called with the display unlocked: the client disarms
    // the source from inside it.
    fn report(handler: Option<SignalHandler>, signal: HostTime, next_expected: HostTime) -> bool {
        match handler {
            Some(handler) => {
                handler.on_signal(signal, next_expected);
                true
            }
            None => false,
        }
    }

    /// Whether the attached source is armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state.lock().armed
    }

    /// Whether the attached source has been invalidated.
    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        self.state.lock().invalidated
    }

    /// Whether the attached handler's client is still alive.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state
            .lock()
            .handler
            .as_ref()
            .is_some_and(SignalHandler::is_connected)
    }

    /// Number of `arm` calls seen.
    #[must_use]
    pub fn arm_count(&self) -> u64 {
        self.state.lock().arm_count
    }

    /// Number of `disarm` calls seen.
    #[must_use]
    pub fn disarm_count(&self) -> u64 {
        self.state.lock().disarm_count
    }

    /// Number of `invalidate` calls seen.
    #[must_use]
    pub fn invalidate_count(&self) -> u64 {
        self.state.lock().invalidate_count
    }

    /// The most recent frame-rate hint.
    #[must_use]
    pub fn frame_rate_range(&self) -> Option<FrameRateRange> {
        self.state.lock().frame_rate_range
    }
}

/// The [`SignalSource`] half of a [`ManualDisplay`].
#[derive(Debug)]
pub struct ManualSignalSource {
    state: Arc<Mutex<DisplayState>>,
}

impl SignalSource for ManualSignalSource {
    fn arm(&mut self) {
        let mut state = self.state.lock();
        state.armed = true;
        state.arm_count += 1;
    }

    fn disarm(&mut self) {
        let mut state = self.state.lock();
        state.armed = false;
        state.disarm_count += 1;
    }

    fn invalidate(&mut self) {
        let mut state = self.state.lock();
        state.armed = false;
        state.invalidated = true;
        state.invalidate_count += 1;
    }

    fn set_frame_rate_range(&mut self, range: FrameRateRange) {
        self.state.lock().frame_rate_range = Some(range);
    }
}

/// A [`TaskRunner`] that queues work until asked to run it.
#[derive(Default)]
pub struct ManualTaskRunner {
    queue: Mutex<VecDeque<Task>>,
}

impl ManualTaskRunner {
    /// Creates an empty runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs queued tasks, including any posted while running, until the
    /// queue is empty. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // Popped one at a time so tasks may post more work.
            let Some(task) = self.queue.lock().pop_front() else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl TaskRunner for ManualTaskRunner {
    fn post_task(&self, task: Task) {
        self.queue.lock().push_back(task);
    }
}

impl core::fmt::Debug for ManualTaskRunner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ManualTaskRunner")
            .field("pending", &self.pending())
            .finish()
    }
}

/// A [`TaskRunner`] that runs work on the posting thread, immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineTaskRunner;

impl TaskRunner for InlineTaskRunner {
    fn post_task(&self, task: Task) {
        task();
    }

    fn runs_tasks_on_current_thread(&self) -> bool {
        true
    }
}

/// A [`RefreshRateProbe`] reporting a fixed value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ManualProbe(pub RefreshRate);

impl RefreshRateProbe for ManualProbe {
    fn device_max_refresh_rate(&self) -> RefreshRate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn unattached_display_fires_nothing() {
        let display = ManualDisplay::new();
        assert!(!display.fire(HostTime(0), HostTime(1)));
        assert!(!display.fire_in_flight(HostTime(0), HostTime(1)));
        assert!(!display.is_connected());
    }

    #[test]
    fn runner_drains_work_posted_while_draining() {
        let runner = Arc::new(ManualTaskRunner::new());
        let ran = Arc::new(AtomicUsize::new(0));

        let (r, n) = (Arc::clone(&runner), Arc::clone(&ran));
        runner.post_task(Box::new(move || {
            n.fetch_add(1, Ordering::Relaxed);
            let n = Arc::clone(&n);
            r.post_task(Box::new(move || {
                n.fetch_add(1, Ordering::Relaxed);
            }));
        }));

        assert_eq!(runner.pending(), 1);
        assert_eq!(runner.run_pending(), 2);
        assert_eq!(ran.load(Ordering::Relaxed), 2);
        assert_eq!(runner.pending(), 0);
    }

    #[test]
    fn inline_runner_runs_immediately() {
        let ran = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&ran);
        InlineTaskRunner.post_task(Box::new(move || {
            n.fetch_add(1, Ordering::Relaxed);
        }));
        assert_eq!(ran.load(Ordering::Relaxed), 1);
        assert!(InlineTaskRunner.runs_tasks_on_current_thread());
    }

    #[test]
    fn probe_reports_its_value() {
        assert_eq!(
            ManualProbe(RefreshRate::from_hz(120.0)).device_max_refresh_rate(),
            RefreshRate::from_hz(120.0)
        );
        assert!(!ManualProbe::default().device_max_refresh_rate().is_known());
    }
}
