// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software display backend for `vsync_core`.
//!
//! For hosts without a native display timer (headless rendering, CI, Linux
//! without a compositor hook), this crate emulates one:
//!
//! - [`SoftDisplayTimer`]: a [`SignalSource`](vsync_core::backend::SignalSource)
//!   ticking on its own thread, following a fixed or variable
//!   [`RefreshSchedule`]
//! - [`WorkerRunner`]: a single-thread [`TaskRunner`] for callbacks
//! - [`SoftDisplayProbe`]: the schedule's fastest rate
//! - [`now`] / [`timebase`]: `CLOCK_MONOTONIC` in nanoseconds
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use vsync_backend_soft::{RefreshSchedule, WorkerRunner, waiter};
//! use vsync_core::config::WaiterConfig;
//! use vsync_core::timing::FrameTiming;
//! use vsync_core::waiter::VsyncWaiter;
//!
//! # fn main() -> Result<(), vsync_backend_soft::SoftTimerError> {
//! let runner = Arc::new(WorkerRunner::spawn("frames")?);
//! let waiter = waiter(
//!     &runner,
//!     Arc::new(|timing: FrameTiming| println!("frame {timing:?}")),
//!     WaiterConfig::on_demand(),
//!     RefreshSchedule::fixed(60.0)?,
//! )?;
//! waiter.await_vsync();
//! # Ok(())
//! # }
//! ```

mod probe;
mod runner;
mod time;
mod timer;

use std::sync::Arc;

use vsync_core::client::VsyncCallback;
use vsync_core::config::WaiterConfig;
use vsync_core::platform::PlatformVsyncWaiter;
use vsync_core::task::TaskRunner;

pub use probe::SoftDisplayProbe;
pub use runner::WorkerRunner;
pub use time::{now, timebase};
pub use timer::{RefreshSchedule, SoftDisplayTimer};

/// Errors from setting up the software backend.
#[derive(Debug, thiserror::Error)]
pub enum SoftTimerError {
    /// A schedule needs at least one rate.
    #[error("refresh schedule is empty")]
    EmptySchedule,
    /// A scheduled rate was zero, negative, or not finite.
    #[error("invalid refresh rate {hz} Hz")]
    InvalidRate {
        /// The rejected value.
        hz: f64,
    },
    /// The timer or worker thread could not be spawned.
    #[error("failed to spawn backend thread")]
    Spawn(#[from] std::io::Error),
}

/// A [`PlatformVsyncWaiter`] over the software display timer.
pub type SoftVsyncWaiter = PlatformVsyncWaiter<SoftDisplayTimer>;

/// Builds a waiter whose display follows `schedule`.
///
/// Callbacks are posted to `target`, which the waiter holds weakly.
///
/// # Errors
///
/// Returns [`SoftTimerError::Spawn`] if the timer thread cannot be started.
pub fn waiter<R: TaskRunner + 'static>(
    target: &Arc<R>,
    callback: VsyncCallback,
    config: WaiterConfig,
    schedule: RefreshSchedule,
) -> Result<SoftVsyncWaiter, SoftTimerError> {
    PlatformVsyncWaiter::try_new(target, callback, config, timebase(), |handler| {
        SoftDisplayTimer::new(handler, schedule)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
    use std::thread;
    use std::time::Duration;

    use vsync_core::timing::{FrameRateRange, FrameTiming, RefreshRate};
    use vsync_core::waiter::{RefreshRateReporter, VsyncWaiter};

    use super::*;

    const PATIENCE: Duration = Duration::from_secs(5);

    fn start(
        config: WaiterConfig,
        schedule: RefreshSchedule,
    ) -> (Arc<WorkerRunner>, SoftVsyncWaiter, Receiver<FrameTiming>) {
        let runner = Arc::new(WorkerRunner::spawn("test-frames").unwrap());
        let (tx, rx) = mpsc::channel();
        let waiter = waiter(
            &runner,
            Arc::new(move |timing: FrameTiming| {
                // The receiver may be gone once a test has seen enough.
                let _ = tx.send(timing);
            }),
            config,
            schedule,
        )
        .unwrap();
        (runner, waiter, rx)
    }

    #[test]
    fn on_demand_delivers_one_frame_per_await() {
        let (_runner, waiter, rx) = start(
            WaiterConfig::on_demand(),
            RefreshSchedule::fixed(500.0).unwrap(),
        );

        waiter.await_vsync();
        let first = rx.recv_timeout(PATIENCE).unwrap();
        assert!(first.frame_target() > first.frame_start());
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(50)),
            Err(RecvTimeoutError::Timeout),
            "paused timer delivered an unrequested frame"
        );

        waiter.await_vsync();
        let second = rx.recv_timeout(PATIENCE).unwrap();
        assert!(second.frame_start() > first.frame_start());
    }

    #[test]
    fn continuous_frames_advance_and_report_the_rate() {
        let (_runner, waiter, rx) = start(
            WaiterConfig::continuous(),
            RefreshSchedule::fixed(500.0).unwrap(),
        );
        assert_eq!(waiter.refresh_rate(), RefreshRate::UNKNOWN);

        waiter.await_vsync();
        let frames: Vec<_> = (0..5).map(|_| rx.recv_timeout(PATIENCE).unwrap()).collect();
        assert!(
            frames
                .windows(2)
                .all(|w| w[0].frame_start() < w[1].frame_start()),
            "frame_start must increase: {frames:?}"
        );
        assert!((waiter.refresh_rate().hz() - 500.0).abs() < 1e-6);
    }

    #[test]
    fn variable_schedule_reports_each_interval() {
        let (_runner, waiter, rx) = start(
            WaiterConfig::continuous(),
            RefreshSchedule::variable(&[250.0, 500.0]).unwrap(),
        );
        waiter.await_vsync();
        for _ in 0..6 {
            let hz = rx
                .recv_timeout(PATIENCE)
                .unwrap()
                .refresh_rate(timebase())
                .hz();
            assert!(
                (hz - 250.0).abs() < 1e-6 || (hz - 500.0).abs() < 1e-6,
                "unexpected interval: {hz} Hz"
            );
        }
    }

    #[test]
    fn frame_rate_hint_caps_the_timer() {
        let (_runner, waiter, rx) = start(
            WaiterConfig::continuous().with_frame_rate_range(FrameRateRange::up_to(
                RefreshRate::UNKNOWN,
                RefreshRate::from_hz(250.0),
            )),
            RefreshSchedule::fixed(500.0).unwrap(),
        );
        waiter.await_vsync();
        let timing = rx.recv_timeout(PATIENCE).unwrap();
        assert!((timing.refresh_rate(timebase()).hz() - 250.0).abs() < 1e-6);
    }

    #[test]
    fn no_frames_after_the_waiter_is_dropped() {
        let runner = Arc::new(WorkerRunner::spawn("test-frames").unwrap());
        let torn_down = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let late = Arc::clone(&torn_down);
        let waiter = waiter(
            &runner,
            Arc::new(move |_: FrameTiming| {
                let _ = tx.send(late.load(Ordering::Acquire));
            }),
            WaiterConfig::continuous(),
            RefreshSchedule::fixed(500.0).unwrap(),
        )
        .unwrap();
        waiter.await_vsync();
        rx.recv_timeout(PATIENCE).unwrap();

        drop(waiter);
        torn_down.store(true, Ordering::Release);
        thread::sleep(Duration::from_millis(50));

        let after_teardown = rx.try_iter().filter(|&late| late).count();
        assert_eq!(after_teardown, 0, "frames delivered after teardown");
    }

    #[test]
    fn dropping_the_waiter_from_its_own_callback_is_safe() {
        let runner = Arc::new(WorkerRunner::spawn("test-frames").unwrap());
        let slot: Arc<parking_lot::Mutex<Option<SoftVsyncWaiter>>> = Arc::default();
        let (tx, rx) = mpsc::channel();

        let own = Arc::clone(&slot);
        let made = waiter(
            &runner,
            Arc::new(move |_: FrameTiming| {
                let taken = own.lock().take();
                drop(taken);
                let _ = tx.send(());
            }),
            WaiterConfig::continuous(),
            RefreshSchedule::fixed(500.0).unwrap(),
        )
        .unwrap();
        // Armed only once stored, so the first callback finds the waiter.
        let mut stored = slot.lock();
        stored.insert(made).await_vsync();
        drop(stored);

        rx.recv_timeout(PATIENCE).unwrap();
        assert!(slot.lock().is_none());
    }
}
