// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Thread-driven display timer.
//!
//! A [`SoftDisplayTimer`] emulates a display on a dedicated thread. Refreshes
//! happen on a fixed grid anchored when the timer starts, whether or not
//! anyone is listening; while armed, each grid point is reported to the
//! [`SignalHandler`]. Arming late joins the grid at the next point, so signal
//! times never drift with arming latency.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex, MutexGuard};
use vsync_core::backend::{SignalHandler, SignalSource};
use vsync_core::time::{Duration, HostTime};
use vsync_core::timing::{FrameRateRange, RefreshRate};

use crate::SoftTimerError;
use crate::time::{now, timebase};

/// 60 Hz in nanoseconds, used if a hint collapses the rate to nothing.
const FALLBACK_INTERVAL: Duration = Duration(16_666_667);

/// One minute in nanoseconds: the longest refresh interval the timer emulates.
const LONGEST_INTERVAL: Duration = Duration(60_000_000_000);

/// The sequence of refresh rates a [`SoftDisplayTimer`] cycles through.
///
/// A fixed schedule has one rate. A variable schedule repeats its rates in
/// order, one refresh each, to imitate variable-refresh-rate panels.
#[derive(Clone, Debug, PartialEq)]
pub struct RefreshSchedule {
    rates: Vec<RefreshRate>,
}

impl RefreshSchedule {
    /// A display refreshing at a constant `hz`.
    ///
    /// # Errors
    ///
    /// Returns [`SoftTimerError::InvalidRate`] if `hz` is not a positive,
    /// finite number, or refreshes slower than once a minute or faster than
    /// once a nanosecond.
    pub fn fixed(hz: f64) -> Result<Self, SoftTimerError> {
        Self::variable(&[hz])
    }

    /// A display cycling through `hz`, one refresh per entry.
    ///
    /// # Errors
    ///
    /// Returns [`SoftTimerError::EmptySchedule`] for an empty slice and
    /// [`SoftTimerError::InvalidRate`] for any entry that [`fixed`](Self::fixed)
    /// would reject.
    pub fn variable(hz: &[f64]) -> Result<Self, SoftTimerError> {
        if hz.is_empty() {
            return Err(SoftTimerError::EmptySchedule);
        }
        let rates = hz
            .iter()
            .map(|&hz| {
                let rate = RefreshRate::from_hz(hz);
                let usable = rate
                    .interval(timebase())
                    .is_some_and(|interval| !interval.is_zero() && interval <= LONGEST_INTERVAL);
                if usable {
                    Ok(rate)
                } else {
                    Err(SoftTimerError::InvalidRate { hz })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rates })
    }

    /// The rates in cycle order.
    #[must_use]
    pub fn rates(&self) -> &[RefreshRate] {
        &self.rates
    }

    /// The highest rate in the schedule.
    #[must_use]
    pub fn fastest(&self) -> RefreshRate {
        self.rates
            .iter()
            .copied()
            .fold(RefreshRate::UNKNOWN, |fastest, rate| {
                if rate.hz() > fastest.hz() { rate } else { fastest }
            })
    }

    fn rate_at(&self, cursor: usize) -> RefreshRate {
        self.rates
            .get(cursor % self.rates.len())
            .copied()
            .unwrap_or(RefreshRate::UNKNOWN)
    }
}

fn step(rate: RefreshRate, range: Option<FrameRateRange>) -> Duration {
    let rate = range.map_or(rate, |range| range.clamp(rate));
    rate.interval(timebase())
        .filter(|interval| !interval.is_zero())
        .map_or(FALLBACK_INTERVAL, |interval| interval.min(LONGEST_INTERVAL))
}

/// `t + interval`, falling back to a 60 Hz step and finally saturating at
/// the end of the clock.
fn advance(t: HostTime, interval: Duration) -> HostTime {
    t.checked_add(interval)
        .or_else(|| t.checked_add(FALLBACK_INTERVAL))
        .unwrap_or(HostTime(u64::MAX))
}

/// Moves `next` to the last grid point at or before `current`, skipping
/// whole schedule cycles at once. Returns the new grid point, its cursor,
/// and the interval that follows it.
fn catch_up(
    schedule: &RefreshSchedule,
    range: Option<FrameRateRange>,
    mut next: HostTime,
    mut cursor: usize,
    current: HostTime,
) -> (HostTime, usize, Duration) {
    let cycle = (0..schedule.rates.len())
        .map(|i| step(schedule.rate_at(cursor + i), range).ticks())
        .fold(0_u64, u64::saturating_add);
    if cycle > 0 && current > next {
        let cycles = (current - next).ticks() / cycle;
        next = advance(next, Duration(cycles * cycle));
    }

    let mut interval = step(schedule.rate_at(cursor), range);
    while advance(next, interval) <= current && next < HostTime(u64::MAX) {
        next = advance(next, interval);
        cursor = (cursor + 1) % schedule.rates.len();
        interval = step(schedule.rate_at(cursor), range);
    }
    (next, cursor, interval)
}

#[derive(Debug, Default)]
struct TimerState {
    armed: bool,
    shutdown: bool,
    range: Option<FrameRateRange>,
}

#[derive(Debug, Default)]
struct TimerShared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

impl TimerShared {
    fn update(&self, f: impl FnOnce(&mut TimerState)) {
        f(&mut *self.state.lock());
        self.wake.notify_all();
    }
}

/// A [`SignalSource`] backed by a timer thread.
///
/// The thread starts at construction and runs until
/// [`invalidate`](SignalSource::invalidate) or drop; invalidation joins it
/// unless called from the timer thread itself (for example by a callback run
/// inline), in which case the thread exits on its own once the handler
/// returns.
pub struct SoftDisplayTimer {
    shared: Arc<TimerShared>,
    thread: Option<JoinHandle<()>>,
    schedule: RefreshSchedule,
}

impl SoftDisplayTimer {
    /// Starts a timer thread reporting to `handler`. The timer starts
    /// disarmed.
    ///
    /// # Errors
    ///
    /// Returns [`SoftTimerError::Spawn`] if the thread cannot be created.
    pub fn new(handler: SignalHandler, schedule: RefreshSchedule) -> Result<Self, SoftTimerError> {
        let shared = Arc::new(TimerShared::default());
        let thread = {
            let shared = Arc::clone(&shared);
            let schedule = schedule.clone();
            thread::Builder::new()
                .name("vsync-soft-timer".into())
                .spawn(move || run(&shared, &handler, &schedule))?
        };
        log::debug!("soft display timer started: {:?}", schedule.rates());
        Ok(Self {
            shared,
            thread: Some(thread),
            schedule,
        })
    }

    /// The schedule this timer follows.
    #[must_use]
    pub fn schedule(&self) -> &RefreshSchedule {
        &self.schedule
    }

    /// Returns `true` until the timer has been invalidated.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.shared.update(|state| {
            state.shutdown = true;
            state.armed = false;
        });
        if thread.thread().id() == thread::current().id() {
            log::debug!("soft display timer stopped from its own thread; detaching");
            return;
        }
        if thread.join().is_err() {
            log::warn!("soft display timer thread panicked");
        }
    }
}

impl SignalSource for SoftDisplayTimer {
    fn arm(&mut self) {
        self.shared.update(|state| state.armed = true);
    }

    fn disarm(&mut self) {
        self.shared.update(|state| state.armed = false);
    }

    fn invalidate(&mut self) {
        self.shutdown();
    }

    fn set_frame_rate_range(&mut self, range: FrameRateRange) {
        self.shared.update(|state| state.range = Some(range));
    }
}

impl Drop for SoftDisplayTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl core::fmt::Debug for SoftDisplayTimer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SoftDisplayTimer")
            .field("schedule", &self.schedule)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn run(shared: &TimerShared, handler: &SignalHandler, schedule: &RefreshSchedule) {
    let mut cursor = 0;
    let mut state = shared.state.lock();
    // Grid time of the next refresh.
    let mut next = advance(now(), step(schedule.rate_at(cursor), state.range));

    loop {
        if state.shutdown {
            break;
        }
        if !state.armed {
            shared.wake.wait(&mut state);
            continue;
        }

        let current = now();
        if current < next {
            let _ = shared
                .wake
                .wait_for(&mut state, (next - current).to_std(timebase()));
            continue;
        }

        // Refreshes that passed unobserved are skipped, not replayed.
        let (signal, at, interval) = catch_up(schedule, state.range, next, cursor, current);
        let next_expected = advance(signal, interval);
        cursor = (at + 1) % schedule.rates.len();
        next = next_expected;

        report(&mut state, handler, signal, next_expected);
    }
    log::debug!("soft display timer thread exiting");
}

// The client disarms the timer from inside the handler, which needs the
// state lock.
fn report(
    state: &mut MutexGuard<'_, TimerState>,
    handler: &SignalHandler,
    signal: HostTime,
    next_expected: HostTime,
) {
    log::trace!("soft vsync at {signal:?}");
    MutexGuard::unlocked(state, || handler.on_signal(signal, next_expected));
}
