// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The signal client: platform display signals in, posted callbacks out.
//!
//! [`SignalClient`] owns a [`SignalSource`] and turns the signals it reports
//! into [`FrameTiming`] callbacks posted on the engine's [`TaskRunner`].
//!
//! ```text
//!   platform thread                    client lock            target runner
//!   ───────────────                    ───────────            ─────────────
//!   SignalHandler::on_signal ──► Invalidated? drop
//!                                valid timing? else drop
//!                                update refresh-rate estimate
//!                                armed? else drop
//!                                pause mode → disarm
//!                         ◄───── (lock released)
//!   TaskRunner::post_task ─────────────────────────────────► gate open?
//!                                                              callback(timing)
//! ```
//!
//! # Lifetime
//!
//! The client is `Active` until [`invalidate`](SignalClient::invalidate),
//! then `Invalidated` for good. Signal handling and invalidation share one
//! lock, so once `invalidate` returns no further signal is observed. Posted
//! callbacks pass through a delivery gate that invalidation closes; a
//! callback already running when `invalidate` is called from another thread
//! finishes before `invalidate` returns.
//!
//! The source only ever holds a weak [`SignalHandler`], and the client holds
//! the target runner weakly, so neither side keeps the other alive.

use core::cell::Cell;
use core::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use crate::backend::{SignalHandler, SignalSource};
use crate::config::WaiterConfig;
use crate::task::TaskRunner;
use crate::time::{HostTime, Timebase};
use crate::timing::{FrameRateRange, FrameTiming, RefreshRate};
use crate::trace::{
    ArmEvent, DeliveryEvent, DropEvent, DropReason, InvalidateEvent, SignalEvent, TraceSink,
    Tracer,
};

/// The engine callback invoked with each delivered [`FrameTiming`].
pub type VsyncCallback = Arc<dyn Fn(FrameTiming) + Send + Sync>;

/// A boxed trace sink owned by a client.
pub type BoxedTraceSink = Box<dyn TraceSink + Send>;

/// Lifetime state of a [`SignalClient`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Accepting signals.
    Active,
    /// Torn down. Terminal.
    Invalidated,
}

/// Counters describing what a client has done so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Signals that reached the client, including discarded ones.
    pub signals_observed: u64,
    /// Callbacks posted to the target runner.
    pub callbacks_posted: u64,
    /// Signals discarded by the client.
    pub signals_dropped: u64,
    /// Posted callbacks discarded because invalidation closed the gate
    /// before they ran.
    pub stale_deliveries: u64,
}

/// Receives signals on behalf of a client. Erases the source type so
/// [`SignalHandler`] stays non-generic.
pub(crate) trait SignalReceiver: Send + Sync {
    fn receive(&self, signal: HostTime, next_expected: HostTime);
}

/// Closed by invalidation; every posted callback runs through it.
///
/// Reentrant so a callback may drop its own waiter.
struct DeliveryGate {
    open: ReentrantMutex<Cell<bool>>,
    stale: AtomicU64,
}

impl DeliveryGate {
    fn new() -> Self {
        Self {
            open: ReentrantMutex::new(Cell::new(true)),
            stale: AtomicU64::new(0),
        }
    }

    fn deliver(&self, callback: &VsyncCallback, timing: FrameTiming) {
        let open = self.open.lock();
        if open.get() {
            callback(timing);
        } else {
            self.stale.fetch_add(1, Ordering::Relaxed);
            log::trace!("vsync callback posted before invalidation; dropped");
        }
    }

    fn close(&self) {
        self.open.lock().set(false);
    }
}

struct Inner<S> {
    source: Option<S>,
    lifecycle: Lifecycle,
    armed: bool,
    signals_observed: u64,
    callbacks_posted: u64,
    signals_dropped: u64,
    sink: Option<BoxedTraceSink>,
}

fn tracer(sink: &mut Option<BoxedTraceSink>) -> Tracer<'_> {
    match sink {
        Some(sink) => Tracer::new(Some(&mut **sink)),
        None => Tracer::none(),
    }
}

fn discard(
    dropped: &mut u64,
    tracer: &mut Tracer<'_>,
    signal_index: u64,
    signal: HostTime,
    reason: DropReason,
) {
    *dropped += 1;
    tracer.dropped(&DropEvent {
        signal_index,
        signal,
        reason,
    });
}

struct Shared<S> {
    inner: Mutex<Inner<S>>,
    gate: Arc<DeliveryGate>,
    pause_after_vsync: AtomicBool,
    refresh_rate: AtomicU64,
    target: Weak<dyn TaskRunner>,
    callback: VsyncCallback,
    timebase: Timebase,
}

struct Delivery {
    gate: Arc<DeliveryGate>,
    callback: VsyncCallback,
    timing: FrameTiming,
}

impl<S: SignalSource> Shared<S> {
    /// Decides what to do with a signal. Runs entirely under the lock and
    /// returns the post to perform once the lock is released.
    fn handle_signal(
        &self,
        signal: HostTime,
        next_expected: HostTime,
    ) -> Option<(Arc<dyn TaskRunner>, Delivery)> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let signal_index = inner.signals_observed;
        inner.signals_observed += 1;

        let mut tracer = tracer(&mut inner.sink);
        tracer.signal(&SignalEvent {
            signal_index,
            signal,
            next_expected,
        });

        if inner.lifecycle == Lifecycle::Invalidated {
            discard(
                &mut inner.signals_dropped,
                &mut tracer,
                signal_index,
                signal,
                DropReason::Invalidated,
            );
            return None;
        }

        let timing = match FrameTiming::new(signal, next_expected) {
            Ok(timing) => timing,
            Err(err) => {
                log::debug!("dropping vsync signal {signal_index}: {err}");
                discard(
                    &mut inner.signals_dropped,
                    &mut tracer,
                    signal_index,
                    signal,
                    DropReason::InvalidTiming,
                );
                return None;
            }
        };
        self.refresh_rate.store(
            timing.refresh_rate(self.timebase).to_bits(),
            Ordering::Relaxed,
        );

        if !inner.armed {
            discard(
                &mut inner.signals_dropped,
                &mut tracer,
                signal_index,
                signal,
                DropReason::NotArmed,
            );
            return None;
        }

        let pause_after_vsync = self.pause_after_vsync.load(Ordering::Acquire);
        if pause_after_vsync {
            inner.armed = false;
            if let Some(source) = inner.source.as_mut() {
                source.disarm();
            }
            tracer.arm(&ArmEvent {
                signals_observed: signal_index + 1,
                armed: false,
                pause_after_vsync,
            });
        }

        let Some(target) = self.target.upgrade() else {
            log::debug!("vsync target runner is gone; dropping signal {signal_index}");
            discard(
                &mut inner.signals_dropped,
                &mut tracer,
                signal_index,
                signal,
                DropReason::TargetGone,
            );
            return None;
        };

        inner.callbacks_posted += 1;
        tracer.delivery(&DeliveryEvent {
            signal_index,
            frame_start: timing.frame_start(),
            frame_target: timing.frame_target(),
        });
        log::trace!("posting vsync {signal_index}: {timing:?}");

        Some((
            target,
            Delivery {
                gate: Arc::clone(&self.gate),
                callback: Arc::clone(&self.callback),
                timing,
            },
        ))
    }
}

impl<S: SignalSource> SignalReceiver for Shared<S> {
    fn receive(&self, signal: HostTime, next_expected: HostTime) {
        if let Some((target, delivery)) = self.handle_signal(signal, next_expected) {
            target.post_task(Box::new(move || {
                delivery.gate.deliver(&delivery.callback, delivery.timing);
            }));
        }
    }
}

/// Bridges a platform [`SignalSource`] to an engine callback.
///
/// See the [module documentation](self) for the threading model.
pub struct SignalClient<S: SignalSource + 'static> {
    shared: Arc<Shared<S>>,
}

impl<S: SignalSource + 'static> SignalClient<S> {
    /// Creates a client whose source is built by `make_source`.
    ///
    /// `target` is the runner callbacks are posted to; the client keeps only
    /// a weak reference to it, so the caller must keep the runner alive. `timebase` converts the source's timestamps to
    /// seconds for the refresh-rate estimate.
    ///
    /// The client starts `Active` and disarmed.
    ///
    /// # Errors
    ///
    /// Returns whatever `make_source` fails with.
    pub fn try_new<R, F, E>(
        target: &Arc<R>,
        callback: VsyncCallback,
        config: WaiterConfig,
        timebase: Timebase,
        make_source: F,
    ) -> Result<Self, E>
    where
        R: TaskRunner + 'static,
        F: FnOnce(SignalHandler) -> Result<S, E>,
    {
        let target = Arc::downgrade(target);
        let target: Weak<dyn TaskRunner> = target;
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                source: None,
                lifecycle: Lifecycle::Active,
                armed: false,
                signals_observed: 0,
                callbacks_posted: 0,
                signals_dropped: 0,
                sink: None,
            }),
            gate: Arc::new(DeliveryGate::new()),
            pause_after_vsync: AtomicBool::new(config.pause_after_vsync),
            refresh_rate: AtomicU64::new(RefreshRate::UNKNOWN.to_bits()),
            target,
            callback,
            timebase,
        });

        let receiver = Arc::downgrade(&shared);
        let receiver: Weak<dyn SignalReceiver> = receiver;
        let mut source = make_source(SignalHandler::new(receiver))?;
        if let Some(range) = config.frame_rate_range {
            source.set_frame_rate_range(range);
        }
        shared.inner.lock().source = Some(source);

        Ok(Self { shared })
    }

    /// Infallible form of [`try_new`](Self::try_new).
    pub fn new<R, F>(
        target: &Arc<R>,
        callback: VsyncCallback,
        config: WaiterConfig,
        timebase: Timebase,
        make_source: F,
    ) -> Self
    where
        R: TaskRunner + 'static,
        F: FnOnce(SignalHandler) -> S,
    {
        match Self::try_new(target, callback, config, timebase, |handler| {
            Ok::<_, core::convert::Infallible>(make_source(handler))
        }) {
            Ok(client) => client,
            Err(never) => match never {},
        }
    }

    /// Arms the source for the next signal.
    ///
    /// Idempotent while armed: repeated calls before the signal arrives
    /// coalesce into one delivery. A no-op once invalidated.
    pub fn await_vsync(&self) {
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;
        if inner.lifecycle == Lifecycle::Invalidated {
            log::trace!("await_vsync on invalidated client ignored");
            return;
        }
        if inner.armed {
            return;
        }
        inner.armed = true;
        if let Some(source) = inner.source.as_mut() {
            source.arm();
        }
        tracer(&mut inner.sink).arm(&ArmEvent {
            signals_observed: inner.signals_observed,
            armed: true,
            pause_after_vsync: self.pause_after_vsync(),
        });
    }

    /// Tears the client down.
    ///
    /// After this returns no signal is observed and no posted callback runs,
    /// and the source has been invalidated and dropped. Idempotent, and safe
    /// to call while a signal is being handled on another thread.
    pub fn invalidate(&self) {
        let source = {
            let mut guard = self.shared.inner.lock();
            let inner = &mut *guard;
            if inner.lifecycle == Lifecycle::Invalidated {
                return;
            }
            inner.lifecycle = Lifecycle::Invalidated;
            inner.armed = false;
            tracer(&mut inner.sink).invalidate(&InvalidateEvent {
                signals_observed: inner.signals_observed,
                callbacks_posted: inner.callbacks_posted,
                signals_dropped: inner.signals_dropped,
            });
            inner.source.take()
        };
        // Taken after the client lock is released: a running callback may
        // call back into the client.
        self.shared.gate.close();

        log::debug!("vsync client invalidated");
        if let Some(mut source) = source {
            source.invalidate();
        }
    }

    /// The most recent refresh-rate estimate, or [`RefreshRate::UNKNOWN`]
    /// before the first valid signal.
    #[must_use]
    pub fn refresh_rate(&self) -> RefreshRate {
        RefreshRate::from_bits(self.shared.refresh_rate.load(Ordering::Relaxed))
    }

    /// Sets pause mode. Read on every signal, so it takes effect with the
    /// next one.
    pub fn set_pause_after_vsync(&self, pause: bool) {
        self.shared.pause_after_vsync.store(pause, Ordering::Release);
    }

    /// Returns the current pause mode.
    #[must_use]
    pub fn pause_after_vsync(&self) -> bool {
        self.shared.pause_after_vsync.load(Ordering::Acquire)
    }

    /// Forwards a frame-rate hint to the source. Ignored once invalidated.
    pub fn set_frame_rate_range(&self, range: FrameRateRange) {
        if let Some(source) = self.shared.inner.lock().source.as_mut() {
            source.set_frame_rate_range(range);
        }
    }

    /// Installs (or removes) the trace sink, returning the previous one.
    pub fn set_trace_sink(&self, sink: Option<BoxedTraceSink>) -> Option<BoxedTraceSink> {
        core::mem::replace(&mut self.shared.inner.lock().sink, sink)
    }

    /// Returns `true` while a signal is awaited.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.shared.inner.lock().armed
    }

    /// Returns the lifetime state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.inner.lock().lifecycle
    }

    /// Returns `true` once invalidated.
    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        self.lifecycle() == Lifecycle::Invalidated
    }

    /// Returns the client's counters.
    #[must_use]
    pub fn stats(&self) -> ClientStats {
        let inner = self.shared.inner.lock();
        ClientStats {
            signals_observed: inner.signals_observed,
            callbacks_posted: inner.callbacks_posted,
            signals_dropped: inner.signals_dropped,
            stale_deliveries: self.shared.gate.stale.load(Ordering::Relaxed),
        }
    }

    /// The timebase the source reports in.
    #[must_use]
    pub fn timebase(&self) -> Timebase {
        self.shared.timebase
    }
}

impl<S: SignalSource + 'static> Drop for SignalClient<S> {
    fn drop(&mut self) {
        self.invalidate();
    }
}

impl<S: SignalSource + 'static> fmt::Debug for SignalClient<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SignalClient");
        if let Some(inner) = self.shared.inner.try_lock() {
            s.field("lifecycle", &inner.lifecycle)
                .field("armed", &inner.armed);
        }
        s.field("pause_after_vsync", &self.pause_after_vsync())
            .field("refresh_rate", &self.refresh_rate())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;
    use crate::manual::{ManualDisplay, ManualSignalSource, ManualTaskRunner};

    const FRAME: u64 = 16_666_667;

    struct Harness {
        display: ManualDisplay,
        runner: Arc<ManualTaskRunner>,
        timings: Arc<Mutex<Vec<FrameTiming>>>,
        client: SignalClient<ManualSignalSource>,
    }

    fn harness(config: WaiterConfig) -> Harness {
        let display = ManualDisplay::new();
        let runner = Arc::new(ManualTaskRunner::new());
        let timings = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&timings);
        let client = SignalClient::new(
            &runner,
            Arc::new(move |timing: FrameTiming| sink.lock().push(timing)),
            config,
            Timebase::NANOS,
            |handler| display.source(handler),
        );
        Harness {
            display,
            runner,
            timings,
            client,
        }
    }

    fn frame(n: u64) -> (HostTime, HostTime) {
        (HostTime(n * FRAME), HostTime((n + 1) * FRAME))
    }

    impl Harness {
        fn fire(&self, n: u64) -> bool {
            let (start, target) = frame(n);
            self.display.fire(start, target)
        }

        fn delivered(&self) -> Vec<FrameTiming> {
            self.timings.lock().clone()
        }
    }

    #[test]
    fn one_await_one_callback_in_pause_mode() {
        let h = harness(WaiterConfig::on_demand());
        h.client.await_vsync();
        assert!(h.display.is_armed());

        assert!(h.fire(0));
        // Nothing runs until the target runner gets a turn.
        assert!(h.delivered().is_empty());
        assert_eq!(h.runner.run_pending(), 1);
        assert_eq!(
            h.delivered(),
            vec![FrameTiming::new(HostTime(0), HostTime(FRAME)).unwrap()]
        );

        // Paused after firing: the display stops and no second callback comes.
        assert!(!h.display.is_armed());
        assert!(!h.client.is_armed());
        assert!(!h.fire(1));
        h.runner.run_pending();
        assert_eq!(h.delivered().len(), 1);
    }

    #[test]
    fn signals_racing_a_pause_are_deduplicated() {
        let h = harness(WaiterConfig::on_demand());
        h.client.await_vsync();
        // Hardware fires three times before the pause takes effect.
        for n in 0..3 {
            let (start, target) = frame(n);
            h.display.fire_in_flight(start, target);
        }
        h.runner.run_pending();
        assert_eq!(h.delivered().len(), 1);
        assert_eq!(h.client.stats().signals_dropped, 2);
    }

    #[test]
    fn callbacks_never_exceed_awaits_in_pause_mode() {
        let h = harness(WaiterConfig::on_demand());
        let mut awaits = 0_u64;
        for n in 0..20_u64 {
            if n % 3 != 0 {
                h.client.await_vsync();
                awaits += 1;
            }
            if n % 2 == 0 {
                // Repeated awaits coalesce.
                h.client.await_vsync();
                awaits += 1;
            }
            let (start, target) = frame(n);
            h.display.fire_in_flight(start, target);
            h.runner.run_pending();
            let delivered = h.delivered().len() as u64;
            assert!(delivered <= awaits, "{delivered} callbacks for {awaits} awaits");
            assert!(
                delivered <= h.display.arm_count(),
                "{delivered} callbacks for {} arms",
                h.display.arm_count()
            );
        }
        assert!(h.display.arm_count() < awaits, "repeated awaits were not coalesced");
    }

    #[test]
    fn double_await_coalesces_into_one_arm() {
        let h = harness(WaiterConfig::on_demand());
        h.client.await_vsync();
        h.client.await_vsync();
        h.client.await_vsync();
        assert_eq!(h.display.arm_count(), 1);
        h.fire(0);
        h.runner.run_pending();
        assert_eq!(h.delivered().len(), 1);
    }

    #[test]
    fn continuous_mode_delivers_every_signal() {
        let h = harness(WaiterConfig::continuous());
        h.client.await_vsync();
        for n in 0..3 {
            assert!(h.fire(n));
        }
        assert_eq!(h.runner.run_pending(), 3);

        let delivered = h.delivered();
        assert_eq!(delivered.len(), 3);
        assert!(
            delivered
                .windows(2)
                .all(|w| w[0].frame_start() < w[1].frame_start()),
            "frame_start must increase: {delivered:?}"
        );
        assert!(h.client.is_armed());
        assert_eq!(h.display.disarm_count(), 0);
    }

    #[test]
    fn pause_mode_can_be_toggled_at_runtime() {
        let h = harness(WaiterConfig::continuous());
        h.client.await_vsync();
        h.fire(0);
        h.client.set_pause_after_vsync(true);
        assert!(h.client.pause_after_vsync());
        h.fire(1);
        assert!(!h.fire(2));
        h.runner.run_pending();
        assert_eq!(h.delivered().len(), 2);
    }

    #[test]
    fn invalidate_then_signals_delivers_nothing() {
        let h = harness(WaiterConfig::continuous());
        h.client.await_vsync();
        h.client.invalidate();
        assert!(h.display.is_invalidated());
        assert!(h.client.is_invalidated());

        for n in 0..5 {
            let (start, target) = frame(n);
            h.display.fire_in_flight(start, target);
        }
        h.runner.run_pending();
        assert!(h.delivered().is_empty());

        // Awaiting after teardown is a quiet no-op.
        h.client.await_vsync();
        assert!(!h.client.is_armed());
    }

    #[test]
    fn invalidate_is_idempotent() {
        let h = harness(WaiterConfig::on_demand());
        h.client.invalidate();
        h.client.invalidate();
        h.client.invalidate();
        assert_eq!(h.display.invalidate_count(), 1);
    }

    #[test]
    fn posted_callback_is_discarded_if_invalidated_first() {
        let h = harness(WaiterConfig::on_demand());
        h.client.await_vsync();
        h.fire(0);
        assert_eq!(h.runner.pending(), 1);

        h.client.invalidate();
        assert_eq!(h.runner.run_pending(), 1);
        assert!(h.delivered().is_empty());
        assert_eq!(h.client.stats().stale_deliveries, 1);
    }

    #[test]
    fn dropped_runner_discards_deliveries() {
        let h = harness(WaiterConfig::on_demand());
        let Harness {
            display,
            runner,
            timings,
            client,
        } = h;
        drop(runner);
        client.await_vsync();
        let (start, target) = frame(0);
        assert!(display.fire(start, target));
        assert!(timings.lock().is_empty());
        assert_eq!(client.stats().signals_dropped, 1);
    }

    #[test]
    fn refresh_rate_tracks_each_signal() {
        let h = harness(WaiterConfig::continuous());
        assert_eq!(h.client.refresh_rate(), RefreshRate::UNKNOWN);

        h.client.await_vsync();
        h.display.fire(HostTime(0), HostTime(FRAME));
        assert!((h.client.refresh_rate().hz() - 60.0).abs() < 1e-3);

        // Variable refresh: the panel drops to 8.33 ms.
        h.display.fire(HostTime(FRAME), HostTime(FRAME + 8_333_333));
        assert!((h.client.refresh_rate().hz() - 120.0).abs() < 1e-2);
    }

    #[test]
    fn invalid_timing_is_dropped_and_stays_armed() {
        let h = harness(WaiterConfig::on_demand());
        h.client.await_vsync();
        h.display.fire(HostTime(100), HostTime(100));
        h.runner.run_pending();
        assert!(h.delivered().is_empty());
        assert!(h.client.is_armed());
        assert_eq!(h.client.refresh_rate(), RefreshRate::UNKNOWN);

        h.fire(1);
        h.runner.run_pending();
        assert_eq!(h.delivered().len(), 1);
    }

    #[test]
    fn callback_may_await_again_from_inline_runner() {
        let display = ManualDisplay::new();
        let runner = Arc::new(crate::manual::InlineTaskRunner);
        let count = Arc::new(AtomicU64::new(0));
        let client: Arc<Mutex<Option<SignalClient<ManualSignalSource>>>> =
            Arc::new(Mutex::new(None));

        let c = Arc::clone(&count);
        let again = Arc::clone(&client);
        let made = SignalClient::new(
            &runner,
            Arc::new(move |_: FrameTiming| {
                c.fetch_add(1, Ordering::Relaxed);
                if let Some(client) = again.lock().as_ref() {
                    client.await_vsync();
                }
            }),
            WaiterConfig::on_demand(),
            Timebase::NANOS,
            |handler| display.source(handler),
        );
        made.await_vsync();
        *client.lock() = Some(made);

        display.fire(HostTime(0), HostTime(FRAME));
        display.fire(HostTime(FRAME), HostTime(2 * FRAME));
        assert_eq!(count.load(Ordering::Relaxed), 2);
        assert!(display.is_armed(), "callback re-armed the display");
    }

    #[test]
    fn invalidate_races_signals_from_another_thread() {
        for _ in 0..50 {
            let h = harness(WaiterConfig::continuous());
            h.client.await_vsync();
            let barrier = Arc::new(Barrier::new(2));

            let display = h.display.clone();
            let b = Arc::clone(&barrier);
            let signaller = thread::spawn(move || {
                b.wait();
                for n in 0..200 {
                    let (start, target) = frame(n);
                    display.fire_in_flight(start, target);
                }
            });

            barrier.wait();
            h.client.invalidate();
            let posted_at_invalidate = h.client.stats().callbacks_posted;
            signaller.join().unwrap();

            assert_eq!(
                h.client.stats().callbacks_posted,
                posted_at_invalidate,
                "no signal may be accepted after invalidate returns"
            );
            h.runner.run_pending();
            assert!(h.delivered().is_empty(), "gate closed before any run");
        }
    }

    #[test]
    fn dropping_the_client_releases_the_source() {
        let h = harness(WaiterConfig::on_demand());
        let display = h.display.clone();
        drop(h);
        assert!(display.is_invalidated());
        assert!(!display.is_connected());
        // A late signal into the dead handler is harmless.
        display.fire_in_flight(HostTime(0), HostTime(FRAME));
    }

    #[test]
    fn frame_rate_hint_reaches_the_source() {
        let range = FrameRateRange::up_to(RefreshRate::from_hz(48.0), RefreshRate::from_hz(120.0));
        let h = harness(WaiterConfig::on_demand().with_frame_rate_range(range));
        assert_eq!(h.display.frame_rate_range(), Some(range));

        let fixed = FrameRateRange::fixed(RefreshRate::from_hz(60.0));
        h.client.set_frame_rate_range(fixed);
        assert_eq!(h.display.frame_rate_range(), Some(fixed));
    }

    #[cfg(feature = "trace")]
    #[test]
    fn trace_sink_sees_handling_order() {
        #[derive(Default)]
        struct Log(Vec<&'static str>);

        impl TraceSink for Log {
            fn on_signal(&mut self, _: &SignalEvent) {
                self.0.push("signal");
            }
            fn on_delivery(&mut self, _: &DeliveryEvent) {
                self.0.push("deliver");
            }
            fn on_drop(&mut self, e: &DropEvent) {
                self.0.push(match e.reason {
                    DropReason::NotArmed => "drop:not-armed",
                    DropReason::Invalidated => "drop:invalidated",
                    DropReason::InvalidTiming => "drop:timing",
                    DropReason::TargetGone => "drop:target",
                });
            }
            fn on_arm(&mut self, e: &ArmEvent) {
                self.0.push(if e.armed { "arm" } else { "disarm" });
            }
            fn on_invalidate(&mut self, _: &InvalidateEvent) {
                self.0.push("invalidate");
            }
        }

        let h = harness(WaiterConfig::on_demand());
        let log = Arc::new(Mutex::new(Log::default()));
        h.client.set_trace_sink(Some(Box::new(Arc::clone(&log))));

        h.client.await_vsync();
        h.fire(0);
        let (start, target) = frame(1);
        h.display.fire_in_flight(start, target);
        h.client.invalidate();
        h.display.fire_in_flight(start, target);

        assert_eq!(
            log.lock().0,
            [
                "arm",
                "signal",
                "disarm",
                "deliver",
                "signal",
                "drop:not-armed",
                "invalidate",
                "signal",
                "drop:invalidated",
            ]
        );
    }
}
