// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for platform display timers.
//!
//! Platform-specific work lives in *backend* crates. Each backend provides:
//!
//! - **Signal source**: implements [`SignalSource`] over the native display
//!   timer (`CADisplayLink`, `CVDisplayLink`, a software timer thread). The
//!   source is built by a factory that receives a [`SignalHandler`] and calls
//!   [`SignalHandler::on_signal`] from whatever thread the platform fires on.
//!
//! - **Time**: `now() -> HostTime` and `timebase() -> Timebase` free
//!   functions reading the clock the source reports timestamps in.
//!
//! - **Probe**: a [`RefreshRateProbe`] reporting the device's maximum
//!   refresh rate, for instrumentation only.
//!
//! - **Task runner** (optional): a [`TaskRunner`](crate::task::TaskRunner)
//!   for the platform's natural callback context, such as the main dispatch
//!   queue.
//!
//! # Wiring
//!
//! ```rust,ignore
//! let waiter = PlatformVsyncWaiter::try_new(
//!     &runner,
//!     Arc::new(|timing: FrameTiming| engine.begin_frame(timing)),
//!     WaiterConfig::on_demand(),
//!     backend::timebase(),
//!     |handler| backend::DisplayLinkSource::new(handler, mtm),
//! )?;
//! waiter.await_vsync();
//! ```

use core::fmt;
use std::sync::Weak;

use crate::client::SignalReceiver;
use crate::time::HostTime;
use crate::timing::{FrameRateRange, RefreshRate};

/// A native display timer that can be armed, disarmed, and torn down.
///
/// The [`SignalClient`](crate::client::SignalClient) owns its source
/// exclusively and calls these methods while holding its internal lock, with
/// the exception of [`invalidate`](Self::invalidate), which runs after the
/// lock is released so a platform stop call may wait for an in-flight
/// signal.
///
/// Implementations must not call [`SignalHandler::on_signal`] synchronously
/// from inside `arm` or `disarm`.
pub trait SignalSource: Send {
    /// Enables delivery of the next signal.
    ///
    /// Called only when the client is not already armed.
    fn arm(&mut self);

    /// Stops signal delivery until the next [`arm`](Self::arm).
    ///
    /// Signals already in flight may still arrive; the client discards them.
    fn disarm(&mut self);

    /// Releases the native binding. Called exactly once, after which the
    /// source is dropped.
    fn invalidate(&mut self);

    /// Passes a frame-rate hint to variable-refresh-rate hardware.
    ///
    /// The default ignores the hint.
    fn set_frame_rate_range(&mut self, range: FrameRateRange) {
        _ = range;
    }
}

/// Non-owning handle a [`SignalSource`] uses to report display signals.
///
/// Holds only a weak reference to its client, so a source (or a native
/// callback context the platform keeps alive) never extends the client's
/// lifetime. Signals reported after the client is gone are dropped.
#[derive(Clone)]
pub struct SignalHandler {
    receiver: Weak<dyn SignalReceiver>,
}

impl SignalHandler {
    pub(crate) fn new(receiver: Weak<dyn SignalReceiver>) -> Self {
        Self { receiver }
    }

    /// Reports a display signal.
    ///
    /// `signal` is when the refresh began; `next_expected` is when the
    /// following one is due. Both are in the backend's host-time units.
    /// Safe to call from any thread.
    pub fn on_signal(&self, signal: HostTime, next_expected: HostTime) {
        match self.receiver.upgrade() {
            Some(receiver) => receiver.receive(signal, next_expected),
            None => log::trace!("vsync signal after client release; dropped"),
        }
    }

    /// Returns `true` while the client that created this handler is alive.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.receiver.strong_count() > 0
    }
}

impl fmt::Debug for SignalHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalHandler")
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Reports the display's maximum refresh rate.
///
/// This is for tooling and instrumentation only. The value does not reflect
/// dynamic throttling (low-power mode, thermal limits, VRR idling), so frame
/// scheduling must use the live estimate from
/// [`RefreshRateReporter`](crate::waiter::RefreshRateReporter) instead.
pub trait RefreshRateProbe {
    /// The maximum rate the display supports, or
    /// [`RefreshRate::UNKNOWN`] if the platform cannot say.
    fn device_max_refresh_rate(&self) -> RefreshRate;
}
