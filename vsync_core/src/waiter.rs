// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine-facing traits.

use crate::timing::RefreshRate;

/// What the engine's frame scheduler sees of a vsync waiter.
///
/// The engine calls [`await_vsync`](Self::await_vsync) when it wants to
/// produce a frame; the waiter later invokes the callback it was built with,
/// on the engine's target runner, carrying the refresh's
/// [`FrameTiming`](crate::timing::FrameTiming).
pub trait VsyncWaiter {
    /// Requests one callback for the next display refresh.
    ///
    /// Non-blocking. Calls made while a request is already outstanding
    /// coalesce with it, so one refresh never produces two callbacks. After
    /// teardown this does nothing.
    fn await_vsync(&self);
}

/// Reports the live refresh rate for variable-refresh-rate-aware consumers.
pub trait RefreshRateReporter {
    /// The rate implied by the most recent display signal, or
    /// [`RefreshRate::UNKNOWN`] before the first one.
    fn refresh_rate(&self) -> RefreshRate;
}
