// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction-time configuration for waiters.

use crate::timing::FrameRateRange;

/// Configuration for a [`SignalClient`](crate::client::SignalClient) and the
/// [`PlatformVsyncWaiter`](crate::platform::PlatformVsyncWaiter) wrapping it.
///
/// Both fields can also be changed after construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaiterConfig {
    /// Disarm the display timer after each delivered signal, so every
    /// callback needs its own `await_vsync()`. When `false`, every signal is
    /// delivered until the waiter is torn down.
    pub pause_after_vsync: bool,
    /// Frame-rate hint applied to the source at construction.
    pub frame_rate_range: Option<FrameRateRange>,
}

impl WaiterConfig {
    /// One callback per `await_vsync()`: the usual animation-driven setup.
    #[must_use]
    pub const fn on_demand() -> Self {
        Self {
            pause_after_vsync: true,
            frame_rate_range: None,
        }
    }

    /// A callback on every display signal once armed, for tight render loops
    /// and continuous instrumentation.
    #[must_use]
    pub const fn continuous() -> Self {
        Self {
            pause_after_vsync: false,
            frame_rate_range: None,
        }
    }

    /// Returns this configuration with a frame-rate hint.
    #[must_use]
    pub const fn with_frame_rate_range(mut self, range: FrameRateRange) -> Self {
        self.frame_rate_range = Some(range);
        self
    }
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self::on_demand()
    }
}
