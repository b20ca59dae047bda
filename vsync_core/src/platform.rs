// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-platform waiter: a [`SignalClient`] behind the engine traits.

use core::fmt;
use std::sync::Arc;

use crate::backend::{SignalHandler, SignalSource};
use crate::client::{SignalClient, VsyncCallback};
use crate::config::WaiterConfig;
use crate::task::TaskRunner;
use crate::time::Timebase;
use crate::timing::{FrameRateRange, RefreshRate};
use crate::waiter::{RefreshRateReporter, VsyncWaiter};

/// A [`VsyncWaiter`] over one platform [`SignalSource`].
///
/// Owns its [`SignalClient`] exclusively. Dropping the waiter invalidates the
/// client before releasing it, so no signal that arrives during or after
/// teardown reaches the engine.
pub struct PlatformVsyncWaiter<S: SignalSource + 'static> {
    client: SignalClient<S>,
}

impl<S: SignalSource + 'static> PlatformVsyncWaiter<S> {
    /// Creates a waiter whose source is built by `make_source`.
    ///
    /// See [`SignalClient::try_new`] for the parameters.
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
        let client = SignalClient::try_new(target, callback, config, timebase, make_source)?;
        Ok(Self { client })
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
        Self {
            client: SignalClient::new(target, callback, config, timebase, make_source),
        }
    }

    /// Sets pause mode (see [`WaiterConfig::pause_after_vsync`]).
    pub fn set_pause_after_vsync(&self, pause: bool) {
        self.client.set_pause_after_vsync(pause);
    }

    /// Forwards a frame-rate hint to the display timer.
    pub fn set_frame_rate_range(&self, range: FrameRateRange) {
        self.client.set_frame_rate_range(range);
    }

    /// The underlying client, for inspection.
    #[must_use]
    pub fn client(&self) -> &SignalClient<S> {
        &self.client
    }
}

impl<S: SignalSource + 'static> VsyncWaiter for PlatformVsyncWaiter<S> {
    fn await_vsync(&self) {
        self.client.await_vsync();
    }
}

impl<S: SignalSource + 'static> RefreshRateReporter for PlatformVsyncWaiter<S> {
    fn refresh_rate(&self) -> RefreshRate {
        self.client.refresh_rate()
    }
}

impl<S: SignalSource + 'static> Drop for PlatformVsyncWaiter<S> {
    fn drop(&mut self) {
        self.client.invalidate();
    }
}

impl<S: SignalSource + 'static> fmt::Debug for PlatformVsyncWaiter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformVsyncWaiter")
            .field("client", &self.client)
            .finish()
    }
}
