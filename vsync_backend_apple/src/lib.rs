// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Apple backend for `vsync_core`.
//!
//! Provides a [`SignalSource`](vsync_core::backend::SignalSource) over
//! `CADisplayLink` (default), or over the legacy `CVDisplayLink` with the
//! `cv-display-link` feature, plus [`MainQueueRunner`] for posting frame
//! callbacks to the main dispatch queue and [`ScreenProbe`] for the main
//! screen's maximum refresh rate.
//!
//! Both display links report times on the Mach absolute clock; use
//! [`timebase`] to convert.

#![expect(unsafe_code, reason = "Apple backend requires extensive Objective-C FFI")]

#[cfg(feature = "ca-display-link")]
mod ca_display_link;
#[cfg(feature = "cv-display-link")]
mod cv_display_link;
mod dispatch;
mod mach_time;
mod probe;

use vsync_core::time::{HostTime, Timebase};

#[cfg(feature = "ca-display-link")]
pub use ca_display_link::{AppleVsyncWaiter, DisplayLinkSource, waiter};
#[cfg(feature = "cv-display-link")]
pub use cv_display_link::{CvDisplayLinkSource, CvVsyncWaiter, cv_waiter};
pub use dispatch::MainQueueRunner;
pub use probe::ScreenProbe;

/// Errors from creating a display link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DisplayLinkError {
    /// `CVDisplayLinkCreateWithActiveCGDisplays` failed with this `CVReturn`.
    #[error("CVDisplayLink creation failed (CVReturn {0})")]
    CreateFailed(i32),
    /// `CVDisplayLinkSetOutputCallback` failed with this `CVReturn`.
    #[error("CVDisplayLink output callback setup failed (CVReturn {0})")]
    CallbackFailed(i32),
}

/// Returns the current host time (Mach absolute time).
#[must_use]
pub fn now() -> HostTime {
    mach_time::now()
}

/// Returns the Mach absolute time timebase for converting ticks to
/// nanoseconds.
#[must_use]
pub fn timebase() -> Timebase {
    mach_time::timebase()
}
