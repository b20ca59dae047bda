// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Main screen refresh rate probe.

use objc2::rc::Retained;
use objc2::runtime::{AnyClass, AnyObject};
use objc2::{MainThreadMarker, msg_send, sel};
use vsync_core::backend::RefreshRateProbe;
use vsync_core::timing::RefreshRate;

/// Reads `maximumFramesPerSecond` from the main screen.
///
/// Uses `UIScreen` on iOS and `NSScreen` on macOS 12+. Screens are
/// main-thread objects, so the probe is created with a
/// [`MainThreadMarker`] and cannot leave the main thread.
#[derive(Clone, Copy, Debug)]
pub struct ScreenProbe {
    _mtm: MainThreadMarker,
}

impl ScreenProbe {
    /// Creates a probe for the main screen.
    #[must_use]
    pub fn new(mtm: MainThreadMarker) -> Self {
        Self { _mtm: mtm }
    }
}

impl RefreshRateProbe for ScreenProbe {
    fn device_max_refresh_rate(&self) -> RefreshRate {
        let Some(class) = AnyClass::get(c"UIScreen").or_else(|| AnyClass::get(c"NSScreen"))
        else {
            return RefreshRate::UNKNOWN;
        };
        // SAFETY: `mainScreen` is a class method returning a nullable
        // screen, and we are on the main thread.
        let screen: Option<Retained<AnyObject>> = unsafe { msg_send![class, mainScreen] };
        let Some(screen) = screen else {
            log::debug!("no main screen; refresh rate unknown");
            return RefreshRate::UNKNOWN;
        };
        // SAFETY: `respondsToSelector:` is defined on every NSObject.
        let supported: bool =
            unsafe { msg_send![&*screen, respondsToSelector: sel!(maximumFramesPerSecond)] };
        if !supported {
            return RefreshRate::UNKNOWN;
        }
        // SAFETY: checked above; the property is an NSInteger.
        let fps: isize = unsafe { msg_send![&*screen, maximumFramesPerSecond] };
        rate_from_fps(fps)
    }
}

/// Converts an `NSInteger` frames-per-second value, treating non-positive
/// values as unknown.
fn rate_from_fps(fps: isize) -> RefreshRate {
    if fps <= 0 {
        return RefreshRate::UNKNOWN;
    }
    RefreshRate::from_hz(fps as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_fps_is_a_rate() {
        assert_eq!(rate_from_fps(120), RefreshRate::from_hz(120.0));
    }

    #[test]
    fn non_positive_fps_is_unknown() {
        assert_eq!(rate_from_fps(0), RefreshRate::UNKNOWN);
        assert_eq!(rate_from_fps(-1), RefreshRate::UNKNOWN);
    }
}
