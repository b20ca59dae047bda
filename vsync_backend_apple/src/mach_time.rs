// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mach absolute time, the clock both display links report in.

use vsync_core::time::{HostTime, Timebase};

#[repr(C)]
struct MachTimebaseInfo {
    numer: u32,
    denom: u32,
}

// SAFETY: These are stable macOS/iOS kernel ABI functions.
unsafe extern "C" {
    fn mach_absolute_time() -> u64;
    fn mach_timebase_info(info: *mut MachTimebaseInfo) -> i32;
}

/// Returns the Mach absolute time timebase (numer/denom → nanoseconds).
pub(crate) fn timebase() -> Timebase {
    let mut info = MachTimebaseInfo { numer: 0, denom: 0 };
    // SAFETY: passing a valid pointer to a local struct.
    let ret = unsafe { mach_timebase_info(&mut info) };
    if ret != 0 || info.numer == 0 || info.denom == 0 {
        log::warn!("mach_timebase_info failed ({ret}); assuming nanosecond ticks");
        return Timebase::NANOS;
    }
    Timebase::new(info.numer, info.denom)
}

/// Returns the current Mach absolute time as a [`HostTime`].
pub(crate) fn now() -> HostTime {
    // SAFETY: mach_absolute_time is always safe to call.
    HostTime(unsafe { mach_absolute_time() })
}

/// Converts a `CFTimeInterval` (seconds on the Mach clock, as reported by
/// `CACurrentMediaTime()` and `CADisplayLink`) to host ticks.
#[cfg_attr(
    not(feature = "ca-display-link"),
    expect(dead_code, reason = "used only by ca_display_link module")
)]
pub(crate) fn from_media_time(seconds: f64, tb: Timebase) -> HostTime {
    HostTime::from_secs_f64(seconds, tb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timebase_is_valid() {
        let tb = timebase();
        assert!(tb.numer > 0, "timebase numer must be non-zero");
        assert!(tb.denom > 0, "timebase denom must be non-zero");
    }

    #[test]
    fn now_advances() {
        let a = now();
        let b = now();
        assert!(a.ticks() > 0, "mach_absolute_time should be non-zero");
        assert!(b >= a, "mach_absolute_time went backwards");
    }

    #[test]
    fn media_time_converts_at_frame_precision() {
        let tb = timebase();
        let nanos = from_media_time(1.0 / 60.0, tb).to_nanos(tb);
        let error = nanos.abs_diff(16_666_667);
        assert!(error < 100, "1/60 s conversion off by {error} ns");
    }
}
