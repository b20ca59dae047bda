// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame timing handed from the display timer to the engine.
//!
//! - [`FrameTiming`]: the `(frame_start, frame_target)` pair delivered with
//!   every vsync callback.
//! - [`RefreshRate`]: frames per second, used both for the live estimate
//!   derived from each signal and for the static device maximum.
//! - [`FrameRateRange`]: an optional hint for variable-refresh-rate
//!   hardware.
//!
//! # Live estimate versus device maximum
//!
//! The live estimate comes from the interval between a signal and the next
//! expected signal, so on variable-refresh-rate hardware it changes from frame
//! to frame and reflects any throttling the system applies. The device maximum
//! (see [`RefreshRateProbe`](crate::backend::RefreshRateProbe)) is what the
//! panel could do, not what it is doing. Only the former may feed frame
//! scheduling.

use core::fmt;

use thiserror::Error;

use crate::time::{Duration, HostTime, Timebase};

/// Errors from constructing timing values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TimingError {
    /// The target time does not come after the start time.
    #[error("frame target {target:?} is not after frame start {start:?}")]
    NonIncreasing {
        /// The reported signal time.
        start: HostTime,
        /// The reported next-expected signal time.
        target: HostTime,
    },
}

/// Timing for one display refresh, delivered by value to the vsync callback.
///
/// `frame_start` is when the signal fired; `frame_target` is when the next
/// signal is expected, i.e. the deadline for the frame being produced.
/// `frame_target > frame_start` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameTiming {
    frame_start: HostTime,
    frame_target: HostTime,
}

impl FrameTiming {
    /// Creates a timing pair.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::NonIncreasing`] if `frame_target` is not
    /// strictly after `frame_start`.
    pub fn new(frame_start: HostTime, frame_target: HostTime) -> Result<Self, TimingError> {
        if frame_target <= frame_start {
            return Err(TimingError::NonIncreasing {
                start: frame_start,
                target: frame_target,
            });
        }
        Ok(Self {
            frame_start,
            frame_target,
        })
    }

    /// When the display signal fired.
    #[inline]
    #[must_use]
    pub const fn frame_start(&self) -> HostTime {
        self.frame_start
    }

    /// When the next display signal is expected.
    #[inline]
    #[must_use]
    pub const fn frame_target(&self) -> HostTime {
        self.frame_target
    }

    /// The refresh interval this timing describes. Never zero.
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.frame_target - self.frame_start
    }

    /// The refresh rate implied by [`interval`](Self::interval).
    #[must_use]
    pub fn refresh_rate(&self, timebase: Timebase) -> RefreshRate {
        RefreshRate::from_interval(self.interval(), timebase)
    }
}

/// A refresh rate in frames per second.
///
/// [`RefreshRate::UNKNOWN`] (zero) is the sentinel for "no measurement yet";
/// it is a value, not an error.
#[derive(Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct RefreshRate(f64);

impl RefreshRate {
    /// No rate is known yet.
    pub const UNKNOWN: Self = Self(0.0);

    /// Creates a rate from frames per second. Non-finite or non-positive
    /// values become [`UNKNOWN`](Self::UNKNOWN).
    #[must_use]
    pub fn from_hz(hz: f64) -> Self {
        if hz.is_finite() && hz > 0.0 {
            Self(hz)
        } else {
            Self::UNKNOWN
        }
    }

    /// Creates a rate from a refresh interval: `1 / interval` in seconds.
    ///
    /// A zero interval yields [`UNKNOWN`](Self::UNKNOWN).
    #[must_use]
    pub fn from_interval(interval: Duration, timebase: Timebase) -> Self {
        let seconds = interval.as_secs_f64(timebase);
        if seconds > 0.0 {
            Self::from_hz(1.0 / seconds)
        } else {
            Self::UNKNOWN
        }
    }

    /// Frames per second, or `0.0` when unknown.
    #[inline]
    #[must_use]
    pub const fn hz(self) -> f64 {
        self.0
    }

    /// Returns `false` for the [`UNKNOWN`](Self::UNKNOWN) sentinel.
    #[inline]
    #[must_use]
    pub fn is_known(self) -> bool {
        self.0 > 0.0
    }

    /// The refresh interval at this rate, or `None` when unknown.
    #[must_use]
    pub fn interval(self, timebase: Timebase) -> Option<Duration> {
        self.is_known()
            .then(|| Duration::from_secs_f64(1.0 / self.0, timebase))
    }

    pub(crate) fn to_bits(self) -> u64 {
        self.0.to_bits()
    }

    pub(crate) fn from_bits(bits: u64) -> Self {
        Self(f64::from_bits(bits))
    }
}

impl fmt::Debug for RefreshRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "RefreshRate({:.3} Hz)", self.0)
        } else {
            f.write_str("RefreshRate(unknown)")
        }
    }
}

/// Preferred frame-rate range for variable-refresh-rate displays.
///
/// This is a hint passed down to the native timer (e.g. `CADisplayLink`'s
/// `preferredFrameRateRange`). Sources that cannot honor it ignore it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRateRange {
    /// Lowest acceptable rate.
    pub minimum: RefreshRate,
    /// Highest acceptable rate.
    pub maximum: RefreshRate,
    /// Rate the system should aim for.
    pub preferred: RefreshRate,
}

impl FrameRateRange {
    /// A range pinned to a single rate.
    #[must_use]
    pub fn fixed(rate: RefreshRate) -> Self {
        Self {
            minimum: rate,
            maximum: rate,
            preferred: rate,
        }
    }

    /// Allows anything from `minimum` to `maximum`, preferring the maximum.
    #[must_use]
    pub fn up_to(minimum: RefreshRate, maximum: RefreshRate) -> Self {
        Self {
            minimum,
            maximum,
            preferred: maximum,
        }
    }

    /// Clamps `rate` into `[minimum, maximum]`. Unknown bounds are open.
    #[must_use]
    pub fn clamp(&self, rate: RefreshRate) -> RefreshRate {
        let mut hz = rate.hz();
        if self.maximum.is_known() {
            hz = hz.min(self.maximum.hz());
        }
        if self.minimum.is_known() {
            hz = hz.max(self.minimum.hz());
        }
        RefreshRate::from_hz(hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_timing_rejects_non_increasing_pairs() {
        assert_eq!(
            FrameTiming::new(HostTime(10), HostTime(10)),
            Err(TimingError::NonIncreasing {
                start: HostTime(10),
                target: HostTime(10),
            })
        );
        assert!(FrameTiming::new(HostTime(10), HostTime(9)).is_err());

        let timing = FrameTiming::new(HostTime(10), HostTime(26)).unwrap();
        assert_eq!(timing.frame_start(), HostTime(10));
        assert_eq!(timing.frame_target(), HostTime(26));
        assert_eq!(timing.interval(), Duration(16));
    }

    #[test]
    fn sixty_hz_interval_yields_sixty_hz() {
        let tb = Timebase::NANOS;
        let timing = FrameTiming::new(HostTime(0), HostTime(16_666_667)).unwrap();
        let rate = timing.refresh_rate(tb);
        assert!((rate.hz() - 60.0).abs() < 1e-3, "got {rate:?}");
    }

    #[test]
    fn promotion_interval_is_not_rounded() {
        // 59.94 Hz must stay 59.94, not snap to 60.
        let tb = Timebase::NANOS;
        let rate = RefreshRate::from_interval(Duration::from_secs_f64(1.0 / 59.94, tb), tb);
        assert!((rate.hz() - 59.94).abs() < 1e-3, "got {rate:?}");
    }

    #[test]
    fn unknown_sentinel_behaviour() {
        assert!(!RefreshRate::UNKNOWN.is_known());
        assert_eq!(RefreshRate::default(), RefreshRate::UNKNOWN);
        assert_eq!(RefreshRate::from_hz(-3.0), RefreshRate::UNKNOWN);
        assert_eq!(RefreshRate::from_hz(f64::NAN), RefreshRate::UNKNOWN);
        assert_eq!(
            RefreshRate::from_interval(Duration::ZERO, Timebase::NANOS),
            RefreshRate::UNKNOWN
        );
        assert_eq!(RefreshRate::UNKNOWN.interval(Timebase::NANOS), None);
    }

    #[test]
    fn bits_round_trip_preserves_rate() {
        let rate = RefreshRate::from_hz(119.88);
        assert_eq!(RefreshRate::from_bits(rate.to_bits()), rate);
    }

    #[test]
    fn frame_rate_range_clamps() {
        let range = FrameRateRange::up_to(RefreshRate::from_hz(30.0), RefreshRate::from_hz(120.0));
        assert_eq!(range.preferred, RefreshRate::from_hz(120.0));
        assert_eq!(
            range.clamp(RefreshRate::from_hz(240.0)),
            RefreshRate::from_hz(120.0)
        );
        assert_eq!(
            range.clamp(RefreshRate::from_hz(10.0)),
            RefreshRate::from_hz(30.0)
        );
        let fixed = FrameRateRange::fixed(RefreshRate::from_hz(60.0));
        assert_eq!(fixed.clamp(RefreshRate::from_hz(90.0)).hz(), 60.0);
    }
}
