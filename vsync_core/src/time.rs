// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time for vsync timestamps.
//!
//! Display timers report timestamps in whatever unit the platform clock uses:
//! Mach absolute ticks on Apple platforms, nanoseconds from
//! `CLOCK_MONOTONIC` elsewhere. [`HostTime`] keeps the raw tick value and
//! [`Timebase`] carries the rational ticks → nanoseconds factor, so conversion
//! to seconds (needed for refresh-rate estimation) happens exactly once, at
//! the edge.
//!
//! [`Duration`] uses the same tick units as [`HostTime`]. Conversions go
//! through `u128` intermediates so large tick counts do not overflow.

use core::fmt;
use core::ops::{Add, Sub};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// A point on the platform's monotonic clock, in native ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Converts to nanoseconds using `timebase`.
    #[inline]
    #[must_use]
    pub const fn to_nanos(self, timebase: Timebase) -> u64 {
        timebase.ticks_to_nanos(self.0)
    }

    /// Builds a host time from nanoseconds using `timebase`.
    #[inline]
    #[must_use]
    pub const fn from_nanos(nanos: u64, timebase: Timebase) -> Self {
        Self(timebase.nanos_to_ticks(nanos))
    }

    /// Builds a host time from a floating-point seconds value (as reported
    /// by `CADisplayLink.timestamp`, for example).
    ///
    /// Negative and non-finite inputs clamp to zero.
    #[must_use]
    pub fn from_secs_f64(seconds: f64, timebase: Timebase) -> Self {
        Self(timebase.secs_to_ticks(seconds))
    }

    /// Returns the time elapsed since `earlier`, or [`Duration::ZERO`] if
    /// `earlier` is not actually earlier.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Checked addition of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, duration: Duration) -> Option<Self> {
        match self.0.checked_add(duration.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// Rational conversion factor: `nanoseconds = ticks * numer / denom`.
///
/// Backends hand out the right instance for their clock
/// (`vsync_backend_apple::timebase()`, `vsync_backend_soft::timebase()`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Numerator of the ticks-to-nanoseconds ratio.
    pub numer: u32,
    /// Denominator of the ticks-to-nanoseconds ratio.
    pub denom: u32,
}

impl Timebase {
    /// Ticks are nanoseconds.
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// Creates a timebase.
    ///
    /// # Panics
    ///
    /// Panics if either `numer` or `denom` is zero.
    #[inline]
    #[must_use]
    pub const fn new(numer: u32, denom: u32) -> Self {
        assert!(numer != 0, "timebase numerator must not be zero");
        assert!(denom != 0, "timebase denominator must not be zero");
        Self { numer, denom }
    }

    /// Converts a tick count to nanoseconds.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; narrowing back to u64 is intentional"
    )]
    pub const fn ticks_to_nanos(self, ticks: u64) -> u64 {
        (ticks as u128 * self.numer as u128 / self.denom as u128) as u64
    }

    /// Converts nanoseconds to a tick count.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; narrowing back to u64 is intentional"
    )]
    pub const fn nanos_to_ticks(self, nanos: u64) -> u64 {
        (nanos as u128 * self.denom as u128 / self.numer as u128) as u64
    }

    /// Converts a tick count to seconds.
    #[inline]
    #[must_use]
    pub fn ticks_to_secs(self, ticks: u64) -> f64 {
        ticks as f64 * f64::from(self.numer) / f64::from(self.denom) / NANOS_PER_SECOND
    }

    /// Converts seconds to a tick count. Negative and non-finite inputs
    /// clamp to zero; values past `u64::MAX` saturate.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "input is clamped to [0, u64::MAX] before the cast"
    )]
    pub fn secs_to_ticks(self, seconds: f64) -> u64 {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        let ticks = seconds * NANOS_PER_SECOND * f64::from(self.denom) / f64::from(self.numer);
        if ticks >= u64::MAX as f64 {
            u64::MAX
        } else {
            ticks.round() as u64
        }
    }
}

impl Default for Timebase {
    fn default() -> Self {
        Self::NANOS
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timebase({}/{})", self.numer, self.denom)
    }
}

/// A span of host time, in the same tick units as [`HostTime`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Returns `true` for a zero-length duration.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Creates a duration from nanoseconds.
    #[inline]
    #[must_use]
    pub const fn from_nanos(nanos: u64, timebase: Timebase) -> Self {
        Self(timebase.nanos_to_ticks(nanos))
    }

    /// Creates a duration from floating-point seconds.
    #[must_use]
    pub fn from_secs_f64(seconds: f64, timebase: Timebase) -> Self {
        Self(timebase.secs_to_ticks(seconds))
    }

    /// Converts to nanoseconds.
    #[inline]
    #[must_use]
    pub const fn to_nanos(self, timebase: Timebase) -> u64 {
        timebase.ticks_to_nanos(self.0)
    }

    /// Converts to floating-point seconds.
    #[inline]
    #[must_use]
    pub fn as_secs_f64(self, timebase: Timebase) -> f64 {
        timebase.ticks_to_secs(self.0)
    }

    /// Converts to a [`std::time::Duration`] for sleeping and timeouts.
    #[must_use]
    pub fn to_std(self, timebase: Timebase) -> std::time::Duration {
        std::time::Duration::from_nanos(self.to_nanos(timebase))
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({})", self.0)
    }
}
