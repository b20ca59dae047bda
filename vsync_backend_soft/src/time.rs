// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host clock for the software backend: `CLOCK_MONOTONIC` in nanoseconds.

use rustix::time::{ClockId, Timespec, clock_gettime};
use vsync_core::time::{HostTime, Timebase};

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Returns the software backend [`Timebase`]: host ticks are nanoseconds.
#[must_use]
pub const fn timebase() -> Timebase {
    Timebase::NANOS
}

/// Returns the current monotonic host time.
#[must_use]
pub fn now() -> HostTime {
    timespec_to_host_time(clock_gettime(ClockId::Monotonic))
}

fn timespec_to_host_time(timespec: Timespec) -> HostTime {
    let seconds = u64::try_from(timespec.tv_sec).unwrap_or(0);
    let nanos = u64::try_from(timespec.tv_nsec)
        .unwrap_or(0)
        .min(999_999_999);

    let ticks = u128::from(seconds)
        .saturating_mul(NANOS_PER_SECOND)
        .saturating_add(u128::from(nanos));
    HostTime(u64::try_from(ticks).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_does_not_go_backwards() {
        let first = now();
        let second = now();
        assert!(second >= first, "monotonic clock went backwards");
    }

    #[test]
    fn timespec_becomes_nanosecond_ticks() {
        let input = Timespec {
            tv_sec: 3,
            tv_nsec: 250_000_000,
        };
        assert_eq!(timespec_to_host_time(input), HostTime(3_250_000_000));
    }

    #[test]
    fn negative_and_huge_timespecs_clamp() {
        let negative = Timespec {
            tv_sec: -1,
            tv_nsec: 5,
        };
        assert_eq!(timespec_to_host_time(negative), HostTime(5));

        let huge = Timespec {
            tv_sec: i64::MAX,
            tv_nsec: 999_999_999,
        };
        assert_eq!(timespec_to_host_time(huge), HostTime(u64::MAX));
    }
}
