// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Maximum refresh rate of a software display.

use vsync_core::backend::RefreshRateProbe;
use vsync_core::timing::RefreshRate;

use crate::timer::RefreshSchedule;

/// Reports the fastest rate of a [`RefreshSchedule`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoftDisplayProbe {
    max: RefreshRate,
}

impl SoftDisplayProbe {
    /// Creates a probe for a display following `schedule`.
    #[must_use]
    pub fn new(schedule: &RefreshSchedule) -> Self {
        Self {
            max: schedule.fastest(),
        }
    }
}

impl RefreshRateProbe for SoftDisplayProbe {
    fn device_max_refresh_rate(&self) -> RefreshRate {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_the_fastest_scheduled_rate() {
        let schedule = RefreshSchedule::variable(&[48.0, 120.0, 60.0]).unwrap();
        let probe = SoftDisplayProbe::new(&schedule);
        assert_eq!(probe.device_max_refresh_rate(), RefreshRate::from_hz(120.0));
    }
}
