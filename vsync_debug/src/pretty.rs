// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.

use std::io::Write;

use vsync_core::time::Timebase;
use vsync_core::trace::{
    ArmEvent, DeliveryEvent, DropEvent, InvalidateEvent, SignalEvent, TraceSink,
};

/// A [`TraceSink`] that writes one line per event.
///
/// Write errors are counted, not propagated: a broken pipe must not disturb
/// the signal path.
#[derive(Debug)]
pub struct PrettyPrintSink<W> {
    out: W,
    timebase: Timebase,
    write_errors: u64,
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink writing to `out`, printing times in milliseconds.
    pub fn new(out: W, timebase: Timebase) -> Self {
        Self {
            out,
            timebase,
            write_errors: 0,
        }
    }

    /// Number of lines that failed to write.
    #[must_use]
    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn ms(&self, ticks: u64) -> f64 {
        self.timebase.ticks_to_secs(ticks) * 1000.0
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        if writeln!(self.out, "{args}").is_err() {
            self.write_errors += 1;
        }
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_signal(&mut self, e: &SignalEvent) {
        let (at, next) = (self.ms(e.signal.ticks()), self.ms(e.next_expected.ticks()));
        self.line(format_args!(
            "[{:>6}] signal    at {at:.3} ms, next {next:.3} ms",
            e.signal_index
        ));
    }

    fn on_delivery(&mut self, e: &DeliveryEvent) {
        let start = self.ms(e.frame_start.ticks());
        let budget = self.ms(e.frame_target.ticks()) - start;
        self.line(format_args!(
            "[{:>6}] deliver   frame {start:.3} ms, budget {budget:.3} ms",
            e.signal_index
        ));
    }

    fn on_drop(&mut self, e: &DropEvent) {
        let at = self.ms(e.signal.ticks());
        self.line(format_args!(
            "[{:>6}] drop      at {at:.3} ms ({:?})",
            e.signal_index, e.reason
        ));
    }

    fn on_arm(&mut self, e: &ArmEvent) {
        self.line(format_args!(
            "[{:>6}] {:<9} pause_after_vsync={}",
            e.signals_observed,
            if e.armed { "arm" } else { "disarm" },
            e.pause_after_vsync
        ));
    }

    fn on_invalidate(&mut self, e: &InvalidateEvent) {
        self.line(format_args!(
            "[{:>6}] invalidate posted={} dropped={}",
            e.signals_observed, e.callbacks_posted, e.signals_dropped
        ));
    }
}
