// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Each delivered frame becomes a complete (`X`) slice from `frame_start` to
//! `frame_target`, so the cadence of the display is visible at a glance.
//! Signals and drops are instants; arm state is a counter track.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};
use vsync_core::time::Timebase;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
/// Arm and invalidate events carry no time of their own and are placed at
/// the most recent signal.
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_ts = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Signal(e) => {
                last_ts = ticks_to_us(e.signal.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "Signal",
                    "cat": "Display",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "signal_index": e.signal_index,
                        "next_expected_us": ticks_to_us(e.next_expected.ticks(), timebase),
                    }
                }));
            }
            RecordedEvent::Delivery(e) => {
                let start = ticks_to_us(e.frame_start.ticks(), timebase);
                let target = ticks_to_us(e.frame_target.ticks(), timebase);
                let refresh_hz = if target > start {
                    1_000_000.0 / (target - start)
                } else {
                    0.0
                };
                events.push(json!({
                    "ph": "X",
                    "name": "Frame",
                    "cat": "Delivery",
                    "ts": start,
                    "dur": target - start,
                    "pid": 0,
                    "tid": 1,
                    "args": {
                        "signal_index": e.signal_index,
                        "refresh_hz": refresh_hz,
                    }
                }));
            }
            RecordedEvent::Drop(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Dropped",
                    "cat": "Display",
                    "ts": ticks_to_us(e.signal.ticks(), timebase),
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "signal_index": e.signal_index,
                        "reason": format!("{:?}", e.reason),
                    }
                }));
            }
            RecordedEvent::Arm(e) => {
                events.push(json!({
                    "ph": "C",
                    "name": "Armed",
                    "cat": "Client",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "armed": u8::from(e.armed),
                    }
                }));
            }
            RecordedEvent::Invalidate(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Invalidate",
                    "cat": "Client",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "signals_observed": e.signals_observed,
                        "callbacks_posted": e.callbacks_posted,
                        "signals_dropped": e.signals_dropped,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(ticks) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use vsync_core::time::HostTime;
    use vsync_core::trace::{
        ArmEvent, DeliveryEvent, DropEvent, DropReason, InvalidateEvent, SignalEvent, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_arm(&ArmEvent {
            signals_observed: 0,
            armed: true,
            pause_after_vsync: true,
        });
        rec.on_signal(&SignalEvent {
            signal_index: 0,
            signal: HostTime(1_000_000),
            next_expected: HostTime(17_666_667),
        });
        rec.on_delivery(&DeliveryEvent {
            signal_index: 0,
            frame_start: HostTime(1_000_000),
            frame_target: HostTime(17_666_667),
        });
        rec.on_drop(&DropEvent {
            signal_index: 1,
            signal: HostTime(17_666_667),
            reason: DropReason::NotArmed,
        });
        rec.on_invalidate(&InvalidateEvent {
            signals_observed: 2,
            callbacks_posted: 1,
            signals_dropped: 1,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 5);

        assert_eq!(parsed[0]["ph"], "C");
        assert_eq!(parsed[0]["args"]["armed"], 1);

        assert_eq!(parsed[1]["name"], "Signal");
        assert_eq!(parsed[1]["ts"], 1000.0);

        // The delivery spans one refresh interval.
        assert_eq!(parsed[2]["ph"], "X");
        assert_eq!(parsed[2]["ts"], 1000.0);
        let dur = parsed[2]["dur"].as_f64().unwrap();
        assert!((dur - 16_666.667).abs() < 1e-6, "dur = {dur}");

        assert_eq!(parsed[3]["args"]["reason"], "NotArmed");

        // Placed at the last signal seen.
        assert_eq!(parsed[4]["name"], "Invalidate");
        assert_eq!(parsed[4]["ts"], 1000.0);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
