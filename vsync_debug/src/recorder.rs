// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, one tag byte followed by
//! the event's fields. [`decode`] reads them back as an iterator of
//! [`RecordedEvent`]; decoding stops for good at the first unknown tag or
//! truncated record.

use core::iter::FusedIterator;

use vsync_core::time::HostTime;
use vsync_core::trace::{
    ArmEvent, DeliveryEvent, DropEvent, DropReason, InvalidateEvent, SignalEvent, TraceSink,
};

const TAG_SIGNAL: u8 = 1;
const TAG_DELIVERY: u8 = 2;
const TAG_DROP: u8 = 3;
const TAG_ARM: u8 = 4;
const TAG_INVALIDATE: u8 = 5;

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_reason(&mut self, reason: DropReason) {
        self.write_u8(match reason {
            DropReason::Invalidated => 0,
            DropReason::NotArmed => 1,
            DropReason::InvalidTiming => 2,
            DropReason::TargetGone => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_signal(&mut self, e: &SignalEvent) {
        self.write_u8(TAG_SIGNAL);
        self.write_u64(e.signal_index);
        self.write_u64(e.signal.ticks());
        self.write_u64(e.next_expected.ticks());
    }

    fn on_delivery(&mut self, e: &DeliveryEvent) {
        self.write_u8(TAG_DELIVERY);
        self.write_u64(e.signal_index);
        self.write_u64(e.frame_start.ticks());
        self.write_u64(e.frame_target.ticks());
    }

    fn on_drop(&mut self, e: &DropEvent) {
        self.write_u8(TAG_DROP);
        self.write_u64(e.signal_index);
        self.write_u64(e.signal.ticks());
        self.write_reason(e.reason);
    }

    fn on_arm(&mut self, e: &ArmEvent) {
        self.write_u8(TAG_ARM);
        self.write_u64(e.signals_observed);
        self.write_bool(e.armed);
        self.write_bool(e.pause_after_vsync);
    }

    fn on_invalidate(&mut self, e: &InvalidateEvent) {
        self.write_u8(TAG_INVALIDATE);
        self.write_u64(e.signals_observed);
        self.write_u64(e.callbacks_posted);
        self.write_u64(e.signals_dropped);
    }
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`SignalEvent`].
    Signal(SignalEvent),
    /// A [`DeliveryEvent`].
    Delivery(DeliveryEvent),
    /// A [`DropEvent`].
    Drop(DropEvent),
    /// An [`ArmEvent`].
    Arm(ArmEvent),
    /// An [`InvalidateEvent`].
    Invalidate(InvalidateEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|v| v != 0)
    }

    fn read_reason(&mut self) -> Option<DropReason> {
        Some(match self.read_u8()? {
            0 => DropReason::Invalidated,
            1 => DropReason::NotArmed,
            2 => DropReason::InvalidTiming,
            3 => DropReason::TargetGone,
            _ => return None,
        })
    }

    fn decode_signal(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Signal(SignalEvent {
            signal_index: self.read_u64()?,
            signal: self.read_time()?,
            next_expected: self.read_time()?,
        }))
    }

    fn decode_delivery(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Delivery(DeliveryEvent {
            signal_index: self.read_u64()?,
            frame_start: self.read_time()?,
            frame_target: self.read_time()?,
        }))
    }

    fn decode_drop(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Drop(DropEvent {
            signal_index: self.read_u64()?,
            signal: self.read_time()?,
            reason: self.read_reason()?,
        }))
    }

    fn decode_arm(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Arm(ArmEvent {
            signals_observed: self.read_u64()?,
            armed: self.read_bool()?,
            pause_after_vsync: self.read_bool()?,
        }))
    }

    fn decode_invalidate(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Invalidate(InvalidateEvent {
            signals_observed: self.read_u64()?,
            callbacks_posted: self.read_u64()?,
            signals_dropped: self.read_u64()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let event = match self.read_u8() {
            Some(TAG_SIGNAL) => self.decode_signal(),
            Some(TAG_DELIVERY) => self.decode_delivery(),
            Some(TAG_DROP) => self.decode_drop(),
            Some(TAG_ARM) => self.decode_arm(),
            Some(TAG_INVALIDATE) => self.decode_invalidate(),
            Some(_) | None => None,
        };
        if event.is_none() {
            // Never resume mid-record.
            self.pos = self.data.len();
        }
        event
    }
}

impl FusedIterator for DecodeIter<'_> {}
