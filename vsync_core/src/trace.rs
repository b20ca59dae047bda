// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing hooks for the vsync handoff.
//!
//! A [`SignalClient`](crate::client::SignalClient) reports what it does with
//! each display signal to an optional [`TraceSink`]: every signal observed,
//! every callback posted, every signal discarded (and why), plus arm, disarm,
//! and invalidate transitions. Events are emitted while the client's lock is
//! held, so a sink sees them in handling order.
//!
//! [`Tracer`] wraps the optional sink. With the `trace` feature **off** every
//! `Tracer` method compiles to nothing; with it **on**, each method is one
//! `Option` branch before dispatch.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::time::HostTime;

/// Why a display signal did not produce a callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The client had already been invalidated.
    Invalidated,
    /// The client was not armed (a signal racing a pause).
    NotArmed,
    /// The next-expected time was not after the signal time.
    InvalidTiming,
    /// The target task runner no longer exists.
    TargetGone,
}

/// Emitted for every display signal that reaches the client.
#[derive(Clone, Copy, Debug)]
pub struct SignalEvent {
    /// Zero-based count of signals observed by this client.
    pub signal_index: u64,
    /// When the refresh began.
    pub signal: HostTime,
    /// When the next refresh is due.
    pub next_expected: HostTime,
}

/// Emitted when a callback is posted to the target runner.
#[derive(Clone, Copy, Debug)]
pub struct DeliveryEvent {
    /// Index of the signal being delivered.
    pub signal_index: u64,
    /// `FrameTiming::frame_start` of the delivery.
    pub frame_start: HostTime,
    /// `FrameTiming::frame_target` of the delivery.
    pub frame_target: HostTime,
}

/// Emitted when a signal is discarded.
#[derive(Clone, Copy, Debug)]
pub struct DropEvent {
    /// Index of the discarded signal.
    pub signal_index: u64,
    /// When the discarded refresh began.
    pub signal: HostTime,
    /// Why it was discarded.
    pub reason: DropReason,
}

/// Emitted when the client arms or disarms its source.
#[derive(Clone, Copy, Debug)]
pub struct ArmEvent {
    /// Signals observed before this transition.
    pub signals_observed: u64,
    /// `true` for arm, `false` for disarm.
    pub armed: bool,
    /// Pause mode at the time of the transition.
    pub pause_after_vsync: bool,
}

/// Emitted once, when the client is invalidated.
#[derive(Clone, Copy, Debug)]
pub struct InvalidateEvent {
    /// Total signals observed over the client's life.
    pub signals_observed: u64,
    /// Total callbacks posted.
    pub callbacks_posted: u64,
    /// Total signals discarded before invalidation.
    pub signals_dropped: u64,
}

/// Receives vsync trace events.
///
/// Every method defaults to a no-op; override the ones you need.
pub trait TraceSink {
    /// A display signal reached the client.
    fn on_signal(&mut self, e: &SignalEvent) {
        _ = e;
    }

    /// A callback was posted.
    fn on_delivery(&mut self, e: &DeliveryEvent) {
        _ = e;
    }

    /// A signal was discarded.
    fn on_drop(&mut self, e: &DropEvent) {
        _ = e;
    }

    /// The source was armed or disarmed.
    fn on_arm(&mut self, e: &ArmEvent) {
        _ = e;
    }

    /// The client was invalidated.
    fn on_invalidate(&mut self, e: &InvalidateEvent) {
        _ = e;
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

/// Shares a sink between the client and its owner, so a recorder can be read
/// back while (or after) the client writes to it.
impl<T: TraceSink + ?Sized> TraceSink for Arc<Mutex<T>> {
    fn on_signal(&mut self, e: &SignalEvent) {
        self.lock().on_signal(e);
    }

    fn on_delivery(&mut self, e: &DeliveryEvent) {
        self.lock().on_delivery(e);
    }

    fn on_drop(&mut self, e: &DropEvent) {
        self.lock().on_drop(e);
    }

    fn on_arm(&mut self, e: &ArmEvent) {
        self.lock().on_arm(e);
    }

    fn on_invalidate(&mut self, e: &InvalidateEvent) {
        self.lock().on_invalidate(e);
    }
}

/// Thin wrapper around an optional [`TraceSink`].
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! dispatch {
    ($self:ident, $method:ident, $e:ident) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $self.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to `sink`, if any.
    #[inline]
    #[must_use]
    pub fn new(sink: Option<&'a mut dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::new(None)
    }

    /// Emits a [`SignalEvent`].
    #[inline]
    pub fn signal(&mut self, e: &SignalEvent) {
        dispatch!(self, on_signal, e);
    }

    /// Emits a [`DeliveryEvent`].
    #[inline]
    pub fn delivery(&mut self, e: &DeliveryEvent) {
        dispatch!(self, on_delivery, e);
    }

    /// Emits a [`DropEvent`].
    #[inline]
    pub fn dropped(&mut self, e: &DropEvent) {
        dispatch!(self, on_drop, e);
    }

    /// Emits an [`ArmEvent`].
    #[inline]
    pub fn arm(&mut self, e: &ArmEvent) {
        dispatch!(self, on_arm, e);
    }

    /// Emits an [`InvalidateEvent`].
    #[inline]
    pub fn invalidate(&mut self, e: &InvalidateEvent) {
        dispatch!(self, on_invalidate, e);
    }
}
