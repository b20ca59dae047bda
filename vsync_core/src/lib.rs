// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for turning display refresh signals into engine frame
//! callbacks.
//!
//! A rendering engine asks for a frame with "call me at the next refresh".
//! `vsync_core` owns the platform-independent half of that request: it arms a
//! native display timer on demand, filters and timestamps the signals the
//! timer reports, and posts one callback per request onto a task runner the
//! engine chooses.
//!
//! # Architecture
//!
//! ```text
//!   Backend (display timer)
//!       │  SignalHandler::on_signal(signal, next_expected)
//!       ▼
//!   SignalClient ──► FrameTiming ──► TaskRunner::post_task
//!       ▲                                    │
//!       │ arm / disarm / invalidate          ▼
//!   SignalSource                      engine callback
//!
//!   PlatformVsyncWaiter = VsyncWaiter + RefreshRateReporter over a SignalClient
//! ```
//!
//! **[`client`]**: The state machine. Pause mode, coalescing of repeated
//! awaits, the live refresh-rate estimate, and one-way invalidation.
//!
//! **[`platform`]**: [`PlatformVsyncWaiter`](platform::PlatformVsyncWaiter),
//! the engine-facing wrapper that tears its client down on drop.
//!
//! **[`waiter`]**: The [`VsyncWaiter`](waiter::VsyncWaiter) and
//! [`RefreshRateReporter`](waiter::RefreshRateReporter) traits.
//!
//! **[`backend`]**: What a platform backend implements:
//! [`SignalSource`](backend::SignalSource) and
//! [`RefreshRateProbe`](backend::RefreshRateProbe).
//!
//! **[`timing`]**: [`FrameTiming`](timing::FrameTiming),
//! [`RefreshRate`](timing::RefreshRate) and frame-rate hints.
//!
//! **[`time`]**: Host-clock ticks and the timebase that converts them.
//!
//! **[`task`]**: The [`TaskRunner`](task::TaskRunner) capability.
//!
//! **[`manual`]**: Hand-driven display and runner for headless use and
//! tests.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) hooks for the signal
//! handoff, with a [`Tracer`](trace::Tracer) wrapper that compiles away
//! without the `trace` feature.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod backend;
pub mod client;
pub mod config;
pub mod manual;
pub mod platform;
pub mod task;
pub mod time;
pub mod timing;
pub mod trace;
pub mod waiter;
