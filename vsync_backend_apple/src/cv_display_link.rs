// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `CVDisplayLink` signal source, for macOS releases before
//! `CADisplayLink` was available there.
//!
//! The link calls back on a `CoreVideo` thread. Stopping it is expensive and
//! waits for an in-flight callback, so the link is started on first arm and
//! stays running until invalidated; while disarmed, callbacks return without
//! reporting.

use core::cell::Cell;
use core::ffi::c_void;
use core::pin::Pin;
use core::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dispatch2::DispatchQueue;
use objc2_core_foundation::CFRetained;
use objc2_core_video::{CVDisplayLink as CVDisplayLinkRaw, CVTimeStamp, kCVReturnSuccess};
use vsync_core::backend::{SignalHandler, SignalSource};
use vsync_core::client::VsyncCallback;
use vsync_core::config::WaiterConfig;
use vsync_core::platform::PlatformVsyncWaiter;
use vsync_core::task::TaskRunner;
use vsync_core::time::HostTime;

use crate::{DisplayLinkError, mach_time};

thread_local! {
    static IN_CALLBACK: Cell<bool> = const { Cell::new(false) };
}

struct CallbackState {
    handler: SignalHandler,
    armed: AtomicBool,
}

struct LinkParts {
    raw: CFRetained<CVDisplayLinkRaw>,
    // Must outlive `raw`: the callback holds a pointer to it.
    state: Pin<Box<CallbackState>>,
}

// SAFETY: CVDisplayLink is a CoreFoundation object whose start, stop and
// release are documented thread-safe. `CallbackState` is `Send + Sync`.
unsafe impl Send for LinkParts {}

impl Drop for LinkParts {
    #[expect(
        deprecated,
        reason = "CVDisplayLink API is deprecated by Apple but still functional"
    )]
    fn drop(&mut self) {
        if self.raw.is_running() {
            let ret = self.raw.stop();
            if ret != kCVReturnSuccess {
                log::warn!("CVDisplayLinkStop failed ({ret})");
            }
        }
    }
}

/// A [`SignalSource`] over `CVDisplayLink`, targeting all active displays.
pub struct CvDisplayLinkSource {
    parts: Option<LinkParts>,
}

impl CvDisplayLinkSource {
    /// Creates a stopped display link reporting to `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayLinkError`] if the underlying `CoreVideo` calls fail.
    #[expect(
        deprecated,
        reason = "CVDisplayLink API is deprecated by Apple but still functional"
    )]
    pub fn new(handler: SignalHandler) -> Result<Self, DisplayLinkError> {
        let state = Box::pin(CallbackState {
            handler,
            armed: AtomicBool::new(false),
        });

        let mut link_ptr: *mut CVDisplayLinkRaw = core::ptr::null_mut();
        // SAFETY: link_ptr is a valid out-pointer.
        let ret = unsafe {
            CVDisplayLinkRaw::create_with_active_cg_displays(NonNull::new_unchecked(&mut link_ptr))
        };
        if ret != kCVReturnSuccess {
            return Err(DisplayLinkError::CreateFailed(ret));
        }
        let raw_nn = NonNull::new(link_ptr).ok_or(DisplayLinkError::CreateFailed(ret))?;
        // SAFETY: create_with_active_cg_displays follows the Create Rule,
        // returning a +1 retained reference.
        let raw = unsafe { CFRetained::from_raw(raw_nn) };

        let state_ptr: *const CallbackState = &*state;
        // SAFETY: display_link_callback matches the expected C signature,
        // and state_ptr stays valid until the link is stopped and released.
        let ret = unsafe {
            raw.set_output_callback(Some(display_link_callback), state_ptr as *mut c_void)
        };
        if ret != kCVReturnSuccess {
            return Err(DisplayLinkError::CallbackFailed(ret));
        }

        Ok(Self {
            parts: Some(LinkParts { raw, state }),
        })
    }
}

impl SignalSource for CvDisplayLinkSource {
    #[expect(
        deprecated,
        reason = "CVDisplayLink API is deprecated by Apple but still functional"
    )]
    fn arm(&mut self) {
        let Some(parts) = &self.parts else {
            return;
        };
        parts.state.armed.store(true, Ordering::Release);
        if !parts.raw.is_running() {
            let ret = parts.raw.start();
            if ret != kCVReturnSuccess {
                log::warn!("CVDisplayLinkStart failed ({ret}); no signals will arrive");
            }
        }
    }

    fn disarm(&mut self) {
        if let Some(parts) = &self.parts {
            parts.state.armed.store(false, Ordering::Release);
        }
    }

    fn invalidate(&mut self) {
        let Some(parts) = self.parts.take() else {
            return;
        };
        parts.state.armed.store(false, Ordering::Release);
        if IN_CALLBACK.get() {
            // Stopping from the callback thread would wait on ourselves.
            DispatchQueue::main().exec_async(move || drop(parts));
        } else {
            drop(parts);
        }
    }
}

impl Drop for CvDisplayLinkSource {
    fn drop(&mut self) {
        self.invalidate();
    }
}

impl core::fmt::Debug for CvDisplayLinkSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let armed = self
            .parts
            .as_ref()
            .is_some_and(|parts| parts.state.armed.load(Ordering::Relaxed));
        f.debug_struct("CvDisplayLinkSource")
            .field("armed", &armed)
            .field("invalidated", &self.parts.is_none())
            .finish_non_exhaustive()
    }
}

/// The C callback invoked by `CoreVideo` on its background thread.
///
/// # Safety
///
/// - `user_info` must point to a valid, pinned `CallbackState`.
/// - `in_now` and `in_output_time` must be valid `CVTimeStamp` pointers
///   (guaranteed by `CoreVideo`).
unsafe extern "C-unwind" fn display_link_callback(
    _display_link: NonNull<CVDisplayLinkRaw>,
    in_now: NonNull<CVTimeStamp>,
    in_output_time: NonNull<CVTimeStamp>,
    _flags_in: u64,
    _flags_out: NonNull<u64>,
    user_info: *mut c_void,
) -> i32 {
    // SAFETY: user_info is the pinned CallbackState pointer we set in `new`.
    let state = unsafe { &*(user_info.cast::<CallbackState>()) };
    if !state.armed.load(Ordering::Acquire) {
        return kCVReturnSuccess;
    }

    // SAFETY: CoreVideo passes valid timestamps for the duration of the call.
    let (now_ts, out_ts) = unsafe { (in_now.as_ref(), in_output_time.as_ref()) };

    IN_CALLBACK.set(true);
    state
        .handler
        .on_signal(HostTime(now_ts.hostTime), HostTime(out_ts.hostTime));
    IN_CALLBACK.set(false);

    kCVReturnSuccess
}

/// A [`PlatformVsyncWaiter`] over `CVDisplayLink`.
pub type CvVsyncWaiter = PlatformVsyncWaiter<CvDisplayLinkSource>;

/// Builds a waiter driven by `CVDisplayLink`.
///
/// # Errors
///
/// Returns [`DisplayLinkError`] if the display link cannot be created.
pub fn cv_waiter<R: TaskRunner + 'static>(
    target: &Arc<R>,
    callback: VsyncCallback,
    config: WaiterConfig,
) -> Result<CvVsyncWaiter, DisplayLinkError> {
    PlatformVsyncWaiter::try_new(
        target,
        callback,
        config,
        mach_time::timebase(),
        CvDisplayLinkSource::new,
    )
}
