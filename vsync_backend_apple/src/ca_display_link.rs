// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `CADisplayLink` signal source.
//!
//! Available on macOS 14+ and iOS 15+. The link fires on the main run loop,
//! reporting `timestamp` (the refresh that just began) and `targetTimestamp`
//! (the next one) to the [`SignalHandler`].
//!
//! A `CADisplayLink` may only be touched on the main thread, while the
//! [`SignalClient`](vsync_core::client::SignalClient) may arm or disarm from
//! any thread. The source therefore records the state it wants and applies
//! it on the main thread: directly when already there, otherwise through the
//! main dispatch queue. Each application reads the latest wanted state, so
//! the order in which queued applications run does not matter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dispatch2::{DispatchQueue, MainThreadBound};
use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2::{DefinedClass, MainThreadMarker, MainThreadOnly, define_class, msg_send, sel};
use objc2_foundation::{NSObject, NSObjectProtocol, NSRunLoop, NSRunLoopCommonModes};
use objc2_quartz_core::{CADisplayLink as CADisplayLinkRaw, CAFrameRateRange};
use parking_lot::Mutex;
use vsync_core::backend::{SignalHandler, SignalSource};
use vsync_core::client::VsyncCallback;
use vsync_core::config::WaiterConfig;
use vsync_core::platform::PlatformVsyncWaiter;
use vsync_core::task::TaskRunner;
use vsync_core::time::Timebase;
use vsync_core::timing::FrameRateRange;

use crate::mach_time;

struct DisplayLinkTargetIvars {
    handler: SignalHandler,
    timebase: Timebase,
}

define_class! {
    #[unsafe(super(NSObject))]
    #[thread_kind = MainThreadOnly]
    #[name = "VsyncDisplayLinkTarget"]
    #[ivars = DisplayLinkTargetIvars]
    struct DisplayLinkTarget;

    unsafe impl NSObjectProtocol for DisplayLinkTarget {}

    impl DisplayLinkTarget {
        #[unsafe(method(tick:))]
        fn tick(&self, sender: &AnyObject) {
            self.handle_tick(sender);
        }
    }
}

impl DisplayLinkTarget {
    fn new(handler: SignalHandler, mtm: MainThreadMarker) -> Retained<Self> {
        let this = mtm.alloc::<Self>().set_ivars(DisplayLinkTargetIvars {
            handler,
            timebase: mach_time::timebase(),
        });
        // SAFETY: NSObject's init is always safe.
        unsafe { msg_send![super(this), init] }
    }

    fn handle_tick(&self, sender: &AnyObject) {
        let ivars = self.ivars();
        // SAFETY: `sender` is the CADisplayLink that invoked this selector.
        let timestamp: f64 = unsafe { msg_send![sender, timestamp] };
        // SAFETY: as above.
        let target_timestamp: f64 = unsafe { msg_send![sender, targetTimestamp] };

        ivars.handler.on_signal(
            mach_time::from_media_time(timestamp, ivars.timebase),
            mach_time::from_media_time(target_timestamp, ivars.timebase),
        );
    }
}

/// Main-thread-only half of the source.
struct LinkParts {
    raw: Retained<CADisplayLinkRaw>,
    // The link retains its target too; this keeps it alive past invalidate.
    _target: Retained<DisplayLinkTarget>,
}

/// State the source wants the link in, applied on the main thread.
#[derive(Default)]
struct Wanted {
    running: AtomicBool,
    invalidated: AtomicBool,
    range: Mutex<Option<FrameRateRange>>,
}

/// A [`SignalSource`] over `CADisplayLink`.
///
/// Must be created on the main thread. The link starts paused and is added
/// to the main run loop in the common modes, so it keeps firing during
/// scrolling and live resize.
pub struct DisplayLinkSource {
    link: Option<Arc<MainThreadBound<LinkParts>>>,
    wanted: Arc<Wanted>,
}

impl DisplayLinkSource {
    /// Creates a paused display link reporting to `handler`.
    pub fn new(handler: SignalHandler, mtm: MainThreadMarker) -> Self {
        let target = DisplayLinkTarget::new(handler, mtm);

        // SAFETY: `target` is a valid NSObject and `sel!(tick:)` matches the
        // method defined in define_class! above.
        let raw = unsafe {
            CADisplayLinkRaw::displayLinkWithTarget_selector(
                &*((&*target) as *const DisplayLinkTarget as *const AnyObject),
                sel!(tick:),
            )
        };
        raw.setPaused(true);
        // SAFETY: the main run loop is always valid and
        // `NSRunLoopCommonModes` is a framework constant.
        unsafe {
            raw.addToRunLoop_forMode(&NSRunLoop::mainRunLoop(), NSRunLoopCommonModes);
        }

        let parts = LinkParts {
            raw,
            _target: target,
        };
        Self {
            link: Some(Arc::new(MainThreadBound::new(parts, mtm))),
            wanted: Arc::default(),
        }
    }

    fn sync(&self) {
        if let Some(link) = &self.link {
            sync(Arc::clone(link), Arc::clone(&self.wanted));
        }
    }
}

/// Applies `wanted` to the link on the main thread.
///
/// Both arguments are dropped on the main thread too, so the final release
/// of the link never has to wait on it.
fn sync(link: Arc<MainThreadBound<LinkParts>>, wanted: Arc<Wanted>) {
    if let Some(mtm) = MainThreadMarker::new() {
        apply(link.get(mtm), &wanted);
        return;
    }
    DispatchQueue::main().exec_async(move || match MainThreadMarker::new() {
        Some(mtm) => apply(link.get(mtm), &wanted),
        None => log::error!("main dispatch queue ran off the main thread"),
    });
}

fn apply(parts: &LinkParts, wanted: &Wanted) {
    if wanted.invalidated.load(Ordering::Acquire) {
        parts.raw.invalidate();
        return;
    }
    if let Some(range) = wanted.range.lock().take() {
        set_preferred_range(&parts.raw, range);
    }
    parts.raw.setPaused(!wanted.running.load(Ordering::Acquire));
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "CAFrameRateRange uses single-precision rates"
)]
fn set_preferred_range(raw: &CADisplayLinkRaw, range: FrameRateRange) {
    // SAFETY: `respondsToSelector:` is defined on every NSObject.
    let supported: bool =
        unsafe { msg_send![raw, respondsToSelector: sel!(setPreferredFrameRateRange:)] };
    if !supported {
        log::debug!("preferredFrameRateRange unavailable; hint ignored");
        return;
    }
    let native = CAFrameRateRange {
        minimum: range.minimum.hz() as f32,
        maximum: range.maximum.hz() as f32,
        preferred: range.preferred.hz() as f32,
    };
    // SAFETY: checked above; the argument is a plain C struct.
    let () = unsafe { msg_send![raw, setPreferredFrameRateRange: native] };
}

impl SignalSource for DisplayLinkSource {
    fn arm(&mut self) {
        self.wanted.running.store(true, Ordering::Release);
        self.sync();
    }

    fn disarm(&mut self) {
        self.wanted.running.store(false, Ordering::Release);
        self.sync();
    }

    fn invalidate(&mut self) {
        self.wanted.invalidated.store(true, Ordering::Release);
        if let Some(link) = self.link.take() {
            sync(link, Arc::clone(&self.wanted));
        }
    }

    fn set_frame_rate_range(&mut self, range: FrameRateRange) {
        *self.wanted.range.lock() = Some(range);
        self.sync();
    }
}

impl Drop for DisplayLinkSource {
    fn drop(&mut self) {
        // A link left on the run loop would keep firing forever.
        self.invalidate();
    }
}

impl core::fmt::Debug for DisplayLinkSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DisplayLinkSource")
            .field("running", &self.wanted.running.load(Ordering::Relaxed))
            .field("invalidated", &self.wanted.invalidated.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// A [`PlatformVsyncWaiter`] over `CADisplayLink`.
pub type AppleVsyncWaiter = PlatformVsyncWaiter<DisplayLinkSource>;

/// Builds a waiter driven by the main screen's `CADisplayLink`.
///
/// Callbacks are posted to `target`, typically a
/// [`MainQueueRunner`](crate::MainQueueRunner). The waiter holds it weakly.
pub fn waiter<R: TaskRunner + 'static>(
    target: &Arc<R>,
    callback: VsyncCallback,
    config: WaiterConfig,
    mtm: MainThreadMarker,
) -> AppleVsyncWaiter {
    PlatformVsyncWaiter::new(target, callback, config, mach_time::timebase(), |handler| {
        DisplayLinkSource::new(handler, mtm)
    })
}
