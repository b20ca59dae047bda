// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paces a simulated engine off the software display timer.
//!
//! The "engine" runs on the main thread: it awaits a vsync, receives the
//! frame timing from the worker runner, pretends to build a frame, and
//! awaits again. The display alternates between 120 Hz and 60 Hz refreshes
//! so the live refresh-rate estimate can be watched changing. Every signal
//! the client handles is recorded and exported as a Chrome trace.
//!
//! ```text
//! RUST_LOG=info cargo run -p soft_pacing -- [trace.json]
//! ```

use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use vsync_backend_soft::{RefreshSchedule, SoftDisplayProbe, WorkerRunner, timebase, waiter};
use vsync_core::backend::RefreshRateProbe;
use vsync_core::config::WaiterConfig;
use vsync_core::timing::FrameTiming;
use vsync_core::waiter::{RefreshRateReporter, VsyncWaiter};
use vsync_debug::recorder::RecorderSink;

const FRAME_COUNT: u32 = 90;
/// Simulated per-frame work.
const BUILD_TIME: Duration = Duration::from_millis(3);

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let trace_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "soft_pacing_trace.json".to_owned());

    let schedule = RefreshSchedule::variable(&[120.0, 120.0, 60.0])?;
    let probe = SoftDisplayProbe::new(&schedule);
    log::info!(
        "display max refresh rate: {:?} (reporting only)",
        probe.device_max_refresh_rate()
    );

    let runner = Arc::new(WorkerRunner::spawn("engine-frames")?);
    let (frames, frames_rx) = mpsc::channel::<FrameTiming>();
    let waiter = waiter(
        &runner,
        Arc::new(move |timing: FrameTiming| {
            if frames.send(timing).is_err() {
                log::warn!("engine stopped listening; frame dropped");
            }
        }),
        WaiterConfig::on_demand(),
        schedule,
    )?;

    let recorder = Arc::new(Mutex::new(RecorderSink::new()));
    waiter
        .client()
        .set_trace_sink(Some(Box::new(Arc::clone(&recorder))));

    for frame in 0..FRAME_COUNT {
        waiter.await_vsync();
        let timing = frames_rx.recv_timeout(Duration::from_secs(1))?;
        log::info!(
            "frame {frame:>3}: budget {:>6.3} ms, live rate {:?}",
            timing.interval().as_secs_f64(timebase()) * 1000.0,
            waiter.refresh_rate(),
        );
        thread::sleep(BUILD_TIME);
    }

    let stats = waiter.client().stats();
    drop(waiter);
    log::info!(
        "{} signals observed, {} callbacks posted, {} dropped",
        stats.signals_observed,
        stats.callbacks_posted,
        stats.signals_dropped
    );

    let bytes = recorder.lock().as_bytes().to_vec();
    let mut out = BufWriter::new(File::create(&trace_path)?);
    vsync_debug::chrome::export(&bytes, timebase(), &mut out)?;
    out.flush()?;
    log::info!("wrote {trace_path}");
    Ok(())
}
