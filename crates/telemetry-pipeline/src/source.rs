//! Transform source seam and the worker-thread driver.
//!
//! Game capture hooks live outside the relay; each one only has to hand
//! over `(transform, dt)` pairs. The driver owns the worker thread that
//! pulls frames, runs the pipeline, and publishes non-stale results at
//! the platform cadence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glam::Mat4;
use tracing::{info, warn};

use crate::pipeline::{FrameOutcome, MotionPipeline};

/// One captured frame from the host simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformFrame {
    /// Rigid-body world transform of the vehicle.
    pub transform: Mat4,
    /// Seconds since the previous frame as measured by the capture hook.
    pub dt: f32,
}

/// Supplier of captured frames, polled by the driver at the platform
/// cadence. Returning `None` means no fresh frame is available yet.
pub trait TransformSource: Send {
    /// Pull the next captured frame, if any.
    fn next_frame(&mut self) -> Option<TransformFrame>;
}

/// Target cadence of the worker loop.
const DRIVE_PERIOD: Duration = Duration::from_millis(10);

/// Worker thread that drives a [`MotionPipeline`] from a
/// [`TransformSource`].
///
/// The worker polls the stop flag between samples; `stop` signals it and
/// joins, handing the pipeline back for inspection or reuse.
#[derive(Debug)]
pub struct PipelineDriver {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<MotionPipeline>>,
}

impl PipelineDriver {
    /// Spawn the worker loop.
    pub fn spawn(
        mut pipeline: MotionPipeline,
        mut source: Box<dyn TransformSource>,
    ) -> PipelineDriver {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let worker = thread::Builder::new()
            .name("telemetry-pipeline".into())
            .spawn(move || {
                info!("pipeline worker running");
                while !stop_flag.load(Ordering::Relaxed) {
                    let started = Instant::now();

                    if let Some(frame) = source.next_frame() {
                        let consumed = pipeline.process_transform(frame.transform, frame.dt);
                        if consumed && pipeline.last_outcome() == FrameOutcome::Derived {
                            pipeline.send_filtered_data();
                        }
                    }

                    let elapsed = started.elapsed();
                    if elapsed < DRIVE_PERIOD {
                        thread::sleep(DRIVE_PERIOD - elapsed);
                    }
                }
                pipeline.stop_sending();
                info!("pipeline worker exited");
                pipeline
            });

        match worker {
            Ok(handle) => PipelineDriver {
                stop,
                worker: Some(handle),
            },
            Err(e) => {
                warn!("failed to spawn pipeline worker: {e}");
                PipelineDriver { stop, worker: None }
            }
        }
    }

    /// Whether the worker thread is still alive.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map(|w| !w.is_finished())
            .unwrap_or(false)
    }

    /// Signal the worker and join it, returning the (reset) pipeline.
    pub fn stop(mut self) -> Option<MotionPipeline> {
        self.stop.store(true, Ordering::Relaxed);
        self.worker.take().and_then(|worker| worker.join().ok())
    }
}

impl Drop for PipelineDriver {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
