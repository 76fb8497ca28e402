use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use log::{debug, warn};
use woundscale_calib::{CalibrationDetector, CalibrationResult};
use woundscale_image::RasterImage;
use woundscale_imgproc::resize::resize_nearest;

use crate::config::PreviewConfig;
use crate::errors::PipelineError;

/// A source of live camera frames.
///
/// `None` means no new frame is available yet. Any `FnMut() -> Option<RasterImage>`
/// closure is a frame source.
pub trait FrameSource: Send + 'static {
    /// Returns the latest frame.
    fn grab(&mut self) -> Option<RasterImage>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Option<RasterImage> + Send + 'static,
{
    fn grab(&mut self) -> Option<RasterImage> {
        self()
    }
}

/// Live calibration feedback while the camera view is open.
///
/// A background thread polls the frame source on a fixed cadence, detects the marker on
/// a downsampled copy of each frame and hands the result, mapped back to full
/// resolution, to a callback. The loop owns its detector and shares no state with the
/// assessment pipeline.
pub struct CalibrationPreview {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CalibrationPreview {
    /// Starts the preview loop.
    ///
    /// # Arguments
    ///
    /// * `source` - The camera frames.
    /// * `detector` - The calibration detector, owned by the loop.
    /// * `config` - Polling interval and downsampling factor.
    /// * `on_result` - Receives the calibration of every processed frame.
    pub fn start<S, C>(
        mut source: S,
        detector: CalibrationDetector,
        config: PreviewConfig,
        mut on_result: C,
    ) -> Result<Self, PipelineError>
    where
        S: FrameSource,
        C: FnMut(CalibrationResult) + Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let factor = config.downsample_factor.max(1);
        let interval = config.interval();

        let handle = std::thread::Builder::new()
            .name("calibration-preview".to_string())
            .spawn({
                let cancel = cancel.clone();
                move || {
                    while !cancel.load(Ordering::SeqCst) {
                        let tick = Instant::now();

                        if let Some(frame) = source.grab() {
                            match preview_frame(&detector, &frame, factor) {
                                Ok(result) => on_result(result),
                                Err(e) => warn!("preview frame skipped: {e}"),
                            }
                        }

                        let elapsed = tick.elapsed();
                        debug!("preview poll took {:?}", elapsed);
                        std::thread::sleep(interval.saturating_sub(elapsed));
                    }
                }
            })?;

        Ok(Self {
            cancel,
            handle: Some(handle),
        })
    }

    /// A token that stops the loop when set, e.g. from a signal handler.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Whether the loop is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the loop and waits for the current poll to finish.
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("calibration preview thread panicked");
            }
        }
    }
}

impl Drop for CalibrationPreview {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Detects the marker on a downsampled frame and maps the result to full resolution.
pub fn preview_frame(
    detector: &CalibrationDetector,
    frame: &RasterImage,
    factor: usize,
) -> Result<CalibrationResult, PipelineError> {
    if factor <= 1 {
        return Ok(detector.detect(frame)?);
    }
    let small = resize_nearest(frame, factor)?;
    let result = detector.detect(&small)?;
    Ok(result.rescaled(factor as f64))
}
