use crate::engine::error::SensorError;
use crate::engine::sensor::frame::{ColorFrame, DepthFrame, Skeleton};

/// A depth device as seen by the pipeline.
///
/// All polling is non-blocking: each call returns the frame that arrived since
/// the previous poll, or `None`. Frames come in the device's native resolution.
pub trait SensorFrameSource: Send + Sync {
    /// Ask the device to begin streaming. `Ok` means the request was accepted;
    /// streaming is confirmed through [`SensorFrameSource::is_capturing`].
    fn start(&mut self) -> Result<(), SensorError>;

    fn stop(&mut self);

    fn is_capturing(&self) -> bool;

    fn poll_depth_frame(&mut self) -> Option<DepthFrame>;

    fn poll_color_frame(&mut self) -> Option<ColorFrame> {
        None
    }

    fn poll_skeletons(&mut self) -> Option<Vec<Skeleton>> {
        None
    }

    /// Short name for log lines.
    fn name(&self) -> &str;
}
