//! Capability traits for the media and inference backends.
//!
//! The pipeline only ever talks to these traits. Concrete adapters
//! (FFmpeg decode/encode, ONNX inference) live in their own crates and
//! are injected when the pipeline is constructed, so tests can swap in
//! scripted implementations without touching any native library.

use std::path::Path;

use video_detect_common::{Detection, Frame, Result, VideoMetadata};

/// Runs object detection over an ordered batch of decoded frames.
///
/// Implementations must be stateless across calls: the result for a
/// batch depends only on the frames in that batch. The returned vector
/// must contain exactly one entry per input frame, in input order, with
/// an empty vector for frames without detections.
pub trait Detector: Send + Sync {
    fn detect_batch(&self, frames: &[Frame]) -> Result<Vec<Vec<Detection>>>;
}

/// An open video yielding decoded RGB frames in presentation order.
pub trait FrameStream: Send {
    /// Stream-level properties read from the container headers.
    fn metadata(&self) -> &VideoMetadata;

    /// Pulls the next decoded frame. Returns `None` at end of stream.
    /// After an `Err` the stream is exhausted and must not be polled again.
    fn next_frame(&mut self) -> Option<Result<Frame>>;
}

/// Opens a local video file for decoding.
pub trait FrameSource: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameStream>>;
}

/// An in-progress encoded video accepting frames in order.
pub trait FrameWriter: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flushes the encoder and finalizes the container. Must be called
    /// exactly once; the output file is not valid until it returns.
    fn finish(&mut self) -> Result<()>;
}

/// Creates encoded video files matching the metadata of a source video.
pub trait FrameSink: Send + Sync {
    fn create(&self, path: &Path, metadata: &VideoMetadata) -> Result<Box<dyn FrameWriter>>;
}

/// Adapts a [`FrameStream`] to an iterator of frame results.
pub struct FrameStreamIter {
    stream: Box<dyn FrameStream>,
}

impl FrameStreamIter {
    pub fn new(stream: Box<dyn FrameStream>) -> Self {
        Self { stream }
    }
}

impl Iterator for FrameStreamIter {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stream.next_frame()
    }
}
