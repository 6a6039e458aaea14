//! FFmpeg-backed frame source.
//!
//! Opens a local video file and yields its frames as RGB24 one at a
//! time, so the pipeline never holds more than a batch of decoded
//! frames in memory. Uses multi-threaded software decoding (libavcodec)
//! with a software scaler for the pixel format conversion.

use ffmpeg_next as ffmpeg;
use std::path::Path;

use video_detect_common::{Frame, FrameRate, PipelineError, Result, VideoMetadata};
use video_detect_core::{FrameSource, FrameStream};

/// Initialize `FFmpeg` library
fn init_ffmpeg() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        ffmpeg::init().expect("Failed to initialize FFmpeg");
    });
}

/// [`FrameSource`] producing [`VideoStream`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegFrameSource;

impl FrameSource for FfmpegFrameSource {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameStream>> {
        Ok(Box::new(VideoStream::open(path)?))
    }
}

/// An open video file being decoded frame by frame.
pub struct VideoStream {
    ictx: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    metadata: VideoMetadata,
    next_frame_number: u64,
    flushed: bool,
    finished: bool,
}

impl VideoStream {
    /// Open a video file and prepare the decoder.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened
    /// - No video stream is found
    /// - The decoder or scaler cannot be created
    pub fn open(path: &Path) -> Result<Self> {
        init_ffmpeg();

        let ictx = ffmpeg::format::input(&path)
            .map_err(|e| PipelineError::Ffmpeg(format!("Failed to open input file: {e}")))?;

        let (stream_index, frame_rate, reported_frames, codec_params) = {
            let stream = ictx
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or(PipelineError::NoVideoStream)?;

            // avg_frame_rate can be unset for some containers; fall back
            // to the stream's raw rate.
            let mut rate = stream.avg_frame_rate();
            if rate.0 == 0 {
                rate = stream.rate();
            }

            (stream.index(), rate, stream.frames(), stream.parameters())
        };

        let decoder = ffmpeg::codec::context::Context::from_parameters(codec_params)
            .map_err(|e| PipelineError::Ffmpeg(format!("Failed to create context: {e}")))?
            .decoder()
            .video()
            .map_err(|e| PipelineError::Ffmpeg(format!("Failed to create decoder: {e}")))?;

        let width = decoder.width();
        let height = decoder.height();

        // Convert everything to RGB24 at source resolution for detection
        // and drawing.
        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg::format::Pixel::RGB24,
            width,
            height,
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| PipelineError::Ffmpeg(format!("Failed to create scaler: {e}")))?;

        let metadata = VideoMetadata {
            width,
            height,
            frame_rate: FrameRate::new(frame_rate.0, frame_rate.1),
            frame_count: u64::try_from(reported_frames).ok().filter(|&n| n > 0),
        };

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            metadata,
            next_frame_number: 0,
            flushed: false,
            finished: false,
        })
    }

    /// Next packet belonging to the selected video stream.
    fn read_packet(&mut self) -> Option<ffmpeg::Packet> {
        loop {
            let next = self.ictx.packets().next();
            match next {
                Some((stream, packet)) => {
                    if stream.index() == self.stream_index {
                        return Some(packet);
                    }
                }
                None => return None,
            }
        }
    }

    fn deliver(&mut self, decoded: &ffmpeg::util::frame::video::Video) -> Result<Frame> {
        let mut converted = ffmpeg::util::frame::video::Video::empty();
        self.scaler
            .run(decoded, &mut converted)
            .map_err(|e| PipelineError::Ffmpeg(format!("Failed to convert frame: {e}")))?;

        let frame = Frame {
            frame_number: self.next_frame_number,
            width: self.metadata.width,
            height: self.metadata.height,
            data: copy_rgb_frame(&converted),
        };
        self.next_frame_number += 1;
        Ok(frame)
    }
}

impl FrameStream for VideoStream {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Option<Result<Frame>> {
        if self.finished {
            return None;
        }

        loop {
            // Drain any frame the decoder already holds.
            let mut decoded = ffmpeg::util::frame::video::Video::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let result = self.deliver(&decoded);
                if result.is_err() {
                    self.finished = true;
                }
                return Some(result);
            }

            if self.flushed {
                self.finished = true;
                return None;
            }

            // Feed the next packet, or start the flush at end of file.
            match self.read_packet() {
                Some(packet) => {
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        self.finished = true;
                        return Some(Err(PipelineError::Decode {
                            frame: self.next_frame_number,
                            reason: format!("Failed to decode packet: {e}"),
                        }));
                    }
                }
                None => {
                    self.decoder.send_eof().ok();
                    self.flushed = true;
                }
            }
        }
    }
}

/// Copy an RGB24 frame into a contiguous row-major buffer, dropping any
/// stride padding.
fn copy_rgb_frame(frame: &ffmpeg::util::frame::video::Video) -> Vec<u8> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let stride = frame.stride(0);
    let plane_data = frame.data(0);

    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row_end = row_start + (width * 3);
        data.extend_from_slice(&plane_data[row_start..row_end]);
    }
    data
}
