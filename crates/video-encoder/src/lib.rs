//! FFmpeg-backed frame sink.
//!
//! Writes annotated RGB24 frames into an H.264 MP4 file with the same
//! resolution and frame rate as the source video. Frames are converted
//! to YUV420P through a software scaler and muxed with interleaved
//! writes; the container is only valid once `finish` has run.

use ffmpeg_next as ffmpeg;
use std::path::Path;

use video_detect_common::{Frame, FrameRate, PipelineError, Result, VideoMetadata};
use video_detect_core::{FrameSink, FrameWriter};

/// Frame rate written when the source container does not report one.
const FALLBACK_FPS: i32 = 25;

/// Initialize `FFmpeg` library
fn init_ffmpeg() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        ffmpeg::init().expect("Failed to initialize FFmpeg");
    });
}

/// [`FrameSink`] producing H.264 MP4 files via [`Mp4FrameWriter`].
#[derive(Debug, Clone)]
pub struct Mp4FrameSink {
    /// x264 preset name passed to the encoder.
    pub preset: String,
}

impl Default for Mp4FrameSink {
    fn default() -> Self {
        Self {
            preset: "medium".to_string(),
        }
    }
}

impl FrameSink for Mp4FrameSink {
    fn create(&self, path: &Path, metadata: &VideoMetadata) -> Result<Box<dyn FrameWriter>> {
        Ok(Box::new(Mp4FrameWriter::create(
            path,
            metadata,
            &self.preset,
        )?))
    }
}

/// An MP4 file being written frame by frame.
pub struct Mp4FrameWriter {
    octx: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::video::Encoder,
    scaler: ffmpeg::software::scaling::Context,
    ost_index: usize,
    enc_time_base: ffmpeg::Rational,
    ost_time_base: ffmpeg::Rational,
    width: u32,
    height: u32,
    frames_written: i64,
    finished: bool,
}

impl Mp4FrameWriter {
    /// Create the output file and open the encoder.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The dimensions are odd (YUV420P requires even width and height)
    /// - The output file cannot be created
    /// - No H.264 encoder is available or it cannot be opened
    pub fn create(path: &Path, metadata: &VideoMetadata, preset: &str) -> Result<Self> {
        if metadata.width % 2 != 0 || metadata.height % 2 != 0 {
            return Err(PipelineError::Encode(format!(
                "H.264/YUV420P output requires even dimensions, got {}x{}",
                metadata.width, metadata.height
            )));
        }

        init_ffmpeg();

        let mut octx = ffmpeg::format::output(&path)
            .map_err(|e| PipelineError::Encode(format!("Failed to create output file: {e}")))?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::H264)
            .ok_or_else(|| PipelineError::Encode("No H.264 encoder available".to_string()))?;

        let mut ost = octx
            .add_stream(codec)
            .map_err(|e| PipelineError::Encode(format!("Failed to add output stream: {e}")))?;
        let ost_index = ost.index();

        let rate = effective_frame_rate(metadata.frame_rate);
        let enc_time_base = ffmpeg::Rational::new(rate.den, rate.num);

        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| PipelineError::Encode(format!("Failed to create encoder: {e}")))?;
        encoder.set_width(metadata.width);
        encoder.set_height(metadata.height);
        encoder.set_format(ffmpeg::format::Pixel::YUV420P);
        encoder.set_time_base(enc_time_base);
        encoder.set_frame_rate(Some(ffmpeg::Rational::new(rate.num, rate.den)));
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }

        let mut options = ffmpeg::Dictionary::new();
        options.set("preset", preset);
        let encoder = encoder
            .open_with(options)
            .map_err(|e| PipelineError::Encode(format!("Failed to open encoder: {e}")))?;
        ost.set_parameters(&encoder);

        octx.write_header()
            .map_err(|e| PipelineError::Encode(format!("Failed to write header: {e}")))?;

        // The muxer may adjust the stream time base when the header is
        // written; packets must be rescaled to whatever it settled on.
        let ost_time_base = octx
            .stream(ost_index)
            .ok_or_else(|| PipelineError::Encode("Output stream disappeared".to_string()))?
            .time_base();

        let scaler = ffmpeg::software::scaling::Context::get(
            ffmpeg::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| PipelineError::Encode(format!("Failed to create scaler: {e}")))?;

        Ok(Self {
            octx,
            encoder,
            scaler,
            ost_index,
            enc_time_base,
            ost_time_base,
            width: metadata.width,
            height: metadata.height,
            frames_written: 0,
            finished: false,
        })
    }

    fn drain_packets(&mut self) -> Result<()> {
        let mut encoded = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.ost_index);
            encoded.rescale_ts(self.enc_time_base, self.ost_time_base);
            encoded
                .write_interleaved(&mut self.octx)
                .map_err(|e| PipelineError::Encode(format!("Failed to write packet: {e}")))?;
        }
        Ok(())
    }
}

impl FrameWriter for Mp4FrameWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.width != self.width || frame.height != self.height {
            return Err(PipelineError::Encode(format!(
                "Frame is {}x{} but the output is {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        if frame.data.len() != frame.expected_data_len() {
            return Err(PipelineError::InvalidFrame(format!(
                "Frame data is {} bytes, expected {}",
                frame.data.len(),
                frame.expected_data_len()
            )));
        }

        let mut rgb =
            ffmpeg::util::frame::video::Video::new(ffmpeg::format::Pixel::RGB24, frame.width, frame.height);
        fill_rgb_frame(frame, &mut rgb);

        let mut yuv = ffmpeg::util::frame::video::Video::empty();
        self.scaler
            .run(&rgb, &mut yuv)
            .map_err(|e| PipelineError::Encode(format!("Failed to convert frame: {e}")))?;
        yuv.set_pts(Some(self.frames_written));

        self.encoder
            .send_frame(&yuv)
            .map_err(|e| PipelineError::Encode(format!("Failed to encode frame: {e}")))?;
        self.frames_written += 1;
        self.drain_packets()
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }

        self.encoder
            .send_eof()
            .map_err(|e| PipelineError::Encode(format!("Failed to flush encoder: {e}")))?;
        self.drain_packets()?;
        self.octx
            .write_trailer()
            .map_err(|e| PipelineError::Encode(format!("Failed to write trailer: {e}")))?;
        self.finished = true;
        Ok(())
    }
}

/// Copy contiguous row-major RGB24 data into an `FFmpeg` frame,
/// honoring the frame's stride.
fn fill_rgb_frame(frame: &Frame, rgb: &mut ffmpeg::util::frame::video::Video) {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let stride = rgb.stride(0);
    let row_bytes = width * 3;
    let plane = rgb.data_mut(0);
    for y in 0..height {
        let src = &frame.data[y * row_bytes..(y + 1) * row_bytes];
        plane[y * stride..y * stride + row_bytes].copy_from_slice(src);
    }
}

fn effective_frame_rate(rate: FrameRate) -> FrameRate {
    if rate.num > 0 {
        rate
    } else {
        FrameRate::new(FALLBACK_FPS, 1)
    }
}
