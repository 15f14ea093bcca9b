use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::capture::domain::camera_source::CameraSource;
use crate::shared::frame::FrameBuffer;

/// Pulls stills from a live video stream (file or stream URL) via
/// ffmpeg-next.
///
/// Each snapshot decodes the next available frame and converts it to RGB24.
/// The scaler is rebuilt whenever the decoded size or pixel format changes,
/// so a source that renegotiates its resolution is handled per capture.
pub struct FfmpegCameraSource {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<ScalerSlot>,
    video_stream_index: usize,
    label: String,
    ended: bool,
}

struct ScalerSlot {
    key: (Pixel, u32, u32),
    ctx: scaling::Context,
}

// Safety: FfmpegCameraSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegCameraSource {}

impl FfmpegCameraSource {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;

        let (video_stream_index, decoder) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or("No video stream found")?;
            let codec_ctx =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
            (stream.index(), codec_ctx.decoder().video()?)
        };

        log::info!(
            "Opened camera stream {} ({}x{})",
            path.display(),
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            ictx,
            decoder,
            scaler: None,
            video_stream_index,
            label: path.display().to_string(),
            ended: false,
        })
    }

    fn next_decoded(&mut self) -> Result<Video, Box<dyn std::error::Error>> {
        let mut decoded = Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            return Ok(decoded);
        }
        if self.ended {
            return Err("Camera stream ended".into());
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.ended = true;
                if self.decoder.receive_frame(&mut decoded).is_ok() {
                    return Ok(decoded);
                }
                return Err("Camera stream ended".into());
            };

            if stream.index() != self.video_stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(decoded);
            }
        }
    }

    fn to_frame(&mut self, decoded: &Video) -> Result<FrameBuffer, Box<dyn std::error::Error>> {
        let width = decoded.width();
        let height = decoded.height();
        let key = (decoded.format(), width, height);

        if self.scaler.as_ref().map_or(true, |s| s.key != key) {
            let ctx = scaling::Context::get(
                key.0,
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                scaling::Flags::BILINEAR,
            )?;
            self.scaler = Some(ScalerSlot { key, ctx });
        }
        let slot = self.scaler.as_mut().ok_or("Scaler unavailable")?;

        let mut rgb_frame = Video::empty();
        slot.ctx.run(decoded, &mut rgb_frame)?;
        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        Ok(FrameBuffer::new(pixels, width, height, 3))
    }
}

impl CameraSource for FfmpegCameraSource {
    fn snapshot(&mut self) -> Result<FrameBuffer, Box<dyn std::error::Error>> {
        let decoded = self.next_decoded()?;
        self.to_frame(&decoded)
    }

    fn describe(&self) -> String {
        format!("stream {}", self.label)
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may pad each row (stride > width*3); the padding is dropped.
fn extract_rgb_pixels(rgb_frame: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
