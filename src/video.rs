//! Frame sources.
//!
//! The monitor pulls one RGB frame at a time. A directory of still images
//! replays recorded footage deterministically; on Linux with the default
//! `webcam` feature a V4L2 device is streamed instead.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// A lazy sequence of frames.
pub trait VideoSource {
    /// The next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Still images from a directory, played in file-name order.
#[derive(Debug)]
pub struct ImageSequence {
    frames: Vec<PathBuf>,
    next: usize,
}

impl ImageSequence {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir)
            .map_err(|e| Error::Video(format!("cannot read {}: {e}", dir.display())))?;

        let mut frames = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if path.is_file() && is_image {
                frames.push(path);
            }
        }
        frames.sort();

        if frames.is_empty() {
            return Err(Error::Video(format!("no image frames in {}", dir.display())));
        }
        info!(dir = %dir.display(), frames = frames.len(), "opened image sequence");

        Ok(Self { frames, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl VideoSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.frames.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        debug!(frame = %path.display(), "reading frame");
        let frame = image::open(path)
            .map_err(|e| Error::Video(format!("cannot decode {}: {e}", path.display())))?;
        Ok(Some(frame.to_rgb8()))
    }
}

/// Resize to `width`, keeping the aspect ratio.
pub fn resize_to_width(frame: &RgbImage, width: u32) -> RgbImage {
    let (w, h) = frame.dimensions();
    if w == width || w == 0 {
        return frame.clone();
    }
    let height = ((h as f64 * width as f64 / w as f64).round() as u32).max(1);
    imageops::resize(frame, width, height, FilterType::Triangle)
}

/// Open V4L2 device `/dev/video{index}` as a frame source.
#[cfg(all(feature = "webcam", target_os = "linux"))]
pub fn open_webcam(index: usize) -> Result<Box<dyn VideoSource>> {
    Ok(Box::new(Webcam::open(index)?))
}

#[cfg(not(all(feature = "webcam", target_os = "linux")))]
pub fn open_webcam(index: usize) -> Result<Box<dyn VideoSource>> {
    Err(Error::Video(format!(
        "webcam {index}: live capture needs Linux and the `webcam` feature, use --frames"
    )))
}

#[cfg(all(feature = "webcam", target_os = "linux"))]
pub use self::webcam::Webcam;

#[cfg(all(feature = "webcam", target_os = "linux"))]
mod webcam {
    use image::RgbImage;
    use tracing::info;
    use v4l::buffer::Type;
    use v4l::io::mmap::Stream;
    use v4l::io::traits::CaptureStream;
    use v4l::prelude::*;
    use v4l::video::Capture;
    use v4l::FourCC;

    use super::VideoSource;
    use crate::error::{Error, Result};

    /// A V4L2 capture device streaming MJPEG.
    pub struct Webcam {
        stream: Stream<'static>,
        _device: Device,
    }

    impl Webcam {
        pub fn open(index: usize) -> Result<Self> {
            let video = |e: std::io::Error| Error::Video(format!("/dev/video{index}: {e}"));

            let device = Device::new(index).map_err(video)?;
            let mut format = device.format().map_err(video)?;
            format.fourcc = FourCC::new(b"MJPG");
            let format = device.set_format(&format).map_err(video)?;
            if format.fourcc != FourCC::new(b"MJPG") {
                return Err(Error::Video(format!(
                    "/dev/video{index} cannot stream MJPEG (offers {})",
                    format.fourcc
                )));
            }
            info!(index, width = format.width, height = format.height, "opened webcam");

            let stream = Stream::with_buffers(&device, Type::VideoCapture, 4).map_err(video)?;
            Ok(Self {
                stream,
                _device: device,
            })
        }
    }

    impl VideoSource for Webcam {
        fn next_frame(&mut self) -> Result<Option<RgbImage>> {
            let (data, _meta) = self
                .stream
                .next()
                .map_err(|e| Error::Video(format!("frame capture failed: {e}")))?;
            let frame = image::load_from_memory(data)
                .map_err(|e| Error::Video(format!("bad MJPEG frame: {e}")))?;
            Ok(Some(frame.to_rgb8()))
        }
    }
}
