// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Camera capture: backend/source traits and the ez-ffmpeg implementation
// DirectShow (Windows) / AVFoundation (macOS) / V4L2 (Linux)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Frame, Input};
use image::RgbImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera {0} not found")]
    NotFound(usize),
    #[error("unable to open camera {port}: {reason}")]
    OpenFailed { port: usize, reason: String },
    #[error("failed to read a frame from camera {port}: {reason}")]
    ReadFailed { port: usize, reason: String },
    #[error("no frame from camera {port} within {timeout:?}")]
    Timeout { port: usize, timeout: Duration },
}

/// An opened camera. Dropping it releases the device.
pub trait FrameSource: Send {
    /// Newest frame available, blocking until one arrives.
    fn read(&mut self) -> Result<RgbImage, CameraError>;

    fn port(&self) -> usize;
}

/// Something able to open cameras by port index
pub trait CameraBackend: Send + Sync {
    /// `size` is the requested capture resolution; the driver default is
    /// used when the device refuses it.
    fn open(&self, port: usize, size: Option<(u32, u32)>)
        -> Result<Box<dyn FrameSource>, CameraError>;

    /// Single attempt at the driver default size, used while scanning ports.
    fn probe(&self, port: usize) -> Result<Box<dyn FrameSource>, CameraError> {
        self.open(port, None)
    }
}

#[cfg(target_os = "windows")]
const INPUT_FORMAT: &str = "dshow";
#[cfg(target_os = "macos")]
const INPUT_FORMAT: &str = "avfoundation";
#[cfg(target_os = "linux")]
const INPUT_FORMAT: &str = "v4l2";
#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
const INPUT_FORMAT: &str = "video4linux2";

/// Capture device URL of `port` for the platform input format.
pub fn camera_url(port: usize, devices: &[String]) -> Option<String> {
    #[cfg(target_os = "windows")]
    {
        devices.get(port).map(|name| format!("video={}", name))
    }
    #[cfg(target_os = "linux")]
    {
        let _ = devices;
        Some(format!("/dev/video{}", port))
    }
    #[cfg(not(any(target_os = "windows", target_os = "linux")))]
    {
        let _ = devices;
        Some(format!("{}", port))
    }
}

/// v4l2 nodes can be checked without opening the device.
fn device_missing(url: &str) -> bool {
    cfg!(target_os = "linux") && !std::path::Path::new(url).exists()
}

/// Names of the capture devices known to ffmpeg.
pub fn get_camera_devices() -> Vec<String> {
    match ez_ffmpeg::device::get_input_video_devices() {
        Ok(devices) => {
            for (index, name) in devices.iter().enumerate() {
                log::debug!("📷 [{}] {}", index, name);
            }
            devices
        }
        Err(e) => {
            log::warn!("⚠️ Failed to list video devices: {}", e);
            Vec::new()
        }
    }
}

/// ez-ffmpeg camera backend
pub struct FfmpegCamera {
    devices: Vec<String>,
    retries: usize,
    read_timeout: Duration,
}

impl Default for FfmpegCamera {
    fn default() -> Self {
        Self {
            devices: get_camera_devices(),
            retries: 3,
            read_timeout: Duration::from_secs(3),
        }
    }
}

impl FfmpegCamera {
    pub fn new() -> Self {
        Self::default()
    }

    fn start(
        &self,
        port: usize,
        url: &str,
        size: Option<(u32, u32)>,
    ) -> Result<FfmpegFrameSource, String> {
        let (tx, rx) = bounded(2);
        let stop = Arc::new(AtomicBool::new(false));
        let filter = CaptureFilter {
            port,
            tx,
            stop: stop.clone(),
            frames: 0,
        };

        let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
        let pipe = pipe.filter("capture", Box::new(filter));
        let out = create_null_output().add_frame_pipeline(pipe);

        let video_size = size.map(|(w, h)| format!("{}x{}", w, h));
        let input = match video_size.as_deref() {
            Some(video_size) => Input::new(url)
                .set_format(INPUT_FORMAT)
                .set_input_opts([("framerate", "30"), ("video_size", video_size)].into()),
            None => Input::new(url).set_format(INPUT_FORMAT),
        };

        let ctx = FfmpegContext::builder()
            .input(input)
            .filter_descs(["format=rgb24"].into())
            .output(out)
            .build()
            .map_err(|e| format!("build failed: {}", e))?;
        let sch = ctx.start().map_err(|e| format!("start failed: {}", e))?;

        Ok(FfmpegFrameSource {
            port,
            rx,
            stop,
            read_timeout: self.read_timeout,
            abort: Some(Box::new(move || sch.abort())),
        })
    }

    fn open_with(
        &self,
        port: usize,
        size: Option<(u32, u32)>,
        attempts: usize,
    ) -> Result<Box<dyn FrameSource>, CameraError> {
        let url = camera_url(port, &self.devices).ok_or(CameraError::NotFound(port))?;
        if device_missing(&url) {
            return Err(CameraError::NotFound(port));
        }

        let mut last_error = String::new();
        for attempt in 1..=attempts {
            let sizes = match size {
                Some(wh) => vec![Some(wh), None],
                None => vec![None],
            };
            // requested size first, then whatever the driver negotiates
            for size in sizes {
                match self.start(port, &url, size) {
                    Ok(source) => {
                        log::info!("✅ Camera {} opened successfully ({})", port, url);
                        return Ok(Box::new(source));
                    }
                    Err(e) => last_error = e,
                }
            }
            if attempt < attempts {
                log::warn!(
                    "⚠️ Camera {} busy or unavailable, retrying in 1s ({}/{})",
                    port,
                    attempt,
                    attempts
                );
                std::thread::sleep(Duration::from_secs(1));
            }
        }

        Err(CameraError::OpenFailed {
            port,
            reason: last_error,
        })
    }
}

impl CameraBackend for FfmpegCamera {
    fn open(
        &self,
        port: usize,
        size: Option<(u32, u32)>,
    ) -> Result<Box<dyn FrameSource>, CameraError> {
        self.open_with(port, size, self.retries)
    }

    fn probe(&self, port: usize) -> Result<Box<dyn FrameSource>, CameraError> {
        self.open_with(port, None, 1)
    }
}

/// Frames of a running ffmpeg capture
pub struct FfmpegFrameSource {
    port: usize,
    rx: Receiver<RgbImage>,
    stop: Arc<AtomicBool>,
    read_timeout: Duration,
    /// ends the ffmpeg job even when no frame ever arrives
    abort: Option<Box<dyn FnOnce() + Send>>,
}

impl FrameSource for FfmpegFrameSource {
    fn read(&mut self) -> Result<RgbImage, CameraError> {
        let frame = match self.rx.recv_timeout(self.read_timeout) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => {
                return Err(CameraError::Timeout {
                    port: self.port,
                    timeout: self.read_timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(CameraError::ReadFailed {
                    port: self.port,
                    reason: "capture pipeline ended".to_string(),
                })
            }
        };
        // only the newest frame matters
        Ok(self.rx.try_iter().last().unwrap_or(frame))
    }

    fn port(&self) -> usize {
        self.port
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(abort) = self.abort.take() {
            abort();
        }
        log::info!("camera {} released", self.port);
    }
}

/// ez-ffmpeg filter copying RGB24 frames into the capture channel
struct CaptureFilter {
    port: usize,
    tx: Sender<RgbImage>,
    stop: Arc<AtomicBool>,
    frames: usize,
}

impl CaptureFilter {
    /// # Safety
    /// `frame` must hold a valid AVFrame.
    unsafe fn copy_rgb(frame: &Frame) -> Option<RgbImage> {
        let av = &*frame.as_ptr();
        let (w, h) = (av.width, av.height);
        if w <= 0 || h <= 0 || av.data[0].is_null() {
            return None;
        }
        let (w, h) = (w as usize, h as usize);
        let stride = av.linesize[0];
        let row = w * 3;
        if stride < row as i32 {
            return None;
        }

        let mut pixels = Vec::with_capacity(row * h);
        for y in 0..h {
            let src = std::slice::from_raw_parts(av.data[0].add(y * stride as usize), row);
            pixels.extend_from_slice(src);
        }
        RgbImage::from_raw(w as u32, h as u32, pixels)
    }
}

impl FrameFilter for CaptureFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        log::debug!("📷 capture filter of camera {} started", self.port);
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        if self.stop.load(Ordering::Relaxed) {
            return Err(format!("camera {} released", self.port));
        }

        if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
            return Ok(None);
        }

        let Some(image) = (unsafe { Self::copy_rgb(&frame) }) else {
            if self.frames == 0 {
                log::warn!("⚠️ camera {} delivered an unreadable frame", self.port);
            }
            return Ok(None);
        };
        self.frames += 1;

        // the reader keeps up or the frame is dropped
        let _ = self.tx.try_send(image);
        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        log::debug!(
            "📷 capture filter of camera {} stopped after {} frames",
            self.port,
            self.frames
        );
    }
}
