// Camera module for webcam capture

use crate::config::CaptureConfig;
use crate::error::{CamXucError, Result};
use crate::models::Frame;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{error, info};

/// An open camera stream owned by a capture session
pub trait CameraStream {
    /// Grabs and decodes the most recent frame
    fn frame(&mut self) -> Result<Frame>;

    /// Releases the device; safe to call more than once
    fn stop(&mut self);
}

/// Grants access to a camera device
pub trait CameraProvider {
    fn open(&self) -> Result<Box<dyn CameraStream>>;
}

/// Opens webcams through nokhwa's native backends
pub struct NokhwaCameraProvider {
    index: Option<u32>,
    requested_format: RequestedFormat<'static>,
}

impl NokhwaCameraProvider {
    /// Creates a provider that requests the configured resolution and frame rate
    pub fn new(config: &CaptureConfig) -> Self {
        let requested_format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            nokhwa::utils::CameraFormat::new(
                nokhwa::utils::Resolution::new(config.width, config.height),
                nokhwa::utils::FrameFormat::YUYV,
                config.fps,
            ),
        ));

        Self {
            index: config.camera_index,
            requested_format,
        }
    }

    /// Helper to try opening a camera at a specific index
    fn try_open_camera(&self, index: u32) -> Result<Camera> {
        Camera::new(CameraIndex::Index(index), self.requested_format)
            .map_err(|e| CamXucError::CameraInit(e.to_string()))
    }

    /// Lists available camera devices
    pub fn list_devices() -> Result<Vec<String>> {
        let devices = nokhwa::query(nokhwa::utils::ApiBackend::Auto)
            .map_err(|e| CamXucError::CameraInit(format!("Failed to query cameras: {e}")))?;

        Ok(devices
            .iter()
            .map(|info| format!("{}: {}", info.index(), info.human_name()))
            .collect())
    }
}

impl CameraProvider for NokhwaCameraProvider {
    fn open(&self) -> Result<Box<dyn CameraStream>> {
        // Some systems start at index 0, others at 1
        let camera = match self.index {
            Some(index) => self.try_open_camera(index),
            None => self.try_open_camera(0).or_else(|_| self.try_open_camera(1)),
        }
        .map_err(|e| {
            error!("Failed to initialize camera: {}", e);
            e
        })?;

        let mut stream = NokhwaStream {
            camera,
            is_running: false,
        };
        stream.ensure_stream_open()?;
        info!(
            "Camera opened: {} at {}x{}",
            stream.camera.info().human_name(),
            stream.camera.resolution().width(),
            stream.camera.resolution().height()
        );
        Ok(Box::new(stream))
    }
}

/// A live nokhwa stream
pub struct NokhwaStream {
    camera: Camera,
    is_running: bool,
}

impl NokhwaStream {
    /// Opens the camera stream and verifies that frames arrive
    fn ensure_stream_open(&mut self) -> Result<()> {
        self.camera.open_stream().map_err(|e| {
            error!("Failed to open camera stream: {}", e);
            CamXucError::from(e)
        })?;
        self.is_running = true;

        // Wait a moment for the camera to initialize
        std::thread::sleep(std::time::Duration::from_millis(200));

        match self.camera.frame() {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Camera stream not working: {}", e);
                self.stop();
                Err(CamXucError::CameraAccessDenied)
            }
        }
    }
}

impl CameraStream for NokhwaStream {
    fn frame(&mut self) -> Result<Frame> {
        let frame_data = self.camera.frame().map_err(|e| {
            CamXucError::FrameProcessing(format!("Failed to capture frame: {e}"))
        })?;

        let buffer = frame_data.decode_image::<RgbFormat>().map_err(|e| {
            CamXucError::FrameProcessing(format!("Failed to decode frame: {e}"))
        })?;

        let (width, height) = (buffer.width(), buffer.height());
        Ok(Frame::new(buffer.into_raw(), width, height))
    }

    fn stop(&mut self) {
        if !self.is_running {
            return;
        }
        self.is_running = false;

        if let Err(e) = self.camera.stop_stream() {
            error!("Error stopping camera stream: {}", e);
        }
    }
}

impl Drop for NokhwaStream {
    fn drop(&mut self) {
        self.stop();
    }
}
