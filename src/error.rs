// Error types for the capture-and-classify client

use thiserror::Error;

/// Main error type for the camxuc client
#[derive(Debug, Error)]
pub enum CamXucError {
    #[error("Camera initialization failed: {0}")]
    CameraInit(String),

    #[error("Camera access denied")]
    CameraAccessDenied,

    #[error("Frame processing failed: {0}")]
    FrameProcessing(String),

    #[error("Image loading failed: {0}")]
    ImageLoad(String),

    #[error("Image encoding failed: {0}")]
    ImageEncode(String),

    #[error("Lỗi kết nối máy chủ: {0}")]
    Network(String),

    /// Message reported by the classification endpoint, shown verbatim
    #[error("{0}")]
    Classification(String),

    #[error("Phản hồi không hợp lệ: {0}")]
    MalformedResponse(String),

    #[error("A submission is already pending")]
    SubmissionPending,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    ImageDecode(#[from] image::ImageError),
}

/// Result type alias for camxuc operations
pub type Result<T> = std::result::Result<T, CamXucError>;

// Conversion from nokhwa errors
impl From<nokhwa::NokhwaError> for CamXucError {
    fn from(err: nokhwa::NokhwaError) -> Self {
        match err {
            nokhwa::NokhwaError::StructureError { structure, error } => {
                CamXucError::CameraInit(format!("{structure}: {error}"))
            }
            nokhwa::NokhwaError::OpenDeviceError(device, error) => {
                CamXucError::CameraInit(format!("Device {device}: {error}"))
            }
            nokhwa::NokhwaError::GetPropertyError { property, error } => {
                CamXucError::CameraInit(format!("Property {property}: {error}"))
            }
            _ => CamXucError::CameraInit(err.to_string()),
        }
    }
}

// Conversion from reqwest transport errors
impl From<reqwest::Error> for CamXucError {
    fn from(err: reqwest::Error) -> Self {
        CamXucError::Network(err.to_string())
    }
}

// Conversion from config layering errors
impl From<config::ConfigError> for CamXucError {
    fn from(err: config::ConfigError) -> Self {
        CamXucError::Config(err.to_string())
    }
}
