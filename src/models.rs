// Core data models for the capture-and-classify client

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Represents a single video frame with RGB data
#[derive(Clone, Debug)]
pub struct Frame {
    /// Raw RGB pixel data (width * height * 3 bytes)
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl Frame {
    /// Creates a new Frame with the given parameters
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Emotion labels the classification service knows about
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmotionLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl EmotionLabel {
    /// Parses the wire key used by the service
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "angry" => Some(EmotionLabel::Angry),
            "disgust" => Some(EmotionLabel::Disgust),
            "fear" => Some(EmotionLabel::Fear),
            "happy" => Some(EmotionLabel::Happy),
            "sad" => Some(EmotionLabel::Sad),
            "surprise" => Some(EmotionLabel::Surprise),
            "neutral" => Some(EmotionLabel::Neutral),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            EmotionLabel::Angry => "angry",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Happy => "happy",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Neutral => "neutral",
        }
    }

    /// Vietnamese name shown in the UI
    pub fn display_name(&self) -> &'static str {
        match self {
            EmotionLabel::Angry => "Giận dữ",
            EmotionLabel::Disgust => "Ghê tởm",
            EmotionLabel::Fear => "Sợ hãi",
            EmotionLabel::Happy => "Vui vẻ",
            EmotionLabel::Sad => "Buồn bã",
            EmotionLabel::Surprise => "Ngạc nhiên",
            EmotionLabel::Neutral => "Bình thường",
        }
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Face bounding box in source-image pixel coordinates
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FaceBox {
    /// Maps the box from a `source` sized image onto a `target` sized surface
    pub fn scaled(&self, source: (u32, u32), target: (f32, f32)) -> FaceBox {
        if source.0 == 0 || source.1 == 0 {
            return *self;
        }
        let sx = target.0 / source.0 as f32;
        let sy = target.1 / source.1 as f32;
        FaceBox {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }
}

/// Parsed response from the classification endpoint
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationResult {
    /// Server-reported dominant emotion key, when present
    pub dominant_emotion: Option<String>,
    /// Emotion key -> confidence percentage, in server order. Not normalised.
    pub all_emotions: IndexMap<String, f64>,
    pub face_coordinates: Option<FaceBox>,
}

/// Image payload submitted to the classification endpoint
#[derive(Clone, Debug)]
pub enum ImagePayload {
    /// Raw encoded bytes sent as the multipart `image` file field
    Blob {
        bytes: Vec<u8>,
        file_name: String,
        mime: String,
    },
    /// `data:` URL sent as the multipart `image_data` text field
    DataUrl(String),
}

impl ImagePayload {
    /// Size of the encoded image as sent on the wire
    pub fn encoded_len(&self) -> usize {
        match self {
            ImagePayload::Blob { bytes, .. } => bytes.len(),
            ImagePayload::DataUrl(url) => url.len(),
        }
    }
}

/// Server status reported by the health endpoint
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ServerHealth {
    pub status: String,
    #[serde(default)]
    pub deepface_available: bool,
}

impl std::fmt::Display for ServerHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.deepface_available {
            write!(f, "Máy chủ: {}", self.status)
        } else {
            write!(f, "Máy chủ: {} (mô hình chưa sẵn sàng)", self.status)
        }
    }
}
