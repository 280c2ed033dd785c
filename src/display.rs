// Display state derived from classification results

use crate::models::{ClassificationResult, EmotionLabel, FaceBox, Frame, ServerHealth};

/// Which main surface is visible
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    DropZone,
    LiveCamera,
}

/// Returns the localized name for a label key, or the raw key when unknown
pub fn translate_emotion(key: &str) -> String {
    EmotionLabel::from_key(key)
        .map(|label| label.to_string())
        .unwrap_or_else(|| key.to_string())
}

/// Rounds a percentage to the nearest integer, halves rounding up
pub fn rounded_percent(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// One rendered percentage bar
#[derive(Clone, Debug, PartialEq)]
pub struct EmotionBar {
    /// Wire key as reported by the server
    pub key: String,
    pub display_name: String,
    pub percent: i64,
}

impl EmotionBar {
    pub fn new(key: &str, value: f64) -> Self {
        Self {
            key: key.to_string(),
            display_name: translate_emotion(key),
            percent: rounded_percent(value),
        }
    }

    /// Bar fill in 0.0..=1.0
    pub fn fill(&self) -> f32 {
        self.percent.clamp(0, 100) as f32 / 100.0
    }
}

impl std::fmt::Display for EmotionBar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}%", self.display_name, self.percent)
    }
}

/// Builds one bar per key of `all_emotions`, keeping server order
pub fn emotion_bars(result: &ClassificationResult) -> Vec<EmotionBar> {
    result
        .all_emotions
        .iter()
        .map(|(key, value)| EmotionBar::new(key, *value))
        .collect()
}

/// Everything the UI renders; owned by the controller
#[derive(Debug, Default)]
pub struct DisplayState {
    pub view: View,
    pub bars: Vec<EmotionBar>,
    pub dominant: Option<String>,
    pub face_box: Option<FaceBox>,
    /// Pixel size of the image the face box refers to
    pub face_source_size: Option<(u32, u32)>,
    pub preview: Option<Frame>,
    /// Bumped every time `preview` is replaced
    pub preview_generation: u64,
    pub loading: bool,
    pub countdown: Option<u32>,
    pub error: Option<String>,
    pub server: Option<String>,
}

impl DisplayState {
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn set_preview(&mut self, frame: Frame) {
        self.preview = Some(frame);
        self.preview_generation += 1;
    }

    pub fn show_server_health(&mut self, health: &ServerHealth) {
        self.server = Some(health.to_string());
    }
}
