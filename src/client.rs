//! HTTP client for the emotion classification service.
//!
//! Every submission goes through [`EmotionClient::process_image`], which sends the
//! image as multipart form data to `POST /detect_emotion/` and returns the parsed
//! distribution or a classification error carrying the server's message.

use crate::error::{CamXucError, Result};
use crate::models::{ClassificationResult, FaceBox, ImagePayload, ServerHealth};
use indexmap::IndexMap;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const DETECT_PATH: &str = "/detect_emotion/";
const HEALTH_PATH: &str = "/health_check/";

/// Shown when the server fails without an `error` message of its own
pub const FALLBACK_ERROR_MESSAGE: &str = "Lỗi xử lý ảnh";

/// Success body of `/detect_emotion/`
#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    emotion: Option<String>,
    #[serde(default)]
    all_emotions: Option<IndexMap<String, f64>>,
    #[serde(default)]
    face_coordinates: Option<FaceBox>,
}

/// Error body of `/detect_emotion/`
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Client for the classification endpoint
#[derive(Debug, Clone)]
pub struct EmotionClient {
    client: reqwest::Client,
    base_url: String,
}

impl EmotionClient {
    /// Creates a new client rooted at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CamXucError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submits one image and returns the parsed classification
    pub async fn process_image(&self, payload: &ImagePayload) -> Result<ClassificationResult> {
        let form = build_form(payload)?;
        let url = format!("{}{}", self.base_url, DETECT_PATH);
        debug!("Submitting {} byte payload to {}", payload.encoded_len(), url);

        let resp = self.client.post(&url).multipart(form).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            return Err(classification_error(status, &body));
        }

        parse_detect_response(&body)
    }

    /// Queries the service status endpoint
    pub async fn health_check(&self) -> Result<ServerHealth> {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CamXucError::Network(format!(
                "health check returned {status}"
            )));
        }
        resp.json::<ServerHealth>()
            .await
            .map_err(|e| CamXucError::MalformedResponse(e.to_string()))
    }
}

fn build_form(payload: &ImagePayload) -> Result<Form> {
    let form = match payload {
        ImagePayload::Blob {
            bytes,
            file_name,
            mime,
        } => {
            let part = Part::bytes(bytes.clone())
                .file_name(file_name.clone())
                .mime_str(mime)?;
            Form::new().part("image", part)
        }
        ImagePayload::DataUrl(url) => Form::new().text("image_data", url.clone()),
    };
    Ok(form)
}

fn classification_error(status: StatusCode, body: &[u8]) -> CamXucError {
    let parsed: ErrorResponse = serde_json::from_slice(body).unwrap_or_default();
    if let Some(detail) = parsed.detail.as_deref() {
        warn!("Classification failed ({status}): {detail}");
    } else {
        warn!("Classification failed ({status})");
    }

    let message = parsed
        .error
        .filter(|msg| !msg.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());
    CamXucError::Classification(message)
}

fn parse_detect_response(body: &[u8]) -> Result<ClassificationResult> {
    let parsed: DetectResponse = serde_json::from_slice(body)
        .map_err(|e| CamXucError::MalformedResponse(e.to_string()))?;

    let all_emotions = parsed.all_emotions.ok_or_else(|| {
        CamXucError::MalformedResponse("missing field `all_emotions`".to_string())
    })?;

    Ok(ClassificationResult {
        dominant_emotion: parsed.emotion,
        all_emotions,
        face_coordinates: parsed.face_coordinates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn blob() -> ImagePayload {
        ImagePayload::Blob {
            bytes: b"jpeg-bytes".to_vec(),
            file_name: "capture.jpg".to_string(),
            mime: "image/jpeg".to_string(),
        }
    }

    fn client(url: &str) -> EmotionClient {
        EmotionClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn blob_is_sent_as_image_file_part() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/detect_emotion/")
            .match_body(Matcher::Regex(r#"name="image"; filename="capture.jpg""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"emotion":"happy","all_emotions":{"happy":87.3,"sad":12.7},
                    "face_coordinates":{"x":10,"y":20,"width":30,"height":40}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let result = client(&server.url()).process_image(&blob()).await.unwrap();
        assert_eq!(result.dominant_emotion.as_deref(), Some("happy"));
        assert_eq!(result.all_emotions.len(), 2);
        assert_eq!(result.all_emotions.get_index(0).unwrap().0, "happy");
        assert_eq!(result.face_coordinates.unwrap().height, 40.0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn data_url_is_sent_as_text_field() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/detect_emotion/")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="image_data""#.to_string()),
                Matcher::Regex("data:image/jpeg;base64,AAAA".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"all_emotions":{"neutral":100.0}}"#)
            .create_async()
            .await;

        let payload = ImagePayload::DataUrl("data:image/jpeg;base64,AAAA".to_string());
        let result = client(&server.url()).process_image(&payload).await.unwrap();
        assert!(result.face_coordinates.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_message_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/detect_emotion/")
            .with_status(400)
            .with_body(r#"{"error":"no face detected"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .process_image(&blob())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no face detected");
    }

    #[tokio::test]
    async fn non_json_error_uses_fallback_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/detect_emotion/")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let err = client(&server.url())
            .process_image(&blob())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), FALLBACK_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn empty_error_field_uses_fallback_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/detect_emotion/")
            .with_status(500)
            .with_body(r#"{"error":"","detail":"trace"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .process_image(&blob())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), FALLBACK_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn missing_all_emotions_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/detect_emotion/")
            .with_status(200)
            .with_body(r#"{"emotion":"happy"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .process_image(&blob())
            .await
            .unwrap_err();
        assert!(matches!(err, CamXucError::MalformedResponse(_)));
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let err = client("http://127.0.0.1:1")
            .process_image(&blob())
            .await
            .unwrap_err();
        assert!(matches!(err, CamXucError::Network(_)));
    }

    #[tokio::test]
    async fn health_check_parses_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health_check/")
            .with_status(200)
            .with_body(r#"{"status":"online","deepface_available":true}"#)
            .create_async()
            .await;

        let health = client(&server.url()).health_check().await.unwrap();
        assert_eq!(health.status, "online");
        assert!(health.deepface_available);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(client("http://localhost:8000/").base_url(), "http://localhost:8000");
    }
}
