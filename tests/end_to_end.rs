use camxuc::camera::{CameraProvider, CameraStream};
use camxuc::client::EmotionClient;
use camxuc::controller::{CaptureController, ControllerSettings, DroppedImage};
use camxuc::display::View;
use camxuc::encoder;
use camxuc::error::{CamXucError, Result};
use camxuc::models::Frame;
use mockito::Matcher;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

struct StillCamera;

impl CameraStream for StillCamera {
    fn frame(&mut self) -> Result<Frame> {
        Ok(Frame::new(vec![64; 16 * 12 * 3], 16, 12))
    }

    fn stop(&mut self) {}
}

struct StillCameraProvider;

impl CameraProvider for StillCameraProvider {
    fn open(&self) -> Result<Box<dyn CameraStream>> {
        Ok(Box::new(StillCamera))
    }
}

fn controller(url: &str) -> CaptureController {
    let client = EmotionClient::new(url, Duration::from_secs(5)).unwrap();
    CaptureController::new(
        Box::new(StillCameraProvider),
        Arc::new(client),
        Handle::current(),
        ControllerSettings {
            poll_interval: Duration::from_secs(1),
            countdown_secs: 0,
            photo_jpeg_quality: 95,
            video_jpeg_quality: 92,
        },
    )
}

fn dropped_jpeg() -> DroppedImage {
    let frame = Frame::new(vec![180; 10 * 10 * 3], 10, 10);
    DroppedImage {
        name: "selfie.jpg".to_string(),
        bytes: encoder::encode_jpeg(&frame, 90).unwrap(),
    }
}

#[tokio::test]
async fn dropped_jpeg_renders_localized_bars() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/detect_emotion/")
        .match_body(Matcher::Regex(r#"name="image"; filename="selfie.jpg""#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"all_emotions": {"happy": 87.3, "sad": 12.7}}"#)
        .expect(1)
        .create_async()
        .await;

    let mut ctl = controller(&server.url());
    ctl.handle_drop(dropped_jpeg()).unwrap();
    assert!(ctl.wait_for_completion().await);

    let rendered: Vec<String> = ctl.display().bars.iter().map(|b| b.to_string()).collect();
    assert_eq!(rendered, ["Vui vẻ 87%", "Buồn bã 13%"]);
    assert!(ctl.display().error.is_none());
    assert!(ctl.display().preview.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn server_error_is_shown_verbatim() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/detect_emotion/")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "no face detected"}"#)
        .create_async()
        .await;

    let mut ctl = controller(&server.url());
    ctl.handle_drop(dropped_jpeg()).unwrap();
    assert!(ctl.wait_for_completion().await);

    assert_eq!(ctl.display().error.as_deref(), Some("no face detected"));
    assert!(ctl.display().bars.is_empty());
    assert!(!ctl.is_busy());
}

#[tokio::test]
async fn video_recognition_polls_until_stopped() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/detect_emotion/")
        .match_body(Matcher::Regex("data:image/jpeg;base64,".to_string()))
        .with_status(200)
        .with_body(r#"{"all_emotions": {"neutral": 95.0, "contempt": 5.0}}"#)
        .expect(2)
        .create_async()
        .await;

    let mut ctl = controller(&server.url());
    ctl.start_video_recognition().unwrap();
    assert_eq!(ctl.display().view, View::LiveCamera);

    let start = Instant::now();
    ctl.tick(start + Duration::from_secs(1));
    assert!(ctl.wait_for_completion().await);
    ctl.tick(start + Duration::from_secs(2));
    assert!(ctl.wait_for_completion().await);

    let rendered: Vec<String> = ctl.display().bars.iter().map(|b| b.to_string()).collect();
    assert_eq!(rendered, ["Bình thường 95%", "contempt 5%"]);

    ctl.stop_video_recognition();
    ctl.stop_video_recognition();
    assert!(!ctl.is_camera_active());
    assert_eq!(ctl.display().view, View::DropZone);

    // No more submissions once stopped
    ctl.tick(start + Duration::from_secs(3));
    assert_eq!(ctl.drain_completions(), 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn missing_all_emotions_is_reported_not_rendered() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/detect_emotion/")
        .with_status(200)
        .with_body(r#"{"emotion": "happy"}"#)
        .create_async()
        .await;

    let mut ctl = controller(&server.url());
    ctl.handle_drop(dropped_jpeg()).unwrap();
    assert!(ctl.wait_for_completion().await);

    let error = ctl.display().error.clone().unwrap();
    assert!(!error.is_empty());
    assert!(ctl.display().bars.is_empty());
}

#[tokio::test]
async fn selected_file_is_read_and_submitted() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/detect_emotion/")
        .match_body(Matcher::Regex(r#"filename="pick.jpg""#.to_string()))
        .with_status(200)
        .with_body(r#"{"all_emotions": {"fear": 49.5}}"#)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pick.jpg");
    std::fs::write(&path, dropped_jpeg().bytes).unwrap();

    let mut ctl = controller(&server.url());
    ctl.handle_files(&[&path]).unwrap();
    assert!(ctl.wait_for_completion().await);
    assert_eq!(ctl.display().bars[0].to_string(), "Sợ hãi 50%");
    mock.assert_async().await;
}

#[tokio::test]
async fn missing_file_is_reported() {
    let mut ctl = controller("http://127.0.0.1:1");
    let result = ctl.handle_files(&["/nonexistent/face.jpg"]);
    assert!(matches!(result, Err(CamXucError::ImageLoad(_))));
    assert!(ctl.display().error.is_some());
}
