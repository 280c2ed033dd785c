// UI module for the capture-and-classify client

use crate::controller::{CaptureController, DroppedImage};
use crate::display::View;
use crate::models::{FaceBox, Frame};
use egui::{Color32, Stroke};
use std::time::{Duration, Instant};
use tracing::warn;

const FACE_STROKE: Stroke = Stroke {
    width: 2.0,
    color: Color32::from_rgb(0x00, 0xff, 0x00),
};
const HIGHLIGHT_STROKE: Stroke = Stroke {
    width: 2.0,
    color: Color32::from_rgb(0x4a, 0x90, 0xe2),
};

/// Main application UI
pub struct EmotionApp {
    controller: CaptureController,
    camera_texture: Option<egui::TextureHandle>,
    preview_texture: Option<egui::TextureHandle>,
    /// Preview generation currently uploaded to `preview_texture`
    preview_generation: u64,
    path_input: String,
}

impl EmotionApp {
    /// Creates a new EmotionApp around an initialized controller
    pub fn new(controller: CaptureController) -> Self {
        Self {
            controller,
            camera_texture: None,
            preview_texture: None,
            preview_generation: 0,
            path_input: String::new(),
        }
    }

    /// Forwards files dropped on the window to the controller
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };

        let name = if file.name.is_empty() {
            file.path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "image".to_string())
        } else {
            file.name.clone()
        };

        let result = match (file.bytes, file.path) {
            (Some(bytes), _) => self.controller.handle_drop(DroppedImage {
                name,
                bytes: bytes.to_vec(),
            }),
            (None, Some(path)) => self.controller.handle_files(&[path]),
            (None, None) => return,
        };
        if let Err(e) = result {
            warn!("Dropped file not submitted: {}", e);
        }
    }

    /// Updates camera texture from the latest frame
    fn update_camera_texture(&mut self, ctx: &egui::Context) {
        if let Some(frame) = self.controller.live_frame() {
            self.camera_texture = Some(load_frame(ctx, "camera", frame));
        } else if !self.controller.is_camera_active() {
            self.camera_texture = None;
        }
    }

    /// Uploads the photo preview once per captured photo
    fn update_preview_texture(&mut self, ctx: &egui::Context) {
        let display = self.controller.display();
        match &display.preview {
            Some(frame) if self.preview_generation != display.preview_generation => {
                self.preview_texture = Some(load_frame(ctx, "preview", frame));
                self.preview_generation = display.preview_generation;
            }
            Some(_) => {}
            None => self.preview_texture = None,
        }
    }

    /// Renders the control buttons
    fn render_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Bật camera").clicked() {
                    if let Err(e) = self.controller.start_camera() {
                        warn!("Camera not started: {}", e);
                    }
                }
                if ui.button("Nhận diện video").clicked() {
                    if let Err(e) = self.controller.start_video_recognition() {
                        warn!("Video recognition not started: {}", e);
                    }
                }
                if ui.button("Chụp ảnh").clicked() {
                    if let Err(e) = self.controller.capture_photo() {
                        warn!("Photo capture not started: {}", e);
                    }
                }
                if ui.button("Dừng").clicked() {
                    self.controller.stop_video_recognition();
                }

                if let Some(server) = &self.controller.display().server {
                    ui.separator();
                    ui.label(server);
                }
            });
        });
    }

    /// Renders emotion statistics, preview and status panels
    fn render_results(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("emotion_stats")
            .min_width(280.0)
            .show(ctx, |ui| {
                let display = self.controller.display();

                if let Some(count) = display.countdown {
                    ui.heading(format!("{count}"));
                }
                if display.loading {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Đang phân tích...");
                    });
                }
                if let Some(error) = &display.error {
                    ui.colored_label(Color32::RED, error);
                }

                if let Some(dominant) = &display.dominant {
                    ui.heading(crate::display::translate_emotion(dominant));
                }
                for bar in &display.bars {
                    ui.horizontal(|ui| {
                        ui.label(&bar.display_name);
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.label(format!("{}%", bar.percent));
                        });
                    });
                    ui.add(egui::ProgressBar::new(bar.fill()));
                }

                if let (Some(texture), Some(frame)) = (&self.preview_texture, &display.preview) {
                    ui.separator();
                    let width = ui.available_width();
                    let size = egui::vec2(width, width * frame.height as f32 / frame.width as f32);
                    let response = ui.add(egui::Image::new(texture).fit_to_exact_size(size));
                    if let Some(face) = &display.face_box {
                        draw_face_rectangle(
                            ui.painter(),
                            response.rect,
                            display.face_source_size.unwrap_or(frame.size()),
                            face,
                        );
                    }
                }
            });
    }

    /// Renders the live camera view or the drop zone
    fn render_main_view(&mut self, ctx: &egui::Context) {
        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());

        let view = self.controller.display().view;
        egui::CentralPanel::default().show(ctx, |ui| {
            match view {
                View::LiveCamera => self.render_camera_view(ui),
                View::DropZone => self.render_drop_zone(ui, hovering),
            }
        });
    }

    fn render_camera_view(&self, ui: &mut egui::Ui) {
        let Some(texture) = &self.camera_texture else {
            ui.label("Đang mở camera...");
            return;
        };

        let available_size = ui.available_size();
        let texture_size = texture.size_vec2();
        let aspect_ratio = texture_size.x / texture_size.y;

        // Calculate size to fit while maintaining aspect ratio
        let mut display_width = available_size.x;
        let mut display_height = display_width / aspect_ratio;
        if display_height > available_size.y {
            display_height = available_size.y;
            display_width = display_height * aspect_ratio;
        }

        let response = ui.add(
            egui::Image::new(texture).fit_to_exact_size(egui::vec2(display_width, display_height)),
        );

        let display = self.controller.display();
        if let Some(face) = &display.face_box {
            let source = display
                .face_source_size
                .unwrap_or((texture_size.x as u32, texture_size.y as u32));
            draw_face_rectangle(ui.painter(), response.rect, source, face);
        }
    }

    fn render_drop_zone(&mut self, ui: &mut egui::Ui, hovering: bool) {
        let stroke = if hovering {
            HIGHLIGHT_STROKE
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke
        };

        egui::Frame::group(ui.style()).stroke(stroke).show(ui, |ui| {
            ui.set_min_size(egui::vec2(ui.available_width(), 200.0));
            ui.vertical_centered(|ui| {
                ui.add_space(60.0);
                ui.label("Kéo và thả ảnh vào đây");
                ui.add_space(12.0);
                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut self.path_input)
                            .hint_text("Đường dẫn tới ảnh"),
                    );
                    if ui.button("Chọn ảnh").clicked() && !self.path_input.trim().is_empty() {
                        let path = std::path::PathBuf::from(self.path_input.trim());
                        if let Err(e) = self.controller.handle_files(&[path]) {
                            warn!("Selected file not submitted: {}", e);
                        }
                    }
                });
            });
        });
    }
}

/// Converts an RGB frame into a GPU texture
fn load_frame(ctx: &egui::Context, name: &str, frame: &Frame) -> egui::TextureHandle {
    let color_image =
        egui::ColorImage::from_rgb([frame.width as usize, frame.height as usize], &frame.data);
    ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR)
}

/// Strokes the face outline over an image drawn at `image_rect`
fn draw_face_rectangle(
    painter: &egui::Painter,
    image_rect: egui::Rect,
    source_size: (u32, u32),
    face: &FaceBox,
) {
    let scaled = face.scaled(source_size, (image_rect.width(), image_rect.height()));
    let rect = egui::Rect::from_min_size(
        image_rect.min + egui::vec2(scaled.x, scaled.y),
        egui::vec2(scaled.width, scaled.height),
    );
    painter.rect_stroke(rect, 0.0, FACE_STROKE, egui::StrokeKind::Outside);
}

impl eframe::App for EmotionApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);

        self.controller.tick(Instant::now());
        self.controller.drain_completions();

        self.update_camera_texture(ctx);
        self.update_preview_texture(ctx);

        self.render_toolbar(ctx);
        self.render_results(ctx);
        self.render_main_view(ctx);

        // Keep the live feed and pending requests moving
        if self.controller.is_camera_active() {
            ctx.request_repaint_after(Duration::from_millis(33));
        } else {
            ctx.request_repaint_after(Duration::from_millis(200));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.controller.dispose();
    }
}
