use eframe::egui;
use egui::{Color32, ColorImage, Rect, Sense, Stroke, TextureHandle, TextureOptions, Vec2, pos2, vec2};
use std::sync::mpsc;
use std::time::Duration;

use crate::brush::{BrushColor, BrushKind, MAX_BRUSH_SIZE, MIN_BRUSH_SIZE, PRESET_COLORS, StrokePoint};
use crate::config::StudioConfig;
use crate::logger;
use crate::loader::{UploadOutcome, pick_image_path, pick_mask_save_path, spawn_upload};
use crate::session::MaskSession;
use crate::state::ColorChoice;
use crate::surface::DrawingSurface;

const SWATCH_SIZE: f32 = 26.0;
/// Width of each image in the original / mask preview pair.
const PREVIEW_WIDTH: f32 = 380.0;

pub struct MaskStudioApp {
    session: MaskSession,

    upload_sender: mpsc::Sender<UploadOutcome>,
    upload_receiver: mpsc::Receiver<UploadOutcome>,
    pending_uploads: usize,

    /// Composite of the surface, keyed on (upload generation, surface revision).
    canvas_texture: Option<TextureHandle>,
    canvas_texture_key: Option<(u64, u64)>,
    original_texture: Option<TextureHandle>,
    mask_texture: Option<TextureHandle>,

    /// A pointer drag is feeding the current stroke.
    stroking: bool,
    /// Message shown in the modal alert until dismissed.
    alert: Option<String>,
}

impl MaskStudioApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: StudioConfig) -> Self {
        let (upload_sender, upload_receiver) = mpsc::channel();
        Self {
            session: MaskSession::new(config),
            upload_sender,
            upload_receiver,
            pending_uploads: 0,
            canvas_texture: None,
            canvas_texture_key: None,
            original_texture: None,
            mask_texture: None,
            stroking: false,
            alert: None,
        }
    }

    // ========================================================================
    // ASYNC UPLOAD
    // ========================================================================

    fn start_upload(&mut self) {
        let Some(path) = pick_image_path() else {
            return;
        };
        let generation = self.session.begin_upload();
        self.pending_uploads += 1;
        spawn_upload(path, generation, self.upload_sender.clone());
    }

    fn poll_uploads(&mut self, ctx: &egui::Context) {
        while let Ok(outcome) = self.upload_receiver.try_recv() {
            self.pending_uploads = self.pending_uploads.saturating_sub(1);
            match self.session.finish_upload(outcome) {
                Ok(true) => {
                    self.stroking = false;
                    self.mask_texture = None;
                    self.original_texture = self.session.original().map(|img| {
                        ctx.load_texture("original_image", to_color_image(&img.pixels), TextureOptions::LINEAR)
                    });
                }
                Ok(false) => {}
                Err(e) => self.alert = Some(e.user_message()),
            }
        }
        if self.pending_uploads > 0 {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }

    // ========================================================================
    // ACTIONS
    // ========================================================================

    fn generate_mask(&mut self, ctx: &egui::Context) {
        // Failures are logged by the session and leave no mask behind.
        let Ok(mask) = self.session.generate_mask() else {
            self.mask_texture = None;
            return;
        };
        match mask.decode_preview() {
            Ok(pixels) => {
                self.mask_texture = Some(ctx.load_texture(
                    "generated_mask",
                    to_color_image(&pixels),
                    TextureOptions::LINEAR,
                ));
            }
            Err(e) => log_warn!("Mask preview unavailable: {}", e),
        }
    }

    fn clear_canvas(&mut self) {
        self.stroking = false;
        self.session.clear();
        self.mask_texture = None;
    }

    fn download_mask(&mut self) {
        if self.session.mask().is_none() {
            self.alert = Some("Please generate a mask first.".to_string());
            return;
        }
        let Some(path) = pick_mask_save_path(&self.session.config().mask_file_name) else {
            return;
        };
        if let Err(e) = self.session.download_mask(&path) {
            log_err!("Saving mask to {} failed: {}", path.display(), e);
            self.alert = Some(e.user_message());
        }
    }

    // ========================================================================
    // PANELS
    // ========================================================================

    fn upload_section(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.vertical_centered(|ui| {
                let label = if self.pending_uploads > 0 {
                    "Loading…"
                } else {
                    "Upload Image"
                };
                if ui
                    .add_enabled(self.pending_uploads == 0, egui::Button::new(label))
                    .clicked()
                {
                    self.start_upload();
                }
                ui.weak(self.session.config().upload_hint.as_str());
                if let Some(original) = self.session.original() {
                    ui.small(original.display_name());
                }
            });
        });
    }

    fn brush_controls(&mut self, ui: &mut egui::Ui) {
        let brush = self.session.state().brush;

        ui.horizontal(|ui| {
            let mut size = brush.size;
            ui.label("Brush Size");
            if ui
                .add(egui::Slider::new(&mut size, MIN_BRUSH_SIZE..=MAX_BRUSH_SIZE).suffix("px"))
                .changed()
            {
                self.session.set_brush_size(size);
            }

            ui.add_space(16.0);

            let mut kind = brush.kind;
            egui::ComboBox::from_label("Brush Type")
                .selected_text(kind.label())
                .show_ui(ui, |ui| {
                    for k in BrushKind::all() {
                        ui.selectable_value(&mut kind, *k, k.label());
                    }
                });
            if kind != brush.kind {
                self.session.set_brush_kind(kind);
            }
        });

        ui.horizontal(|ui| {
            ui.label("Brush Color");
            let choice = self.session.state().color_choice;
            for (index, color) in PRESET_COLORS.iter().enumerate() {
                let selected = choice == ColorChoice::Preset(index);
                if color_swatch(ui, *color, selected).clicked() {
                    self.session.select_preset(index);
                }
            }

            ui.separator();

            let mut custom = self.session.state().custom_color.rgb();
            let response = ui
                .color_edit_button_srgb(&mut custom)
                .on_hover_text("Custom color");
            if response.changed() || (response.clicked() && !self.session.state().is_custom_color()) {
                self.session.pick_custom_color(BrushColor(custom));
            }
            if self.session.state().is_custom_color() {
                ui.painter().rect_stroke(
                    response.rect.expand(2.0),
                    3.0,
                    Stroke::new(2.0, ui.visuals().selection.stroke.color),
                );
            }
        });
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let Some(surface) = self.session.surface() else {
            ui.colored_label(ui.visuals().error_fg_color, "Canvas unavailable.");
            return;
        };

        let dims = surface.dimensions();
        let key = (self.session.state().upload_generation, surface.revision());
        if self.canvas_texture_key != Some(key) || self.canvas_texture.is_none() {
            let image = to_color_image(&surface.composite());
            let texture_size = [dims.width as usize, dims.height as usize];
            let reusable = self
                .canvas_texture
                .as_ref()
                .is_some_and(|handle| handle.size() == texture_size);
            if reusable && let Some(handle) = self.canvas_texture.as_mut() {
                handle.set(image, TextureOptions::NEAREST);
            } else {
                self.canvas_texture =
                    Some(ui.ctx().load_texture("mask_canvas", image, TextureOptions::NEAREST));
            }
            self.canvas_texture_key = Some(key);
        }

        let size = vec2(dims.width as f32, dims.height as f32);
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
        if let Some(texture) = &self.canvas_texture {
            ui.painter().image(
                texture.id(),
                rect,
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }
        ui.painter()
            .rect_stroke(rect, 0.0, Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color));

        // Map screen points to canvas pixels.
        let to_canvas = |pos: egui::Pos2| {
            let local: Vec2 = pos - rect.min;
            StrokePoint::new(
                local.x * dims.width as f32 / rect.width(),
                local.y * dims.height as f32 / rect.height(),
            )
        };

        if response.is_pointer_button_down_on()
            && let Some(pos) = response.interact_pointer_pos()
        {
            let p = to_canvas(pos);
            if self.stroking {
                self.session.extend_stroke(p);
            } else {
                self.session.begin_stroke(p);
                self.stroking = true;
            }
        } else if self.stroking {
            self.session.end_stroke();
            self.stroking = false;
        }

        if response.hovered() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Crosshair);
        }
    }

    fn actions(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Generate Mask").clicked() {
                self.generate_mask(ui.ctx());
            }
            if ui.button("Clear Canvas").clicked() {
                self.clear_canvas();
            }
            ui.separator();
            ui.weak(self.session.state().phase.label());
        });
    }

    fn preview(&mut self, ui: &mut egui::Ui) {
        if !self.session.state().shows_preview() {
            return;
        }
        let (Some(original), Some(mask)) = (&self.original_texture, &self.mask_texture) else {
            return;
        };

        ui.separator();
        ui.horizontal_top(|ui| {
            for (title, texture) in [("Original Image", original), ("Generated Mask", mask)] {
                ui.vertical(|ui| {
                    ui.strong(title);
                    let [w, h] = texture.size();
                    let scale = (PREVIEW_WIDTH / w as f32).min(1.0);
                    ui.image((texture.id(), vec2(w as f32 * scale, h as f32 * scale)));
                });
            }
        });
        if ui.button("Download Mask").clicked() {
            self.download_mask();
        }
    }

    fn alert_window(&mut self, ctx: &egui::Context) {
        let Some(message) = self.alert.clone() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Image Masking Studio")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.alert = None;
        }
    }
}

impl eframe::App for MaskStudioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_uploads(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            // Input is frozen while the alert is up.
            ui.set_enabled(self.alert.is_none());
            egui::ScrollArea::both().show(ui, |ui| {
                ui.heading("Image Masking Studio");
                ui.add_space(8.0);
                self.upload_section(ui);
                ui.add_space(8.0);
                self.brush_controls(ui);
                ui.add_space(8.0);
                self.canvas(ui);
                ui.add_space(8.0);
                self.actions(ui);
                self.preview(ui);
                if let Some(path) = logger::log_path() {
                    ui.add_space(8.0);
                    ui.small(format!("Log: {}", path.display()));
                }
            });
        });

        self.alert_window(ctx);
    }
}

fn to_color_image(pixels: &image::RgbaImage) -> ColorImage {
    let (w, h) = pixels.dimensions();
    ColorImage::from_rgba_unmultiplied([w as usize, h as usize], pixels.as_raw())
}

/// A round preset swatch, ringed when selected.
fn color_swatch(ui: &mut egui::Ui, color: BrushColor, selected: bool) -> egui::Response {
    let (rect, response) = ui.allocate_exact_size(Vec2::splat(SWATCH_SIZE), Sense::click());
    let [r, g, b] = color.rgb();
    let ring = if selected {
        Stroke::new(3.0, ui.visuals().selection.stroke.color)
    } else if response.hovered() {
        Stroke::new(2.0, ui.visuals().widgets.hovered.fg_stroke.color)
    } else {
        Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color)
    };
    ui.painter()
        .circle(rect.center(), SWATCH_SIZE * 0.5 - 2.0, Color32::from_rgb(r, g, b), ring);
    response.on_hover_text(color.to_hex())
}
