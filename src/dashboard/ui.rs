//! egui renderer for the dashboard.

pub(crate) mod style;

use std::time::{Duration, Instant};

use eframe::egui::{
    self, Align, Align2, Area, Color32, Frame, Id, Layout, Margin, Order, RichText, ScrollArea,
    Stroke, Ui,
};

use super::controller::DashboardController;
use super::state::StatusTone;

/// Smallest window that still fits the sidebar and the preview.
pub const MIN_VIEWPORT_SIZE: egui::Vec2 = egui::vec2(760.0, 520.0);
const IDLE_REPAINT: Duration = Duration::from_millis(500);
const BUSY_REPAINT: Duration = Duration::from_millis(50);
const PREVIEW_HEIGHT: f32 = 260.0;

/// Renders the dashboard from the controller state.
pub struct DashboardApp {
    controller: DashboardController,
    visuals_set: bool,
}

impl DashboardApp {
    /// Create the app, loading persisted configuration.
    pub fn new() -> Result<Self, String> {
        let mut controller = DashboardController::new(Default::default());
        controller
            .load_configuration()
            .map_err(|err| format!("Failed to load config: {err}"))?;
        Ok(Self::with_controller(controller))
    }

    pub fn with_controller(controller: DashboardController) -> Self {
        Self {
            controller,
            visuals_set: false,
        }
    }

    fn apply_visuals(&mut self, ctx: &egui::Context) {
        if self.visuals_set {
            return;
        }
        let mut visuals = egui::Visuals::dark();
        style::apply_visuals(&mut visuals);
        ctx.set_visuals(visuals);
        self.visuals_set = true;
    }

    fn consume_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped_files = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped_files {
            if let Some(path) = file.path.as_deref() {
                if is_json_path(path) {
                    self.controller.load_input_file(path);
                } else {
                    self.controller
                        .push_toast("Drop a .json file to load it", StatusTone::Warning);
                }
            } else if let Some(bytes) = file.bytes.as_deref() {
                self.controller.load_input_bytes(file.name.clone(), None, bytes);
            }
        }
    }

    fn render_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("config_panel")
            .resizable(false)
            .default_width(250.0)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                ui.heading("⚙️ Configuration");
                ui.add_space(6.0);
                self.render_health(ui);
                ui.separator();
                self.render_backend_url(ui);
            });
    }

    fn render_health(&mut self, ui: &mut Ui) {
        let health = &self.controller.ui.health;
        let palette = style::palette();
        let color = match &health.last {
            Some(state) if state.is_online() && !health.model_missing() => palette.success,
            Some(state) if state.is_online() => palette.warning,
            Some(_) => palette.error,
            None => palette.text_muted,
        };
        ui.horizontal(|ui| {
            ui.label(RichText::new(health.summary()).color(color));
            if health.checking {
                ui.add(egui::Spinner::new().size(12.0));
            }
        });
        if health.model_missing() {
            ui.label(
                RichText::new("Backend has no model loaded")
                    .small()
                    .color(palette.warning),
            );
        }
        if let Some(crate::client::BackendHealth::Offline { reason }) = &health.last {
            ui.label(RichText::new(reason).small().color(palette.text_muted));
        }
        if ui.button("🔄 Check again").clicked() {
            self.controller.refresh_health();
        }
    }

    fn render_backend_url(&mut self, ui: &mut Ui) {
        let palette = style::palette();
        ui.label("Backend URL");
        let response = ui.text_edit_singleline(&mut self.controller.ui.config.backend_url_input);
        let submitted =
            response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        let changed = self.controller.ui.config.backend_url_input.trim()
            != self.controller.ui.config.backend_url;
        let apply = ui.add_enabled(changed, egui::Button::new("Apply")).clicked();
        if (submitted && changed) || apply {
            self.controller.apply_backend_url_input();
        }
        if let Some(err) = &self.controller.ui.config.last_error {
            ui.label(RichText::new(err).small().color(palette.error));
        }
    }

    fn render_center(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .id_salt("dashboard_scroll")
                .show(ui, |ui| {
                    ui.heading("🌼 Iris Flower Species Prediction");
                    ui.label(
                        RichText::new("Predict the species of an iris from four measurements.")
                            .color(style::palette().text_muted),
                    );
                    ui.add_space(12.0);
                    self.render_input_options(ui);
                    ui.add_space(12.0);
                    self.render_preview(ui);
                    ui.add_space(12.0);
                    self.render_prediction(ui);
                });
        });
    }

    fn render_input_options(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("📂 Input Options").strong());
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            let fetching = self.controller.ui.input.fetching_sample;
            if ui
                .add_enabled(!fetching, egui::Button::new("🎲 Use Random Sample"))
                .clicked()
            {
                self.controller.request_random_sample();
            }
            if fetching {
                ui.add(egui::Spinner::new());
            }
            ui.separator();
            if ui.button("📁 Upload JSON…").clicked() {
                self.controller.pick_input_file();
            }
            let has_file = self.controller.ui.input.file.is_some();
            if ui
                .add_enabled(has_file, egui::Button::new("✖ Clear file"))
                .clicked()
            {
                self.controller.clear_input_file();
            }
        });
        if let Some(file) = &self.controller.ui.input.file {
            ui.label(
                RichText::new(format!("Loaded file: {}", file.name))
                    .small()
                    .color(style::palette().text_muted),
            );
        } else {
            ui.label(
                RichText::new("Or drop a .json file onto the window")
                    .small()
                    .color(style::palette().text_muted),
            );
        }
    }

    fn render_preview(&mut self, ui: &mut Ui) {
        let Some((title, preview)) = self.controller.ui.input.active_preview() else {
            return;
        };
        ui.label(RichText::new(title).strong());
        Frame::default()
            .fill(style::compartment_fill())
            .stroke(style::outer_border())
            .inner_margin(Margin::same(8))
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ScrollArea::vertical()
                    .id_salt("preview_scroll")
                    .max_height(PREVIEW_HEIGHT)
                    .show(ui, |ui| {
                        ui.label(RichText::new(preview).monospace());
                    });
            });
    }

    fn render_prediction(&mut self, ui: &mut Ui) {
        let in_flight = self.controller.ui.prediction.in_flight;
        ui.horizontal(|ui| {
            let button = egui::Button::new(RichText::new("🚀 Predict").strong());
            if ui.add_enabled(!in_flight, button).clicked() {
                self.controller.predict();
            }
            if in_flight {
                ui.add(egui::Spinner::new());
                ui.label("🔮 Model is predicting...");
            }
        });
        let Some(result) = &self.controller.ui.prediction.result else {
            return;
        };
        ui.add_space(12.0);
        ui.label(RichText::new("📊 Prediction Results").strong());
        Frame::default()
            .fill(style::result_fill())
            .stroke(Stroke::new(1.0, style::palette().success))
            .inner_margin(Margin::same(10))
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.label(
                    RichText::new(result.message())
                        .size(18.0)
                        .color(style::palette().accent_mint),
                );
            });
    }

    fn render_status(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .frame(Frame::default().fill(Color32::from_rgb(0, 0, 0)))
            .show(ctx, |ui| {
                let status = &self.controller.ui.status;
                ui.horizontal(|ui| {
                    ui.add_space(8.0);
                    ui.painter().circle_filled(
                        ui.cursor().min + egui::vec2(9.0, 11.0),
                        9.0,
                        status.badge_color,
                    );
                    ui.add_space(22.0);
                    ui.label(RichText::new(&status.badge_label).color(Color32::WHITE));
                    ui.separator();
                    ui.label(RichText::new(&status.text).color(Color32::WHITE));
                });
            });
    }

    fn render_toasts(&mut self, ctx: &egui::Context) {
        if self.controller.ui.toasts.is_empty() {
            return;
        }
        let palette = style::palette();
        let mut dismissed = None;
        Area::new(Id::new("toast_overlay"))
            .order(Order::Foreground)
            .anchor(Align2::RIGHT_TOP, egui::vec2(-12.0, 12.0))
            .show(ctx, |ui| {
                ui.with_layout(Layout::top_down(Align::Max), |ui| {
                    for toast in &self.controller.ui.toasts {
                        Frame::window(&ctx.style())
                            .fill(palette.bg_primary)
                            .stroke(Stroke::new(1.0, style::tone_color(toast.tone)))
                            .show(ui, |ui| {
                                ui.horizontal(|ui| {
                                    ui.label(RichText::new(&toast.text).color(palette.text_primary));
                                    if ui.small_button("✖").clicked() {
                                        dismissed = Some(toast.id);
                                    }
                                });
                            });
                        ui.add_space(6.0);
                    }
                });
            });
        if let Some(id) = dismissed {
            self.controller.dismiss_toast(id);
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_visuals(ctx);
        self.controller.tick(Instant::now());
        self.consume_dropped_files(ctx);
        self.render_sidebar(ctx);
        self.render_status(ctx);
        self.render_center(ctx);
        self.render_toasts(ctx);
        let busy = self.controller.is_busy() || !self.controller.ui.toasts.is_empty();
        ctx.request_repaint_after(if busy { BUSY_REPAINT } else { IDLE_REPAINT });
    }
}

fn is_json_path(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn only_json_files_are_accepted_on_drop() {
        assert!(is_json_path(Path::new("/tmp/input.json")));
        assert!(is_json_path(Path::new("INPUT.JSON")));
        assert!(!is_json_path(Path::new("input.csv")));
        assert!(!is_json_path(Path::new("input")));
    }
}
