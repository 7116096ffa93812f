/// egui front ends
///
/// Each window renders state owned by a `DashboardController` and turns
/// clicks into `DashboardCommand`s; no behaviour lives in the widgets.

pub mod alliance_preview_gui;
pub mod dashboard_gui;

use eframe::egui;
use egui::Color32;

use crate::alliance::Rgb;

pub const TEAM_BLACK: Color32 = Color32::from_rgb(0, 0, 0);
pub const TEAM_YELLOW: Color32 = Color32::from_rgb(255, 255, 0);

pub fn to_color32(rgb: Rgb) -> Color32 {
    Color32::from_rgb(rgb[0], rgb[1], rgb[2])
}

/// Yellow on black team colours
pub fn apply_team_theme(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();
    visuals.panel_fill = TEAM_BLACK;
    visuals.window_fill = TEAM_BLACK;
    visuals.override_text_color = Some(TEAM_YELLOW);
    visuals.widgets.inactive.weak_bg_fill = Color32::from_rgb(60, 60, 0);
    visuals.widgets.hovered.weak_bg_fill = Color32::from_rgb(204, 204, 0);
    visuals.widgets.active.weak_bg_fill = Color32::from_rgb(204, 204, 0);
    ctx.set_visuals(visuals);
}

/// Colour-coded label on a filled background
pub fn badge(ui: &mut egui::Ui, text: &str, fg: Color32, bg: Color32) {
    egui::Frame::none()
        .fill(bg)
        .rounding(4.0)
        .inner_margin(egui::Margin::symmetric(10.0, 4.0))
        .show(ui, |ui| {
            ui.label(egui::RichText::new(text).color(fg).size(18.0).strong());
        });
}

/// Close the window once the token is cancelled (Ctrl-C)
pub fn close_if_cancelled(ctx: &egui::Context, token: &crate::periodic::CancellationToken) -> bool {
    if token.is_cancelled() {
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        return true;
    }
    false
}
