/// Alliance field preview (experimental)
///
/// Flips the field picture between red and blue with one button and writes
/// the chosen alliance to the table.

use eframe::egui;
use egui::{TextureHandle, TextureOptions};
use std::time::Duration;

use crate::alliance::AllianceColor;
use crate::assets::AllianceImages;
use crate::dashboard::{DashboardCommand, DashboardController};
use crate::periodic::CancellationToken;
use crate::remote_table::RemoteTable;
use crate::telemetry::format_alliance;

use super::{badge, close_if_cancelled, to_color32};

pub struct AlliancePreviewGUI {
    controller: DashboardController<Box<dyn RemoteTable>>,
    red: TextureHandle,
    blue: TextureHandle,
    token: CancellationToken,
}

impl AlliancePreviewGUI {
    pub fn new(
        ctx: &egui::Context,
        controller: DashboardController<Box<dyn RemoteTable>>,
        images: AllianceImages,
        token: CancellationToken,
    ) -> Self {
        Self {
            controller,
            red: ctx.load_texture("alliance_red", images.red, TextureOptions::LINEAR),
            blue: ctx.load_texture("alliance_blue", images.blue, TextureOptions::LINEAR),
            token,
        }
    }
}

impl eframe::App for AlliancePreviewGUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if close_if_cancelled(ctx, &self.token) {
            return;
        }

        let mut switch = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            if ui.button("Switch Color").clicked() {
                switch = true;
            }
            let choice = self.controller.alliance_choice();
            match choice {
                AllianceColor::Red => {
                    ui.add(egui::Image::new(&self.red).shrink_to_fit());
                }
                AllianceColor::Blue => {
                    ui.add(egui::Image::new(&self.blue).shrink_to_fit());
                }
                AllianceColor::Unknown => {
                    ui.label("No alliance selected");
                }
            }
            let (fg, bg) = choice.color_pair();
            badge(ui, &format_alliance(choice), to_color32(fg), to_color32(bg));
        });

        if switch {
            self.controller.handle(DashboardCommand::ToggleAlliance);
        }
        // Keep checking the cancel flag while idle
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}
