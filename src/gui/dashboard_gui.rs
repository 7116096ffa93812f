use eframe::egui;
use egui::{TextureHandle, TextureOptions};
use std::time::{Duration, Instant};

use crate::alliance::AllianceColor;
use crate::assets::AutoModeImages;
use crate::auto_mode::AutoMode;
use crate::dashboard::{DashboardCommand, DashboardController};
use crate::periodic::CancellationToken;
use crate::remote_table::RemoteTable;
use crate::nt_client::TableClient;

use super::{apply_team_theme, badge, close_if_cancelled, to_color32};

/// Image display width on the selector panel
const PREVIEW_WIDTH: f32 = 350.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelLayout {
    /// Selector + motor power + alliance + live telemetry
    Full,
    /// Auto selector only, in team colours
    SelectorOnly,
}

pub struct DashboardGUI {
    controller: DashboardController<Box<dyn RemoteTable>>,
    link: Option<TableClient>,
    layout: PanelLayout,
    textures: Vec<TextureHandle>,
    power_text: String,
    alliance_pick: AllianceColor,
    token: CancellationToken,
    table_name: String,
}

impl DashboardGUI {
    pub fn new(
        ctx: &egui::Context,
        mut controller: DashboardController<Box<dyn RemoteTable>>,
        link: Option<TableClient>,
        layout: PanelLayout,
        images: AutoModeImages,
        token: CancellationToken,
        table_name: &str,
    ) -> Self {
        let textures = images
            .into_images()
            .into_iter()
            .zip(AutoMode::ALL)
            .map(|(image, mode)| ctx.load_texture(mode.identifier(), image, TextureOptions::LINEAR))
            .collect();

        if layout == PanelLayout::SelectorOnly {
            apply_team_theme(ctx);
        } else {
            controller.start(Instant::now());
        }

        Self {
            controller,
            link,
            layout,
            textures,
            power_text: String::new(),
            alliance_pick: AllianceColor::default(),
            token,
            table_name: table_name.to_string(),
        }
    }

    fn render_selector(&self, ui: &mut egui::Ui, commands: &mut Vec<DashboardCommand>) {
        let view = self.controller.view();
        if let Some(texture) = self.textures.get(view.displayed_asset.index()) {
            ui.add(egui::Image::new(texture).max_width(PREVIEW_WIDTH));
        }
        ui.label(&view.status);
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            for mode in AutoMode::ALL {
                if ui.button(mode.label()).clicked() {
                    commands.push(DashboardCommand::SelectAuto(mode));
                }
            }
        });
    }

    fn render_controls(&mut self, ui: &mut egui::Ui, commands: &mut Vec<DashboardCommand>) {
        ui.horizontal(|ui| {
            ui.label("Motor Power:");
            ui.add(egui::TextEdit::singleline(&mut self.power_text).desired_width(80.0));
            if ui.button("Set Power").clicked() {
                commands.push(DashboardCommand::SubmitMotorPower(self.power_text.clone()));
            }
            if let Some(power) = self.controller.view().last_motor_power {
                ui.weak(format!("sent {:.2}", power));
            }
        });

        ui.horizontal(|ui| {
            egui::ComboBox::from_label("Alliance")
                .selected_text(self.alliance_pick.as_str())
                .show_ui(ui, |ui| {
                    for color in AllianceColor::CHOICES {
                        ui.selectable_value(&mut self.alliance_pick, color, color.as_str());
                    }
                });
            if ui.button("Set Alliance").clicked() {
                commands.push(DashboardCommand::SubmitAlliance(self.alliance_pick));
            }
        });
    }

    fn render_telemetry(&self, ui: &mut egui::Ui) {
        let view = self.controller.view();
        ui.label(egui::RichText::new(&view.speed_text).size(18.0));
        let (fg, bg) = view.alliance_colors;
        badge(ui, &view.alliance_text, to_color32(fg), to_color32(bg));
    }

    fn render_link_status(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            match &self.link {
                Some(client) if client.is_connected() => {
                    ui.colored_label(egui::Color32::GREEN, format!("Connected to {}", client.endpoint()));
                }
                Some(client) => {
                    ui.colored_label(egui::Color32::RED, format!("Waiting for {}", client.endpoint()));
                }
                None => {
                    ui.colored_label(egui::Color32::GRAY, "Offline (local table)");
                }
            }
            ui.weak(format!("table '{}'", self.table_name));
            if let Some(at) = self.controller.view().last_update {
                ui.weak(format!("updated {}", at.format("%H:%M:%S")));
            }
        });
    }
}

impl eframe::App for DashboardGUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if close_if_cancelled(ctx, &self.token) {
            return;
        }

        let now = Instant::now();
        self.controller.poll(now);

        let mut commands = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            match self.layout {
                PanelLayout::SelectorOnly => {
                    ui.vertical_centered(|ui| {
                        ui.heading(egui::RichText::new("FRC TEAM 5962 AUTONOMOUS SELECTOR").size(22.0).strong());
                        ui.add_space(10.0);
                        self.render_selector(ui, &mut commands);
                    });
                }
                PanelLayout::Full => {
                    ui.heading("Robot Dashboard");
                    ui.separator();
                    self.render_selector(ui, &mut commands);
                    ui.separator();
                    self.render_controls(ui, &mut commands);
                    ui.separator();
                    self.render_telemetry(ui);
                }
            }
            ui.separator();
            self.render_link_status(ui);
        });

        for command in commands {
            self.controller.handle(command);
        }

        // Wake up for the next telemetry tick even without input
        let wait = self
            .controller
            .time_until_next_poll(Instant::now())
            .unwrap_or(Duration::from_millis(250));
        ctx.request_repaint_after(wait);
    }
}
