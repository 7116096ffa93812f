/// Robot dashboard: auto selector, motor power, alliance and live telemetry
/// 
/// Run with: cargo run --bin dashboard -- [--offline] [--server 10.59.62.2]

use anyhow::Result;
use clap::Parser;
use eframe::egui;

use frc_dashboard::assets::AutoModeImages;
use frc_dashboard::dashboard::DashboardController;
use frc_dashboard::gui::dashboard_gui::{DashboardGUI, PanelLayout};
use frc_dashboard::periodic::CancellationToken;
use frc_dashboard::startup::{init_logging, install_ctrlc, open_table, CommonArgs};

const DEFAULT_TABLE: &str = "RobotData";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

fn run(cli: Cli) -> Result<()> {
    let settings = cli.common.load_settings(DEFAULT_TABLE)?;
    // Fatal before any window opens
    let images = AutoModeImages::load(&settings.asset_dir)?;

    let token = CancellationToken::new();
    install_ctrlc(&token);
    let (table, link) = open_table(&settings, cli.common.offline, &token);
    let controller = DashboardController::new(table, settings.poll_period, token.clone());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Robot Dashboard")
            .with_inner_size([640.0, 620.0]),
        ..Default::default()
    };

    let table_name = settings.table_name.clone();
    let exit_token = token.clone();
    eframe::run_native(
        "Robot Dashboard",
        options,
        Box::new(move |cc| {
            Box::new(DashboardGUI::new(
                &cc.egui_ctx,
                controller,
                link,
                PanelLayout::Full,
                images,
                token,
                &table_name,
            ))
        }),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))?;

    exit_token.cancel();
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.common.debug);

    if let Err(e) = run(cli) {
        eprintln!("Dashboard failed: {:#}", e);
        std::process::exit(1);
    }
}
