/// Alliance field preview with a single "Switch Color" button
/// 
/// Run with: cargo run --bin alliance_preview

use anyhow::Result;
use clap::Parser;
use eframe::egui;

use frc_dashboard::assets::AllianceImages;
use frc_dashboard::dashboard::DashboardController;
use frc_dashboard::gui::alliance_preview_gui::AlliancePreviewGUI;
use frc_dashboard::periodic::CancellationToken;
use frc_dashboard::startup::{init_logging, install_ctrlc, open_table, CommonArgs};

const DEFAULT_TABLE: &str = "Auto Chooser";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

fn run(cli: Cli) -> Result<()> {
    let settings = cli.common.load_settings(DEFAULT_TABLE)?;
    let images = AllianceImages::load(&settings.asset_dir)?;

    let token = CancellationToken::new();
    install_ctrlc(&token);
    // The link status isn't shown here; the client only has to outlive the window
    let (table, _link) = open_table(&settings, cli.common.offline, &token);
    let controller = DashboardController::new(table, settings.poll_period, token.clone());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Alliance Preview")
            .with_inner_size([600.0, 550.0])
            .with_resizable(false),
        ..Default::default()
    };

    let exit_token = token.clone();
    eframe::run_native(
        "Alliance Preview",
        options,
        Box::new(move |cc| Box::new(AlliancePreviewGUI::new(&cc.egui_ctx, controller, images, token))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))?;

    exit_token.cancel();
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.common.debug);

    if let Err(e) = run(cli) {
        eprintln!("Alliance preview failed: {:#}", e);
        std::process::exit(1);
    }
}
