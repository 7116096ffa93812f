/// Shared startup for the GUI binaries: command line, logging, Ctrl-C and
/// table selection

use anyhow::Result;
use clap::Args;
use log::{info, LevelFilter};
use std::path::PathBuf;

use crate::config_loader::{load_dashboard_settings, DashboardSettings, SettingsOverrides};
use crate::periodic::CancellationToken;
use crate::remote_table::{MemoryTable, RemoteTable};
use crate::nt_client::TableClient;

#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Dashboard config file (defaults to dashboard.yaml next to Cargo.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// NT server address, overrides SERVER_ADDRESS
    #[arg(long)]
    pub server: Option<String>,
    /// NT server port, overrides NT_PORT
    #[arg(long)]
    pub port: Option<u16>,
    /// Table name, overrides TABLE_NAME
    #[arg(long)]
    pub table: Option<String>,
    /// Use an in-process table instead of connecting to the robot
    #[arg(long, default_value_t = false)]
    pub offline: bool,
    /// Debug level logging
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

impl CommonArgs {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            server_address: self.server.clone(),
            nt_port: self.port,
            table_name: self.table.clone(),
        }
    }

    pub fn load_settings(&self, default_table: &str) -> Result<DashboardSettings> {
        load_dashboard_settings(self.config.as_deref(), default_table, &self.overrides())
    }
}

/// RUST_LOG still wins over the level picked here
pub fn init_logging(debug: bool) {
    let level = if debug { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Cancel `token` on Ctrl-C
pub fn install_ctrlc(token: &CancellationToken) {
    let t = token.clone();
    if let Err(e) = ctrlc::set_handler(move || t.cancel()) {
        log::warn!("Could not install Ctrl-C handler: {}", e);
    }
}

/// Table the controller talks to, plus the NT client when online
pub fn open_table(
    settings: &DashboardSettings,
    offline: bool,
    token: &CancellationToken,
) -> (Box<dyn RemoteTable>, Option<TableClient>) {
    if offline {
        info!("Offline mode: using in-process table '{}'", settings.table_name);
        return (Box::new(MemoryTable::new(&settings.table_name)), None);
    }
    let client = TableClient::connect(&settings.server_endpoint(), settings.reconnect_delay, token.clone());
    let table = client.get_table(&settings.table_name);
    (Box::new(table), Some(client))
}
