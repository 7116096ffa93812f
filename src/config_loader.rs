use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVER_ADDRESS: &str = "10.59.62.2";
pub const DEFAULT_NT_PORT: u16 = 5810;
pub const DEFAULT_POLL_PERIOD_MS: u64 = 100;
pub const DEFAULT_RECONNECT_MS: u64 = 1000;
pub const DEFAULT_ASSET_DIR: &str = "assets";

/// One block of dashboard.yaml. Every key is optional so host blocks only
/// need to list what differs from `default`.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct HostSettings {
    pub server_address: Option<String>,
    pub nt_port: Option<u16>,
    pub table_name: Option<String>,
    pub poll_period_ms: Option<u64>,
    pub reconnect_ms: Option<u64>,
    pub asset_dir: Option<String>,
}

impl HostSettings {
    /// Keys set in `other` win
    fn merged_with(&self, other: &HostSettings) -> HostSettings {
        HostSettings {
            server_address: other.server_address.clone().or_else(|| self.server_address.clone()),
            nt_port: other.nt_port.or(self.nt_port),
            table_name: other.table_name.clone().or_else(|| self.table_name.clone()),
            poll_period_ms: other.poll_period_ms.or(self.poll_period_ms),
            reconnect_ms: other.reconnect_ms.or(self.reconnect_ms),
            asset_dir: other.asset_dir.clone().or_else(|| self.asset_dir.clone()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DashboardConfig {
    pub default: Option<HostSettings>,
    pub hosts: Option<BTreeMap<String, HostSettings>>, // hostname -> overrides
}

/// Resolved settings a binary runs with
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub server_address: String,
    pub nt_port: u16,
    pub table_name: String,
    pub poll_period: Duration,
    pub reconnect_delay: Duration,
    pub asset_dir: PathBuf,
}

/// Values coming from the environment or the command line
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub server_address: Option<String>,
    pub nt_port: Option<u16>,
    pub table_name: Option<String>,
}

impl DashboardConfig {
    /// Merge `default` with the block for `hostname`, filling anything still
    /// unset from built-in defaults
    pub fn settings_for(&self, hostname: &str, default_table: &str) -> DashboardSettings {
        let base = self.default.clone().unwrap_or_default();
        let merged = match self.hosts.as_ref().and_then(|h| h.get(hostname)) {
            Some(host) => {
                log::debug!(target: "config_loader", "Applying host block for '{}'", hostname);
                base.merged_with(host)
            }
            None => base,
        };

        let asset_dir = PathBuf::from(merged.asset_dir.unwrap_or_else(|| DEFAULT_ASSET_DIR.to_string()));
        let asset_dir = if asset_dir.is_relative() {
            crate_root().join(asset_dir)
        } else {
            asset_dir
        };

        DashboardSettings {
            server_address: merged.server_address.unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string()),
            nt_port: merged.nt_port.unwrap_or(DEFAULT_NT_PORT),
            table_name: merged.table_name.unwrap_or_else(|| default_table.to_string()),
            poll_period: Duration::from_millis(merged.poll_period_ms.unwrap_or(DEFAULT_POLL_PERIOD_MS)),
            reconnect_delay: Duration::from_millis(merged.reconnect_ms.unwrap_or(DEFAULT_RECONNECT_MS)),
            asset_dir,
        }
    }
}

impl DashboardSettings {
    pub fn apply(&mut self, overrides: &SettingsOverrides) {
        if let Some(addr) = &overrides.server_address {
            self.server_address = addr.clone();
        }
        if let Some(port) = overrides.nt_port {
            self.nt_port = port;
        }
        if let Some(table) = &overrides.table_name {
            self.table_name = table.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_address.trim().is_empty() {
            return Err(anyhow!("SERVER_ADDRESS must not be empty"));
        }
        if self.table_name.trim().is_empty() {
            return Err(anyhow!("TABLE_NAME must not be empty"));
        }
        if self.nt_port == 0 {
            return Err(anyhow!("NT_PORT must not be 0"));
        }
        let poll_ms = self.poll_period.as_millis();
        if !(10..=5000).contains(&poll_ms) {
            return Err(anyhow!("POLL_PERIOD_MS must be between 10 and 5000, got {}", poll_ms));
        }
        let reconnect_ms = self.reconnect_delay.as_millis();
        if !(10..=60_000).contains(&reconnect_ms) {
            return Err(anyhow!("RECONNECT_MS must be between 10 and 60000, got {}", reconnect_ms));
        }
        Ok(())
    }

    pub fn server_endpoint(&self) -> String {
        format!("{}:{}", self.server_address, self.nt_port)
    }
}

fn crate_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn default_config_path() -> PathBuf {
    crate_root().join("dashboard.yaml")
}

pub fn parse_config(yaml: &str) -> Result<DashboardConfig> {
    let config: DashboardConfig = serde_yaml::from_str(yaml)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<DashboardConfig> {
    let file = File::open(path)
        .map_err(|e| anyhow!("Missing required dashboard config at {:?}: {}", path, e))?;
    let config: DashboardConfig = serde_yaml::from_reader(file)
        .with_context(|| format!("Invalid dashboard config at {:?}", path))?;
    Ok(config)
}

/// Build overrides from a variable lookup (`DASHBOARD_SERVER`,
/// `DASHBOARD_PORT`, `DASHBOARD_TABLE`)
pub fn overrides_from_lookup<F>(lookup: F) -> Result<SettingsOverrides>
where
    F: Fn(&str) -> Option<String>,
{
    let nt_port = match lookup("DASHBOARD_PORT") {
        Some(raw) => Some(
            raw.trim()
                .parse::<u16>()
                .map_err(|e| anyhow!("DASHBOARD_PORT '{}' is not a port number: {}", raw, e))?,
        ),
        None => None,
    };
    Ok(SettingsOverrides {
        server_address: lookup("DASHBOARD_SERVER"),
        nt_port,
        table_name: lookup("DASHBOARD_TABLE"),
    })
}

pub fn env_overrides() -> Result<SettingsOverrides> {
    // .env is optional
    let _ = dotenv();
    overrides_from_lookup(|key| env::var(key).ok())
}

/// Load settings for this host: config file, then environment, then CLI.
pub fn load_dashboard_settings(
    config_path: Option<&Path>,
    default_table: &str,
    cli: &SettingsOverrides,
) -> Result<DashboardSettings> {
    let path = config_path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let config = load_config(&path)?;

    let hostname = gethostname::gethostname().to_string_lossy().to_string();
    let mut settings = config.settings_for(&hostname, default_table);
    settings.apply(&env_overrides()?);
    settings.apply(cli);
    settings.validate()?;

    log::info!(target: "config_loader", "Dashboard settings: server={}, table='{}', poll={} ms, assets={:?} (hostname={})",
               settings.server_endpoint(), settings.table_name, settings.poll_period.as_millis(),
               settings.asset_dir, hostname);
    Ok(settings)
}
