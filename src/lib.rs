/// FRC Dashboard Library
/// 
/// Shared modules for the dashboard, auto selector and alliance preview GUIs

pub mod alliance;
pub mod assets;
pub mod auto_mode;
pub mod config_loader;
pub mod dashboard;
pub mod gui;
pub mod periodic;
pub mod remote_table;
pub mod startup;
pub mod nt_client;
pub mod telemetry;
