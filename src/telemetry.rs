/// Telemetry polling
///
/// Reads robot speed and alliance colour from the table. Every read has a
/// default, so a tick always produces a snapshot.

use chrono::{DateTime, Local};
use log::debug;

use crate::alliance::AllianceColor;
use crate::remote_table::RemoteTable;

pub const SPEED_KEY: &str = "speed";
pub const ALLIANCE_KEY: &str = "allianceColor";
pub const DEFAULT_SPEED: f64 = 0.0;
pub const DEFAULT_ALLIANCE: &str = "UNKNOWN";

/// Latest values read from the table. Replaced wholesale on every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    pub speed: f64,
    pub alliance_color: AllianceColor,
    pub received_at: DateTime<Local>,
}

impl TelemetrySnapshot {
    pub fn speed_text(&self) -> String {
        format_speed(self.speed)
    }

    pub fn alliance_text(&self) -> String {
        format_alliance(self.alliance_color)
    }
}

pub fn format_speed(speed: f64) -> String {
    format!("Speed: {:.2}", speed)
}

pub fn format_alliance(color: AllianceColor) -> String {
    format!("Alliance: {}", color.display_name())
}

#[derive(Debug, Default)]
pub struct TelemetryPoller;

impl TelemetryPoller {
    pub fn new() -> Self {
        Self
    }

    pub fn read<T: RemoteTable + ?Sized>(&self, table: &T) -> TelemetrySnapshot {
        let speed = table.get_number(SPEED_KEY, DEFAULT_SPEED);
        let raw_alliance = table.get_string(ALLIANCE_KEY, DEFAULT_ALLIANCE);
        let alliance_color = AllianceColor::from_remote(&raw_alliance);
        debug!(target: "telemetry", "tick: speed={:.3} alliance={:?} (raw '{}')", speed, alliance_color, raw_alliance);
        TelemetrySnapshot {
            speed,
            alliance_color,
            received_at: Local::now(),
        }
    }
}
