/// Alliance colour handling
///
/// The alliance is chosen locally (combo box / switch button) and written to
/// the table, and it is also read back from the table on every telemetry tick.

use serde::{Deserialize, Serialize};

/// RGB triple, kept toolkit-agnostic so the mapping can be tested without egui
pub type Rgb = [u8; 3];

pub const WHITE: Rgb = [255, 255, 255];
pub const RED: Rgb = [200, 0, 0];
pub const BLUE: Rgb = [0, 70, 200];
pub const BLACK: Rgb = [0, 0, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AllianceColor {
    Red,
    Blue,
    #[default]
    Unknown,
}

impl AllianceColor {
    /// Fixed choice set offered by the alliance selector, in display order
    pub const CHOICES: [AllianceColor; 3] = [AllianceColor::Red, AllianceColor::Blue, AllianceColor::Unknown];

    /// Literal written to the table under `allianceColor`
    pub fn as_str(&self) -> &'static str {
        match self {
            AllianceColor::Red => "Red",
            AllianceColor::Blue => "Blue",
            AllianceColor::Unknown => "Unknown",
        }
    }

    /// Uppercase name used by the live alliance label
    pub fn display_name(&self) -> &'static str {
        match self {
            AllianceColor::Red => "RED",
            AllianceColor::Blue => "BLUE",
            AllianceColor::Unknown => "UNKNOWN",
        }
    }

    /// Map a value read from the table. Case and surrounding whitespace are
    /// ignored; anything that isn't red or blue is Unknown.
    pub fn from_remote(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "RED" => AllianceColor::Red,
            "BLUE" => AllianceColor::Blue,
            _ => AllianceColor::Unknown,
        }
    }

    /// (foreground, background) pairing for the alliance label
    pub fn color_pair(&self) -> (Rgb, Rgb) {
        match self {
            AllianceColor::Red => (WHITE, RED),
            AllianceColor::Blue => (WHITE, BLUE),
            AllianceColor::Unknown => (WHITE, BLACK),
        }
    }

    /// Red <-> Blue. Unknown starts at Red.
    pub fn toggled(&self) -> Self {
        match self {
            AllianceColor::Red => AllianceColor::Blue,
            AllianceColor::Blue | AllianceColor::Unknown => AllianceColor::Red,
        }
    }
}

impl std::fmt::Display for AllianceColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
