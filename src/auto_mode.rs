/// Autonomous routine selection
///
/// One AutoMode is selected at any time (NoAuto until the driver picks one).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AutoMode {
    #[default]
    NoAuto,
    BlueBackside,
    RedBackside,
    BlueLeave,
    RedLeave,
}

impl AutoMode {
    /// Button order on the selector panel
    pub const ALL: [AutoMode; 5] = [
        AutoMode::NoAuto,
        AutoMode::BlueBackside,
        AutoMode::RedBackside,
        AutoMode::BlueLeave,
        AutoMode::RedLeave,
    ];

    /// Identifier the robot code matches on (`selectedAuto` key)
    pub fn identifier(&self) -> &'static str {
        match self {
            AutoMode::NoAuto => "noAuto",
            AutoMode::BlueBackside => "blueBackside",
            AutoMode::RedBackside => "redBackside",
            AutoMode::BlueLeave => "blueLeave",
            AutoMode::RedLeave => "redLeave",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AutoMode::NoAuto => "No Auto",
            AutoMode::BlueBackside => "Blue Backside",
            AutoMode::RedBackside => "Red Backside",
            AutoMode::BlueLeave => "Blue Leave",
            AutoMode::RedLeave => "Red Leave",
        }
    }

    /// File name of the path preview image, relative to the asset directory
    pub fn asset_file(&self) -> &'static str {
        match self {
            AutoMode::NoAuto => "noAuto.png",
            AutoMode::BlueBackside => "blueBackside.png",
            AutoMode::RedBackside => "redBackside.png",
            AutoMode::BlueLeave => "blueLeave.png",
            AutoMode::RedLeave => "redLeave.png",
        }
    }

    /// Position in `ALL`, used to index loaded textures
    pub fn index(&self) -> usize {
        match self {
            AutoMode::NoAuto => 0,
            AutoMode::BlueBackside => 1,
            AutoMode::RedBackside => 2,
            AutoMode::BlueLeave => 3,
            AutoMode::RedLeave => 4,
        }
    }
}

/// Holds the selected mode. Selection is total: every variant is accepted.
#[derive(Debug, Default)]
pub struct AutoModeSelector {
    selected: AutoMode,
}

impl AutoModeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> AutoMode {
        self.selected
    }

    pub fn select(&mut self, mode: AutoMode) {
        self.selected = mode;
    }

    pub fn status_text(&self) -> String {
        format!("Selected auto: {}", self.selected.label())
    }
}
