/// Static display assets
///
/// Images are decoded once at startup. A missing or unreadable file is a
/// startup error; the binaries exit instead of showing an empty window.

use anyhow::{anyhow, Context, Result};
use egui::ColorImage;
use std::path::Path;

use crate::alliance::AllianceColor;
use crate::auto_mode::AutoMode;

pub fn load_color_image(path: &Path) -> Result<ColorImage> {
    let img = image::open(path).with_context(|| format!("Failed to load image asset {:?}", path))?;
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    log::debug!(target: "assets", "Loaded {:?} ({}x{})", path, size[0], size[1]);
    Ok(ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

/// Path preview per auto mode, indexed by `AutoMode::index()`
pub struct AutoModeImages {
    images: Vec<ColorImage>,
}

impl AutoModeImages {
    pub fn load(asset_dir: &Path) -> Result<Self> {
        let images = AutoMode::ALL
            .iter()
            .map(|mode| load_color_image(&asset_dir.join(mode.asset_file())))
            .collect::<Result<Vec<_>>>()?;
        log::info!(target: "assets", "Loaded {} auto mode images from {:?}", images.len(), asset_dir);
        Ok(Self { images })
    }

    pub fn get(&self, mode: AutoMode) -> &ColorImage {
        &self.images[mode.index()]
    }

    pub fn into_images(self) -> Vec<ColorImage> {
        self.images
    }
}

/// Field picture shown by the alliance preview. Unknown has none.
pub fn alliance_asset_file(color: AllianceColor) -> Option<&'static str> {
    match color {
        AllianceColor::Red => Some("Red2025.png"),
        AllianceColor::Blue => Some("Blue2025.png"),
        AllianceColor::Unknown => None,
    }
}

pub fn load_alliance_image(asset_dir: &Path, color: AllianceColor) -> Result<ColorImage> {
    let file = alliance_asset_file(color).ok_or_else(|| anyhow!("No field image for alliance {}", color))?;
    load_color_image(&asset_dir.join(file))
}

pub struct AllianceImages {
    pub red: ColorImage,
    pub blue: ColorImage,
}

impl AllianceImages {
    pub fn load(asset_dir: &Path) -> Result<Self> {
        Ok(Self {
            red: load_alliance_image(asset_dir, AllianceColor::Red)?,
            blue: load_alliance_image(asset_dir, AllianceColor::Blue)?,
        })
    }
}
