use crate::error::BoardError;
use crate::model::{ColorMode, Minutes};
use log::*;
use std::path::Path;

/// Board tunables. Every field has a default so a config file only needs to
/// name what it changes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub pixels_per_minute: f64,
    pub snap_minutes: Minutes,
    pub min_view_hours: u32,
    pub max_view_hours: u32,
    pub min_service_minutes: Minutes,
    pub min_split_minutes: Minutes,
    pub history_limit: usize,
    pub layout: LayoutConfig,
    pub colors: ColorConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            pixels_per_minute: 4.0,
            snap_minutes: 5,
            min_view_hours: 1,
            max_view_hours: 24,
            min_service_minutes: 5,
            min_split_minutes: 20,
            history_limit: 100,
            layout: LayoutConfig::default(),
            colors: ColorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Height of a track row holding at most two concurrent trains.
    pub min_row_height: f64,
    pub row_height_step: f64,
    pub max_row_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            min_row_height: 48.0,
            row_height_step: 4.0,
            max_row_height: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub mode: ColorMode,
    /// Reference lengths in meters for buckets b1..b5.
    pub canonical_lengths: Vec<f64>,
    /// Background colors for buckets b1..b5.
    pub bucket_colors: Vec<String>,
    pub single_color: String,
    pub border_darken_percent: f64,
}

impl Default for ColorConfig {
    fn default() -> Self {
        ColorConfig {
            mode: ColorMode::Length,
            canonical_lengths: vec![50.0, 75.0, 80.0, 107.0, 135.0],
            bucket_colors: vec![
                "#d8ecf7".to_string(),
                "#8cc5e8".to_string(),
                "#3d8fc9".to_string(),
                "#1f5f99".to_string(),
                "#0b2e59".to_string(),
            ],
            single_color: "#4a90d9".to_string(),
            border_darken_percent: 25.0,
        }
    }
}

impl BoardConfig {
    pub fn load(path: &Path) -> Result<BoardConfig, BoardError> {
        trace!("Loading config {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config: BoardConfig = serde_json::from_str(&contents)?;
        if config.min_view_hours == 0 || config.min_view_hours > config.max_view_hours {
            warn!(
                "View hour bounds {}..{} are inconsistent",
                config.min_view_hours, config.max_view_hours
            );
        }
        Ok(config)
    }
}
