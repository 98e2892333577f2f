//! Fitter settings from `TRYON_*` environment variables.

use crate::placement::{PlacementOptions, DEFAULT_WATCH_MIN_VISIBILITY};
use std::path::PathBuf;

/// Fitter configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct FitterConfig {
    /// Root of the accessory library (one subdirectory per category).
    pub accessories_dir: PathBuf,
    /// File extension appended to accessory ids.
    pub accessory_ext: String,
    /// Wrist visibility a watch placement requires.
    pub watch_min_visibility: f32,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            accessories_dir: PathBuf::from("accessories"),
            accessory_ext: "png".to_string(),
            watch_min_visibility: DEFAULT_WATCH_MIN_VISIBILITY,
        }
    }
}

impl FitterConfig {
    /// Load configuration from `TRYON_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            accessories_dir: lookup("TRYON_ACCESSORIES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.accessories_dir),
            accessory_ext: lookup("TRYON_ACCESSORY_EXT")
                .map(|ext| ext.trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty())
                .unwrap_or(defaults.accessory_ext),
            watch_min_visibility: parsed::<f32>(&lookup, "TRYON_WATCH_VISIBILITY")
                .filter(|v| (0.0..=1.0).contains(v))
                .unwrap_or(defaults.watch_min_visibility),
        }
    }

    pub fn placement_options(&self) -> PlacementOptions {
        PlacementOptions { watch_min_visibility: self.watch_min_visibility }
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}
