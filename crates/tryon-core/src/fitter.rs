//! Virtual fitting: resolve, place and composite accessories onto an avatar.
//!
//! Each application consumes the current avatar and returns the next one,
//! so sequential try-ons are an explicit ownership handoff. Later items draw
//! over earlier ones.

use crate::compositor::{self, CompositeError};
use crate::config::FitterConfig;
use crate::landmarks::LandmarkSet;
use crate::placement::{self, AccessoryCategory, Placement, PlacementOptions};
use crate::raster::RasterImage;
use crate::resolver::{AccessoryRef, AccessoryResolver};
use std::sync::Arc;

/// One accessory to try on.
#[derive(Debug, Clone)]
pub struct TryOnItem {
    pub accessory: AccessoryRef,
    pub category: AccessoryCategory,
}

impl TryOnItem {
    pub fn new(accessory: impl Into<AccessoryRef>, category: AccessoryCategory) -> Self {
        Self { accessory: accessory.into(), category }
    }
}

/// Applies accessories to avatars.
///
/// Holds a shared handle to the resolver so several fitters (one per worker
/// thread, say) reuse the same decode cache.
pub struct VirtualFitter {
    resolver: Arc<AccessoryResolver>,
    options: PlacementOptions,
}

impl VirtualFitter {
    pub fn new(resolver: Arc<AccessoryResolver>) -> Self {
        Self { resolver, options: PlacementOptions::default() }
    }

    pub fn from_config(resolver: Arc<AccessoryResolver>, config: &FitterConfig) -> Self {
        Self { resolver, options: config.placement_options() }
    }

    /// Placement `category` would get on an avatar of the given size.
    pub fn placement_for(
        &self,
        category: AccessoryCategory,
        landmarks: Option<&LandmarkSet>,
        width: u32,
        height: u32,
    ) -> Placement {
        placement::compute_placement_with(category, landmarks, width, height, &self.options)
    }

    /// Composite one accessory, returning the composite or the reason it failed.
    ///
    /// The avatar is borrowed, so on failure the caller still holds it.
    pub fn try_apply(
        &self,
        avatar: &RasterImage,
        accessory: &AccessoryRef,
        category: AccessoryCategory,
        landmarks: Option<&LandmarkSet>,
    ) -> Result<RasterImage, CompositeError> {
        let art = self.resolver.resolve(accessory);
        let placement = self.placement_for(category, landmarks, avatar.width(), avatar.height());
        tracing::info!(
            %category,
            x = placement.x,
            y = placement.y,
            width = placement.width,
            height = placement.height,
            rotation = placement.rotation_degrees,
            "applying accessory"
        );
        compositor::place_accessory(avatar, &art, &placement)
    }

    /// Composite one accessory and hand back the next avatar state.
    ///
    /// A compositing failure is logged and the avatar comes back unchanged.
    pub fn apply_accessory(
        &self,
        avatar: RasterImage,
        accessory: &AccessoryRef,
        category: AccessoryCategory,
        landmarks: Option<&LandmarkSet>,
    ) -> RasterImage {
        match self.try_apply(&avatar, accessory, category, landmarks) {
            Ok(next) => next,
            Err(err) => {
                tracing::warn!(%category, error = %err, "accessory not applied");
                avatar
            }
        }
    }

    /// Apply `items` in order, each on top of the previous result.
    pub fn apply_all(
        &self,
        avatar: RasterImage,
        items: &[TryOnItem],
        landmarks: Option<&LandmarkSet>,
    ) -> RasterImage {
        items.iter().fold(avatar, |current, item| {
            self.apply_accessory(current, &item.accessory, item.category, landmarks)
        })
    }
}
