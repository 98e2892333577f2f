//! tryon-core — Landmark-driven accessory placement and compositing.
//!
//! Takes an RGBA avatar, the face/pose landmarks detected on it, and an
//! accessory reference; computes where the accessory belongs and blends it
//! onto the avatar. Perception models are external: landmarks and
//! segmentation masks arrive here as plain data.

pub mod compositor;
pub mod config;
pub mod fitter;
pub mod landmarks;
pub mod library;
pub mod placement;
pub mod raster;
pub mod resolver;

pub use compositor::{place_accessory, CompositeError};
pub use config::FitterConfig;
pub use fitter::{TryOnItem, VirtualFitter};
pub use landmarks::{FaceLandmarks, LandmarkPoint, LandmarkSet, PoseLandmarks};
pub use library::AccessoryLibrary;
pub use placement::{compute_placement, AccessoryCategory, Placement, Surface};
pub use raster::{apply_mask, RasterError, RasterImage};
pub use resolver::{AccessoryDescriptor, AccessoryRef, AccessoryResolver, ResolveError};
