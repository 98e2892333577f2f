//! Landmark-driven placement of accessories.
//!
//! Each [`AccessoryCategory`] carries one landmark rule and maps to one
//! [`Surface`] whose default placement is used whenever that rule cannot be
//! applied. Missing landmarks always select the default; they are never
//! replaced by zero coordinates.

use crate::landmarks::{FaceFeatures, LandmarkSet, PoseFeatures};
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Clothing ---
const CLOTHING_WIDTH_PER_SHOULDER_SPAN: f32 = 2.0;
/// Downward shift of the center, as a fraction of image height, without hips.
const CLOTHING_DROP_NO_HIPS: f32 = 0.10;
const CLOTHING_HEIGHT_NO_HIPS: f32 = 0.50;
const CLOTHING_MIN_HEIGHT: f32 = 0.30;

// --- Jewelry ---
const JEWELRY_NECK_WIDTH: f32 = 0.20;
const JEWELRY_NECK_HEIGHT: f32 = 0.10;
/// Upward shift from the shoulder midpoint, as a fraction of image height.
const JEWELRY_NECK_RAISE: f32 = 0.05;
const JEWELRY_WIDTH_PER_SHOULDER_SPAN: f32 = 0.6;
const JEWELRY_HEIGHT_PER_SHOULDER_SPAN: f32 = 0.3;

// --- Glasses ---
const GLASSES_WIDTH_PER_EYE_SPAN: f32 = 2.2;
const GLASSES_ASPECT: f32 = 0.4;

// --- Hats ---
const HAT_WIDTH_PER_FACE_SPAN: f32 = 1.5;
/// Upward shift above the top of the face oval, as a fraction of hat width.
const HAT_LIFT: f32 = 0.2;
const HAT_ASPECT: f32 = 0.6;

// --- Watches ---
/// Minimum wrist visibility for a landmark-derived watch placement.
pub const DEFAULT_WATCH_MIN_VISIBILITY: f32 = 0.5;
const WATCH_SIZE: f32 = 0.10;

/// Where and how large an accessory is drawn on the target image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Center x in target pixels.
    pub x: f32,
    /// Center y in target pixels.
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Clockwise rotation about the accessory's own center.
    pub rotation_degrees: f32,
}

impl Placement {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height, rotation_degrees: 0.0 }
    }

    pub fn rotated(mut self, degrees: f32) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    /// Finite geometry with a positive size.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height, self.rotation_degrees]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// The accessory kinds the fitter knows how to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessoryCategory {
    Clothing,
    Jewelry,
    Glasses,
    Hats,
    Watches,
    Other,
}

impl AccessoryCategory {
    pub const ALL: [AccessoryCategory; 6] = [
        AccessoryCategory::Clothing,
        AccessoryCategory::Jewelry,
        AccessoryCategory::Glasses,
        AccessoryCategory::Hats,
        AccessoryCategory::Watches,
        AccessoryCategory::Other,
    ];

    /// Parse a category name. Unknown names map to [`AccessoryCategory::Other`].
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "clothing" => Self::Clothing,
            "jewelry" => Self::Jewelry,
            "glasses" => Self::Glasses,
            "hats" => Self::Hats,
            "watches" => Self::Watches,
            "other" => Self::Other,
            unknown => {
                tracing::warn!(category = unknown, "unknown accessory category, using other");
                Self::Other
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clothing => "clothing",
            Self::Jewelry => "jewelry",
            Self::Glasses => "glasses",
            Self::Hats => "hats",
            Self::Watches => "watches",
            Self::Other => "other",
        }
    }

    /// Body surface whose default placement backs this category.
    pub fn surface(&self) -> Surface {
        match self {
            Self::Clothing => Surface::Torso,
            Self::Jewelry => Surface::Neck,
            Self::Glasses => Surface::Face,
            Self::Hats => Surface::Head,
            Self::Watches => Surface::Wrist,
            Self::Other => Surface::Center,
        }
    }
}

impl From<&str> for AccessoryCategory {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl fmt::Display for AccessoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named regions with fixed default placements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Head,
    Face,
    Neck,
    Torso,
    Wrist,
    Center,
}

impl Surface {
    /// Placement used when landmarks cannot position the accessory.
    ///
    /// Sizes are fractions of the target dimensions; the wrist box is square
    /// and scales with image width on both axes.
    pub fn default_placement(&self, target_width: u32, target_height: u32) -> Placement {
        let w = target_width as f32;
        let h = target_height as f32;
        match self {
            Self::Head => Placement::new(w / 2.0, h * 0.15, w * 0.5, h * 0.2),
            Self::Face => Placement::new(w / 2.0, h * 0.25, w * 0.4, h * 0.1),
            Self::Neck => Placement::new(w / 2.0, h * 0.35, w * 0.3, h * 0.1),
            Self::Torso => Placement::new(w / 2.0, h * 0.5, w * 0.7, h * 0.4),
            Self::Wrist => Placement::new(w * 0.7, h * 0.6, w * 0.15, w * 0.15),
            Self::Center => Placement::new(w / 2.0, h / 2.0, w * 0.5, h * 0.3),
        }
    }
}

/// Tunables for the landmark rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementOptions {
    /// Wrist visibility must exceed this for a watch to follow the wrist.
    pub watch_min_visibility: f32,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self { watch_min_visibility: DEFAULT_WATCH_MIN_VISIBILITY }
    }
}

/// Compute where to draw an accessory of `category` on a target image.
pub fn compute_placement(
    category: AccessoryCategory,
    landmarks: Option<&LandmarkSet>,
    target_width: u32,
    target_height: u32,
) -> Placement {
    compute_placement_with(
        category,
        landmarks,
        target_width,
        target_height,
        &PlacementOptions::default(),
    )
}

/// [`compute_placement`] with explicit tunables.
pub fn compute_placement_with(
    category: AccessoryCategory,
    landmarks: Option<&LandmarkSet>,
    target_width: u32,
    target_height: u32,
    options: &PlacementOptions,
) -> Placement {
    let derived = landmarks.and_then(|set| {
        landmark_placement(category, set, target_width as f32, target_height as f32, options)
    });

    match derived {
        // Degenerate landmarks (coincident shoulders, a one-point face oval)
        // produce a zero-sized box, which is no better than missing ones.
        Some(p) if p.is_valid() => {
            tracing::debug!(%category, placement = ?p, "landmark placement");
            p
        }
        _ => {
            let surface = category.surface();
            let p = surface.default_placement(target_width, target_height);
            tracing::debug!(%category, ?surface, placement = ?p, "falling back to default placement");
            p
        }
    }
}

fn landmark_placement(
    category: AccessoryCategory,
    set: &LandmarkSet,
    w: f32,
    h: f32,
    options: &PlacementOptions,
) -> Option<Placement> {
    match category {
        AccessoryCategory::Clothing => clothing(set.pose_features()?, h),
        AccessoryCategory::Jewelry => jewelry(set.pose_features()?, w, h),
        AccessoryCategory::Glasses => glasses(set.face_features()?),
        AccessoryCategory::Hats => hat(set.face_features()?),
        AccessoryCategory::Watches => watch(set.pose_features()?, w, options.watch_min_visibility),
        AccessoryCategory::Other => None,
    }
}

/// Torso box spanning the shoulders, refined toward the hips.
fn clothing(pose: &PoseFeatures, h: f32) -> Option<Placement> {
    let (left, right) = pose.shoulders.both()?;
    let shoulder_mid = left.midpoint(&right);
    let width = left.horizontal_distance(&right) * CLOTHING_WIDTH_PER_SHOULDER_SPAN;

    let (center_y, height) = match pose.hips.midpoint() {
        Some(hip_mid) => {
            let torso = (hip_mid.y - shoulder_mid.y) * 2.0;
            (
                (shoulder_mid.y + hip_mid.y) / 2.0,
                torso.max(h * CLOTHING_MIN_HEIGHT),
            )
        }
        None => (
            shoulder_mid.y + h * CLOTHING_DROP_NO_HIPS,
            h * CLOTHING_HEIGHT_NO_HIPS,
        ),
    };

    Some(Placement::new(shoulder_mid.x, center_y, width, height).rotated(left.tilt_degrees(&right)))
}

/// Necklace at the neck, or just above the shoulder line.
fn jewelry(pose: &PoseFeatures, w: f32, h: f32) -> Option<Placement> {
    if let Some(neck) = pose.neck {
        return Some(Placement::new(
            neck.x,
            neck.y,
            w * JEWELRY_NECK_WIDTH,
            h * JEWELRY_NECK_HEIGHT,
        ));
    }

    let (left, right) = pose.shoulders.both()?;
    let mid = left.midpoint(&right);
    let span = left.horizontal_distance(&right);
    Some(Placement::new(
        mid.x,
        mid.y - h * JEWELRY_NECK_RAISE,
        span * JEWELRY_WIDTH_PER_SHOULDER_SPAN,
        span * JEWELRY_HEIGHT_PER_SHOULDER_SPAN,
    ))
}

/// Frames centered between the eyes, tilted with the eye line.
fn glasses(face: &FaceFeatures) -> Option<Placement> {
    let left = face.left_eye.center?;
    let right = face.right_eye.center?;
    let mid = left.midpoint(&right);
    let width = left.horizontal_distance(&right) * GLASSES_WIDTH_PER_EYE_SPAN;
    Some(Placement::new(mid.x, mid.y, width, width * GLASSES_ASPECT).rotated(left.tilt_degrees(&right)))
}

/// Hat sitting above the face oval. No head-tilt compensation.
fn hat(face: &FaceFeatures) -> Option<Placement> {
    let mut points = face.face_oval.iter();
    let first = points.next()?;
    let (mut top, mut leftmost, mut rightmost) = (first, first, first);
    for p in points {
        if p.y < top.y {
            top = p;
        }
        if p.x < leftmost.x {
            leftmost = p;
        }
        if p.x > rightmost.x {
            rightmost = p;
        }
    }

    let width = (rightmost.x - leftmost.x) * HAT_WIDTH_PER_FACE_SPAN;
    let center_x = (leftmost.x + rightmost.x) / 2.0;
    Some(Placement::new(
        center_x,
        top.y - width * HAT_LIFT,
        width,
        width * HAT_ASPECT,
    ))
}

/// Square watch face on the left wrist, if it is confidently visible.
fn watch(pose: &PoseFeatures, w: f32, min_visibility: f32) -> Option<Placement> {
    let wrist = pose.wrists.left?;
    // A wrist without a usable visibility score is treated as not visible.
    let visibility = wrist.visibility?;
    if visibility.is_nan() || visibility <= min_visibility {
        return None;
    }
    let size = w * WATCH_SIZE;
    Some(Placement::new(wrist.x, wrist.y, size, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{
        Bilateral, EyeFeature, FaceFeatures, FaceLandmarks, LandmarkPoint, PoseLandmarks,
    };

    const W: u32 = 400;
    const H: u32 = 600;

    fn pt(x: f32, y: f32) -> LandmarkPoint {
        LandmarkPoint::new(x, y).with_visibility(0.9)
    }

    fn pose_set(features: PoseFeatures) -> LandmarkSet {
        LandmarkSet::new(None, Some(PoseLandmarks::from_features(features)))
    }

    fn face_set(features: FaceFeatures) -> LandmarkSet {
        LandmarkSet::new(Some(FaceLandmarks::from_features(features)), None)
    }

    fn shoulders(l: (f32, f32), r: (f32, f32)) -> Bilateral {
        Bilateral::new(Some(pt(l.0, l.1)), Some(pt(r.0, r.1)))
    }

    fn assert_close(actual: f32, expected: f32, what: &str) {
        assert!((actual - expected).abs() < 1e-3, "{what}: got {actual}, expected {expected}");
    }

    #[test]
    fn test_clothing_level_shoulders() {
        let set = pose_set(PoseFeatures {
            shoulders: shoulders((100.0, 200.0), (300.0, 200.0)),
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Clothing, Some(&set), W, H);
        assert_eq!(p.rotation_degrees, 0.0);
        assert_close(p.x, 200.0, "center x");
        assert_close(p.width, 400.0, "width");
    }

    #[test]
    fn test_clothing_tilted_shoulders() {
        let set = pose_set(PoseFeatures {
            shoulders: shoulders((100.0, 180.0), (300.0, 220.0)),
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Clothing, Some(&set), W, H);
        assert_close(p.rotation_degrees, 11.3099, "rotation");
    }

    #[test]
    fn test_clothing_without_hips() {
        let set = pose_set(PoseFeatures {
            shoulders: shoulders((100.0, 200.0), (300.0, 200.0)),
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Clothing, Some(&set), W, H);
        assert_eq!(p.height, H as f32 * 0.5);
        assert_close(p.y, 200.0 + H as f32 * 0.1, "center y");
    }

    #[test]
    fn test_clothing_with_hips() {
        let set = pose_set(PoseFeatures {
            shoulders: shoulders((100.0, 200.0), (300.0, 200.0)),
            hips: shoulders((120.0, 400.0), (280.0, 400.0)),
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Clothing, Some(&set), W, H);
        assert_close(p.y, 300.0, "torso midpoint");
        // 2 × (400 − 200) = 400 exceeds the 30% floor of 180.
        assert_close(p.height, 400.0, "height");
    }

    #[test]
    fn test_clothing_height_floor() {
        let set = pose_set(PoseFeatures {
            shoulders: shoulders((100.0, 200.0), (300.0, 200.0)),
            hips: shoulders((120.0, 220.0), (280.0, 220.0)),
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Clothing, Some(&set), W, H);
        assert_close(p.height, H as f32 * 0.3, "height floor");
    }

    #[test]
    fn test_clothing_one_hip_is_treated_as_no_hips() {
        let set = pose_set(PoseFeatures {
            shoulders: shoulders((100.0, 200.0), (300.0, 200.0)),
            hips: Bilateral::new(Some(pt(120.0, 400.0)), None),
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Clothing, Some(&set), W, H);
        assert_eq!(p.height, H as f32 * 0.5);
    }

    #[test]
    fn test_jewelry_at_neck() {
        let set = pose_set(PoseFeatures {
            neck: Some(pt(210.0, 150.0)),
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Jewelry, Some(&set), W, H);
        assert_eq!((p.x, p.y), (210.0, 150.0));
        assert_close(p.width, W as f32 * 0.2, "width");
        assert_close(p.height, H as f32 * 0.1, "height");
        assert_eq!(p.rotation_degrees, 0.0);
    }

    #[test]
    fn test_jewelry_from_shoulders() {
        let set = pose_set(PoseFeatures {
            shoulders: shoulders((100.0, 200.0), (300.0, 200.0)),
            neck: None,
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Jewelry, Some(&set), W, H);
        assert_close(p.x, 200.0, "x");
        assert_close(p.y, 200.0 - H as f32 * 0.05, "y");
        assert_close(p.width, 120.0, "width");
        assert_close(p.height, 60.0, "height");
    }

    #[test]
    fn test_glasses_from_eyes() {
        let set = face_set(FaceFeatures {
            left_eye: EyeFeature { center: Some(pt(240.0, 110.0)), ..Default::default() },
            right_eye: EyeFeature { center: Some(pt(160.0, 100.0)), ..Default::default() },
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Glasses, Some(&set), W, H);
        assert_close(p.x, 200.0, "x");
        assert_close(p.y, 105.0, "y");
        assert_close(p.width, 176.0, "width");
        assert_close(p.height, 176.0 * 0.4, "height");
        // dx = -80, dy = -10 → atan(0.125)
        assert_close(p.rotation_degrees, 0.125f32.atan().to_degrees(), "rotation");
    }

    #[test]
    fn test_hat_from_face_oval() {
        let set = face_set(FaceFeatures {
            face_oval: vec![
                pt(200.0, 80.0),
                pt(260.0, 150.0),
                pt(200.0, 230.0),
                pt(140.0, 150.0),
            ],
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Hats, Some(&set), W, H);
        assert_close(p.width, 180.0, "width");
        assert_close(p.x, 200.0, "x");
        assert_close(p.y, 80.0 - 36.0, "y");
        assert_close(p.height, 108.0, "height");
        assert_eq!(p.rotation_degrees, 0.0);
    }

    #[test]
    fn test_watch_visible_wrist() {
        let set = pose_set(PoseFeatures {
            wrists: Bilateral::new(Some(pt(90.0, 380.0)), None),
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Watches, Some(&set), W, H);
        assert_eq!((p.x, p.y), (90.0, 380.0));
        assert_close(p.width, 40.0, "width");
        assert_close(p.height, 40.0, "height");
    }

    #[test]
    fn test_watch_low_visibility_falls_back() {
        let wrist = LandmarkPoint::new(90.0, 380.0).with_visibility(0.5);
        let set = pose_set(PoseFeatures {
            wrists: Bilateral::new(Some(wrist), None),
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Watches, Some(&set), W, H);
        assert_eq!(p, Surface::Wrist.default_placement(W, H));
    }

    #[test]
    fn test_watch_nan_visibility_falls_back() {
        let wrist = LandmarkPoint::new(90.0, 380.0).with_visibility(f32::NAN);
        let set = pose_set(PoseFeatures {
            wrists: Bilateral::new(Some(wrist), None),
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Watches, Some(&set), W, H);
        assert_eq!(p, Surface::Wrist.default_placement(W, H));
    }

    #[test]
    fn test_watch_without_visibility_falls_back() {
        let set = pose_set(PoseFeatures {
            wrists: Bilateral::new(Some(LandmarkPoint::new(90.0, 380.0)), None),
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Watches, Some(&set), W, H);
        assert_eq!(p, Surface::Wrist.default_placement(W, H));
    }

    #[test]
    fn test_watch_threshold_is_configurable() {
        let wrist = LandmarkPoint::new(90.0, 380.0).with_visibility(0.4);
        let set = pose_set(PoseFeatures {
            wrists: Bilateral::new(Some(wrist), None),
            ..Default::default()
        });
        let options = PlacementOptions { watch_min_visibility: 0.3 };
        let p = compute_placement_with(AccessoryCategory::Watches, Some(&set), W, H, &options);
        assert_eq!((p.x, p.y), (90.0, 380.0));
    }

    #[test]
    fn test_other_always_centered() {
        let set = pose_set(PoseFeatures {
            shoulders: shoulders((100.0, 200.0), (300.0, 200.0)),
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Other, Some(&set), W, H);
        assert_eq!(p, Surface::Center.default_placement(W, H));
        assert_eq!((p.x, p.y), (200.0, 300.0));
        assert_close(p.width, 200.0, "width");
        assert_close(p.height, 180.0, "height");
    }

    #[test]
    fn test_missing_landmarks_select_documented_defaults() {
        let empty = LandmarkSet::default();
        let pose_only = pose_set(PoseFeatures::default());
        let face_only = face_set(FaceFeatures::default());

        for category in AccessoryCategory::ALL {
            let expected = category.surface().default_placement(W, H);
            for set in [None, Some(&empty), Some(&pose_only), Some(&face_only)] {
                let p = compute_placement(category, set, W, H);
                assert_eq!(p, expected, "{category} with {set:?}");
            }
        }
    }

    #[test]
    fn test_default_table_fractions() {
        let (w, h) = (W as f32, H as f32);
        assert_eq!(Surface::Head.default_placement(W, H), Placement::new(w / 2.0, h * 0.15, w * 0.5, h * 0.2));
        assert_eq!(Surface::Face.default_placement(W, H), Placement::new(w / 2.0, h * 0.25, w * 0.4, h * 0.1));
        assert_eq!(Surface::Neck.default_placement(W, H), Placement::new(w / 2.0, h * 0.35, w * 0.3, h * 0.1));
        assert_eq!(Surface::Torso.default_placement(W, H), Placement::new(w / 2.0, h * 0.5, w * 0.7, h * 0.4));
        assert_eq!(Surface::Wrist.default_placement(W, H), Placement::new(w * 0.7, h * 0.6, w * 0.15, w * 0.15));
        assert_eq!(Surface::Center.default_placement(W, H), Placement::new(w / 2.0, h / 2.0, w * 0.5, h * 0.3));
    }

    #[test]
    fn test_degenerate_shoulders_fall_back() {
        let set = pose_set(PoseFeatures {
            shoulders: shoulders((200.0, 200.0), (200.0, 260.0)),
            ..Default::default()
        });
        let p = compute_placement(AccessoryCategory::Clothing, Some(&set), W, H);
        assert_eq!(p, Surface::Torso.default_placement(W, H));
    }

    #[test]
    fn test_derived_placements_are_valid() {
        let set = LandmarkSet::new(
            Some(FaceLandmarks::from_features(FaceFeatures {
                left_eye: EyeFeature { center: Some(pt(230.0, 120.0)), ..Default::default() },
                right_eye: EyeFeature { center: Some(pt(170.0, 118.0)), ..Default::default() },
                face_oval: vec![pt(200.0, 60.0), pt(250.0, 130.0), pt(150.0, 130.0)],
                ..Default::default()
            })),
            Some(PoseLandmarks::from_features(PoseFeatures {
                shoulders: shoulders((110.0, 250.0), (290.0, 255.0)),
                hips: shoulders((140.0, 450.0), (260.0, 452.0)),
                wrists: Bilateral::new(Some(pt(80.0, 420.0)), Some(pt(320.0, 420.0))),
                neck: Some(pt(200.0, 240.0)),
            })),
        );
        for category in AccessoryCategory::ALL {
            let p = compute_placement(category, Some(&set), W, H);
            assert!(p.is_valid(), "{category}: {p:?}");
        }
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(AccessoryCategory::parse("glasses"), AccessoryCategory::Glasses);
        assert_eq!(AccessoryCategory::parse(" Hats "), AccessoryCategory::Hats);
        assert_eq!(AccessoryCategory::parse("scarves"), AccessoryCategory::Other);
        assert_eq!(AccessoryCategory::from(""), AccessoryCategory::Other);
    }

    #[test]
    fn test_category_serde_lowercase() {
        let json = serde_json::to_string(&AccessoryCategory::Watches).unwrap();
        assert_eq!(json, "\"watches\"");
    }
}
