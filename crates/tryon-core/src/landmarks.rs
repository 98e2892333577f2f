//! Face and body landmark sets handed in by the perception collaborator.
//!
//! Raw landmarks arrive as an index → point map in source-image pixel space.
//! Named anatomical features are derived from those indices once, at
//! construction, so placement rules never index into the raw map. Every
//! feature is an `Option`: a landmark that was not detected stays absent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- MediaPipe Face Mesh indices (refined, 478 points) ---
const FACE_LEFT_EYE_CENTER: u32 = 468;
const FACE_LEFT_EYE_CORNERS: (u32, u32) = (263, 362);
const FACE_LEFT_EYE_TOP: u32 = 386;
const FACE_LEFT_EYE_BOTTOM: u32 = 374;
const FACE_RIGHT_EYE_CENTER: u32 = 473;
const FACE_RIGHT_EYE_CORNERS: (u32, u32) = (133, 33);
const FACE_RIGHT_EYE_TOP: u32 = 159;
const FACE_RIGHT_EYE_BOTTOM: u32 = 145;
const FACE_NOSE_TIP: u32 = 4;
const FACE_NOSE_BOTTOM: u32 = 94;
const FACE_NOSE_BRIDGE: u32 = 6;
const FACE_MOUTH_CORNERS: (u32, u32) = (61, 291);
const FACE_MOUTH_TOP: u32 = 13;
const FACE_MOUTH_BOTTOM: u32 = 14;

/// Face contour, clockwise from the forehead.
const FACE_OVAL: [u32; 36] = [
    10, 338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288, 397, 365, 379, 378, 400, 377,
    152, 148, 176, 149, 150, 136, 172, 58, 132, 93, 234, 127, 162, 21, 54, 103, 67, 109,
];

// --- MediaPipe Pose indices (33 points) ---
const POSE_LEFT_SHOULDER: u32 = 11;
const POSE_RIGHT_SHOULDER: u32 = 12;
const POSE_LEFT_WRIST: u32 = 15;
const POSE_RIGHT_WRIST: u32 = 16;
const POSE_LEFT_HIP: u32 = 23;
const POSE_RIGHT_HIP: u32 = 24;

/// Pixels the derived neck sits above the shoulder midpoint.
const NECK_RAISE_PX: f32 = 10.0;

/// A single detected keypoint in source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    /// Relative depth, as reported by the detector.
    #[serde(default)]
    pub z: f32,
    /// Detection confidence in [0, 1]. Pose landmarks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0, visibility: None }
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Midpoint of two landmarks. Depth is averaged; visibility is dropped.
    pub fn midpoint(&self, other: &LandmarkPoint) -> LandmarkPoint {
        LandmarkPoint {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
            visibility: None,
        }
    }

    /// Horizontal distance to `other`, always non-negative.
    pub fn horizontal_distance(&self, other: &LandmarkPoint) -> f32 {
        (other.x - self.x).abs()
    }

    /// Angle of the line from `self` to `other`, in degrees.
    ///
    /// Computed as `atan(dy / dx)`, so the result stays in (-90, 90).
    /// A vertical line (`dx == 0`) yields 0.
    pub fn tilt_degrees(&self, other: &LandmarkPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        if dx == 0.0 {
            0.0
        } else {
            (dy / dx).atan().to_degrees()
        }
    }
}

/// A left/right pair of landmarks, either side possibly missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bilateral {
    pub left: Option<LandmarkPoint>,
    pub right: Option<LandmarkPoint>,
}

impl Bilateral {
    pub fn new(left: Option<LandmarkPoint>, right: Option<LandmarkPoint>) -> Self {
        Self { left, right }
    }

    /// Both sides, only when both were detected.
    pub fn both(&self) -> Option<(LandmarkPoint, LandmarkPoint)> {
        Some((self.left?, self.right?))
    }

    pub fn midpoint(&self) -> Option<LandmarkPoint> {
        self.both().map(|(l, r)| l.midpoint(&r))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EyeFeature {
    pub center: Option<LandmarkPoint>,
    pub inner_corner: Option<LandmarkPoint>,
    pub outer_corner: Option<LandmarkPoint>,
    pub top: Option<LandmarkPoint>,
    pub bottom: Option<LandmarkPoint>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoseFeature {
    pub tip: Option<LandmarkPoint>,
    pub bottom: Option<LandmarkPoint>,
    pub bridge: Option<LandmarkPoint>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouthFeature {
    pub corners: Bilateral,
    pub top: Option<LandmarkPoint>,
    pub bottom: Option<LandmarkPoint>,
}

/// Named facial features derived from face-mesh indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceFeatures {
    pub left_eye: EyeFeature,
    pub right_eye: EyeFeature,
    pub nose: NoseFeature,
    pub mouth: MouthFeature,
    /// Detected contour points in contour order. Missing indices are skipped.
    pub face_oval: Vec<LandmarkPoint>,
}

/// Named body features derived from pose indices.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoseFeatures {
    pub shoulders: Bilateral,
    pub hips: Bilateral,
    pub wrists: Bilateral,
    pub neck: Option<LandmarkPoint>,
}

/// Wire form of a landmark sub-set: `{"landmarks": {"<index>": point}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IndexedLandmarks {
    #[serde(default)]
    landmarks: BTreeMap<u32, LandmarkPoint>,
}

/// Face-mesh landmarks plus their derived features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "IndexedLandmarks", into = "IndexedLandmarks")]
pub struct FaceLandmarks {
    points: BTreeMap<u32, LandmarkPoint>,
    features: FaceFeatures,
}

impl FaceLandmarks {
    pub fn from_points(points: BTreeMap<u32, LandmarkPoint>) -> Self {
        let get = |idx: u32| points.get(&idx).copied();
        let features = FaceFeatures {
            left_eye: EyeFeature {
                center: get(FACE_LEFT_EYE_CENTER),
                inner_corner: get(FACE_LEFT_EYE_CORNERS.1),
                outer_corner: get(FACE_LEFT_EYE_CORNERS.0),
                top: get(FACE_LEFT_EYE_TOP),
                bottom: get(FACE_LEFT_EYE_BOTTOM),
            },
            right_eye: EyeFeature {
                center: get(FACE_RIGHT_EYE_CENTER),
                inner_corner: get(FACE_RIGHT_EYE_CORNERS.0),
                outer_corner: get(FACE_RIGHT_EYE_CORNERS.1),
                top: get(FACE_RIGHT_EYE_TOP),
                bottom: get(FACE_RIGHT_EYE_BOTTOM),
            },
            nose: NoseFeature {
                tip: get(FACE_NOSE_TIP),
                bottom: get(FACE_NOSE_BOTTOM),
                bridge: get(FACE_NOSE_BRIDGE),
            },
            mouth: MouthFeature {
                corners: Bilateral::new(get(FACE_MOUTH_CORNERS.0), get(FACE_MOUTH_CORNERS.1)),
                top: get(FACE_MOUTH_TOP),
                bottom: get(FACE_MOUTH_BOTTOM),
            },
            face_oval: FACE_OVAL.iter().filter_map(|&idx| get(idx)).collect(),
        };
        Self { points, features }
    }

    /// Build directly from features, for collaborators that report named
    /// features rather than raw mesh indices.
    pub fn from_features(features: FaceFeatures) -> Self {
        Self { points: BTreeMap::new(), features }
    }

    pub fn point(&self, index: u32) -> Option<&LandmarkPoint> {
        self.points.get(&index)
    }

    pub fn points(&self) -> &BTreeMap<u32, LandmarkPoint> {
        &self.points
    }

    pub fn features(&self) -> &FaceFeatures {
        &self.features
    }
}

impl From<IndexedLandmarks> for FaceLandmarks {
    fn from(raw: IndexedLandmarks) -> Self {
        Self::from_points(raw.landmarks)
    }
}

impl From<FaceLandmarks> for IndexedLandmarks {
    fn from(face: FaceLandmarks) -> Self {
        Self { landmarks: face.points }
    }
}

/// Pose landmarks plus their derived features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "IndexedLandmarks", into = "IndexedLandmarks")]
pub struct PoseLandmarks {
    points: BTreeMap<u32, LandmarkPoint>,
    features: PoseFeatures,
}

impl PoseLandmarks {
    pub fn from_points(points: BTreeMap<u32, LandmarkPoint>) -> Self {
        let get = |idx: u32| points.get(&idx).copied();
        let shoulders = Bilateral::new(get(POSE_LEFT_SHOULDER), get(POSE_RIGHT_SHOULDER));
        let neck = shoulders.midpoint().map(|mid| LandmarkPoint {
            y: mid.y - NECK_RAISE_PX,
            ..mid
        });
        let features = PoseFeatures {
            shoulders,
            hips: Bilateral::new(get(POSE_LEFT_HIP), get(POSE_RIGHT_HIP)),
            wrists: Bilateral::new(get(POSE_LEFT_WRIST), get(POSE_RIGHT_WRIST)),
            neck,
        };
        Self { points, features }
    }

    pub fn from_features(features: PoseFeatures) -> Self {
        Self { points: BTreeMap::new(), features }
    }

    pub fn point(&self, index: u32) -> Option<&LandmarkPoint> {
        self.points.get(&index)
    }

    pub fn points(&self) -> &BTreeMap<u32, LandmarkPoint> {
        &self.points
    }

    pub fn features(&self) -> &PoseFeatures {
        &self.features
    }
}

impl From<IndexedLandmarks> for PoseLandmarks {
    fn from(raw: IndexedLandmarks) -> Self {
        Self::from_points(raw.landmarks)
    }
}

impl From<PoseLandmarks> for IndexedLandmarks {
    fn from(pose: PoseLandmarks) -> Self {
        Self { landmarks: pose.points }
    }
}

/// Everything the perception collaborator detected for one source image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    #[serde(default)]
    pub face: Option<FaceLandmarks>,
    #[serde(default)]
    pub pose: Option<PoseLandmarks>,
}

impl LandmarkSet {
    pub fn new(face: Option<FaceLandmarks>, pose: Option<PoseLandmarks>) -> Self {
        Self { face, pose }
    }

    pub fn face_features(&self) -> Option<&FaceFeatures> {
        self.face.as_ref().map(FaceLandmarks::features)
    }

    pub fn pose_features(&self) -> Option<&PoseFeatures> {
        self.pose.as_ref().map(PoseLandmarks::features)
    }
}
