use bevy::math::Vec3;
use constants::skeleton::SKELETON_JOINT_COUNT;

/// One depth image in sensor-native resolution.
///
/// Samples are millimetres, row-major, `0` meaning no reading. Devices that
/// segment users themselves also supply one label per pixel (`0` = no user).
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    pub timestamp: f64,
    pub samples: Vec<u16>,
    pub user_labels: Option<Vec<u8>>,
}

impl DepthFrame {
    pub fn new(width: u32, height: u32, timestamp: f64, samples: Vec<u16>) -> Self {
        debug_assert_eq!(samples.len(), (width * height) as usize);
        Self {
            width,
            height,
            timestamp,
            samples,
            user_labels: None,
        }
    }

    pub fn filled(width: u32, height: u32, depth_mm: u16) -> Self {
        Self::new(width, height, 0.0, vec![depth_mm; (width * height) as usize])
    }

    pub fn with_user_labels(mut self, labels: Vec<u8>) -> Self {
        debug_assert_eq!(labels.len(), self.samples.len());
        self.user_labels = Some(labels);
        self
    }

    pub fn pixel_count(&self) -> usize {
        self.samples.len()
    }

    pub fn same_dimensions(&self, other: &DepthFrame) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// RGBA8 image aligned with the depth frame of the same tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorFrame {
    pub width: u32,
    pub height: u32,
    pub timestamp: f64,
    pub pixels: Vec<[u8; 4]>,
}

/// Joints reported for a fully tracked skeleton, in device order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointId {
    HipCenter,
    Spine,
    ShoulderCenter,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
}

impl JointId {
    pub const ALL: [JointId; SKELETON_JOINT_COUNT] = [
        JointId::HipCenter,
        JointId::Spine,
        JointId::ShoulderCenter,
        JointId::Head,
        JointId::ShoulderLeft,
        JointId::ElbowLeft,
        JointId::WristLeft,
        JointId::HandLeft,
        JointId::ShoulderRight,
        JointId::ElbowRight,
        JointId::WristRight,
        JointId::HandRight,
        JointId::HipLeft,
        JointId::KneeLeft,
        JointId::AnkleLeft,
        JointId::FootLeft,
        JointId::HipRight,
        JointId::KneeRight,
        JointId::AnkleRight,
        JointId::FootRight,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonJoint {
    pub id: JointId,
    /// Sensor space, metres.
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub tracking_id: u32,
    pub joints: Vec<SkeletonJoint>,
}

impl Skeleton {
    /// Number of joints the device reported for this skeleton this tick.
    pub fn tracked_joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn joint(&self, id: JointId) -> Option<&SkeletonJoint> {
        self.joints.iter().find(|joint| joint.id == id)
    }
}
