use bevy::math::Vec3;

use crate::engine::error::SensorError;
use crate::engine::sensor::frame::{ColorFrame, DepthFrame, JointId, Skeleton, SkeletonJoint};
use crate::engine::sensor::source::SensorFrameSource;

const BACKDROP_DEPTH_MM: u16 = 3000;
const SUBJECT_DEPTH_MM: u16 = 1500;
const FRAME_RATE: f64 = 30.0;
const SUBJECT_LABEL: u8 = 1;

/// Joint offsets from the spine, metres.
const JOINT_OFFSETS: [(JointId, [f32; 3]); 20] = [
    (JointId::HipCenter, [0.0, -0.15, 0.0]),
    (JointId::Spine, [0.0, 0.0, 0.0]),
    (JointId::ShoulderCenter, [0.0, 0.3, 0.0]),
    (JointId::Head, [0.0, 0.5, 0.0]),
    (JointId::ShoulderLeft, [-0.2, 0.28, 0.0]),
    (JointId::ElbowLeft, [-0.3, 0.05, 0.0]),
    (JointId::WristLeft, [-0.35, -0.15, 0.0]),
    (JointId::HandLeft, [-0.37, -0.22, 0.0]),
    (JointId::ShoulderRight, [0.2, 0.28, 0.0]),
    (JointId::ElbowRight, [0.3, 0.05, 0.0]),
    (JointId::WristRight, [0.35, -0.15, 0.0]),
    (JointId::HandRight, [0.37, -0.22, 0.0]),
    (JointId::HipLeft, [-0.1, -0.2, 0.0]),
    (JointId::KneeLeft, [-0.1, -0.6, 0.0]),
    (JointId::AnkleLeft, [-0.1, -0.95, 0.0]),
    (JointId::FootLeft, [-0.1, -1.0, 0.08]),
    (JointId::HipRight, [0.1, -0.2, 0.0]),
    (JointId::KneeRight, [0.1, -0.6, 0.0]),
    (JointId::AnkleRight, [0.1, -0.95, 0.0]),
    (JointId::FootRight, [0.1, -1.0, 0.08]),
];

/// Stand-in device: a static backdrop with one subject swaying across it.
///
/// Produces depth with user labels, a colour frame and two skeletons per
/// tick, the first of which is only partially tracked.
pub struct SyntheticSensor {
    width: u32,
    height: u32,
    failed_starts_remaining: u32,
    capturing: bool,
    frame_index: u64,
}

impl SyntheticSensor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            failed_starts_remaining: 0,
            capturing: false,
            frame_index: 0,
        }
    }

    /// Refuse the first `count` start requests.
    pub fn with_failed_starts(mut self, count: u32) -> Self {
        self.failed_starts_remaining = count;
        self
    }

    fn timestamp(&self) -> f64 {
        self.frame_index as f64 / FRAME_RATE
    }

    /// Subject centre and radii in pixels for the current frame.
    fn subject_ellipse(&self) -> (f32, f32, f32, f32) {
        let sway = (self.frame_index as f32 * 0.05).sin();
        let cx = self.width as f32 * (0.5 + 0.25 * sway);
        let cy = self.height as f32 * 0.5;
        (cx, cy, self.width as f32 * 0.1, self.height as f32 * 0.35)
    }

    fn in_subject(&self, x: u32, y: u32) -> bool {
        let (cx, cy, rx, ry) = self.subject_ellipse();
        let dx = (x as f32 - cx) / rx;
        let dy = (y as f32 - cy) / ry;
        dx * dx + dy * dy <= 1.0
    }

    fn spine_position(&self) -> Vec3 {
        let (cx, _, _, _) = self.subject_ellipse();
        let x = (cx / self.width as f32 - 0.5) * 2.0;
        Vec3::new(x, 0.1, SUBJECT_DEPTH_MM as f32 / 1000.0)
    }
}

impl SensorFrameSource for SyntheticSensor {
    fn start(&mut self) -> Result<(), SensorError> {
        if self.failed_starts_remaining > 0 {
            self.failed_starts_remaining -= 1;
            return Err(SensorError::StartFailed("device is still initialising".into()));
        }
        self.capturing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.capturing = false;
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn poll_depth_frame(&mut self) -> Option<DepthFrame> {
        if !self.capturing {
            return None;
        }
        self.frame_index += 1;

        let pixel_count = (self.width * self.height) as usize;
        let mut samples = Vec::with_capacity(pixel_count);
        let mut labels = Vec::with_capacity(pixel_count);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.in_subject(x, y) {
                    samples.push(SUBJECT_DEPTH_MM);
                    labels.push(SUBJECT_LABEL);
                } else {
                    // Floor slopes away towards the top of the image.
                    samples.push(BACKDROP_DEPTH_MM + (self.height - y) as u16 * 2);
                    labels.push(0);
                }
            }
        }

        Some(
            DepthFrame::new(self.width, self.height, self.timestamp(), samples)
                .with_user_labels(labels),
        )
    }

    fn poll_color_frame(&mut self) -> Option<ColorFrame> {
        if !self.capturing {
            return None;
        }
        let mut pixels = Vec::with_capacity((self.width * self.height) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let shade = (y * 255 / self.height.max(1)) as u8;
                if self.in_subject(x, y) {
                    pixels.push([230, 140, 90, 255]);
                } else {
                    pixels.push([60, 70, shade.saturating_add(80), 255]);
                }
            }
        }
        Some(ColorFrame {
            width: self.width,
            height: self.height,
            timestamp: self.timestamp(),
            pixels,
        })
    }

    fn poll_skeletons(&mut self) -> Option<Vec<Skeleton>> {
        if !self.capturing {
            return None;
        }
        let spine = self.spine_position();
        let full = Skeleton {
            tracking_id: 1,
            joints: JOINT_OFFSETS
                .iter()
                .map(|(id, offset)| SkeletonJoint {
                    id: *id,
                    position: spine + Vec3::from_array(*offset),
                })
                .collect(),
        };
        // A second user half out of frame.
        let partial = Skeleton {
            tracking_id: 2,
            joints: JOINT_OFFSETS[..8]
                .iter()
                .map(|(id, offset)| SkeletonJoint {
                    id: *id,
                    position: Vec3::new(1.2, 0.0, 2.5) + Vec3::from_array(*offset),
                })
                .collect(),
        };
        Some(vec![partial, full])
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_configured_starts_then_streams() {
        let mut sensor = SyntheticSensor::new(8, 6).with_failed_starts(2);
        assert!(sensor.start().is_err());
        assert!(sensor.start().is_err());
        assert!(sensor.poll_depth_frame().is_none());

        sensor.start().unwrap();
        let frame = sensor.poll_depth_frame().unwrap();
        assert_eq!(frame.pixel_count(), 48);
        assert_eq!(frame.user_labels.as_ref().map(Vec::len), Some(48));
    }

    #[test]
    fn labels_mark_the_subject_only() {
        let mut sensor = SyntheticSensor::new(40, 30);
        sensor.start().unwrap();
        let frame = sensor.poll_depth_frame().unwrap();
        let labels = frame.user_labels.unwrap();

        for (depth, label) in frame.samples.iter().zip(labels) {
            if label > 0 {
                assert_eq!(*depth, SUBJECT_DEPTH_MM);
            } else {
                assert!(*depth >= BACKDROP_DEPTH_MM);
            }
        }
    }

    #[test]
    fn reports_one_full_skeleton_after_a_partial_one() {
        let mut sensor = SyntheticSensor::new(40, 30);
        sensor.start().unwrap();
        let skeletons = sensor.poll_skeletons().unwrap();

        assert_eq!(skeletons.len(), 2);
        assert!(skeletons[0].tracked_joint_count() < 20);
        assert_eq!(skeletons[1].tracked_joint_count(), 20);
        assert!(skeletons[1].joint(JointId::Spine).is_some());
    }
}
