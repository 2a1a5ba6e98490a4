use std::collections::HashSet;

use bevy::prelude::*;
use constants::skeleton::{EYE_OFFSET_X, EYE_OFFSET_Y, LOOK_AT_SCALE, SKELETON_JOINT_COUNT};

use crate::engine::sensor::device::SensorFrames;
use crate::engine::sensor::frame::{JointId, Skeleton};

/// Eye and look-at point of the following camera.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct CameraAnchor {
    pub eye: Vec3,
    pub look_at: Vec3,
}

impl CameraAnchor {
    pub fn new(eye: Vec3) -> Self {
        Self {
            eye,
            look_at: Vec3::ZERO,
        }
    }

    /// Back to `eye`, looking at the origin.
    pub fn reset(&mut self, eye: Vec3) {
        self.eye = eye;
        self.look_at = Vec3::ZERO;
    }
}

/// Steers the [`CameraAnchor`] from one joint of a fully tracked skeleton.
#[derive(Resource, Debug, Clone)]
pub struct SkeletalAnchorTracker {
    pub reference_joint: JointId,
    pub full_joint_count: usize,
}

impl Default for SkeletalAnchorTracker {
    fn default() -> Self {
        Self {
            reference_joint: JointId::Spine,
            full_joint_count: SKELETON_JOINT_COUNT,
        }
    }
}

impl SkeletalAnchorTracker {
    /// First skeleton reporting the full joint set. Partial skeletons are skipped.
    pub fn select<'a>(&self, skeletons: &'a [Skeleton]) -> Option<&'a Skeleton> {
        skeletons
            .iter()
            .find(|skeleton| skeleton.tracked_joint_count() == self.full_joint_count)
    }

    /// Apply the framing heuristic. Leaves `anchor` untouched and returns
    /// `false` when no skeleton is fully tracked.
    pub fn update(&self, anchor: &mut CameraAnchor, skeletons: &[Skeleton]) -> bool {
        let Some(joint) = self
            .select(skeletons)
            .and_then(|skeleton| skeleton.joint(self.reference_joint))
        else {
            return false;
        };

        let reference = joint.position * anchor.eye.z;
        anchor.look_at.x = reference.x * LOOK_AT_SCALE;
        anchor.look_at.y = reference.y * LOOK_AT_SCALE;
        anchor.eye.x = -anchor.look_at.x * EYE_OFFSET_X;
        anchor.eye.y = -anchor.look_at.y * EYE_OFFSET_Y;
        true
    }
}

pub fn track_skeletal_anchor(
    frames: Res<SensorFrames>,
    tracker: Res<SkeletalAnchorTracker>,
    mut anchor: ResMut<CameraAnchor>,
) {
    let Some(skeletons) = frames.skeletons.as_deref() else {
        return;
    };
    if tracker.select(skeletons).is_none() {
        return;
    }
    tracker.update(&mut anchor, skeletons);
}

/// Log users entering and leaving the sensor's view.
pub fn log_tracked_users(frames: Res<SensorFrames>, mut known: Local<HashSet<u32>>) {
    let Some(skeletons) = frames.skeletons.as_deref() else {
        return;
    };
    let current: HashSet<u32> = skeletons.iter().map(|s| s.tracking_id).collect();

    for id in current.difference(&known) {
        info!("New user {}", id);
    }
    for id in known.difference(&current) {
        info!("Lost user {}", id);
    }
    *known = current;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sensor::frame::SkeletonJoint;

    fn skeleton(tracking_id: u32, joint_count: usize, spine: Vec3) -> Skeleton {
        let joints = JointId::ALL
            .iter()
            .take(joint_count)
            .map(|id| SkeletonJoint {
                id: *id,
                position: if *id == JointId::Spine { spine } else { Vec3::ONE },
            })
            .collect();
        Skeleton {
            tracking_id,
            joints,
        }
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn spine_drives_look_at_and_eye() {
        let tracker = SkeletalAnchorTracker::default();
        let mut anchor = CameraAnchor::new(Vec3::new(0.0, 0.0, 10.0));
        let skeletons = [skeleton(1, 20, Vec3::new(30.0, 60.0, 0.0))];

        assert!(tracker.update(&mut anchor, &skeletons));
        assert_close(anchor.look_at.x, 99.9);
        assert_close(anchor.look_at.y, 199.8);
        assert_close(anchor.eye.x, -49.95);
        assert_close(anchor.eye.y, -49.95);
        assert_eq!(anchor.eye.z, 10.0);
    }

    #[test]
    fn partial_skeletons_are_skipped() {
        let tracker = SkeletalAnchorTracker::default();
        let skeletons = [
            skeleton(1, 12, Vec3::new(5.0, 5.0, 0.0)),
            skeleton(2, 20, Vec3::new(1.0, 2.0, 0.0)),
            skeleton(3, 20, Vec3::new(9.0, 9.0, 0.0)),
        ];

        assert_eq!(tracker.select(&skeletons).map(|s| s.tracking_id), Some(2));
    }

    #[test]
    fn no_full_skeleton_leaves_anchor_unchanged() {
        let tracker = SkeletalAnchorTracker::default();
        let mut anchor = CameraAnchor::new(Vec3::new(0.0, 0.0, 100.0));
        anchor.look_at = Vec3::new(3.0, 4.0, 0.0);
        let before = anchor.clone();

        assert!(!tracker.update(&mut anchor, &[skeleton(1, 19, Vec3::ONE)]));
        assert!(!tracker.update(&mut anchor, &[]));
        assert_eq!(anchor, before);
    }

    #[test]
    fn system_holds_anchor_when_no_skeletons_arrive() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<SensorFrames>()
            .init_resource::<SkeletalAnchorTracker>()
            .insert_resource(CameraAnchor::new(Vec3::new(0.0, 0.0, 10.0)))
            .add_systems(Update, track_skeletal_anchor);

        app.world_mut().resource_mut::<SensorFrames>().skeletons =
            Some(vec![skeleton(7, 20, Vec3::new(30.0, 60.0, 0.0))]);
        app.update();
        let tracked = app.world().resource::<CameraAnchor>().clone();
        assert_close(tracked.look_at.x, 99.9);

        app.world_mut().resource_mut::<SensorFrames>().skeletons = None;
        app.update();
        assert_eq!(*app.world().resource::<CameraAnchor>(), tracked);
    }
}
