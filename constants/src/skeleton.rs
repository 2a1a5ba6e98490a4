/// Joint count of a fully tracked skeleton. Anything less is ignored.
pub const SKELETON_JOINT_COUNT: usize = 20;

/// Look-at scale applied to the reference joint.
pub const LOOK_AT_SCALE: f32 = 0.333;

/// Eye offsets relative to the look-at point, per axis.
pub const EYE_OFFSET_X: f32 = 0.5;
pub const EYE_OFFSET_Y: f32 = 0.25;
