use bevy::math::Vec3;

/// Axis flip applied to everything produced in sensor space.
/// The device looks back at the viewer, so all three axes are mirrored.
pub const SENSOR_TO_WORLD_SCALE: Vec3 = Vec3::new(-1.0, -1.0, -1.0);

/// Map a sensor-space point into world space.
pub fn sensor_to_world(point: Vec3) -> Vec3 {
    point * SENSOR_TO_WORLD_SCALE
}
