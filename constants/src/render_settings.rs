use bevy::math::Vec3;

/// Vertices emitted per point by each expansion shape.
pub const QUAD_VERTEX_COUNT: u32 = 6;
pub const BOX_VERTEX_COUNT: u32 = 36;
pub const DISC_SEGMENTS: u32 = 8;
pub const DISC_VERTEX_COUNT: u32 = DISC_SEGMENTS * 3;

/// Storage buffers the expansion vertex stage reads from.
pub const EXPANSION_STORAGE_BUFFERS: u32 = 1;

/// Storage buffers bound in the height field compute stage.
pub const HEIGHTFIELD_STORAGE_BUFFERS: u32 = 2;

pub const DEFAULT_LIGHT_POSITION: Vec3 = Vec3::new(-270.0, -340.0, -300.0);
pub const DEFAULT_LIGHT_AMBIENT: f32 = 0.5;
pub const DEFAULT_LIGHT_DIFFUSE: f32 = 0.25;
pub const DEFAULT_LIGHT_SPECULAR: f32 = 0.75;
pub const DEFAULT_LIGHT_SHININESS: f32 = 20.0;

pub const SENSOR_LIGHT_POSITION: Vec3 = Vec3::new(0.0, 250.0, -100.0);
pub const SENSOR_LIGHT_SHININESS: f32 = 10.0;

pub const CAMERA_FOV_DEGREES: f32 = 60.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 15000.0;

/// Default eye for each scene; the viewport resets to these on rebuild.
pub const WAVE_MESH_EYE: Vec3 = Vec3::new(0.0, 0.0, -500.0);
pub const DEPTH_SENSOR_EYE: Vec3 = Vec3::new(0.0, 0.0, 100.0);
