use bevy::prelude::*;
use bevy::render::Extract;
use bytemuck::{Pod, Zeroable};
use constants::coordinate_system::sensor_to_world;

use crate::engine::assets::pipeline_settings::{PipelineSettings, SceneMode};
use crate::engine::camera::anchor_camera::AnchoredCamera;
use crate::engine::mesh::topology::MeshTopology;
use crate::engine::render::pipeline::expansion_program::{
    ExpansionProgram, ExpansionSelector, PrimitiveShape,
};

/// Uniform block shared by the vertex and fragment stages of every
/// expansion program. Matches `ExpansionParams` in `expansion.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ExpansionUniform {
    pub clip_from_world: [[f32; 4]; 4],
    pub world_from_local: [[f32; 4]; 4],
    /// xyz = eye, w = elapsed seconds
    pub eye: [f32; 4],
    /// xyz = light position, w = shininess
    pub light_position: [f32; 4],
    /// ambient, diffuse, specular, alpha
    pub light_terms: [f32; 4],
    /// scale, uv mix, depth scale, rotation speed
    pub shape: [f32; 4],
    /// xyz = box dimensions, w = bright tolerance (sensor scene only)
    pub box_dimensions: [f32; 4],
    /// width, height, depth source (0 wave, 1 sensor), unused
    pub grid: [u32; 4],
}

impl Default for ExpansionUniform {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Everything the expansion node needs for one frame.
#[derive(Resource, Debug, Clone, Default)]
pub struct ExpansionFrame {
    pub program: Option<ExpansionProgram>,
    pub shape: PrimitiveShape,
    pub uniform: ExpansionUniform,
}

/// Mesh orientation and scale. The sensor lattice is mirrored into world
/// space on every axis.
pub fn world_from_local(settings: &PipelineSettings) -> Mat4 {
    let [x, y, z] = settings.camera.rotation_degrees;
    let rotation = Quat::from_euler(
        EulerRot::XYZ,
        x.to_radians(),
        y.to_radians(),
        z.to_radians(),
    );
    let scale = Vec3::splat(settings.expansion.lattice_scale);
    let scale = match settings.scene {
        SceneMode::WaveMesh => scale,
        SceneMode::DepthSensor => sensor_to_world(scale),
    };
    Mat4::from_scale_rotation_translation(scale, rotation, Vec3::ZERO)
}

pub fn build_expansion_uniform(
    settings: &PipelineSettings,
    clip_from_world: Mat4,
    eye: Vec3,
    elapsed: f32,
    grid: (u32, u32),
) -> ExpansionUniform {
    let expansion = &settings.expansion;
    let lighting = &settings.lighting;
    let [bx, by, bz] = expansion.box_dimensions;
    let bright_tolerance = if settings.uses_sensor() {
        settings.sensor.bright_tolerance
    } else {
        0.0
    };

    ExpansionUniform {
        clip_from_world: clip_from_world.to_cols_array_2d(),
        world_from_local: world_from_local(settings).to_cols_array_2d(),
        eye: eye.extend(elapsed).to_array(),
        light_position: Vec3::from_array(lighting.position)
            .extend(lighting.shininess)
            .to_array(),
        light_terms: [
            lighting.ambient,
            lighting.diffuse,
            lighting.specular,
            expansion.alpha,
        ],
        shape: [
            expansion.scale,
            expansion.uv_mix,
            expansion.depth_scale,
            expansion.rotation_speed,
        ],
        box_dimensions: [bx, by, bz, bright_tolerance],
        grid: [grid.0, grid.1, settings.uses_sensor() as u32, 0],
    }
}

/// Capture camera matrices and stage parameters for the render world.
/// Leaves `program` unset until the scene exists, which skips the draw.
pub fn extract_expansion_frame(
    mut commands: Commands,
    camera_query: Extract<Query<(&Camera, &GlobalTransform), With<AnchoredCamera>>>,
    settings: Extract<Option<Res<PipelineSettings>>>,
    selector: Extract<Option<Res<ExpansionSelector>>>,
    topology: Extract<Option<Res<MeshTopology>>>,
    time: Extract<Res<Time>>,
) {
    let mut frame = ExpansionFrame::default();

    let (Some(settings), Some(selector), Some(topology)) =
        (settings.as_ref(), selector.as_ref(), topology.as_ref())
    else {
        commands.insert_resource(frame);
        return;
    };

    if let Ok((camera, camera_transform)) = camera_query.single() {
        let clip_from_world =
            camera.clip_from_view() * camera_transform.compute_matrix().inverse();
        frame.program = Some(selector.program());
        frame.shape = settings.expansion.shape;
        frame.uniform = build_expansion_uniform(
            settings,
            clip_from_world,
            camera_transform.translation(),
            time.elapsed_secs(),
            topology.size(),
        );
    }

    commands.insert_resource(frame);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_std140_sized() {
        assert_eq!(std::mem::size_of::<ExpansionUniform>(), 224);
        assert_eq!(std::mem::size_of::<ExpansionUniform>() % 16, 0);
    }

    #[test]
    fn sensor_scene_is_mirrored() {
        let settings = PipelineSettings::depth_sensor();
        let model = world_from_local(&settings);
        let point = model.transform_point3(Vec3::new(10.0, 5.0, 2.0));
        let scale = settings.expansion.lattice_scale;

        assert!((point - Vec3::new(-10.0, -5.0, -2.0) * scale).length() < 1e-4);
    }

    #[test]
    fn uniform_packs_settings() {
        let mut settings = PipelineSettings::default();
        settings.lighting.shininess = 7.0;
        settings.expansion.alpha = 0.5;

        let uniform = build_expansion_uniform(
            &settings,
            Mat4::IDENTITY,
            Vec3::new(0.0, 0.0, -500.0),
            2.5,
            (128, 64),
        );

        assert_eq!(uniform.eye, [0.0, 0.0, -500.0, 2.5]);
        assert_eq!(uniform.light_position[3], 7.0);
        assert_eq!(uniform.light_terms[3], 0.5);
        assert_eq!(uniform.grid, [128, 64, 0, 0]);
        assert_eq!(uniform.box_dimensions[3], 0.0);
    }

    #[test]
    fn sensor_uniform_carries_bright_tolerance() {
        let mut settings = PipelineSettings::depth_sensor();
        settings.sensor.bright_tolerance = 0.08;

        let uniform =
            build_expansion_uniform(&settings, Mat4::IDENTITY, Vec3::ZERO, 0.0, (320, 240));

        assert_eq!(uniform.grid[2], 1);
        assert_eq!(uniform.box_dimensions, [3.0, 6.0, 1.0, 0.08]);
    }
}
