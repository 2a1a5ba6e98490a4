use bevy::prelude::*;
use bevy::render::extract_resource::{ExtractResource, ExtractResourcePlugin};
use bevy::render::{
    Render, RenderApp, RenderSet,
    render_resource::{
        BindGroupEntry, BindGroupLayout, BindGroupLayoutEntry, BindingType, Buffer,
        BufferBindingType, BufferDescriptor, BufferInitDescriptor, BufferUsages,
        CachedComputePipelineId, ComputePassDescriptor, ComputePipelineDescriptor, PipelineCache,
        ShaderStages,
    },
    renderer::{RenderDevice, RenderQueue},
};
use bytemuck::{Pod, Zeroable};
use constants::mesh::{HEIGHTFIELD_WORKGROUP_SIZE, TEXEL_STRIDE_BYTES};
use serde::{Deserialize, Serialize};

use crate::engine::assets::pipeline_settings::PipelineSettings;
use crate::engine::core::app_state::AppState;
use crate::engine::mesh::topology::MeshTopology;
use crate::engine::render::pipeline::readiness::{ProgramReadiness, check_capability_floor};

pub const HEIGHTFIELD_SHADER_PATH: &str = "shaders/heightfield.wgsl";

/// Wave shape applied to the base lattice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveParams {
    pub amplitude: f32,
    pub speed: f32,
    /// Spatial frequency of the wave across the lattice.
    pub width: f32,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            amplitude: 12.0,
            speed: 1.0,
            width: 0.04,
        }
    }
}

/// Displacement of one base position. Mirrors `wave_offset` in
/// `heightfield.wgsl`; keep the two in step.
pub fn wave_offset(base: Vec3, elapsed: f32, wave: &WaveParams) -> Vec3 {
    let phase = elapsed * wave.speed;
    let height = wave.amplitude * (base.x * wave.width + phase).sin() * (base.y * wave.width + phase).cos();
    Vec3::new(0.0, 0.0, height)
}

/// CPU evaluation of the height field. Always computed from the base
/// positions, never from a previous result.
pub fn displace(base: &[Vec3], elapsed: f32, wave: &WaveParams) -> Vec<Vec3> {
    base.iter()
        .map(|position| *position + wave_offset(*position, elapsed, wave))
        .collect()
}

/// Clock and wave parameters for this tick's compute dispatch.
#[derive(Resource, Debug, Clone, Default, ExtractResource)]
pub struct HeightFieldFrame {
    pub elapsed: f32,
    pub wave: WaveParams,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct HeightFieldUniform {
    /// width, height, texel count, unused
    grid: [u32; 4],
    /// amplitude, speed, width, elapsed
    wave: [f32; 4],
}

pub struct HeightFieldPlugin;

impl Plugin for HeightFieldPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HeightFieldFrame>()
            .add_plugins(ExtractResourcePlugin::<HeightFieldFrame>::default())
            .add_plugins(ExtractResourcePlugin::<MeshTopology>::default())
            .add_systems(
                Update,
                update_heightfield_frame.run_if(in_state(AppState::Running)),
            );

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app.init_resource::<GpuHeightField>().add_systems(
            Render,
            (
                prepare_heightfield_buffers.in_set(RenderSet::PrepareResources),
                run_heightfield_compute.in_set(RenderSet::PrepareBindGroups),
            )
                .run_if(in_state(AppState::Running)),
        );
    }

    fn finish(&self, app: &mut App) {
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app.init_resource::<HeightFieldPipeline>();
    }
}

pub fn update_heightfield_frame(
    time: Res<Time>,
    settings: Res<PipelineSettings>,
    mut frame: ResMut<HeightFieldFrame>,
) {
    frame.elapsed = time.elapsed_secs();
    frame.wave = settings.active_wave();
}

/// Compute pipeline writing the displaced buffer from the base buffer.
///
/// ```wgsl
/// @group(0) @binding(0) var<storage, read> base_texels: array<GridTexel>;
/// @group(0) @binding(1) var<storage, read_write> displaced_texels: array<GridTexel>;
/// @group(0) @binding(2) var<uniform> params: HeightFieldParams;
/// ```
#[derive(Resource)]
pub struct HeightFieldPipeline {
    pub pipeline: CachedComputePipelineId,
    layout: BindGroupLayout,
}

impl FromWorld for HeightFieldPipeline {
    fn from_world(world: &mut World) -> Self {
        let layout = world.resource::<RenderDevice>().create_bind_group_layout(
            "heightfield_compute_layout",
            &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::COMPUTE,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::COMPUTE,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::COMPUTE,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        );

        let shader = world.resource::<AssetServer>().load(HEIGHTFIELD_SHADER_PATH);
        let pipeline =
            world
                .resource::<PipelineCache>()
                .queue_compute_pipeline(ComputePipelineDescriptor {
                    label: Some("heightfield_compute".into()),
                    layout: vec![layout.clone()],
                    push_constant_ranges: Vec::new(),
                    shader,
                    shader_defs: vec![],
                    entry_point: "main".into(),
                    zero_initialize_workgroup_memory: true,
                });

        Self { pipeline, layout }
    }
}

/// GPU copies of the current topology.
///
/// Fields drop in declaration order, the reverse of allocation order.
#[derive(Resource, Default)]
pub struct GpuHeightField {
    pub index_buffer: Option<Buffer>,
    pub displaced: Option<Buffer>,
    pub base: Option<Buffer>,
    pub generation: Option<u64>,
    pub width: u32,
    pub height: u32,
    pub texel_count: u32,
}

/// Reallocate buffers when the extracted topology has a new generation.
/// Rebuilds happen in the main world between ticks, so the old buffers are
/// never in use by the frame that replaces them. The main world already
/// rejects lattices over the device limits; the check here covers the first
/// allocation.
pub fn prepare_heightfield_buffers(
    topology: Res<MeshTopology>,
    mut gpu: ResMut<GpuHeightField>,
    render_device: Res<RenderDevice>,
    readiness: Res<ProgramReadiness>,
) {
    if gpu.generation == Some(topology.generation()) {
        return;
    }

    if let Err(err) = check_capability_floor(&render_device.limits(), topology.texel_count()) {
        // Fatal only for the first lattice; afterwards the previous buffers keep drawing.
        if gpu.generation.is_none() {
            readiness.fail(err);
        } else {
            warn!("Keeping {}x{} height field buffers: {}", gpu.width, gpu.height, err);
            gpu.generation = Some(topology.generation());
        }
        return;
    }

    let texels = topology.gpu_texels();
    let (width, height) = topology.size();

    // Release the previous generation before allocating the next.
    *gpu = GpuHeightField::default();

    let base = render_device.create_buffer_with_data(&BufferInitDescriptor {
        label: Some("heightfield_base_texels"),
        contents: bytemuck::cast_slice(&texels),
        usage: BufferUsages::STORAGE,
    });
    let displaced = render_device.create_buffer(&BufferDescriptor {
        label: Some("heightfield_displaced_texels"),
        size: texels.len() as u64 * TEXEL_STRIDE_BYTES,
        usage: BufferUsages::STORAGE,
        mapped_at_creation: false,
    });
    let index_buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
        label: Some("lattice_indices"),
        contents: bytemuck::cast_slice(topology.indices()),
        usage: BufferUsages::INDEX,
    });

    *gpu = GpuHeightField {
        index_buffer: Some(index_buffer),
        displaced: Some(displaced),
        base: Some(base),
        generation: Some(topology.generation()),
        width,
        height,
        texel_count: topology.texel_count(),
    };
    debug!(
        "Allocated height field buffers for {}x{} (generation {})",
        width,
        height,
        topology.generation()
    );
}

/// Dispatch the height field pass. Runs every tick whether or not anything
/// is drawn, and is submitted before the render graph executes.
pub fn run_heightfield_compute(
    pipeline: Res<HeightFieldPipeline>,
    gpu: Res<GpuHeightField>,
    frame: Res<HeightFieldFrame>,
    pipeline_cache: Res<PipelineCache>,
    render_device: Res<RenderDevice>,
    render_queue: Res<RenderQueue>,
) {
    let (Some(base), Some(displaced)) = (&gpu.base, &gpu.displaced) else {
        return;
    };
    let Some(compute_pipeline) = pipeline_cache.get_compute_pipeline(pipeline.pipeline) else {
        return;
    };

    let uniform = HeightFieldUniform {
        grid: [gpu.width, gpu.height, gpu.texel_count, 0],
        wave: [
            frame.wave.amplitude,
            frame.wave.speed,
            frame.wave.width,
            frame.elapsed,
        ],
    };
    let params = render_device.create_buffer_with_data(&BufferInitDescriptor {
        label: Some("heightfield_params"),
        contents: bytemuck::cast_slice(&[uniform]),
        usage: BufferUsages::UNIFORM,
    });

    let bind_group = render_device.create_bind_group(
        "heightfield_compute_bind_group",
        &pipeline.layout,
        &[
            BindGroupEntry {
                binding: 0,
                resource: base.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 1,
                resource: displaced.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 2,
                resource: params.as_entire_binding(),
            },
        ],
    );

    let mut encoder = render_device.create_command_encoder(&Default::default());
    {
        let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
            label: Some("heightfield_compute"),
            timestamp_writes: None,
        });
        pass.set_pipeline(compute_pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(
            gpu.width.div_ceil(HEIGHTFIELD_WORKGROUP_SIZE),
            gpu.height.div_ceil(HEIGHTFIELD_WORKGROUP_SIZE),
            1,
        );
    }
    render_queue.submit([encoder.finish()]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::background::model::{ForegroundMask, PixelClass, apply_mask};
    use crate::engine::sensor::frame::DepthFrame;

    #[test]
    fn displacement_is_a_pure_function_of_its_inputs() {
        let topology = MeshTopology::build(16, 8).unwrap();
        let wave = WaveParams::default();

        let first = displace(topology.base_positions(), 12.5, &wave);
        let second = displace(topology.base_positions(), 12.5, &wave);
        assert_eq!(first, second);
    }

    #[test]
    fn results_do_not_accumulate_across_ticks() {
        let topology = MeshTopology::build(8, 8).unwrap();
        let wave = WaveParams::default();

        // Step through many ticks, then jump straight to the same time.
        let mut last = Vec::new();
        for tick in 0..=600 {
            last = displace(topology.base_positions(), tick as f32 / 60.0, &wave);
        }
        assert_eq!(last, displace(topology.base_positions(), 10.0, &wave));
    }

    #[test]
    fn only_depth_is_displaced() {
        let topology = MeshTopology::build(6, 4).unwrap();
        let displaced = displace(topology.base_positions(), 3.0, &WaveParams::default());

        for (base, moved) in topology.base_positions().iter().zip(&displaced) {
            assert_eq!(base.truncate(), moved.truncate());
            assert!((moved.z - base.z).abs() <= 12.0);
        }
    }

    #[test]
    fn zero_amplitude_is_identity() {
        let topology = MeshTopology::build(4, 2).unwrap();
        let wave = WaveParams {
            amplitude: 0.0,
            ..WaveParams::default()
        };
        assert_eq!(
            displace(topology.base_positions(), 42.0, &wave),
            topology.base_positions()
        );
    }

    #[test]
    fn known_value() {
        let wave = WaveParams {
            amplitude: 2.0,
            speed: 1.0,
            width: 0.5,
        };
        let offset = wave_offset(Vec3::new(std::f32::consts::PI, 0.0, 0.0), 0.0, &wave);
        // sin(pi / 2) * cos(0) = 1
        assert!((offset.z - 2.0).abs() < 1e-6);
    }

    #[test]
    fn background_pixel_is_still_in_the_sensor_scene() {
        let settings = PipelineSettings::depth_sensor();
        let topology = MeshTopology::build(2, 1).unwrap();
        let reference = DepthFrame::filled(2, 1, 2000);
        let mask = ForegroundMask::uniform(2, 1, PixelClass::Background);

        // Final z of a sensor vertex: displaced lattice plus masked depth.
        let final_z = |elapsed: f32, raw: Vec<u16>| {
            let frame = DepthFrame::new(2, 1, elapsed as f64, raw);
            let masked = apply_mask(
                &frame,
                None,
                &mask,
                Some(&reference),
                settings.sensor.max_depth_mm,
                settings.sensor.bright_tolerance,
            );
            displace(topology.base_positions(), elapsed, &settings.active_wave())
                .iter()
                .zip(&masked.depth)
                .map(|(position, depth)| position.z + depth * settings.expansion.depth_scale)
                .collect::<Vec<_>>()
        };

        assert_eq!(final_z(0.0, vec![2000, 2000]), final_z(1.0, vec![2600, 1200]));
    }

    #[test]
    fn sensor_scene_dispatches_a_flat_wave() {
        let mut app = App::new();
        let mut settings = PipelineSettings::depth_sensor();
        settings.wave.amplitude = 12.0;
        app.add_plugins(MinimalPlugins)
            .insert_resource(settings)
            .init_resource::<HeightFieldFrame>()
            .add_systems(Update, update_heightfield_frame);

        app.update();
        assert_eq!(app.world().resource::<HeightFieldFrame>().wave.amplitude, 0.0);
    }

    #[test]
    fn frame_tracks_settings() {
        let mut app = App::new();
        let mut settings = PipelineSettings::default();
        settings.wave.amplitude = 4.0;
        app.add_plugins(MinimalPlugins)
            .insert_resource(settings)
            .init_resource::<HeightFieldFrame>()
            .add_systems(Update, update_heightfield_frame);

        app.update();
        assert_eq!(app.world().resource::<HeightFieldFrame>().wave.amplitude, 4.0);
    }
}
