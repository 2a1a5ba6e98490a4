use bevy::core_pipeline::core_3d::CORE_3D_DEPTH_FORMAT;
use bevy::core_pipeline::core_3d::graph::{Core3d, Node3d};
use bevy::ecs::query::QueryItem;
use bevy::image::BevyDefault;
use bevy::prelude::*;
use bevy::render::extract_resource::ExtractResourcePlugin;
use bevy::render::render_asset::RenderAssets;
use bevy::render::render_graph::{
    NodeRunError, RenderGraphApp, RenderGraphContext, RenderLabel, ViewNode, ViewNodeRunner,
};
use bevy::render::render_resource::{
    BindGroup, BindGroupEntry, BindGroupLayout, BindGroupLayoutEntry, BindingResource, BindingType,
    BlendState, BufferBindingType, BufferInitDescriptor, BufferUsages, CachedRenderPipelineId,
    ColorTargetState, ColorWrites, CompareFunction, DepthBiasState, DepthStencilState,
    FragmentState, IndexFormat, LoadOp, MultisampleState, Operations, PipelineCache,
    PrimitiveState, RenderPassDepthStencilAttachment, RenderPassDescriptor,
    RenderPipelineDescriptor, Shader, ShaderDefVal, ShaderStages, StencilState, StoreOp, TextureFormat,
    TextureSampleType, TextureViewDimension, VertexState,
};
use bevy::render::renderer::{RenderContext, RenderDevice};
use bevy::render::texture::{FallbackImage, GpuImage};
use bevy::render::view::{ViewDepthTexture, ViewTarget};
use bevy::render::{Render, RenderApp, RenderSet};

use crate::engine::background::subtraction::MaskedImages;
use crate::engine::compute::heightfield::GpuHeightField;
use crate::engine::core::app_state::AppState;
use crate::engine::render::extraction::expansion_frame::ExpansionFrame;
use crate::engine::render::pipeline::expansion_program::{
    ExpansionProgram, PrimitiveShape, draw_vertex_count,
};
use crate::engine::render::pipeline::readiness::{
    ProgramReadiness, ProgramShaders, check_program_readiness,
};

pub const EXPANSION_SHADER_PATH: &str = "shaders/expansion.wgsl";

/// Draws the displaced lattice either as points or as expanded primitives.
///
/// Vertices are pulled from the displaced texel buffer in the vertex stage;
/// no vertex buffers are bound. The pass runs after the opaque pass so it
/// depth tests against anything else in the scene.
pub struct ExpansionRenderPlugin;

impl Plugin for ExpansionRenderPlugin {
    fn build(&self, app: &mut App) {
        let readiness = ProgramReadiness::default();

        app.insert_resource(readiness.clone())
            .add_plugins(ExtractResourcePlugin::<MaskedImages>::default());

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app
            .insert_resource(readiness)
            .init_resource::<ExpansionFrame>()
            .init_resource::<ExpansionBindGroup>()
            .add_systems(
                Render,
                (
                    check_program_readiness.in_set(RenderSet::PrepareResources),
                    prepare_expansion_bind_group
                        .in_set(RenderSet::PrepareBindGroups)
                        .run_if(in_state(AppState::Running)),
                ),
            )
            .add_render_graph_node::<ViewNodeRunner<ExpansionRenderNode>>(
                Core3d,
                ExpansionRenderLabel,
            )
            .add_render_graph_edges(
                Core3d,
                (
                    Node3d::MainOpaquePass,
                    ExpansionRenderLabel,
                    Node3d::MainTransparentPass,
                ),
            );
    }

    fn finish(&self, app: &mut App) {
        let shaders = app
            .world()
            .get_resource::<AssetServer>()
            .map(ProgramShaders::load);
        if let Some(shaders) = shaders {
            app.insert_resource(shaders);
        }

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app.init_resource::<ExpansionPipelines>();
    }
}

#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
pub struct ExpansionRenderLabel;

/// One pass-through pipeline plus one expand pipeline per shape.
///
/// ```wgsl
/// @group(0) @binding(0) var<uniform> params: ExpansionParams;
/// @group(0) @binding(1) var<storage, read> texels: array<GridTexel>;
/// @group(0) @binding(2) var masked_depth: texture_2d<f32>;
/// @group(0) @binding(3) var masked_colour: texture_2d<f32>;
/// ```
#[derive(Resource)]
pub struct ExpansionPipelines {
    pub layout: BindGroupLayout,
    pass_through: CachedRenderPipelineId,
    expand: [CachedRenderPipelineId; 3],
}

impl ExpansionPipelines {
    pub fn id(&self, program: ExpansionProgram, shape: PrimitiveShape) -> CachedRenderPipelineId {
        match program {
            ExpansionProgram::PassThrough => self.pass_through,
            ExpansionProgram::Expand => self.expand[shape.index()],
        }
    }

    /// Every queued program with a label for error reporting.
    pub fn programs(&self) -> Vec<(String, CachedRenderPipelineId)> {
        let mut programs = vec![(ExpansionProgram::PassThrough.label().to_string(), self.pass_through)];
        programs.extend(PrimitiveShape::ALL.iter().map(|shape| {
            (
                format!("{}_{:?}", ExpansionProgram::Expand.label(), shape).to_lowercase(),
                self.expand[shape.index()],
            )
        }));
        programs
    }
}

impl FromWorld for ExpansionPipelines {
    fn from_world(world: &mut World) -> Self {
        let layout = create_expansion_bind_group_layout(world.resource::<RenderDevice>());
        let shader = world.resource::<AssetServer>().load(EXPANSION_SHADER_PATH);
        let pipeline_cache = world.resource::<PipelineCache>();

        let pass_through = pipeline_cache.queue_render_pipeline(expansion_pipeline_descriptor(
            &layout,
            shader.clone(),
            ExpansionProgram::PassThrough,
            PrimitiveShape::default(),
        ));
        let expand = PrimitiveShape::ALL.map(|shape| {
            pipeline_cache.queue_render_pipeline(expansion_pipeline_descriptor(
                &layout,
                shader.clone(),
                ExpansionProgram::Expand,
                shape,
            ))
        });

        Self {
            layout,
            pass_through,
            expand,
        }
    }
}

fn create_expansion_bind_group_layout(render_device: &RenderDevice) -> BindGroupLayout {
    let texture = |binding| BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::VERTEX_FRAGMENT,
        ty: BindingType::Texture {
            sample_type: TextureSampleType::Float { filterable: false },
            view_dimension: TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };

    render_device.create_bind_group_layout(
        "expansion_layout",
        &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::VERTEX,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            texture(2),
            texture(3),
        ],
    )
}

pub fn expansion_shader_defs(program: ExpansionProgram, shape: PrimitiveShape) -> Vec<ShaderDefVal> {
    match program {
        ExpansionProgram::PassThrough => vec!["PASS_THROUGH".into()],
        ExpansionProgram::Expand => vec![
            "EXPAND".into(),
            shape.shader_def().into(),
            ShaderDefVal::UInt(
                "VERTICES_PER_PRIMITIVE".into(),
                shape.vertices_per_primitive(),
            ),
        ],
    }
}

fn expansion_pipeline_descriptor(
    layout: &BindGroupLayout,
    shader: Handle<Shader>,
    program: ExpansionProgram,
    shape: PrimitiveShape,
) -> RenderPipelineDescriptor {
    let shader_defs = expansion_shader_defs(program, shape);
    let label = match program {
        ExpansionProgram::PassThrough => program.label().to_string(),
        ExpansionProgram::Expand => format!("{}_{:?}", program.label(), shape).to_lowercase(),
    };

    RenderPipelineDescriptor {
        label: Some(label.into()),
        layout: vec![layout.clone()],
        push_constant_ranges: Vec::new(),
        vertex: VertexState {
            shader: shader.clone(),
            shader_defs: shader_defs.clone(),
            entry_point: "vertex".into(),
            buffers: Vec::new(),
        },
        fragment: Some(FragmentState {
            shader,
            shader_defs,
            entry_point: "fragment".into(),
            targets: vec![Some(ColorTargetState {
                format: TextureFormat::bevy_default(),
                blend: Some(BlendState::ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
        }),
        primitive: PrimitiveState {
            topology: program.topology(),
            cull_mode: None,
            ..default()
        },
        depth_stencil: Some(DepthStencilState {
            format: CORE_3D_DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Greater,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState::default(),
        zero_initialize_workgroup_memory: false,
    }
}

#[derive(Resource, Default)]
pub struct ExpansionBindGroup {
    pub bind_group: Option<BindGroup>,
}

/// Rebuild the bind group for this frame. The wave scene has no masked
/// images, so the fallback texture stands in for both.
pub fn prepare_expansion_bind_group(
    mut bind_group: ResMut<ExpansionBindGroup>,
    pipelines: Res<ExpansionPipelines>,
    frame: Res<ExpansionFrame>,
    gpu: Res<GpuHeightField>,
    masked: Option<Res<MaskedImages>>,
    gpu_images: Res<RenderAssets<GpuImage>>,
    fallback: Res<FallbackImage>,
    render_device: Res<RenderDevice>,
) {
    bind_group.bind_group = None;

    let Some(displaced) = &gpu.displaced else {
        return;
    };
    if frame.program.is_none() {
        return;
    }

    let (depth_view, colour_view) = match masked.as_deref() {
        Some(masked) => {
            let (Some(depth), Some(colour)) =
                (gpu_images.get(&masked.depth), gpu_images.get(&masked.colour))
            else {
                return;
            };
            (&depth.texture_view, &colour.texture_view)
        }
        None => (&fallback.d2.texture_view, &fallback.d2.texture_view),
    };

    let uniform = render_device.create_buffer_with_data(&BufferInitDescriptor {
        label: Some("expansion_params"),
        contents: bytemuck::cast_slice(&[frame.uniform]),
        usage: BufferUsages::UNIFORM,
    });

    bind_group.bind_group = Some(render_device.create_bind_group(
        "expansion_bind_group",
        &pipelines.layout,
        &[
            BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 1,
                resource: displaced.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 2,
                resource: BindingResource::TextureView(depth_view),
            },
            BindGroupEntry {
                binding: 3,
                resource: BindingResource::TextureView(colour_view),
            },
        ],
    ));
}

#[derive(Default)]
struct ExpansionRenderNode;

impl ViewNode for ExpansionRenderNode {
    type ViewQuery = (&'static ViewTarget, &'static ViewDepthTexture);

    fn run(
        &self,
        _graph: &mut RenderGraphContext,
        render_context: &mut RenderContext,
        (target, depth): QueryItem<Self::ViewQuery>,
        world: &World,
    ) -> Result<(), NodeRunError> {
        let (Some(frame), Some(pipelines), Some(bind_group), Some(gpu)) = (
            world.get_resource::<ExpansionFrame>(),
            world.get_resource::<ExpansionPipelines>(),
            world.get_resource::<ExpansionBindGroup>(),
            world.get_resource::<GpuHeightField>(),
        ) else {
            return Ok(());
        };
        let (Some(program), Some(bind_group)) = (frame.program, &bind_group.bind_group) else {
            return Ok(());
        };
        let pipeline_cache = world.resource::<PipelineCache>();
        let Some(pipeline) = pipeline_cache.get_render_pipeline(pipelines.id(program, frame.shape))
        else {
            return Ok(());
        };

        let mut render_pass = render_context.begin_tracked_render_pass(RenderPassDescriptor {
            label: Some("expansion_render_pass"),
            color_attachments: &[Some(target.get_color_attachment())],
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: depth.view(),
                depth_ops: Some(Operations {
                    load: LoadOp::Load,
                    store: StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_render_pipeline(pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);

        match program {
            ExpansionProgram::PassThrough => {
                let Some(indices) = &gpu.index_buffer else {
                    return Ok(());
                };
                render_pass.set_index_buffer(indices.slice(..), 0, IndexFormat::Uint32);
                render_pass.draw_indexed(0..gpu.texel_count, 0, 0..1);
            }
            ExpansionProgram::Expand => {
                let vertices = draw_vertex_count(program, frame.shape, gpu.texel_count);
                render_pass.draw(0..vertices, 0..1);
            }
        }

        Ok(())
    }
}
