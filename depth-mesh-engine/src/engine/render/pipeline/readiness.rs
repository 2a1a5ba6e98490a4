use std::sync::{Arc, Mutex};

use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy::render::render_resource::{
    CachedPipelineState, PipelineCache, PipelineCacheError, Shader,
};
use bevy::render::renderer::RenderDevice;
use bevy::render::settings::WgpuLimits;
use constants::mesh::TEXEL_STRIDE_BYTES;
use constants::render_settings::{
    BOX_VERTEX_COUNT, EXPANSION_STORAGE_BUFFERS, HEIGHTFIELD_STORAGE_BUFFERS,
};
use constants::sensor::PROGRAM_LOAD_TIMEOUT_TICKS;

use crate::engine::compute::heightfield::{HEIGHTFIELD_SHADER_PATH, HeightFieldPipeline};
use crate::engine::core::app_state::AppState;
use crate::engine::error::ExpansionError;
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::render::pipeline::expansion_pipeline::{
    EXPANSION_SHADER_PATH, ExpansionPipelines,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReadinessReport {
    #[default]
    Pending,
    Ready,
    Failed(ExpansionError),
}

/// Load status of every GPU program, shared between the main and render
/// worlds. The render world writes it, the main world acts on it.
///
/// The first failure sticks; later reports never overwrite it.
#[derive(Resource, Clone, Default)]
pub struct ProgramReadiness(Arc<Mutex<ReadinessReport>>);

impl ProgramReadiness {
    pub fn report(&self) -> ReadinessReport {
        match self.0.lock() {
            Ok(report) => report.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn mark_ready(&self) {
        self.update(ReadinessReport::Ready);
    }

    pub fn fail(&self, err: ExpansionError) {
        self.update(ReadinessReport::Failed(err));
    }

    fn update(&self, next: ReadinessReport) {
        let mut report = match self.0.lock() {
            Ok(report) => report,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !matches!(*report, ReadinessReport::Failed(_)) {
            *report = next;
        }
    }
}

/// Handles to the shader assets, kept in the main world so load failures can
/// be told apart from slow loads.
#[derive(Resource)]
pub struct ProgramShaders {
    handles: Vec<(&'static str, Handle<Shader>)>,
}

impl ProgramShaders {
    pub fn load(asset_server: &AssetServer) -> Self {
        Self {
            handles: [HEIGHTFIELD_SHADER_PATH, EXPANSION_SHADER_PATH]
                .into_iter()
                .map(|path| (path, asset_server.load(path)))
                .collect(),
        }
    }

    fn failed(&self, asset_server: &AssetServer) -> Option<ExpansionError> {
        self.handles.iter().find_map(|(path, handle)| {
            matches!(
                asset_server.get_load_state(handle),
                Some(LoadState::Failed(_))
            )
            .then(|| ExpansionError::ShaderLoadFailed((*path).to_string()))
        })
    }
}

/// Refuse to run on a device below the minimum the two stages need.
///
/// Each stage's storage buffers must fit one shader stage, the displaced
/// buffer must be bindable as a whole, and the largest expansion must stay
/// addressable by a single draw call.
pub fn check_capability_floor(limits: &WgpuLimits, texel_count: u32) -> Result<(), ExpansionError> {
    let storage_buffers = HEIGHTFIELD_STORAGE_BUFFERS.max(EXPANSION_STORAGE_BUFFERS);
    if limits.max_storage_buffers_per_shader_stage < storage_buffers {
        return Err(ExpansionError::CapabilityFloor {
            limit: "max_storage_buffers_per_shader_stage",
            available: limits.max_storage_buffers_per_shader_stage as u64,
            required: storage_buffers as u64,
        });
    }

    let buffer_bytes = texel_count as u64 * TEXEL_STRIDE_BYTES;
    if (limits.max_storage_buffer_binding_size as u64) < buffer_bytes {
        return Err(ExpansionError::CapabilityFloor {
            limit: "max_storage_buffer_binding_size",
            available: limits.max_storage_buffer_binding_size as u64,
            required: buffer_bytes,
        });
    }

    let vertices = texel_count as u64 * BOX_VERTEX_COUNT as u64;
    if vertices > u32::MAX as u64 {
        return Err(ExpansionError::CapabilityFloor {
            limit: "vertices_per_draw",
            available: u32::MAX as u64,
            required: vertices,
        });
    }

    Ok(())
}

/// `Ok(true)` once compiled, `Ok(false)` while still loading or compiling.
pub fn pipeline_status(state: &CachedPipelineState, program: &str) -> Result<bool, ExpansionError> {
    match state {
        CachedPipelineState::Ok(_) => Ok(true),
        CachedPipelineState::Queued | CachedPipelineState::Creating(_) => Ok(false),
        CachedPipelineState::Err(
            PipelineCacheError::ShaderNotLoaded(_) | PipelineCacheError::ShaderImportNotYetAvailable,
        ) => Ok(false),
        CachedPipelineState::Err(err) => Err(ExpansionError::ProgramFailed {
            program: program.to_string(),
            reason: err.to_string(),
        }),
    }
}

/// Render world: fold the state of every queued program into the shared report.
pub fn check_program_readiness(
    readiness: Res<ProgramReadiness>,
    pipeline_cache: Res<PipelineCache>,
    render_device: Res<RenderDevice>,
    heightfield: Option<Res<HeightFieldPipeline>>,
    expansion: Option<Res<ExpansionPipelines>>,
) {
    if readiness.report() != ReadinessReport::Pending {
        return;
    }
    let (Some(heightfield), Some(expansion)) = (heightfield, expansion) else {
        return;
    };

    if let Err(err) = check_capability_floor(&render_device.limits(), 0) {
        readiness.fail(err);
        return;
    }

    let mut all_ready = pipeline_status(
        pipeline_cache.get_compute_pipeline_state(heightfield.pipeline),
        "heightfield",
    );
    for (label, id) in expansion.programs() {
        all_ready = all_ready.and_then(|ready| {
            pipeline_status(pipeline_cache.get_render_pipeline_state(id), &label)
                .map(|this| ready && this)
        });
    }

    match all_ready {
        Ok(true) => readiness.mark_ready(),
        Ok(false) => {}
        Err(err) => readiness.fail(err),
    }
}

/// Main world: wait for the render world to report, then either move on or
/// stop the app. Nothing is drawn with a program that failed to load.
pub fn await_expansion_programs(
    readiness: Res<ProgramReadiness>,
    shaders: Option<Res<ProgramShaders>>,
    asset_server: Option<Res<AssetServer>>,
    mut loading_progress: ResMut<LoadingProgress>,
    mut next_state: ResMut<NextState<AppState>>,
    mut exit: EventWriter<AppExit>,
    mut waited: Local<u64>,
) {
    let shader_failure = match (shaders, asset_server) {
        (Some(shaders), Some(asset_server)) => shaders.failed(&asset_server),
        _ => None,
    };
    if let Some(err) = shader_failure {
        readiness.fail(err);
    }

    match readiness.report() {
        ReadinessReport::Ready => {
            loading_progress.programs_ready = true;
            println!("✓ Expansion programs compiled");
            println!("→ Transitioning to ExpansionProgramsReady state");
            next_state.set(AppState::ExpansionProgramsReady);
        }
        ReadinessReport::Failed(err) => abort_startup(&err, &mut exit),
        ReadinessReport::Pending => {
            *waited += 1;
            if *waited > PROGRAM_LOAD_TIMEOUT_TICKS {
                let err = ExpansionError::LoadTimedOut(PROGRAM_LOAD_TIMEOUT_TICKS);
                readiness.fail(err.clone());
                abort_startup(&err, &mut exit);
            }
        }
    }
}

/// The first height field allocation happens once running; a device floor
/// failure there still stops the app.
pub fn watch_program_failures(readiness: Res<ProgramReadiness>, mut exit: EventWriter<AppExit>) {
    if let ReadinessReport::Failed(err) = readiness.report() {
        abort_startup(&err, &mut exit);
    }
}

fn abort_startup(err: &ExpansionError, exit: &mut EventWriter<AppExit>) {
    error!("✗ {err}");
    exit.write(AppExit::error());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> WgpuLimits {
        WgpuLimits::default()
    }

    #[test]
    fn default_limits_cover_the_default_lattice() {
        assert!(check_capability_floor(&limits(), 128 * 128).is_ok());
        assert!(check_capability_floor(&limits(), 320 * 240).is_ok());
    }

    #[test]
    fn too_few_storage_buffers_is_rejected() {
        let limits = WgpuLimits {
            max_storage_buffers_per_shader_stage: 1,
            ..limits()
        };
        assert!(matches!(
            check_capability_floor(&limits, 16),
            Err(ExpansionError::CapabilityFloor {
                limit: "max_storage_buffers_per_shader_stage",
                ..
            })
        ));
    }

    #[test]
    fn storage_floor_covers_both_stages() {
        for available in 0..HEIGHTFIELD_STORAGE_BUFFERS.max(EXPANSION_STORAGE_BUFFERS) {
            let limits = WgpuLimits {
                max_storage_buffers_per_shader_stage: available,
                ..limits()
            };
            assert!(check_capability_floor(&limits, 16).is_err());
        }
    }

    #[test]
    fn oversized_buffer_is_rejected() {
        let limits = WgpuLimits {
            max_storage_buffer_binding_size: 1024,
            ..limits()
        };
        assert!(check_capability_floor(&limits, 32).is_ok());
        assert_eq!(
            check_capability_floor(&limits, 33),
            Err(ExpansionError::CapabilityFloor {
                limit: "max_storage_buffer_binding_size",
                available: 1024,
                required: 33 * 32,
            })
        );
    }

    #[test]
    fn pending_states_are_not_errors() {
        assert_eq!(pipeline_status(&CachedPipelineState::Queued, "p"), Ok(false));
        assert_eq!(
            pipeline_status(
                &CachedPipelineState::Err(PipelineCacheError::ShaderImportNotYetAvailable),
                "p"
            ),
            Ok(false)
        );
        assert!(matches!(
            pipeline_status(
                &CachedPipelineState::Err(PipelineCacheError::CreateShaderModule("bad".into())),
                "expand_box"
            ),
            Err(ExpansionError::ProgramFailed { program, .. }) if program == "expand_box"
        ));
    }

    #[test]
    fn first_failure_sticks() {
        let readiness = ProgramReadiness::default();
        let shared = readiness.clone();
        assert_eq!(readiness.report(), ReadinessReport::Pending);

        shared.fail(ExpansionError::LoadTimedOut(1));
        readiness.mark_ready();
        assert_eq!(
            readiness.report(),
            ReadinessReport::Failed(ExpansionError::LoadTimedOut(1))
        );
    }

    fn waiting_app(readiness: ProgramReadiness) -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, bevy::state::app::StatesPlugin))
            .init_state::<AppState>()
            .init_resource::<LoadingProgress>()
            .insert_resource(readiness)
            .add_systems(Update, await_expansion_programs);
        app
    }

    #[test]
    fn ready_report_advances_state() {
        let readiness = ProgramReadiness::default();
        let mut app = waiting_app(readiness.clone());

        app.update();
        assert!(!app.world().resource::<LoadingProgress>().programs_ready);

        readiness.mark_ready();
        app.update();
        app.update();
        assert_eq!(
            *app.world().resource::<State<AppState>>().get(),
            AppState::ExpansionProgramsReady
        );
    }

    #[test]
    fn failed_program_requests_exit() {
        let readiness = ProgramReadiness::default();
        readiness.fail(ExpansionError::ProgramFailed {
            program: "expand_quad".into(),
            reason: "syntax error".into(),
        });
        let mut app = waiting_app(readiness);

        app.update();
        assert!(matches!(app.should_exit(), Some(AppExit::Error(_))));
        assert_eq!(
            *app.world().resource::<State<AppState>>().get(),
            AppState::Loading
        );
    }

    #[test]
    fn stalled_load_times_out() {
        let mut app = waiting_app(ProgramReadiness::default());
        for _ in 0..PROGRAM_LOAD_TIMEOUT_TICKS {
            app.update();
        }
        assert!(app.should_exit().is_none());

        app.update();
        assert!(app.should_exit().is_some());
    }
}
