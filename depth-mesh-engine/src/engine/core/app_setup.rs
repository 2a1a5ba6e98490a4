// Standard library and external crates
use bevy::asset::AssetMetaCheck;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy::render::{ExtractSchedule, RenderApp};
use bevy_common_assets::json::JsonAssetPlugin;

// Crate engine modules
use crate::engine::assets::pipeline_settings::PipelineSettings;
use crate::engine::background::subtraction::{subtract_background, sync_background_toggle};
use crate::engine::camera::anchor_camera::apply_camera_anchor;
use crate::engine::camera::skeletal_anchor::{
    SkeletalAnchorTracker, log_tracked_users, track_skeletal_anchor,
};
use crate::engine::compute::heightfield::HeightFieldPlugin;
use crate::engine::core::app_state::{
    AppState, FpsText, transition_to_assets_loaded, transition_to_running,
};
use crate::engine::core::window_config::create_window_config;
use crate::engine::mesh::topology::rebuild_topology_on_resize;
use crate::engine::render::pipeline::expansion_pipeline::ExpansionRenderPlugin;
use crate::engine::render::pipeline::expansion_program::sync_expansion_program;
use crate::engine::render::pipeline::readiness::{
    await_expansion_programs, watch_program_failures,
};
use crate::engine::sensor::device::{
    SensorDevice, SensorFrames, drive_sensor_device, poll_sensor_frames, release_sensor_on_exit,
};
use crate::engine::systems::fps_tracking::{fps_log_system, fps_text_update_system};
use crate::engine::systems::parameter_keys::parameter_keys_system;

// Loading
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::loading::scene_creator::create_scene_when_ready;
use crate::engine::loading::settings_loader::{
    SettingsLoader, load_settings_system, start_loading,
};

// Extraction
use crate::engine::render::extraction::{
    app_state::extract_app_state, expansion_frame::extract_expansion_frame,
};

/// Build the app. `settings_path` is relative to the asset folder and
/// defaults to `settings/pipeline.json`.
pub fn create_app(settings_path: Option<String>) -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .init_state::<AppState>()
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        // Registers PipelineSettings as a loadable asset type from JSON files.
        .add_plugins(JsonAssetPlugin::<PipelineSettings>::new(&["json"]))
        .add_plugins(HeightFieldPlugin)
        .add_plugins(ExpansionRenderPlugin);

    let settings_loader = settings_path.map_or_else(SettingsLoader::default, SettingsLoader::new);

    // Initialise resources early
    app.init_resource::<LoadingProgress>()
        .insert_resource(settings_loader)
        .init_resource::<SensorFrames>()
        .init_resource::<SkeletalAnchorTracker>();

    // Configure render app with proper resource extraction
    if let Some(render_app) = app.get_sub_app_mut(RenderApp) {
        render_app.init_resource::<State<AppState>>();

        // Extract main-world state each frame
        render_app.add_systems(
            ExtractSchedule,
            (extract_app_state, extract_expansion_frame),
        );
    }

    // State-based system scheduling
    app.add_systems(Startup, (setup, start_loading).chain())
        .add_systems(
            Update,
            (
                load_settings_system,
                create_scene_when_ready,
                transition_to_assets_loaded,
            )
                .chain()
                .run_if(in_state(AppState::Loading)),
        )
        .add_systems(
            Update,
            await_expansion_programs.run_if(in_state(AppState::AssetsLoaded)),
        )
        .add_systems(
            Update,
            transition_to_running.run_if(in_state(AppState::ExpansionProgramsReady)),
        );

    // Sensor chain: device tick, polling, masking, then camera steering.
    let sensor_systems = (
        drive_sensor_device,
        poll_sensor_frames,
        sync_background_toggle,
        subtract_background,
        log_tracked_users,
        track_skeletal_anchor,
    )
        .chain()
        .run_if(resource_exists::<SensorDevice>);

    let runtime_systems = (
        parameter_keys_system,
        sync_expansion_program,
        rebuild_topology_on_resize,
        apply_camera_anchor,
        watch_program_failures,
        fps_log_system,
    )
        .chain();

    app.add_systems(
        Update,
        (sensor_systems, runtime_systems)
            .chain()
            .run_if(in_state(AppState::Running)),
    );

    // Release the device whichever path requested the exit.
    app.add_systems(Last, release_sensor_on_exit);

    // Add fps_text_update_system only for native builds.
    #[cfg(not(target_arch = "wasm32"))]
    {
        app.add_systems(Update, fps_text_update_system);
    }

    app
}

// Startup system that only handles basic initialisation
fn setup(mut commands: Commands) {
    println!("=== DEPTH MESH PIPELINE ===");

    #[cfg(not(target_arch = "wasm32"))]
    {
        create_native_overlays(&mut commands);
    }
}

fn create_native_overlays(commands: &mut Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                Text::new("FPS: "),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(Color::srgb(1., 0., 0.)),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(12.0),
                    right: Val::Px(12.0),
                    ..default()
                },
                FpsText,
            ));
        });
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}
