use bevy::asset::LoadState;
use bevy::prelude::*;

use crate::engine::assets::pipeline_settings::PipelineSettings;
use crate::engine::loading::progress::LoadingProgress;

pub const DEFAULT_SETTINGS_PATH: &str = "settings/pipeline.json";

#[derive(Resource)]
pub struct SettingsLoader {
    path: String,
    handle: Option<Handle<PipelineSettings>>,
}

impl SettingsLoader {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            handle: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS_PATH)
    }
}

// Start the loading process
pub fn start_loading(mut settings_loader: ResMut<SettingsLoader>, asset_server: Res<AssetServer>) {
    println!("Loading settings from: {}", settings_loader.path);
    let handle = asset_server.load(settings_loader.path.clone());
    settings_loader.handle = Some(handle);
}

/// Publish the loaded settings as the runtime parameter store. A missing or
/// malformed file is not fatal: the defaults are used instead.
pub fn load_settings_system(
    mut loading_progress: ResMut<LoadingProgress>,
    settings_loader: Res<SettingsLoader>,
    settings_assets: Res<Assets<PipelineSettings>>,
    asset_server: Res<AssetServer>,
    mut commands: Commands,
) {
    if loading_progress.settings_loaded {
        return;
    }
    let Some(handle) = &settings_loader.handle else {
        return;
    };

    if let Some(settings) = settings_assets.get(handle) {
        println!("✓ Settings loaded ({:?} scene)", settings.scene);
        commands.insert_resource(settings.clone());
        loading_progress.settings_loaded = true;
        return;
    }

    if let Some(LoadState::Failed(err)) = asset_server.get_load_state(handle) {
        warn!(
            "Settings at {} failed to load ({}); using defaults",
            settings_loader.path, err
        );
        commands.insert_resource(PipelineSettings::default());
        loading_progress.settings_loaded = true;
    }
}
