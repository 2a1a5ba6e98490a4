use bevy::prelude::*;

#[derive(Resource, Default)]
pub struct LoadingProgress {
    pub settings_loaded: bool,
    pub scene_created: bool,
    pub programs_ready: bool,
}
