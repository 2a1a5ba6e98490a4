use bevy::prelude::*;
use bevy::render::Extract;

use crate::engine::core::app_state::AppState;

/// Mirror the main world state so render systems can use `in_state`.
pub fn extract_app_state(main_world: Extract<Res<State<AppState>>>, mut commands: Commands) {
    commands.insert_resource(State::new(*main_world.get()));
}
