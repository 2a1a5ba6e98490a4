use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;

use crate::engine::core::app_state::FpsText;

const FPS_LOG_INTERVAL_SECS: f32 = 5.0;

fn smoothed_fps(diagnostics: &DiagnosticsStore) -> Option<f64> {
    diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|fps| fps.smoothed())
}

pub fn fps_text_update_system(
    diagnostics: Res<DiagnosticsStore>,
    mut query: Query<&mut Text, With<FpsText>>,
) {
    let Some(value) = smoothed_fps(&diagnostics) else {
        return;
    };
    for mut text in &mut query {
        text.0 = format!("FPS: {value:.1}");
    }
}

/// Periodic frame rate line in the log, for headless and wasm runs.
pub fn fps_log_system(
    diagnostics: Res<DiagnosticsStore>,
    mut last_log_time: Local<f32>,
    time: Res<Time>,
) {
    let current_time = time.elapsed_secs();
    if current_time - *last_log_time < FPS_LOG_INTERVAL_SECS {
        return;
    }
    if let Some(value) = smoothed_fps(&diagnostics) {
        info!("FPS: {value:.1}");
        *last_log_time = current_time;
    }
}
