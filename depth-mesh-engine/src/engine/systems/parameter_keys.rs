use bevy::prelude::*;
use constants::mesh::{GRID_RESIZE_STEP, MAX_GRID_DIMENSION, MIN_GRID_DIMENSION};

use crate::engine::assets::pipeline_settings::{GridSettings, PipelineSettings};
use crate::engine::background::subtraction::BackgroundSubtraction;
use crate::engine::render::pipeline::expansion_program::PrimitiveShape;

const AMPLITUDE_STEP: f32 = 1.0;
const BRIGHT_TOLERANCE_STEP: f32 = 0.005;

/// Grow or shrink the wave grid by one step on both axes, within bounds.
/// Returns whether the size changed.
pub fn resize_grid(grid: &mut GridSettings, grow: bool) -> bool {
    let step = |edge: u32| {
        let next = if grow {
            edge.saturating_add(GRID_RESIZE_STEP)
        } else {
            edge.saturating_sub(GRID_RESIZE_STEP)
        };
        next.clamp(MIN_GRID_DIMENSION, MAX_GRID_DIMENSION)
    };
    let resized = (step(grid.width), step(grid.height));
    if resized == (grid.width, grid.height) {
        return false;
    }
    (grid.width, grid.height) = resized;
    true
}

/// Keyboard stand-in for a parameter panel. Every shortcut writes to the
/// settings resource; the stages pick the change up on the next tick.
pub fn parameter_keys_system(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut settings: ResMut<PipelineSettings>,
    subtraction: Option<ResMut<BackgroundSubtraction>>,
) {
    if keyboard.just_pressed(KeyCode::KeyT) {
        settings.expansion.transform_enabled = !settings.expansion.transform_enabled;
    }

    if keyboard.just_pressed(KeyCode::KeyB) {
        settings.sensor.remove_background = !settings.sensor.remove_background;
    }

    if keyboard.just_pressed(KeyCode::KeyR) {
        if let Some(mut subtraction) = subtraction {
            subtraction.model_mut().request_capture();
            println!("Background re-capture requested");
        }
    }

    if settings.uses_sensor() {
        for (key, step) in [
            (KeyCode::Minus, -BRIGHT_TOLERANCE_STEP),
            (KeyCode::Equal, BRIGHT_TOLERANCE_STEP),
        ] {
            if keyboard.just_pressed(key) {
                let tolerance = &mut settings.sensor.bright_tolerance;
                *tolerance = (*tolerance + step).clamp(0.0, 1.0);
                println!("Bright tolerance: {:.3}", tolerance);
            }
        }
    } else {
        for (key, grow) in [(KeyCode::BracketLeft, false), (KeyCode::BracketRight, true)] {
            if keyboard.just_pressed(key) && resize_grid(&mut settings.grid, grow) {
                println!("Grid size: {}x{}", settings.grid.width, settings.grid.height);
            }
        }

        if keyboard.just_pressed(KeyCode::ArrowUp) {
            settings.wave.amplitude += AMPLITUDE_STEP;
            println!("Wave amplitude: {:.1}", settings.wave.amplitude);
        }

        if keyboard.just_pressed(KeyCode::ArrowDown) {
            settings.wave.amplitude = (settings.wave.amplitude - AMPLITUDE_STEP).max(0.0);
            println!("Wave amplitude: {:.1}", settings.wave.amplitude);
        }
    }

    for (key, shape) in [
        (KeyCode::Digit1, PrimitiveShape::Quad),
        (KeyCode::Digit2, PrimitiveShape::Box),
        (KeyCode::Digit3, PrimitiveShape::Disc),
    ] {
        if keyboard.just_pressed(key) && settings.expansion.shape != shape {
            settings.expansion.shape = shape;
            println!("Primitive shape: {:?}", shape);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_app(settings: PipelineSettings) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<ButtonInput<KeyCode>>()
            .insert_resource(settings)
            .add_systems(Update, parameter_keys_system);
        app
    }

    fn press(app: &mut App, key: KeyCode) {
        let mut input = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
        input.clear();
        input.release_all();
        input.press(key);
        app.update();
    }

    #[test]
    fn resize_is_clamped() {
        let mut grid = GridSettings {
            width: 8,
            height: 2040,
        };
        assert!(resize_grid(&mut grid, true));
        assert_eq!((grid.width, grid.height), (24, 2048));

        let mut grid = GridSettings {
            width: MIN_GRID_DIMENSION,
            height: MIN_GRID_DIMENSION,
        };
        assert!(!resize_grid(&mut grid, false));
    }

    #[test]
    fn transform_key_toggles() {
        let mut app = keys_app(PipelineSettings::default());
        press(&mut app, KeyCode::KeyT);
        assert!(!app.world().resource::<PipelineSettings>().expansion.transform_enabled);
        press(&mut app, KeyCode::KeyT);
        assert!(app.world().resource::<PipelineSettings>().expansion.transform_enabled);
    }

    #[test]
    fn shape_and_grid_keys() {
        let mut app = keys_app(PipelineSettings::default());
        press(&mut app, KeyCode::Digit2);
        press(&mut app, KeyCode::BracketRight);

        let settings = app.world().resource::<PipelineSettings>();
        assert_eq!(settings.expansion.shape, PrimitiveShape::Box);
        assert_eq!((settings.grid.width, settings.grid.height), (144, 144));
    }

    #[test]
    fn sensor_lattice_ignores_resize() {
        let mut app = keys_app(PipelineSettings::depth_sensor());
        press(&mut app, KeyCode::BracketLeft);
        assert_eq!(app.world().resource::<PipelineSettings>().lattice_size(), (320, 240));
    }

    #[test]
    fn tolerance_keys_step_within_range() {
        let mut settings = PipelineSettings::depth_sensor();
        settings.sensor.bright_tolerance = 0.003;
        let mut app = keys_app(settings);

        press(&mut app, KeyCode::Minus);
        assert_eq!(app.world().resource::<PipelineSettings>().sensor.bright_tolerance, 0.0);

        press(&mut app, KeyCode::Equal);
        press(&mut app, KeyCode::Equal);
        let tolerance = app.world().resource::<PipelineSettings>().sensor.bright_tolerance;
        assert!((tolerance - 0.01).abs() < 1e-6);

        press(&mut app, KeyCode::ArrowUp);
        assert_eq!(app.world().resource::<PipelineSettings>().wave.amplitude, 0.0);
    }

    #[test]
    fn amplitude_never_goes_negative() {
        let mut settings = PipelineSettings::default();
        settings.wave.amplitude = 0.5;
        let mut app = keys_app(settings);
        press(&mut app, KeyCode::ArrowDown);
        assert_eq!(app.world().resource::<PipelineSettings>().wave.amplitude, 0.0);
    }
}
