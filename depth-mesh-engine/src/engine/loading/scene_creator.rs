use bevy::prelude::*;

use crate::engine::assets::pipeline_settings::PipelineSettings;
use crate::engine::background::subtraction::BackgroundSubtraction;
use crate::engine::camera::anchor_camera::spawn_anchored_camera;
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::loading::texture_config::create_masked_images;
use crate::engine::mesh::topology::MeshTopology;
use crate::engine::render::pipeline::expansion_program::ExpansionSelector;
use crate::engine::sensor::device::SensorDevice;
use crate::engine::sensor::synthetic::SyntheticSensor;

/// Build everything the running pipeline needs once settings are known:
/// the lattice, the program selector, the camera and, for the depth scene,
/// the sensor device, background model and masked images.
pub fn create_scene_when_ready(
    mut loading_progress: ResMut<LoadingProgress>,
    settings: Option<Res<PipelineSettings>>,
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    mut exit: EventWriter<AppExit>,
) {
    if loading_progress.scene_created || !loading_progress.settings_loaded {
        return;
    }
    // Inserted by the settings loader's commands; visible from the next tick.
    let Some(settings) = settings else {
        return;
    };

    let (width, height) = settings.lattice_size();
    let topology = match MeshTopology::build(width, height) {
        Ok(topology) => topology,
        Err(err) => {
            error!("✗ Cannot build the {}x{} lattice: {}", width, height, err);
            exit.write(AppExit::error());
            return;
        }
    };

    commands.insert_resource(topology);
    commands.insert_resource(ExpansionSelector::new(
        settings.expansion.transform_enabled,
    ));

    let anchor = spawn_anchored_camera(&mut commands, &settings);
    commands.insert_resource(anchor);

    if settings.uses_sensor() {
        let sensor = &settings.sensor;
        let source = SyntheticSensor::new(sensor.width, sensor.height)
            .with_failed_starts(sensor.synthetic_failed_starts);
        commands.insert_resource(SensorDevice::new(Box::new(source)));
        commands.insert_resource(BackgroundSubtraction::from_settings(sensor));
        commands.insert_resource(create_masked_images(
            sensor.width,
            sensor.height,
            &mut images,
        ));
    }

    loading_progress.scene_created = true;
    println!(
        "✓ Scene created: {:?}, {}x{} lattice",
        settings.scene, width, height
    );
}
