use bevy::prelude::*;

use crate::engine::assets::pipeline_settings::PipelineSettings;
use crate::engine::camera::skeletal_anchor::CameraAnchor;

/// The scene camera steered by [`CameraAnchor`].
#[derive(Component)]
pub struct AnchoredCamera;

pub fn anchor_transform(anchor: &CameraAnchor) -> Transform {
    Transform::from_translation(anchor.eye).looking_at(anchor.look_at, Vec3::Y)
}

/// Spawn the camera at the scene's default eye. Multisampling is off because
/// the expansion pass draws straight into the main colour target.
pub fn spawn_anchored_camera(commands: &mut Commands, settings: &PipelineSettings) -> CameraAnchor {
    let anchor = CameraAnchor::new(settings.default_eye());
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: settings.camera.fov_degrees.to_radians(),
            near: settings.camera.near,
            far: settings.camera.far,
            ..default()
        }),
        Msaa::Off,
        anchor_transform(&anchor),
        AnchoredCamera,
    ));
    anchor
}

pub fn apply_camera_anchor(
    anchor: Res<CameraAnchor>,
    mut cameras: Query<&mut Transform, With<AnchoredCamera>>,
) {
    if !anchor.is_changed() {
        return;
    }
    for mut transform in &mut cameras {
        *transform = anchor_transform(&anchor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_follows_anchor() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(CameraAnchor::new(Vec3::new(0.0, 0.0, 100.0)))
            .add_systems(Update, apply_camera_anchor);
        let camera = app
            .world_mut()
            .spawn((Transform::default(), AnchoredCamera))
            .id();

        app.update();
        let transform = *app.world().get::<Transform>(camera).unwrap();
        assert_eq!(transform.translation, Vec3::new(0.0, 0.0, 100.0));
        assert!(transform.forward().dot(Vec3::NEG_Z) > 0.999);

        app.world_mut().resource_mut::<CameraAnchor>().eye = Vec3::new(-5.0, 2.0, 100.0);
        app.update();
        let transform = app.world().get::<Transform>(camera).unwrap();
        assert_eq!(transform.translation, Vec3::new(-5.0, 2.0, 100.0));
    }
}
