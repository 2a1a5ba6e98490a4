use bevy::prelude::*;
use bevy::render::extract_resource::ExtractResource;
use bevy::render::renderer::RenderDevice;
use bevy::render::settings::WgpuLimits;
use bytemuck::{Pod, Zeroable};
use constants::mesh::MAX_GRID_DIMENSION;

use crate::engine::assets::pipeline_settings::PipelineSettings;
use crate::engine::camera::skeletal_anchor::CameraAnchor;
use crate::engine::error::TopologyError;
use crate::engine::render::pipeline::readiness::check_capability_floor;

/// One lattice cell: its index, centred base position and texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridVertex {
    pub index: u32,
    pub position: Vec3,
    pub uv: Vec2,
}

/// GPU layout of a lattice cell in the base and displaced storage buffers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GridTexel {
    pub position: [f32; 4],
    pub uv: [f32; 4],
}

/// Immutable index/position/uv lattice for a `width × height` point grid.
///
/// Cells are numbered row-major from the top-left. A resize replaces every
/// buffer and bumps `generation`; the render world reallocates GPU buffers
/// only when it sees a new generation.
#[derive(Resource, Debug, Clone, PartialEq, ExtractResource)]
pub struct MeshTopology {
    width: u32,
    height: u32,
    generation: u64,
    indices: Vec<u32>,
    base_positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
}

impl MeshTopology {
    pub fn build(width: u32, height: u32) -> Result<Self, TopologyError> {
        if width == 0 || height == 0 {
            return Err(TopologyError::Empty { width, height });
        }
        let largest = width.max(height);
        if largest > MAX_GRID_DIMENSION {
            return Err(TopologyError::TooLarge {
                requested: largest,
                max: MAX_GRID_DIMENSION,
            });
        }

        let count = (width * height) as usize;
        let mut indices = Vec::with_capacity(count);
        let mut base_positions = Vec::with_capacity(count);
        let mut uvs = Vec::with_capacity(count);

        let half_width = width as f32 * 0.5;
        let half_height = height as f32 * 0.5;
        for y in 0..height {
            for x in 0..width {
                indices.push(x + y * width);
                base_positions.push(Vec3::new(
                    x as f32 - half_width,
                    y as f32 - half_height,
                    0.0,
                ));
                uvs.push(Vec2::new(
                    x as f32 / width as f32,
                    y as f32 / height as f32,
                ));
            }
        }

        Ok(Self {
            width,
            height,
            generation: 0,
            indices,
            base_positions,
            uvs,
        })
    }

    /// Replace the lattice when the size changed. Returns `Ok(false)` and
    /// leaves every buffer untouched when it did not.
    pub fn rebuild(&mut self, width: u32, height: u32) -> Result<bool, TopologyError> {
        if self.size() == (width, height) {
            return Ok(false);
        }
        let generation = self.generation + 1;
        *self = Self::build(width, height)?;
        self.generation = generation;
        Ok(true)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn texel_count(&self) -> u32 {
        self.width * self.height
    }

    pub fn index(&self, x: u32, y: u32) -> u32 {
        x + y * self.width
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn base_positions(&self) -> &[Vec3] {
        &self.base_positions
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn vertex(&self, x: u32, y: u32) -> Option<GridVertex> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = self.index(x, y);
        Some(GridVertex {
            index,
            position: self.base_positions[index as usize],
            uv: self.uvs[index as usize],
        })
    }

    /// Base buffer contents for the height field pass.
    pub fn gpu_texels(&self) -> Vec<GridTexel> {
        self.base_positions
            .iter()
            .zip(&self.uvs)
            .map(|(position, uv)| GridTexel {
                position: position.extend(1.0).to_array(),
                uv: [uv.x, uv.y, 0.0, 0.0],
            })
            .collect()
    }
}

/// Rebuild only when the device can hold the new lattice. Without device
/// limits only the dimension bounds apply.
pub fn resize_within_limits(
    topology: &mut MeshTopology,
    width: u32,
    height: u32,
    limits: Option<&WgpuLimits>,
) -> Result<bool, TopologyError> {
    if let Some(limits) = limits {
        check_capability_floor(limits, width.saturating_mul(height))
            .map_err(TopologyError::ExceedsDevice)?;
    }
    topology.rebuild(width, height)
}

/// Rebuild the lattice between ticks when the configured size changes.
/// A rebuild changes the visible extent, so the camera anchor is reset too.
/// A rejected size keeps the current lattice running.
pub fn rebuild_topology_on_resize(
    settings: Res<PipelineSettings>,
    mut topology: ResMut<MeshTopology>,
    mut anchor: ResMut<CameraAnchor>,
    render_device: Option<Res<RenderDevice>>,
    mut rejected: Local<Option<(u32, u32)>>,
) {
    let (width, height) = settings.lattice_size();
    if topology.size() == (width, height) || *rejected == Some((width, height)) {
        return;
    }

    let limits = render_device.map(|device| device.limits());
    match resize_within_limits(&mut topology, width, height, limits.as_ref()) {
        Ok(true) => {
            anchor.reset(settings.default_eye());
            info!(
                "Rebuilt mesh topology: {}x{} ({} points, generation {})",
                width,
                height,
                topology.texel_count(),
                topology.generation()
            );
        }
        Ok(false) => {}
        Err(err) => {
            *rejected = Some((width, height));
            warn!("Keeping {:?} topology: {}", topology.size(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn four_by_two_lattice() {
        let topology = MeshTopology::build(4, 2).unwrap();

        assert_eq!(topology.indices(), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(
            topology.vertex(0, 0).map(|v| v.position),
            Some(Vec3::new(-2.0, -1.0, 0.0))
        );
        assert_eq!(
            topology.vertex(3, 1).map(|v| v.position),
            Some(Vec3::new(1.0, 0.0, 0.0))
        );
        assert_eq!(topology.vertex(3, 1).map(|v| v.uv), Some(Vec2::new(0.75, 0.5)));
        assert!(topology.vertex(4, 0).is_none());
    }

    #[test]
    fn indices_are_row_major_and_unique() {
        let (width, height) = (17, 9);
        let topology = MeshTopology::build(width, height).unwrap();

        let mut seen = HashSet::new();
        for y in 0..height {
            for x in 0..width {
                let vertex = topology.vertex(x, y).unwrap();
                assert_eq!(vertex.index, x + y * width);
                assert_eq!(topology.indices()[vertex.index as usize], vertex.index);
                assert!(seen.insert(vertex.index));
            }
        }
        assert_eq!(seen.len(), (width * height) as usize);
    }

    #[test]
    fn rebuild_with_same_size_is_a_no_op() {
        let mut topology = MeshTopology::build(8, 8).unwrap();
        let before = topology.clone();

        assert_eq!(topology.rebuild(8, 8), Ok(false));
        assert_eq!(topology, before);
    }

    #[test]
    fn rebuild_replaces_buffers_and_bumps_generation() {
        let mut topology = MeshTopology::build(8, 8).unwrap();

        assert_eq!(topology.rebuild(4, 2), Ok(true));
        assert_eq!(topology.generation(), 1);
        assert_eq!(topology.texel_count(), 8);
        assert_eq!(topology, {
            let mut fresh = MeshTopology::build(4, 2).unwrap();
            fresh.generation = 1;
            fresh
        });
    }

    #[test]
    fn rejects_degenerate_sizes() {
        assert_eq!(
            MeshTopology::build(0, 4),
            Err(TopologyError::Empty {
                width: 0,
                height: 4
            })
        );
        assert!(matches!(
            MeshTopology::build(MAX_GRID_DIMENSION + 1, 1),
            Err(TopologyError::TooLarge { .. })
        ));

        let mut topology = MeshTopology::build(2, 2).unwrap();
        assert!(topology.rebuild(0, 0).is_err());
        assert_eq!(topology.size(), (2, 2));
    }

    #[test]
    fn resize_past_device_limits_keeps_lattice() {
        let mut topology = MeshTopology::build(8, 8).unwrap();
        let limits = WgpuLimits {
            max_storage_buffer_binding_size: 8 * 8 * 32,
            ..WgpuLimits::default()
        };

        assert!(matches!(
            resize_within_limits(&mut topology, 16, 16, Some(&limits)),
            Err(TopologyError::ExceedsDevice(_))
        ));
        assert_eq!(topology.size(), (8, 8));
        assert_eq!(topology.generation(), 0);

        assert_eq!(resize_within_limits(&mut topology, 4, 4, Some(&limits)), Ok(true));
        assert_eq!(resize_within_limits(&mut topology, 16, 16, None), Ok(true));
    }

    #[test]
    fn gpu_texels_carry_position_and_uv() {
        let topology = MeshTopology::build(2, 1).unwrap();
        let texels = topology.gpu_texels();
        assert_eq!(texels[1].position, [0.0, -0.5, 0.0, 1.0]);
        assert_eq!(texels[1].uv, [0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn resize_resets_camera_anchor() {
        let mut app = App::new();
        let mut settings = PipelineSettings::default();
        settings.grid.width = 16;
        settings.grid.height = 8;

        let mut anchor = CameraAnchor::new(settings.default_eye());
        anchor.eye = Vec3::new(40.0, 30.0, -500.0);
        anchor.look_at = Vec3::new(10.0, 10.0, 0.0);

        app.add_plugins(MinimalPlugins)
            .insert_resource(MeshTopology::build(128, 128).unwrap())
            .insert_resource(anchor)
            .insert_resource(settings)
            .add_systems(Update, rebuild_topology_on_resize);

        app.update();

        assert_eq!(app.world().resource::<MeshTopology>().size(), (16, 8));
        let anchor = app.world().resource::<CameraAnchor>();
        assert_eq!(anchor.eye, Vec3::new(0.0, 0.0, -500.0));
        assert_eq!(anchor.look_at, Vec3::ZERO);
    }
}
