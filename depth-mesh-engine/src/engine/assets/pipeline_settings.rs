use bevy::prelude::*;
use constants::mesh::{DEFAULT_GRID_HEIGHT, DEFAULT_GRID_WIDTH};
use constants::render_settings::{
    CAMERA_FAR, CAMERA_FOV_DEGREES, CAMERA_NEAR, DEFAULT_LIGHT_AMBIENT, DEFAULT_LIGHT_DIFFUSE,
    DEFAULT_LIGHT_POSITION, DEFAULT_LIGHT_SHININESS, DEFAULT_LIGHT_SPECULAR, DEPTH_SENSOR_EYE,
    SENSOR_LIGHT_POSITION, SENSOR_LIGHT_SHININESS, WAVE_MESH_EYE,
};
use constants::sensor::{
    DEFAULT_BACKGROUND_THRESHOLD_MM, DEFAULT_BRIGHT_TOLERANCE, MAX_DEPTH_MM, SENSOR_DEPTH_HEIGHT,
    SENSOR_DEPTH_WIDTH,
};
use serde::{Deserialize, Serialize};

use crate::engine::compute::heightfield::WaveParams;
use crate::engine::render::pipeline::expansion_program::PrimitiveShape;

/// Which lattice feeds the expansion stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneMode {
    /// Procedural height field only.
    #[default]
    WaveMesh,
    /// Flat lattice displaced by masked sensor depth only.
    DepthSensor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundStrategyKind {
    #[default]
    FrameDifferencing,
    DeviceAssisted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_WIDTH,
            height: DEFAULT_GRID_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    pub width: u32,
    pub height: u32,
    pub max_depth_mm: u16,
    pub background_threshold_mm: u16,
    pub background_strategy: BackgroundStrategyKind,
    pub remove_background: bool,
    /// Normalised depth below which a sample counts as a missing reading and
    /// is culled.
    pub bright_tolerance: f32,
    /// Starts the built-in synthetic device refuses before it comes up.
    pub synthetic_failed_starts: u32,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            width: SENSOR_DEPTH_WIDTH,
            height: SENSOR_DEPTH_HEIGHT,
            max_depth_mm: MAX_DEPTH_MM,
            background_threshold_mm: DEFAULT_BACKGROUND_THRESHOLD_MM,
            background_strategy: BackgroundStrategyKind::default(),
            remove_background: true,
            bright_tolerance: DEFAULT_BRIGHT_TOLERANCE,
            synthetic_failed_starts: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionSettings {
    pub transform_enabled: bool,
    pub shape: PrimitiveShape,
    pub scale: f32,
    pub uv_mix: f32,
    pub alpha: f32,
    pub depth_scale: f32,
    pub box_dimensions: [f32; 3],
    pub rotation_speed: f32,
    /// Uniform scale from lattice units to world units.
    pub lattice_scale: f32,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self {
            transform_enabled: true,
            shape: PrimitiveShape::Quad,
            scale: 1.5,
            uv_mix: 0.133,
            alpha: 0.8,
            depth_scale: 20.0,
            box_dimensions: [3.0, 6.0, 1.0],
            rotation_speed: 0.01,
            lattice_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    pub position: [f32; 3],
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            position: DEFAULT_LIGHT_POSITION.to_array(),
            ambient: DEFAULT_LIGHT_AMBIENT,
            diffuse: DEFAULT_LIGHT_DIFFUSE,
            specular: DEFAULT_LIGHT_SPECULAR,
            shininess: DEFAULT_LIGHT_SHININESS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Overrides the scene's default eye when present.
    pub eye: Option<[f32; 3]>,
    /// Mesh orientation in degrees, applied XYZ.
    pub rotation_degrees: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            eye: None,
            rotation_degrees: [75.0, 0.0, 330.0],
            fov_degrees: CAMERA_FOV_DEGREES,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
        }
    }
}

/// In-memory parameter store read by every stage of the pipeline.
///
/// Loaded from `settings/pipeline.json`; keyboard shortcuts write to the same
/// resource at runtime. Every section falls back to defaults when omitted.
#[derive(Asset, Resource, Debug, Clone, Default, Serialize, Deserialize, TypePath)]
#[serde(default)]
pub struct PipelineSettings {
    pub scene: SceneMode,
    pub grid: GridSettings,
    pub sensor: SensorSettings,
    pub wave: WaveParams,
    pub expansion: ExpansionSettings,
    pub lighting: LightingSettings,
    pub camera: CameraSettings,
}

impl PipelineSettings {
    /// Lattice the topology should be built for. Sensor frames are never
    /// resampled, so the depth scene always uses the native resolution.
    pub fn lattice_size(&self) -> (u32, u32) {
        match self.scene {
            SceneMode::WaveMesh => (self.grid.width, self.grid.height),
            SceneMode::DepthSensor => (self.sensor.width, self.sensor.height),
        }
    }

    pub fn default_eye(&self) -> Vec3 {
        if let Some(eye) = self.camera.eye {
            return Vec3::from_array(eye);
        }
        match self.scene {
            SceneMode::WaveMesh => WAVE_MESH_EYE,
            SceneMode::DepthSensor => DEPTH_SENSOR_EYE,
        }
    }

    pub fn uses_sensor(&self) -> bool {
        self.scene == SceneMode::DepthSensor
    }

    /// Wave the height field pass applies this tick. The sensor scene keeps
    /// the lattice flat so background pixels clamped to the reference stay put.
    pub fn active_wave(&self) -> WaveParams {
        match self.scene {
            SceneMode::WaveMesh => self.wave,
            SceneMode::DepthSensor => WaveParams {
                amplitude: 0.0,
                ..self.wave
            },
        }
    }

    /// Settings matching the depth sensor demo.
    pub fn depth_sensor() -> Self {
        Self {
            scene: SceneMode::DepthSensor,
            wave: WaveParams {
                amplitude: 0.0,
                ..default()
            },
            expansion: ExpansionSettings {
                uv_mix: 0.2,
                lattice_scale: 0.4,
                ..default()
            },
            lighting: LightingSettings {
                position: SENSOR_LIGHT_POSITION.to_array(),
                shininess: SENSOR_LIGHT_SHININESS,
                ..default()
            },
            camera: CameraSettings {
                rotation_degrees: [0.0, 0.0, 0.0],
                ..default()
            },
            ..default()
        }
    }
}
