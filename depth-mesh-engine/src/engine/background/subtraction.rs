use bevy::prelude::*;
use bevy::render::extract_resource::ExtractResource;

use crate::engine::assets::pipeline_settings::{
    BackgroundStrategyKind, PipelineSettings, SensorSettings,
};
use crate::engine::background::device_assisted::DeviceAssisted;
use crate::engine::background::differencing::FrameDifferencing;
use crate::engine::background::model::{
    BackgroundModel, ForegroundMask, MaskedFrame, apply_mask,
};
use crate::engine::sensor::device::SensorFrames;
use crate::engine::sensor::frame::{ColorFrame, DepthFrame};

/// The active background strategy. Callers only see the [`BackgroundModel`] contract.
#[derive(Resource)]
pub struct BackgroundSubtraction {
    model: Box<dyn BackgroundModel>,
    max_depth_mm: u16,
    bright_tolerance: f32,
    last_mask: Option<ForegroundMask>,
}

impl BackgroundSubtraction {
    pub fn new(model: Box<dyn BackgroundModel>, max_depth_mm: u16) -> Self {
        Self {
            model,
            max_depth_mm,
            bright_tolerance: 0.0,
            last_mask: None,
        }
    }

    pub fn set_bright_tolerance(&mut self, tolerance: f32) {
        self.bright_tolerance = tolerance.clamp(0.0, 1.0);
    }

    pub fn from_settings(settings: &SensorSettings) -> Self {
        let model: Box<dyn BackgroundModel> = match settings.background_strategy {
            BackgroundStrategyKind::FrameDifferencing => {
                Box::new(FrameDifferencing::new(settings.background_threshold_mm))
            }
            BackgroundStrategyKind::DeviceAssisted => {
                Box::new(DeviceAssisted::new(settings.background_threshold_mm))
            }
        };
        info!("Background strategy: {}", model.name());
        let mut subtraction = Self::new(model, settings.max_depth_mm);
        subtraction.set_bright_tolerance(settings.bright_tolerance);
        subtraction
    }

    pub fn model(&self) -> &dyn BackgroundModel {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> &mut dyn BackgroundModel {
        self.model.as_mut()
    }

    pub fn last_mask(&self) -> Option<&ForegroundMask> {
        self.last_mask.as_ref()
    }

    /// Classify `depth` and apply the mask to it and the colour frame.
    pub fn process(&mut self, depth: &DepthFrame, colour: Option<&ColorFrame>) -> MaskedFrame {
        let mask = self.model.classify(depth);
        let masked = apply_mask(
            depth,
            colour,
            &mask,
            self.model.reference(),
            self.max_depth_mm,
            self.bright_tolerance,
        );
        self.last_mask = Some(mask);
        masked
    }
}

/// GPU images holding the most recent masked depth and colour.
///
/// They keep their contents on ticks without a new frame, so rendering
/// continues from the last known state.
#[derive(Resource, Clone, ExtractResource)]
pub struct MaskedImages {
    pub depth: Handle<Image>,
    pub colour: Handle<Image>,
    pub width: u32,
    pub height: u32,
}

/// Forward the removal toggle to the model. `set_enabled` is edge triggered,
/// so repeating the same value is a no-op.
pub fn sync_background_toggle(
    settings: Res<PipelineSettings>,
    mut subtraction: ResMut<BackgroundSubtraction>,
) {
    if subtraction.model().is_enabled() != settings.sensor.remove_background {
        subtraction
            .model_mut()
            .set_enabled(settings.sensor.remove_background);
    }
    if subtraction.bright_tolerance != settings.sensor.bright_tolerance {
        subtraction.set_bright_tolerance(settings.sensor.bright_tolerance);
    }
}

pub fn subtract_background(
    frames: Res<SensorFrames>,
    mut subtraction: ResMut<BackgroundSubtraction>,
    masked_images: Res<MaskedImages>,
    mut images: ResMut<Assets<Image>>,
) {
    let Some(depth) = frames.depth.as_ref() else {
        return;
    };
    if depth.width != masked_images.width || depth.height != masked_images.height {
        warn!(
            "Depth frame {}x{} does not match the {}x{} mask images; skipping",
            depth.width, depth.height, masked_images.width, masked_images.height
        );
        return;
    }

    let masked = subtraction.process(depth, frames.color.as_ref());

    if let Some(image) = images.get_mut(&masked_images.depth) {
        image.data = Some(masked.depth_bytes());
    }
    if let Some(image) = images.get_mut(&masked_images.colour) {
        image.data = Some(masked.colour_bytes());
    }
}
