use bevy::prelude::*;

use crate::engine::sensor::frame::{ColorFrame, DepthFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelClass {
    Foreground,
    Background,
}

/// One class per pixel of a depth frame, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ForegroundMask {
    pub width: u32,
    pub height: u32,
    classes: Vec<PixelClass>,
}

impl ForegroundMask {
    pub fn uniform(width: u32, height: u32, class: PixelClass) -> Self {
        Self {
            width,
            height,
            classes: vec![class; (width * height) as usize],
        }
    }

    pub fn from_classes(width: u32, height: u32, classes: Vec<PixelClass>) -> Self {
        debug_assert_eq!(classes.len(), (width * height) as usize);
        Self {
            width,
            height,
            classes,
        }
    }

    pub fn classes(&self) -> &[PixelClass] {
        &self.classes
    }

    pub fn get(&self, x: u32, y: u32) -> Option<PixelClass> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.classes.get((x + y * self.width) as usize).copied()
    }

    pub fn foreground_count(&self) -> usize {
        self.classes
            .iter()
            .filter(|class| **class == PixelClass::Foreground)
            .count()
    }
}

/// Foreground/background separation against a captured reference frame.
///
/// Implementations differ only in how they decide a pixel's class; the
/// enable/capture behaviour is shared and externally identical.
pub trait BackgroundModel: Send + Sync {
    /// Store `frame` as the new reference, replacing any previous one.
    fn capture(&mut self, frame: &DepthFrame);

    /// Classify every pixel of `frame`. While disabled every pixel is foreground.
    fn classify(&mut self, frame: &DepthFrame) -> ForegroundMask;

    /// Edge triggered. A disabled→enabled transition captures the next frame
    /// seen by [`BackgroundModel::classify`]. Returns whether the state changed.
    fn set_enabled(&mut self, enabled: bool) -> bool;

    fn is_enabled(&self) -> bool;

    /// Capture the next classified frame without toggling.
    fn request_capture(&mut self);

    fn reference(&self) -> Option<&DepthFrame>;

    fn name(&self) -> &'static str;
}

/// Reference frame plus the enable/capture bookkeeping both strategies share.
#[derive(Debug, Default)]
pub struct ReferenceSlot {
    reference: Option<DepthFrame>,
    enabled: bool,
    capture_pending: bool,
}

impl ReferenceSlot {
    pub fn capture(&mut self, frame: &DepthFrame) {
        self.reference = Some(frame.clone());
        self.capture_pending = false;
        info!(
            "Captured background reference ({}x{}, t={:.2}s)",
            frame.width, frame.height, frame.timestamp
        );
    }

    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled == enabled {
            return false;
        }
        self.enabled = enabled;
        if enabled {
            self.capture_pending = true;
        }
        info!(
            "Background removal {}",
            if enabled { "enabled" } else { "disabled" }
        );
        true
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn request_capture(&mut self) {
        self.capture_pending = true;
    }

    pub fn reference(&self) -> Option<&DepthFrame> {
        self.reference.as_ref()
    }

    /// Reference to classify `frame` against, capturing `frame` first when a
    /// capture is due or the resolution no longer matches.
    pub fn prepare(&mut self, frame: &DepthFrame) -> &DepthFrame {
        let mismatched = self
            .reference
            .as_ref()
            .is_some_and(|reference| !reference.same_dimensions(frame));
        if mismatched {
            warn!(
                "Depth frame is {}x{}, reference differs; recapturing",
                frame.width, frame.height
            );
        }
        if self.capture_pending || mismatched || self.reference.is_none() {
            self.capture(frame);
        }
        self.reference.get_or_insert_with(|| frame.clone())
    }
}

/// Depth and colour ready for upload, with the mask applied.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedFrame {
    pub width: u32,
    pub height: u32,
    /// Depth normalised to `[0, 1]` by the sensor range.
    pub depth: Vec<f32>,
    pub colour: Vec<[u8; 4]>,
}

impl MaskedFrame {
    pub fn depth_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.depth).to_vec()
    }

    pub fn colour_bytes(&self) -> Vec<u8> {
        self.colour.iter().flatten().copied().collect()
    }
}

pub fn normalise_depth(depth_mm: u16, max_depth_mm: u16) -> f32 {
    (depth_mm as f32 / max_depth_mm.max(1) as f32).min(1.0)
}

/// Apply `mask` to a depth frame and its optional colour frame.
///
/// Background pixels get alpha 0 and take the reference depth so a moving
/// backdrop cannot distort the mesh. Foreground pixels nearer than
/// `bright_tolerance` (normalised) are missing readings and are hidden too.
/// Without a matching colour frame the colour is a grey ramp of the depth.
pub fn apply_mask(
    frame: &DepthFrame,
    colour: Option<&ColorFrame>,
    mask: &ForegroundMask,
    reference: Option<&DepthFrame>,
    max_depth_mm: u16,
    bright_tolerance: f32,
) -> MaskedFrame {
    let colour = colour.filter(|c| c.width == frame.width && c.height == frame.height);
    let reference = reference.filter(|r| r.same_dimensions(frame));

    let mut depth = Vec::with_capacity(frame.pixel_count());
    let mut rgba = Vec::with_capacity(frame.pixel_count());

    for (i, (sample, class)) in frame.samples.iter().zip(mask.classes()).enumerate() {
        let normalised = normalise_depth(*sample, max_depth_mm);
        let mut pixel = match colour {
            Some(colour) => colour.pixels[i],
            None => {
                let grey = ((1.0 - normalised) * 255.0) as u8;
                [grey, grey, grey, 255]
            }
        };

        match class {
            PixelClass::Foreground => {
                if normalised < bright_tolerance {
                    pixel[3] = 0;
                }
                depth.push(normalised);
            }
            PixelClass::Background => {
                let clamped = reference.map_or(*sample, |r| r.samples[i]);
                depth.push(normalise_depth(clamped, max_depth_mm));
                pixel[3] = 0;
            }
        }
        rgba.push(pixel);
    }

    MaskedFrame {
        width: frame.width,
        height: frame.height,
        depth,
        colour: rgba,
    }
}
