use crate::engine::background::model::{
    BackgroundModel, ForegroundMask, PixelClass, ReferenceSlot,
};
use crate::engine::sensor::frame::DepthFrame;

/// Classify by absolute depth difference: more than `threshold_mm` away from
/// the reference is foreground, anything else is background.
pub fn classify_by_difference(
    frame: &DepthFrame,
    reference: &DepthFrame,
    threshold_mm: u16,
) -> ForegroundMask {
    let classes = frame
        .samples
        .iter()
        .zip(&reference.samples)
        .map(|(sample, background)| {
            if sample.abs_diff(*background) > threshold_mm {
                PixelClass::Foreground
            } else {
                PixelClass::Background
            }
        })
        .collect();
    ForegroundMask::from_classes(frame.width, frame.height, classes)
}

/// Manual background removal by frame differencing.
#[derive(Debug)]
pub struct FrameDifferencing {
    threshold_mm: u16,
    slot: ReferenceSlot,
}

impl FrameDifferencing {
    pub fn new(threshold_mm: u16) -> Self {
        Self {
            threshold_mm,
            slot: ReferenceSlot::default(),
        }
    }
}

impl BackgroundModel for FrameDifferencing {
    fn capture(&mut self, frame: &DepthFrame) {
        self.slot.capture(frame);
    }

    fn classify(&mut self, frame: &DepthFrame) -> ForegroundMask {
        if !self.slot.is_enabled() {
            return ForegroundMask::uniform(frame.width, frame.height, PixelClass::Foreground);
        }
        let reference = self.slot.prepare(frame);
        classify_by_difference(frame, reference, self.threshold_mm)
    }

    fn set_enabled(&mut self, enabled: bool) -> bool {
        self.slot.set_enabled(enabled)
    }

    fn is_enabled(&self) -> bool {
        self.slot.is_enabled()
    }

    fn request_capture(&mut self) {
        self.slot.request_capture();
    }

    fn reference(&self) -> Option<&DepthFrame> {
        self.slot.reference()
    }

    fn name(&self) -> &'static str {
        "frame differencing"
    }
}
