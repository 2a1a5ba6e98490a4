use crate::engine::background::differencing::classify_by_difference;
use crate::engine::background::model::{
    BackgroundModel, ForegroundMask, PixelClass, ReferenceSlot,
};
use crate::engine::sensor::frame::DepthFrame;

/// Background removal delegated to the device's own user segmentation.
///
/// A pixel carrying a user label is foreground. The reference frame is still
/// kept so background depth can be clamped, and frames arriving without labels
/// fall back to differencing against it.
#[derive(Debug)]
pub struct DeviceAssisted {
    fallback_threshold_mm: u16,
    slot: ReferenceSlot,
}

impl DeviceAssisted {
    pub fn new(fallback_threshold_mm: u16) -> Self {
        Self {
            fallback_threshold_mm,
            slot: ReferenceSlot::default(),
        }
    }
}

impl BackgroundModel for DeviceAssisted {
    fn capture(&mut self, frame: &DepthFrame) {
        self.slot.capture(frame);
    }

    fn classify(&mut self, frame: &DepthFrame) -> ForegroundMask {
        if !self.slot.is_enabled() {
            return ForegroundMask::uniform(frame.width, frame.height, PixelClass::Foreground);
        }
        let reference = self.slot.prepare(frame);

        match &frame.user_labels {
            Some(labels) => {
                let classes = labels
                    .iter()
                    .map(|label| {
                        if *label > 0 {
                            PixelClass::Foreground
                        } else {
                            PixelClass::Background
                        }
                    })
                    .collect();
                ForegroundMask::from_classes(frame.width, frame.height, classes)
            }
            None => classify_by_difference(frame, reference, self.fallback_threshold_mm),
        }
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
        "device assisted"
    }
}
