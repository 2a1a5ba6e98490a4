//! Foreground/background separation for depth frames.
//!
//! Both strategies sit behind [`model::BackgroundModel`]: a frame differencing
//! model comparing against a captured reference, and a device-assisted model
//! reading the sensor's own user labels. The subtraction resource applies the
//! resulting mask and uploads masked depth and colour for the expansion stage.

/// Device-assisted strategy using per-pixel user labels.
pub mod device_assisted;

/// Manual frame differencing against a reference frame.
pub mod differencing;

/// The background model contract, masks and mask application.
pub mod model;

/// Active strategy resource and the per-tick masking systems.
pub mod subtraction;
