//! Runtime systems for parameter control and diagnostics.

/// FPS overlay and periodic frame rate logging.
pub mod fps_tracking;

/// Keyboard shortcuts writing to the pipeline settings.
///
/// Toggles transform and background removal, forces a background re-capture,
/// resizes the wave grid, selects the primitive shape and adjusts the amplitude.
pub mod parameter_keys;
