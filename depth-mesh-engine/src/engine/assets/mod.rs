//! Loadable asset types.

/// Runtime parameter store, loaded from JSON.
///
/// Scene mode, lattice, sensor, wave, expansion, lighting and camera settings.
pub mod pipeline_settings;
