//! Startup loading for the pipeline.
//!
//! Loads the settings file, then builds the scene the settings describe.
//! Progress flags drive the transitions out of `AppState::Loading`.

/// Loading progress tracking resource for state transitions.
pub mod progress;

/// Scene construction once settings are available.
///
/// Creates the lattice topology, camera, and the sensor chain for the depth scene.
pub mod scene_creator;

/// Pipeline settings loading from JSON, with a defaults fallback.
pub mod settings_loader;

/// Masked depth and colour image creation at sensor resolution.
pub mod texture_config;
