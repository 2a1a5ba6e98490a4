//! Resource extraction systems for render world synchronisation.
//!
//! Transfers main world state to the render world each frame during Bevy's
//! extract schedule.

/// Application state extraction for render world access.
///
/// Transfers AppState to the render world for state-conditional rendering systems.
pub mod app_state;

/// Camera matrices and expansion parameters for the current frame.
///
/// Packs settings, selector and camera into the uniform the expansion programs read.
pub mod expansion_frame;
