//! Rendering systems for the expansion stage.
//!
//! Implements the lattice render pipeline and the extraction of main world
//! state it needs each frame.

/// Resource extraction systems transferring main world state to render world.
///
/// Synchronises application state and per-frame expansion parameters.
pub mod extraction;

/// Expansion render pipeline with program selection and load tracking.
pub mod pipeline;
