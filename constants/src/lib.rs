//! Shared constants for the depth mesh engine.
//!
//! Values here are fixed across builds: sensor geometry, device retry cadence,
//! the camera framing heuristic and the vertex budgets of each expansion shape.

pub mod coordinate_system;
pub mod mesh;
pub mod render_settings;
pub mod sensor;
pub mod skeleton;
