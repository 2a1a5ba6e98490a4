//! Geometry expansion stage for the displaced lattice.
//!
//! Draws the height field output either as one point per lattice vertex or
//! as a primitive expanded around every point, entirely on the GPU.
//!
//! ## Vertex Pulling
//!
//! No vertex buffers are bound. The vertex stage reads the displaced texel
//! buffer directly, deriving the point from `vertex_index / N` and the corner
//! of its primitive from `vertex_index % N`, where `N` is 6 for quads, 36 for
//! boxes and 24 for discs.
//!
//! ## Bindings (@group(0))
//!
//! ```wgsl
//! @group(0) @binding(0) var<uniform> params: ExpansionParams;
//! @group(0) @binding(1) var<storage, read> texels: array<GridTexel>;
//! @group(0) @binding(2) var masked_depth: texture_2d<f32>;
//! @group(0) @binding(3) var masked_colour: texture_2d<f32>;
//! ```
//!
//! ## Program Lifecycle
//!
//! Every program is queued at startup. The app does not enter `Running` until
//! all of them compile, and any compile or shader load failure, or a device
//! below the capability floor, stops the app with an error.
//!
//! ## Render Graph Position
//!
//! `MainOpaquePass → ExpansionRenderLabel → MainTransparentPass`, loading and
//! storing the main depth buffer with reversed-Z `Greater` testing.

/// Render plugin, pipelines, bind group preparation and the view node.
pub mod expansion_pipeline;

/// Program and shape selection, independent of the GPU.
pub mod expansion_program;

/// Program load tracking shared between the main and render worlds.
///
/// Also enforces the device capability floor.
pub mod readiness;
