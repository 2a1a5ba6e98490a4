//! GPU compute passes.
//!
//! ## Height field (`heightfield`)
//!
//! Recomputes the displaced lattice every tick from the immutable base buffer,
//! the elapsed clock and the wave parameters. Writing into a storage buffer
//! rather than displacing in the vertex stage lets the expansion pass read a
//! neighbour's current height when it builds each primitive.
//!
//! **Input:** `base_texels` (position + uv per cell, rebuilt per topology)
//!
//! **Output:** `displaced_texels` (same layout), consumed read-only by the
//! expansion render pass in the same frame.
//!
//! ```wgsl
//! struct GridTexel { position: vec4<f32>, uv: vec4<f32> }
//! struct HeightFieldParams { grid: vec4<u32>, wave: vec4<f32> }
//! ```

/// Per-tick height field synthesis on the GPU, with a CPU reference.
pub mod heightfield;
