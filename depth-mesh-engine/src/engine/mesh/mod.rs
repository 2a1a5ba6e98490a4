//! Lattice topology for the expanded mesh.
//!
//! Builds the immutable index, base position and uv buffers for a `W × H`
//! point grid. The expansion stage pulls vertices by index, so no bevy `Mesh`
//! is involved.

/// Point lattice construction and resize handling.
pub mod topology;
