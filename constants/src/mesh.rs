/// Largest lattice edge accepted by the topology builder.
pub const MAX_GRID_DIMENSION: u32 = 2048;

/// Smallest lattice edge the keyboard controls will shrink the wave grid to.
pub const MIN_GRID_DIMENSION: u32 = 4;

/// Step applied by the grid resize shortcuts.
pub const GRID_RESIZE_STEP: u32 = 16;

/// Default lattice for the wave mesh scene.
pub const DEFAULT_GRID_WIDTH: u32 = 128;
pub const DEFAULT_GRID_HEIGHT: u32 = 128;

/// Compute workgroup edge for the height field pass (8x8 threads).
pub const HEIGHTFIELD_WORKGROUP_SIZE: u32 = 8;

/// Bytes per lattice texel in the base and displaced buffers (position + uv, two `vec4<f32>`).
pub const TEXEL_STRIDE_BYTES: u64 = 32;
