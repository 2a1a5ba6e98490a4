/// Native depth resolution of the sensor. Frames are never resampled.
pub const SENSOR_DEPTH_WIDTH: u32 = 320;
pub const SENSOR_DEPTH_HEIGHT: u32 = 240;

/// Depth readings beyond this range are treated as the far plane (millimetres).
pub const MAX_DEPTH_MM: u16 = 4000;

/// Default frame differencing threshold (millimetres).
pub const DEFAULT_BACKGROUND_THRESHOLD_MM: u16 = 30;

/// Normalised depth below which a sample is treated as a missing reading.
pub const DEFAULT_BRIGHT_TOLERANCE: f32 = 0.05;

/// Ticks to wait after a failed start before trying again.
pub const START_RETRY_INTERVAL_TICKS: u64 = 90;

/// Ticks a shader program may spend loading before startup is abandoned.
pub const PROGRAM_LOAD_TIMEOUT_TICKS: u64 = 600;
