use thiserror::Error;

/// Recoverable failures reported by a sensor frame source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SensorError {
    #[error("no sensor device is attached")]
    DeviceNotFound,
    #[error("sensor failed to start: {0}")]
    StartFailed(String),
    #[error("sensor did not begin capturing within {ticks} ticks")]
    StartTimedOut { ticks: u64 },
}

/// Rejected lattice dimensions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("grid dimension {requested} exceeds the maximum of {max}")]
    TooLarge { requested: u32, max: u32 },
    #[error("lattice does not fit the device: {0}")]
    ExceedsDevice(ExpansionError),
}

/// Load-time failures of the GPU programs. All of these abort startup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExpansionError {
    #[error("program `{program}` failed to compile: {reason}")]
    ProgramFailed { program: String, reason: String },
    #[error("shader asset `{0}` failed to load")]
    ShaderLoadFailed(String),
    #[error("shader programs were not ready after {0} ticks")]
    LoadTimedOut(u64),
    #[error("device limit `{limit}` is {available}, at least {required} is needed")]
    CapabilityFloor {
        limit: &'static str,
        available: u64,
        required: u64,
    },
}
