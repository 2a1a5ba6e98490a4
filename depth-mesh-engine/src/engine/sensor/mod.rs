//! Depth sensor input.
//!
//! The pipeline only sees the [`source::SensorFrameSource`] contract: a device
//! that may refuse to start, and non-blocking polls for depth, colour and
//! skeleton data. [`device::SensorDevice`] wraps a source in the start/retry
//! state machine and exposes it to the ECS.

/// Sensor start/retry state machine and per-tick polling systems.
pub mod device;

/// Depth, colour and skeleton frame types.
pub mod frame;

/// The frame source contract implemented by every device backend.
pub mod source;

/// Built-in device producing a moving subject, used when no hardware is attached.
pub mod synthetic;
