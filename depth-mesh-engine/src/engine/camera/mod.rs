//! Following camera driven by skeletal tracking.
//!
//! The tracker turns the reference joint of a fully tracked skeleton into a
//! [`skeletal_anchor::CameraAnchor`]; the anchored camera copies that anchor
//! into its transform every tick it changes.

/// Anchored camera spawning and transform updates.
pub mod anchor_camera;

/// Skeleton selection and the fixed framing heuristic.
pub mod skeletal_anchor;
