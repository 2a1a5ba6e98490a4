pub mod error;

pub mod assets;
pub mod background;
pub mod camera;
pub mod compute;
pub mod core;
pub mod loading;
pub mod mesh;
pub mod render;
pub mod sensor;
pub mod systems;
