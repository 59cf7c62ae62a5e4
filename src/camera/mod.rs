mod look;
mod plugin;
mod smoothing;

pub use look::*;
pub use plugin::CameraPlugin;
pub use smoothing::*;
