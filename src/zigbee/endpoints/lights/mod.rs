//! Light endpoints controlled by remote switches.

pub mod color_dimmable_light;

pub use color_dimmable_light::{ColorDimmableLight, LightChangeCallback, LightState};
