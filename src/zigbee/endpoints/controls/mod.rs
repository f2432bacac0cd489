//! Endpoints that control other devices or are moved by controllers.

pub mod color_dimmer_switch;
pub mod on_off_switch;
pub mod thermostat;
pub mod window_covering;

pub use color_dimmer_switch::{ColorDimmerSwitch, RemoteLightState};
pub use on_off_switch::OnOffSwitch;
pub use thermostat::{SensorSettings, Thermostat};
pub use window_covering::WindowCovering;
