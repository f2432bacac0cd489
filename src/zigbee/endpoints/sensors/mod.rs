//! Endpoints that publish measurements or alarms.

pub mod contact_switch;
pub mod temperature_sensor;

pub use contact_switch::ContactSwitch;
pub use temperature_sensor::TemperatureSensor;
