//! Zigbee endpoints.
//!
//! This module organizes the endpoint types:
//! - `lights`: Servers driven by remote controllers
//! - `controls`: Switches, thermostats and coverings
//! - `sensors`: Measurement and IAS zone servers
//! - `endpoints_helpers`: Shared core, read slots and the endpoint trait

pub mod controls;
pub mod endpoints_helpers;
pub mod lights;
pub mod sensors;

pub use controls::{ColorDimmerSwitch, OnOffSwitch, Thermostat, WindowCovering};
pub use endpoints_helpers::{
    DEFAULT_READ_TIMEOUT, EndpointCore, PeerRef, PowerSource, ReadSlot, ZigbeeEndpoint,
    from_zcl_time, to_zcl_time,
};
pub use lights::ColorDimmableLight;
pub use sensors::{ContactSwitch, TemperatureSensor};
