//! ZCL (Zigbee Cluster Library) identifiers and in-memory value types.
//!
//! Wire encoding stays inside the stack; this module only describes the
//! values handed across the `ZigbeeStack` boundary.

mod cluster_list;
mod status;
mod string;
mod value;

pub use cluster_list::{ClusterList, ClusterRole, EndpointConfig};
pub use status::ZclStatus;
pub use string::{MAX_NAME_LENGTH, decode_char_string, encode_char_string};
pub use value::AttributeValue;

/// Home Automation profile.
pub const PROFILE_HOME_AUTOMATION: u16 = 0x0104;

/// Common ZCL cluster IDs
pub mod cluster {
    pub const BASIC: u16 = 0x0000;
    pub const POWER_CONFIG: u16 = 0x0001;
    pub const IDENTIFY: u16 = 0x0003;
    pub const GROUPS: u16 = 0x0004;
    pub const SCENES: u16 = 0x0005;
    pub const ON_OFF: u16 = 0x0006;
    pub const LEVEL_CONTROL: u16 = 0x0008;
    pub const TIME: u16 = 0x000A;
    pub const OTA_UPGRADE: u16 = 0x0019;
    pub const WINDOW_COVERING: u16 = 0x0102;
    pub const THERMOSTAT: u16 = 0x0201;
    pub const COLOR_CONTROL: u16 = 0x0300;
    pub const TEMPERATURE_MEASUREMENT: u16 = 0x0402;
    pub const IAS_ZONE: u16 = 0x0500;
}

/// Basic cluster attributes
pub mod basic_attrs {
    pub const ZCL_VERSION: u16 = 0x0000;
    pub const APPLICATION_VERSION: u16 = 0x0001;
    pub const MANUFACTURER_NAME: u16 = 0x0004;
    pub const MODEL_IDENTIFIER: u16 = 0x0005;
    pub const POWER_SOURCE: u16 = 0x0007;
}

/// Power configuration cluster attributes
pub mod power_config_attrs {
    pub const BATTERY_VOLTAGE: u16 = 0x0020;
    pub const BATTERY_PERCENTAGE_REMAINING: u16 = 0x0021;
}

pub mod identify_attrs {
    pub const IDENTIFY_TIME: u16 = 0x0000;
}

pub mod on_off_attrs {
    pub const ON_OFF: u16 = 0x0000;
}

pub mod level_attrs {
    pub const CURRENT_LEVEL: u16 = 0x0000;
}

/// Color control cluster attributes
pub mod color_attrs {
    pub const CURRENT_HUE: u16 = 0x0000;
    pub const CURRENT_SATURATION: u16 = 0x0001;
    pub const CURRENT_X: u16 = 0x0003;
    pub const CURRENT_Y: u16 = 0x0004;
    pub const COLOR_MODE: u16 = 0x0008;
}

/// Time cluster attributes
pub mod time_attrs {
    pub const TIME: u16 = 0x0000;
    pub const TIME_STATUS: u16 = 0x0001;
    pub const TIME_ZONE: u16 = 0x0002;

    /// Time status bit marking the clock as synchronized.
    pub const STATUS_SYNCHRONIZED: u8 = 0x02;
}

/// Temperature measurement cluster attributes
pub mod temperature_attrs {
    pub const MEASURED_VALUE: u16 = 0x0000;
    pub const MIN_MEASURED_VALUE: u16 = 0x0001;
    pub const MAX_MEASURED_VALUE: u16 = 0x0002;
    pub const TOLERANCE: u16 = 0x0003;
}

/// IAS zone cluster attributes
pub mod ias_zone_attrs {
    pub const ZONE_STATE: u16 = 0x0000;
    pub const ZONE_TYPE: u16 = 0x0001;
    pub const ZONE_STATUS: u16 = 0x0002;
    pub const IAS_CIE_ADDRESS: u16 = 0x0010;
    pub const ZONE_ID: u16 = 0x0011;

    /// Zone type for contact switches.
    pub const ZONE_TYPE_CONTACT_SWITCH: u16 = 0x0015;
    /// Zone status bit: alarm 1 (open).
    pub const STATUS_ALARM1: u16 = 0x0001;
}

/// Window covering cluster attributes
pub mod window_covering_attrs {
    pub const CURRENT_POSITION_LIFT_PERCENTAGE: u16 = 0x0008;
    pub const CURRENT_POSITION_TILT_PERCENTAGE: u16 = 0x0009;
}

/// OTA upgrade cluster attributes
pub mod ota_attrs {
    pub const CURRENT_FILE_VERSION: u16 = 0x0002;
}
