//! Home Automation device type identifiers.
//!
//! Used when building an endpoint's simple descriptor and for the
//! human-readable name logged at registration.

pub const DEV_TYPE_ON_OFF_SWITCH: u16 = 0x0000;
pub const DEV_TYPE_LEVEL_CONTROL_SWITCH: u16 = 0x0001;
pub const DEV_TYPE_ON_OFF_OUTPUT: u16 = 0x0002;
pub const DEV_TYPE_LEVEL_CONTROLLABLE_OUTPUT: u16 = 0x0003;
pub const DEV_TYPE_SCENE_SELECTOR: u16 = 0x0004;
pub const DEV_TYPE_CONFIGURATION_TOOL: u16 = 0x0005;
pub const DEV_TYPE_REMOTE_CONTROL: u16 = 0x0006;
pub const DEV_TYPE_COMBINED_INTERFACE: u16 = 0x0007;
pub const DEV_TYPE_RANGE_EXTENDER: u16 = 0x0008;
pub const DEV_TYPE_MAINS_POWER_OUTLET: u16 = 0x0009;
pub const DEV_TYPE_DOOR_LOCK: u16 = 0x000A;
pub const DEV_TYPE_DOOR_LOCK_CONTROLLER: u16 = 0x000B;
pub const DEV_TYPE_SIMPLE_SENSOR: u16 = 0x000C;
pub const DEV_TYPE_CONSUMPTION_AWARENESS: u16 = 0x000D;
pub const DEV_TYPE_HOME_GATEWAY: u16 = 0x0050;
pub const DEV_TYPE_SMART_PLUG: u16 = 0x0051;
pub const DEV_TYPE_WHITE_GOODS: u16 = 0x0052;
pub const DEV_TYPE_METER_INTERFACE: u16 = 0x0053;

/// On/Off Light (0x0100)
pub const DEV_TYPE_ON_OFF_LIGHT: u16 = 0x0100;
/// Dimmable Light (0x0101)
pub const DEV_TYPE_DIMMABLE_LIGHT: u16 = 0x0101;
/// Color Dimmable Light (0x0102)
///
/// Required server clusters: Basic, Identify, Groups, Scenes, On/Off,
/// Level Control, Color Control.
pub const DEV_TYPE_COLOR_DIMMABLE_LIGHT: u16 = 0x0102;
pub const DEV_TYPE_DIMMER_SWITCH: u16 = 0x0104;
/// Color Dimmer Switch (0x0105)
///
/// Client side of On/Off, Level Control and Color Control.
pub const DEV_TYPE_COLOR_DIMMER_SWITCH: u16 = 0x0105;
pub const DEV_TYPE_LIGHT_SENSOR: u16 = 0x0106;

pub const DEV_TYPE_SHADE: u16 = 0x0200;
pub const DEV_TYPE_SHADE_CONTROLLER: u16 = 0x0201;
/// Window Covering (0x0202)
pub const DEV_TYPE_WINDOW_COVERING: u16 = 0x0202;
pub const DEV_TYPE_WINDOW_COVERING_CONTROLLER: u16 = 0x0203;

pub const DEV_TYPE_HEATING_COOLING_UNIT: u16 = 0x0300;
/// Thermostat (0x0301)
///
/// Consumes Temperature Measurement reports from bound sensors.
pub const DEV_TYPE_THERMOSTAT: u16 = 0x0301;
/// Temperature Sensor (0x0302)
pub const DEV_TYPE_TEMPERATURE_SENSOR: u16 = 0x0302;

pub const DEV_TYPE_IAS_CONTROL_INDICATING_EQUIPMENT: u16 = 0x0400;
pub const DEV_TYPE_IAS_ANCILLARY_CONTROL_EQUIPMENT: u16 = 0x0401;
/// IAS Zone (0x0402)
pub const DEV_TYPE_IAS_ZONE: u16 = 0x0402;
pub const DEV_TYPE_IAS_WARNING_DEVICE: u16 = 0x0403;

/// Human-readable name of a device type id.
pub fn device_type_name(device_id: u16) -> &'static str {
    match device_id {
        DEV_TYPE_ON_OFF_SWITCH => "General On/Off switch",
        DEV_TYPE_LEVEL_CONTROL_SWITCH => "Level Control Switch",
        DEV_TYPE_ON_OFF_OUTPUT => "General On/Off output",
        DEV_TYPE_LEVEL_CONTROLLABLE_OUTPUT => "Level Controllable Output",
        DEV_TYPE_SCENE_SELECTOR => "Scene Selector",
        DEV_TYPE_CONFIGURATION_TOOL => "Configuration Tool",
        DEV_TYPE_REMOTE_CONTROL => "Remote Control",
        DEV_TYPE_COMBINED_INTERFACE => "Combined Interface",
        DEV_TYPE_RANGE_EXTENDER => "Range Extender",
        DEV_TYPE_MAINS_POWER_OUTLET => "Mains Power Outlet",
        DEV_TYPE_DOOR_LOCK => "Door lock client",
        DEV_TYPE_DOOR_LOCK_CONTROLLER => "Door lock controller",
        DEV_TYPE_SIMPLE_SENSOR => "Simple Sensor device",
        DEV_TYPE_CONSUMPTION_AWARENESS => "Consumption Awareness Device",
        DEV_TYPE_HOME_GATEWAY => "Home Gateway",
        DEV_TYPE_SMART_PLUG => "Smart plug",
        DEV_TYPE_WHITE_GOODS => "White Goods",
        DEV_TYPE_METER_INTERFACE => "Meter Interface",
        DEV_TYPE_ON_OFF_LIGHT => "On/Off Light Device",
        DEV_TYPE_DIMMABLE_LIGHT => "Dimmable Light Device",
        DEV_TYPE_COLOR_DIMMABLE_LIGHT => "Color Dimmable Light Device",
        DEV_TYPE_DIMMER_SWITCH => "Dimmer Switch Device",
        DEV_TYPE_COLOR_DIMMER_SWITCH => "Color Dimmer Switch Device",
        DEV_TYPE_LIGHT_SENSOR => "Light Sensor",
        DEV_TYPE_SHADE => "Shade",
        DEV_TYPE_SHADE_CONTROLLER => "Shade controller",
        DEV_TYPE_WINDOW_COVERING => "Window Covering client",
        DEV_TYPE_WINDOW_COVERING_CONTROLLER => "Window Covering controller",
        DEV_TYPE_HEATING_COOLING_UNIT => "Heating/Cooling Unit device",
        DEV_TYPE_THERMOSTAT => "Thermostat Device",
        DEV_TYPE_TEMPERATURE_SENSOR => "Temperature Sensor",
        DEV_TYPE_IAS_CONTROL_INDICATING_EQUIPMENT => "IAS Control and Indicating Equipment",
        DEV_TYPE_IAS_ANCILLARY_CONTROL_EQUIPMENT => "IAS Ancillary Control Equipment",
        DEV_TYPE_IAS_ZONE => "IAS Zone",
        DEV_TYPE_IAS_WARNING_DEVICE => "IAS Warning Device",
        _ => "Unknown device type",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names() {
        assert_eq!(
            device_type_name(DEV_TYPE_COLOR_DIMMABLE_LIGHT),
            "Color Dimmable Light Device"
        );
        assert_eq!(device_type_name(DEV_TYPE_IAS_ZONE), "IAS Zone");
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(device_type_name(0xBEEF), "Unknown device type");
    }
}
