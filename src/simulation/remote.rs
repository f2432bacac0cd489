//! Simulated peer devices living on the loopback network.

use crate::zigbee::messages::{Attribute, ReadVariable};
use crate::zigbee::stack::{CommandKind, IeeeAddr, OnOffCommand};
use crate::zigbee::zcl::{
    AttributeValue, ZclStatus, cluster, color_attrs, level_attrs, on_off_attrs, temperature_attrs,
};
use log::info;
use std::collections::HashMap;

/// One endpoint of a remote device.
#[derive(Debug, Clone)]
pub struct RemoteDevice {
    pub short_addr: u16,
    pub ieee_addr: IeeeAddr,
    pub endpoint: u8,
    server_clusters: Vec<u16>,
    client_clusters: Vec<u16>,
    attributes: HashMap<(u16, u16), AttributeValue>,
}

impl RemoteDevice {
    pub fn new(short_addr: u16, ieee_addr: IeeeAddr, endpoint: u8) -> Self {
        Self {
            short_addr,
            ieee_addr,
            endpoint,
            server_clusters: Vec::new(),
            client_clusters: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    /// A color dimmable light with on/off, level and color servers.
    pub fn color_light(short_addr: u16, ieee_addr: IeeeAddr, endpoint: u8) -> Self {
        Self::new(short_addr, ieee_addr, endpoint)
            .with_attribute(
                cluster::ON_OFF,
                on_off_attrs::ON_OFF,
                AttributeValue::Bool(false),
            )
            .with_attribute(
                cluster::LEVEL_CONTROL,
                level_attrs::CURRENT_LEVEL,
                AttributeValue::U8(254),
            )
            .with_attribute(
                cluster::COLOR_CONTROL,
                color_attrs::CURRENT_X,
                AttributeValue::U16(0x616B),
            )
            .with_attribute(
                cluster::COLOR_CONTROL,
                color_attrs::CURRENT_Y,
                AttributeValue::U16(0x607D),
            )
            .with_attribute(
                cluster::COLOR_CONTROL,
                color_attrs::CURRENT_HUE,
                AttributeValue::U8(0),
            )
            .with_attribute(
                cluster::COLOR_CONTROL,
                color_attrs::CURRENT_SATURATION,
                AttributeValue::U8(0),
            )
    }

    /// A temperature sensor reporting `celsius`.
    pub fn temperature_sensor(
        short_addr: u16,
        ieee_addr: IeeeAddr,
        endpoint: u8,
        celsius: f32,
    ) -> Self {
        let tm = cluster::TEMPERATURE_MEASUREMENT;
        Self::new(short_addr, ieee_addr, endpoint)
            .with_attribute(
                tm,
                temperature_attrs::MEASURED_VALUE,
                AttributeValue::S16((celsius * 100.0).round() as i16),
            )
            .with_attribute(
                tm,
                temperature_attrs::MIN_MEASURED_VALUE,
                AttributeValue::S16(-4000),
            )
            .with_attribute(
                tm,
                temperature_attrs::MAX_MEASURED_VALUE,
                AttributeValue::S16(8500),
            )
            .with_attribute(tm, temperature_attrs::TOLERANCE, AttributeValue::U16(50))
    }

    pub fn with_server(mut self, cluster_id: u16) -> Self {
        if !self.server_clusters.contains(&cluster_id) {
            self.server_clusters.push(cluster_id);
        }
        self
    }

    pub fn with_client(mut self, cluster_id: u16) -> Self {
        if !self.client_clusters.contains(&cluster_id) {
            self.client_clusters.push(cluster_id);
        }
        self
    }

    /// Set a server attribute, adding the cluster if needed.
    pub fn with_attribute(
        mut self,
        cluster_id: u16,
        attribute_id: u16,
        value: AttributeValue,
    ) -> Self {
        self.attributes.insert((cluster_id, attribute_id), value);
        self.with_server(cluster_id)
    }

    pub fn attribute(&self, cluster_id: u16, attribute_id: u16) -> Option<&AttributeValue> {
        self.attributes.get(&(cluster_id, attribute_id))
    }

    /// Match-descriptor semantics: any requested input cluster served, or any
    /// requested output cluster consumed.
    pub fn matches(&self, in_clusters: &[u16], out_clusters: &[u16]) -> bool {
        let serves = |c: &u16| self.server_clusters.contains(c);
        let consumes = |c: &u16| self.client_clusters.contains(c);
        in_clusters.iter().any(serves) || out_clusters.iter().any(consumes)
    }

    pub fn read(&self, cluster_id: u16, attribute_ids: &[u16]) -> Vec<ReadVariable> {
        attribute_ids
            .iter()
            .map(|&id| match self.attribute(cluster_id, id) {
                Some(value) => ReadVariable {
                    status: ZclStatus::Success,
                    attribute: Attribute {
                        id,
                        value: value.clone(),
                    },
                },
                None => ReadVariable {
                    status: ZclStatus::UnsupAttrib,
                    attribute: Attribute {
                        id,
                        value: AttributeValue::Bool(false),
                    },
                },
            })
            .collect()
    }

    /// Apply a received ZCL command. Returns false for commands this device ignores.
    pub fn apply(&mut self, kind: &CommandKind) -> bool {
        let cluster_id = match kind {
            CommandKind::OnOff(_) => cluster::ON_OFF,
            CommandKind::MoveToLevel { .. } => cluster::LEVEL_CONTROL,
            CommandKind::MoveToColor { .. } | CommandKind::MoveToHueAndSaturation { .. } => {
                cluster::COLOR_CONTROL
            }
            _ => return false,
        };
        if !self.server_clusters.contains(&cluster_id) {
            return false;
        }
        match *kind {
            CommandKind::OnOff(command) => {
                let key = (cluster::ON_OFF, on_off_attrs::ON_OFF);
                let current = self
                    .attributes
                    .get(&key)
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                let on = match command {
                    OnOffCommand::On => true,
                    OnOffCommand::Off => false,
                    OnOffCommand::Toggle => !current,
                };
                self.attributes.insert(key, AttributeValue::Bool(on));
                info!(
                    "[Sim] Remote 0x{:04x}/{} turned {}",
                    self.short_addr,
                    self.endpoint,
                    if on { "on" } else { "off" }
                );
            }
            CommandKind::MoveToLevel { level, .. } => {
                let key = (cluster::LEVEL_CONTROL, level_attrs::CURRENT_LEVEL);
                self.attributes.insert(key, AttributeValue::U8(level));
                info!(
                    "[Sim] Remote 0x{:04x}/{} level {}",
                    self.short_addr, self.endpoint, level
                );
            }
            CommandKind::MoveToColor { x, y, .. } => {
                let color = cluster::COLOR_CONTROL;
                self.attributes
                    .insert((color, color_attrs::CURRENT_X), AttributeValue::U16(x));
                self.attributes
                    .insert((color, color_attrs::CURRENT_Y), AttributeValue::U16(y));
                info!(
                    "[Sim] Remote 0x{:04x}/{} color x=0x{:04x} y=0x{:04x}",
                    self.short_addr, self.endpoint, x, y
                );
            }
            CommandKind::MoveToHueAndSaturation {
                hue,
                saturation,
                ..
            } => {
                let color = cluster::COLOR_CONTROL;
                self.attributes
                    .insert((color, color_attrs::CURRENT_HUE), AttributeValue::U8(hue));
                self.attributes.insert(
                    (color, color_attrs::CURRENT_SATURATION),
                    AttributeValue::U8(saturation),
                );
            }
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_toggle_and_read() {
        let mut light = RemoteDevice::color_light(0x1234, [1; 8], 10);
        assert!(light.apply(&CommandKind::OnOff(OnOffCommand::Toggle)));
        let vars = light.read(cluster::ON_OFF, &[on_off_attrs::ON_OFF, 0x4000]);
        assert_eq!(vars[0].attribute.value, AttributeValue::Bool(true));
        assert_eq!(vars[1].status, ZclStatus::UnsupAttrib);
    }

    #[test]
    fn test_match_semantics() {
        let sensor = RemoteDevice::temperature_sensor(0x2000, [2; 8], 1, 20.0)
            .with_client(cluster::THERMOSTAT);
        assert!(sensor.matches(&[cluster::TEMPERATURE_MEASUREMENT], &[]));
        assert!(sensor.matches(&[], &[cluster::THERMOSTAT]));
        assert!(!sensor.matches(&[cluster::ON_OFF], &[]));
    }

    #[test]
    fn test_unserved_command_ignored() {
        let mut sensor = RemoteDevice::temperature_sensor(0x2000, [2; 8], 1, 20.0);
        assert!(!sensor.apply(&CommandKind::OnOff(OnOffCommand::On)));
        let state = sensor.attribute(cluster::ON_OFF, on_off_attrs::ON_OFF);
        assert!(state.is_none());
    }
}
