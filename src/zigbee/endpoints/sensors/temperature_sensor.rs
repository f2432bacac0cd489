//! Temperature sensor (HA device 0x0302).
//!
//! Values are stored in hundredths of a degree Celsius as the Temperature
//! Measurement cluster expects.

use crate::error::Result;
use crate::zigbee::device_types::DEV_TYPE_TEMPERATURE_SENSOR;
use crate::zigbee::endpoints::{EndpointCore, ZigbeeEndpoint};
use crate::zigbee::zcl::{AttributeValue, ClusterList, ClusterRole, cluster, temperature_attrs};
use log::debug;

pub struct TemperatureSensor {
    core: EndpointCore,
}

fn to_centi(celsius: f32) -> i16 {
    let centi = (celsius * 100.0).round();
    centi.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

impl TemperatureSensor {
    pub fn new(endpoint_id: u8) -> Self {
        let mut clusters = ClusterList::new()
            .with_cluster(cluster::BASIC, ClusterRole::Server)
            .with_cluster(cluster::IDENTIFY, ClusterRole::Server);
        let tm = cluster::TEMPERATURE_MEASUREMENT;
        clusters
            .set_attribute(
                tm,
                ClusterRole::Server,
                temperature_attrs::MEASURED_VALUE,
                AttributeValue::S16(0),
            )
            .set_attribute(
                tm,
                ClusterRole::Server,
                temperature_attrs::MIN_MEASURED_VALUE,
                AttributeValue::S16(to_centi(-50.0)),
            )
            .set_attribute(
                tm,
                ClusterRole::Server,
                temperature_attrs::MAX_MEASURED_VALUE,
                AttributeValue::S16(to_centi(120.0)),
            )
            .set_attribute(
                tm,
                ClusterRole::Server,
                temperature_attrs::TOLERANCE,
                AttributeValue::U16(0),
            );
        Self {
            core: EndpointCore::with_clusters(endpoint_id, DEV_TYPE_TEMPERATURE_SENSOR, clusters),
        }
    }

    fn write(&self, attribute_id: u16, value: AttributeValue) -> Result<()> {
        let tm = cluster::TEMPERATURE_MEASUREMENT;
        self.core
            .write_attribute(tm, ClusterRole::Server, attribute_id, value)
    }

    pub fn set_temperature(&self, celsius: f32) -> Result<()> {
        debug!(
            "[Zigbee] Temperature sensor {} at {:.2}",
            self.core.endpoint_id(),
            celsius
        );
        let value = AttributeValue::S16(to_centi(celsius));
        self.write(temperature_attrs::MEASURED_VALUE, value)
    }

    pub fn set_min_max_value(&self, min: f32, max: f32) -> Result<()> {
        let min = AttributeValue::S16(to_centi(min));
        let max = AttributeValue::S16(to_centi(max));
        self.write(temperature_attrs::MIN_MEASURED_VALUE, min)?;
        self.write(temperature_attrs::MAX_MEASURED_VALUE, max)
    }

    pub fn set_tolerance(&self, tolerance: f32) -> Result<()> {
        let raw = (tolerance * 100.0).round().clamp(0.0, u16::MAX as f32) as u16;
        self.write(temperature_attrs::TOLERANCE, AttributeValue::U16(raw))
    }

    /// Push the current measured value to bound devices.
    pub fn report_temperature(&self) -> Result<()> {
        let tm = cluster::TEMPERATURE_MEASUREMENT;
        self.core
            .report_attribute(tm, temperature_attrs::MEASURED_VALUE)
    }

    pub fn temperature(&self) -> Option<f32> {
        self.core
            .stored_attribute(
                cluster::TEMPERATURE_MEASUREMENT,
                ClusterRole::Server,
                temperature_attrs::MEASURED_VALUE,
            )
            .and_then(|v| v.as_i16())
            .map(|raw| raw as f32 / 100.0)
    }
}

impl ZigbeeEndpoint for TemperatureSensor {
    fn core(&self) -> &EndpointCore {
        &self.core
    }
}
