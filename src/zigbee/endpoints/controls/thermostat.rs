//! Thermostat (HA device 0x0301) that listens to remote temperature sensors.
//!
//! Binding runs in both directions on the Temperature Measurement cluster:
//! the sensor's table gets an entry towards the thermostat so reports arrive
//! here, and the thermostat's table gets one towards the sensor.

use crate::error::Result;
use crate::zigbee::binding::{BindProfile, BindStep};
use crate::zigbee::device_types::DEV_TYPE_THERMOSTAT;
use crate::zigbee::endpoints::{EndpointCore, ReadSlot, ZigbeeEndpoint};
use crate::zigbee::messages::Attribute;
use crate::zigbee::stack::CommandTarget;
use crate::zigbee::zcl::{ClusterList, ClusterRole, cluster, temperature_attrs};
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;

/// Measurement range and tolerance of a remote sensor, in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorSettings {
    pub min: f32,
    pub max: f32,
    pub tolerance: f32,
}

pub type TemperatureCallback = Arc<dyn Fn(f32) + Send + Sync>;
pub type SettingsCallback = Arc<dyn Fn(SensorSettings) + Send + Sync>;

#[derive(Debug, Default)]
struct SettingsReadout {
    min: Option<f32>,
    max: Option<f32>,
    tolerance: Option<f32>,
}

pub struct Thermostat {
    core: EndpointCore,
    temperature: RwLock<Option<f32>>,
    on_temperature: RwLock<Option<TemperatureCallback>>,
    on_settings: RwLock<Option<SettingsCallback>>,
    readout: Mutex<SettingsReadout>,
    settings: ReadSlot<SensorSettings>,
}

/// Measured values are hundredths of a degree.
fn centi_to_celsius(raw: i16) -> f32 {
    raw as f32 / 100.0
}

impl Thermostat {
    pub fn new(endpoint_id: u8) -> Self {
        let clusters = ClusterList::new()
            .with_cluster(cluster::BASIC, ClusterRole::Server)
            .with_cluster(cluster::IDENTIFY, ClusterRole::Server)
            .with_cluster(cluster::IDENTIFY, ClusterRole::Client)
            .with_cluster(cluster::THERMOSTAT, ClusterRole::Server)
            .with_cluster(cluster::TEMPERATURE_MEASUREMENT, ClusterRole::Client);
        let core = EndpointCore::with_clusters(endpoint_id, DEV_TYPE_THERMOSTAT, clusters);
        // follow every sensor that joins
        core.allow_multiple_binding(true);
        Self {
            core,
            temperature: RwLock::new(None),
            on_temperature: RwLock::new(None),
            on_settings: RwLock::new(None),
            readout: Mutex::new(SettingsReadout::default()),
            settings: ReadSlot::new(),
        }
    }

    pub fn on_temperature_receive(&self, callback: impl Fn(f32) + Send + Sync + 'static) {
        *self.on_temperature.write() = Some(Arc::new(callback));
    }

    pub fn on_config_receive(&self, callback: impl Fn(SensorSettings) + Send + Sync + 'static) {
        *self.on_settings.write() = Some(Arc::new(callback));
    }

    /// Last temperature reported by any bound sensor.
    pub fn temperature(&self) -> Option<f32> {
        *self.temperature.read()
    }

    /// Ask each bound sensor for its current temperature.
    pub fn get_temperature(&self) -> Result<()> {
        for peer in self.core.bound_peers() {
            self.core.request_read(
                peer.target(),
                cluster::TEMPERATURE_MEASUREMENT,
                vec![temperature_attrs::MEASURED_VALUE],
            )?;
        }
        Ok(())
    }

    fn request_settings(&self, target: CommandTarget) -> Result<()> {
        *self.readout.lock() = SettingsReadout::default();
        self.core.request_read(
            target,
            cluster::TEMPERATURE_MEASUREMENT,
            vec![
                temperature_attrs::MIN_MEASURED_VALUE,
                temperature_attrs::MAX_MEASURED_VALUE,
                temperature_attrs::TOLERANCE,
            ],
        )
    }

    /// Request min, max and tolerance; the callback fires once all three arrive.
    pub fn get_sensor_settings(&self, target: CommandTarget) -> Result<()> {
        self.request_settings(target)
    }

    /// Same as [`get_sensor_settings`](Self::get_sensor_settings) but waits
    /// for the result.
    pub async fn read_sensor_settings(&self, target: CommandTarget) -> Result<SensorSettings> {
        let rx = self.settings.arm();
        if let Err(e) = self.request_settings(target) {
            self.settings.disarm();
            return Err(e);
        }
        ReadSlot::wait(rx, self.core.read_timeout()).await
    }

    fn on_settings_attribute(&self, attribute: &Attribute) {
        let complete = {
            let mut readout = self.readout.lock();
            let value = attribute.value.as_i16().map(centi_to_celsius);
            match attribute.id {
                temperature_attrs::MIN_MEASURED_VALUE => readout.min = value,
                temperature_attrs::MAX_MEASURED_VALUE => readout.max = value,
                // tolerance is unsigned
                temperature_attrs::TOLERANCE => {
                    readout.tolerance = attribute.value.as_u16().map(|t| t as f32 / 100.0)
                }
                _ => return,
            }
            match (readout.min, readout.max, readout.tolerance) {
                (Some(min), Some(max), Some(tolerance)) => {
                    *readout = SettingsReadout::default();
                    Some(SensorSettings {
                        min,
                        max,
                        tolerance,
                    })
                }
                _ => None,
            }
        };

        if let Some(settings) = complete {
            info!(
                "[Zigbee] Sensor settings: min {:.2}, max {:.2}, tolerance {:.2}",
                settings.min, settings.max, settings.tolerance
            );
            self.settings.fulfil(settings);
            if let Some(cb) = self.on_settings.read().clone() {
                cb(settings);
            }
        }
    }
}

impl ZigbeeEndpoint for Thermostat {
    fn core(&self) -> &EndpointCore {
        &self.core
    }

    fn on_attribute_read(
        &self,
        cluster_id: u16,
        attribute: &Attribute,
        src_endpoint: u8,
        src_addr: u16,
    ) {
        if cluster_id != cluster::TEMPERATURE_MEASUREMENT {
            debug!(
                "[Zigbee] Thermostat ignoring cluster 0x{:04x} from 0x{:04x}/{}",
                cluster_id, src_addr, src_endpoint
            );
            return;
        }
        if attribute.id == temperature_attrs::MEASURED_VALUE {
            let Some(raw) = attribute.value.as_i16() else {
                return;
            };
            let celsius = centi_to_celsius(raw);
            debug!(
                "[Zigbee] Temperature {:.2} from 0x{:04x}",
                celsius, src_addr
            );
            *self.temperature.write() = Some(celsius);
            if let Some(cb) = self.on_temperature.read().clone() {
                cb(celsius);
            }
            return;
        }
        self.on_settings_attribute(attribute);
    }

    fn bind_profile(&self) -> Option<BindProfile> {
        Some(BindProfile {
            in_clusters: vec![cluster::TEMPERATURE_MEASUREMENT],
            out_clusters: Vec::new(),
            steps: vec![
                BindStep::inbound(cluster::TEMPERATURE_MEASUREMENT),
                BindStep::outbound(cluster::TEMPERATURE_MEASUREMENT),
            ],
        })
    }
}
