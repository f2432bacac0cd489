//! Window covering (HA device 0x0202).

use crate::error::Result;
use crate::zigbee::device_types::DEV_TYPE_WINDOW_COVERING;
use crate::zigbee::endpoints::{EndpointCore, ZigbeeEndpoint};
use crate::zigbee::messages::WindowCoveringCommand;
use crate::zigbee::zcl::{AttributeValue, ClusterList, ClusterRole, cluster, window_covering_attrs};
use log::{debug, info};
use parking_lot::RwLock;
use std::sync::Arc;

pub type MovementCallback = Arc<dyn Fn(WindowCoveringCommand) + Send + Sync>;

pub struct WindowCovering {
    core: EndpointCore,
    on_movement: RwLock<Option<MovementCallback>>,
}

impl WindowCovering {
    pub fn new(endpoint_id: u8) -> Self {
        let mut clusters = ClusterList::new()
            .with_cluster(cluster::BASIC, ClusterRole::Server)
            .with_cluster(cluster::IDENTIFY, ClusterRole::Server)
            .with_cluster(cluster::GROUPS, ClusterRole::Server)
            .with_cluster(cluster::SCENES, ClusterRole::Server);
        clusters
            .set_attribute(
                cluster::WINDOW_COVERING,
                ClusterRole::Server,
                window_covering_attrs::CURRENT_POSITION_LIFT_PERCENTAGE,
                AttributeValue::U8(0),
            )
            .set_attribute(
                cluster::WINDOW_COVERING,
                ClusterRole::Server,
                window_covering_attrs::CURRENT_POSITION_TILT_PERCENTAGE,
                AttributeValue::U8(0),
            );
        Self {
            core: EndpointCore::with_clusters(endpoint_id, DEV_TYPE_WINDOW_COVERING, clusters),
            on_movement: RwLock::new(None),
        }
    }

    /// Called for every movement command received from a controller.
    pub fn on_movement(&self, callback: impl Fn(WindowCoveringCommand) + Send + Sync + 'static) {
        *self.on_movement.write() = Some(Arc::new(callback));
    }

    fn set_percentage(&self, attribute_id: u16, percentage: u8) -> Result<()> {
        let percentage = percentage.min(100);
        self.core.write_attribute(
            cluster::WINDOW_COVERING,
            ClusterRole::Server,
            attribute_id,
            AttributeValue::U8(percentage),
        )?;
        self.core.report_attribute(cluster::WINDOW_COVERING, attribute_id)
    }

    /// Publish the lift position (0 = open, 100 = closed).
    pub fn set_lift_percentage(&self, percentage: u8) -> Result<()> {
        info!("[Zigbee] Window covering lift at {}%", percentage);
        self.set_percentage(
            window_covering_attrs::CURRENT_POSITION_LIFT_PERCENTAGE,
            percentage,
        )
    }

    pub fn set_tilt_percentage(&self, percentage: u8) -> Result<()> {
        info!("[Zigbee] Window covering tilt at {}%", percentage);
        self.set_percentage(
            window_covering_attrs::CURRENT_POSITION_TILT_PERCENTAGE,
            percentage,
        )
    }

    pub fn lift_percentage(&self) -> Option<u8> {
        self.core
            .stored_attribute(
                cluster::WINDOW_COVERING,
                ClusterRole::Server,
                window_covering_attrs::CURRENT_POSITION_LIFT_PERCENTAGE,
            )
            .and_then(|v| v.as_u8())
    }
}

impl ZigbeeEndpoint for WindowCovering {
    fn core(&self) -> &EndpointCore {
        &self.core
    }

    fn on_window_covering_movement(&self, command: WindowCoveringCommand) {
        let callback = self.on_movement.read().clone();
        match callback {
            Some(cb) => cb(command),
            None => debug!(
                "[Zigbee] Window covering command {:?} (no callback)",
                command
            ),
        }
    }
}
