//! On/off light switch (HA device 0x0000).
//!
//! Binds to On/Off servers found on device announce and sends on/off/toggle
//! either to its bindings or to an explicit group, short or IEEE address.

use crate::error::{Result, ZigbeeError};
use crate::zigbee::binding::BindProfile;
use crate::zigbee::device_types::DEV_TYPE_ON_OFF_SWITCH;
use crate::zigbee::endpoints::{EndpointCore, ZigbeeEndpoint};
use crate::zigbee::stack::{CommandKind, CommandTarget, OnOffCommand};
use crate::zigbee::zcl::{ClusterList, ClusterRole, cluster};
use log::{info, warn};

pub struct OnOffSwitch {
    core: EndpointCore,
}

impl OnOffSwitch {
    pub fn new(endpoint_id: u8) -> Self {
        let clusters = ClusterList::new()
            .with_cluster(cluster::BASIC, ClusterRole::Server)
            .with_cluster(cluster::IDENTIFY, ClusterRole::Server)
            .with_cluster(cluster::IDENTIFY, ClusterRole::Client)
            .with_cluster(cluster::ON_OFF, ClusterRole::Client);
        Self {
            core: EndpointCore::with_clusters(endpoint_id, DEV_TYPE_ON_OFF_SWITCH, clusters),
        }
    }

    /// Send an on/off command. Sending to bindings requires at least one bound light.
    pub fn send_on_off(&self, command: OnOffCommand, target: CommandTarget) -> Result<()> {
        if target == CommandTarget::Bound && !self.core.is_bound() {
            warn!(
                "[Zigbee] Switch {}: light not bound, {:?} not sent",
                self.core.endpoint_id(),
                command
            );
            return Err(ZigbeeError::NotBound(self.core.endpoint_id()));
        }
        info!(
            "[Zigbee] Sending 'light {:?}' command to {:?}",
            command, target
        );
        self.core.send_command(target, CommandKind::OnOff(command))
    }

    pub fn light_on(&self) -> Result<()> {
        self.send_on_off(OnOffCommand::On, CommandTarget::Bound)
    }

    pub fn light_off(&self) -> Result<()> {
        self.send_on_off(OnOffCommand::Off, CommandTarget::Bound)
    }

    pub fn light_toggle(&self) -> Result<()> {
        self.send_on_off(OnOffCommand::Toggle, CommandTarget::Bound)
    }

    pub fn group_toggle(&self, group_addr: u16) -> Result<()> {
        self.send_on_off(OnOffCommand::Toggle, CommandTarget::Group(group_addr))
    }
}

impl ZigbeeEndpoint for OnOffSwitch {
    fn core(&self) -> &EndpointCore {
        &self.core
    }

    fn bind_profile(&self) -> Option<BindProfile> {
        Some(BindProfile::client_of(&[cluster::ON_OFF]))
    }
}
