//! In-memory `ZigbeeStack` that records every call for assertions.

use super::stack::{
    BindRequest, CommissioningMode, IeeeAddr, MatchDescRequest, NetworkInfo,
    ReadAttributesRequest, RequestToken, StackHandle, ZclCommand, ZigbeeStack,
};
use super::zcl::{AttributeValue, ClusterList, ClusterRole, EndpointConfig, ZclStatus};
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const LOCAL_IEEE: IeeeAddr = [0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80];
pub const LOCAL_SHORT: u16 = 0x0000;

#[derive(Default)]
struct Recorded {
    factory_new: bool,
    started: Vec<CommissioningMode>,
    scheduled: Vec<(CommissioningMode, Duration)>,
    opened: Vec<u8>,
    channel_masks: Vec<u32>,
    factory_resets: Vec<bool>,
    restarts: usize,
    scans: Vec<(u32, u8)>,
    matches: Vec<(MatchDescRequest, RequestToken)>,
    binds: Vec<(BindRequest, RequestToken)>,
    binding_tables: Vec<(usize, RequestToken)>,
    reads: Vec<ReadAttributesRequest>,
    commands: Vec<ZclCommand>,
    ota_queries: Vec<(u8, u16, u8, u16)>,
    registered: Vec<EndpointConfig>,
    devices: HashMap<u16, IeeeAddr>,
    attributes: HashMap<(u8, u16, ClusterRole, u16), AttributeValue>,
    reject_attributes: bool,
}

#[derive(Clone, Default)]
pub struct RecordingStack {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> StackHandle {
        StackHandle::new(Arc::new(self.clone()))
    }

    pub fn set_factory_new(&self, factory_new: bool) {
        self.inner.lock().factory_new = factory_new;
    }

    pub fn add_device(&self, short_addr: u16, ieee: IeeeAddr) {
        self.inner.lock().devices.insert(short_addr, ieee);
    }

    pub fn reject_attribute_writes(&self) {
        self.inner.lock().reject_attributes = true;
    }

    pub fn started(&self) -> Vec<CommissioningMode> {
        self.inner.lock().started.clone()
    }

    pub fn scheduled(&self) -> Vec<(CommissioningMode, Duration)> {
        self.inner.lock().scheduled.clone()
    }

    pub fn opened(&self) -> Vec<u8> {
        self.inner.lock().opened.clone()
    }

    pub fn channel_masks(&self) -> Vec<u32> {
        self.inner.lock().channel_masks.clone()
    }

    pub fn factory_resets(&self) -> Vec<bool> {
        self.inner.lock().factory_resets.clone()
    }

    pub fn restarts(&self) -> usize {
        self.inner.lock().restarts
    }

    pub fn scans(&self) -> Vec<(u32, u8)> {
        self.inner.lock().scans.clone()
    }

    pub fn match_requests(&self) -> Vec<(MatchDescRequest, RequestToken)> {
        self.inner.lock().matches.clone()
    }

    pub fn bind_requests(&self) -> Vec<(BindRequest, RequestToken)> {
        self.inner.lock().binds.clone()
    }

    pub fn binding_table_requests(&self) -> Vec<(usize, RequestToken)> {
        self.inner.lock().binding_tables.clone()
    }

    pub fn reads(&self) -> Vec<ReadAttributesRequest> {
        self.inner.lock().reads.clone()
    }

    pub fn commands(&self) -> Vec<ZclCommand> {
        self.inner.lock().commands.clone()
    }

    pub fn ota_queries(&self) -> Vec<(u8, u16, u8, u16)> {
        self.inner.lock().ota_queries.clone()
    }

    pub fn registered(&self) -> Vec<EndpointConfig> {
        self.inner.lock().registered.clone()
    }

    pub fn attribute(
        &self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
    ) -> Option<AttributeValue> {
        self.inner
            .lock()
            .attributes
            .get(&(endpoint, cluster, role, attribute))
            .cloned()
    }

    /// Seed an attribute without going through `set_attribute`.
    pub fn store_attribute(
        &self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
        value: AttributeValue,
    ) {
        self.inner
            .lock()
            .attributes
            .insert((endpoint, cluster, role, attribute), value);
    }
}

impl ZigbeeStack for RecordingStack {
    fn register_endpoint(&self, config: &EndpointConfig, clusters: &ClusterList) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.registered.push(*config);
        for role in [ClusterRole::Server, ClusterRole::Client] {
            for cluster in clusters.cluster_ids(role) {
                for (id, value) in clusters.attributes(cluster, role) {
                    inner
                        .attributes
                        .insert((config.endpoint, cluster, role, id), value.clone());
                }
            }
        }
        Ok(())
    }

    fn start_commissioning(&self, mode: CommissioningMode) -> Result<()> {
        self.inner.lock().started.push(mode);
        Ok(())
    }

    fn schedule_commissioning(&self, mode: CommissioningMode, delay: Duration) {
        self.inner.lock().scheduled.push((mode, delay));
    }

    fn is_factory_new(&self) -> bool {
        self.inner.lock().factory_new
    }

    fn open_network(&self, duration_secs: u8) -> Result<()> {
        self.inner.lock().opened.push(duration_secs);
        Ok(())
    }

    fn network_info(&self) -> NetworkInfo {
        NetworkInfo {
            pan_id: 0x1A62,
            extended_pan_id: LOCAL_IEEE,
            channel: 15,
            short_addr: LOCAL_SHORT,
        }
    }

    fn primary_channel_mask(&self) -> u32 {
        self.inner
            .lock()
            .channel_masks
            .last()
            .copied()
            .unwrap_or(0x07FF_F800)
    }

    fn set_primary_channel_mask(&self, mask: u32) {
        self.inner.lock().channel_masks.push(mask);
    }

    fn factory_reset(&self, restart: bool) {
        self.inner.lock().factory_resets.push(restart);
    }

    fn restart(&self) {
        self.inner.lock().restarts += 1;
    }

    fn active_scan(&self, channel_mask: u32, duration: u8) -> Result<()> {
        self.inner.lock().scans.push((channel_mask, duration));
        Ok(())
    }

    fn match_descriptor(&self, request: MatchDescRequest, token: RequestToken) {
        self.inner.lock().matches.push((request, token));
    }

    fn bind(&self, request: BindRequest, token: RequestToken) {
        self.inner.lock().binds.push((request, token));
    }

    fn binding_table(&self, start_index: usize, token: RequestToken) {
        self.inner.lock().binding_tables.push((start_index, token));
    }

    fn ieee_address_of(&self, short_addr: u16) -> Option<IeeeAddr> {
        self.inner.lock().devices.get(&short_addr).copied()
    }

    fn short_address_of(&self, ieee_addr: &IeeeAddr) -> Option<u16> {
        self.inner
            .lock()
            .devices
            .iter()
            .find(|(_, ieee)| *ieee == ieee_addr)
            .map(|(short, _)| *short)
    }

    fn local_ieee_address(&self) -> IeeeAddr {
        LOCAL_IEEE
    }

    fn read_attributes(&self, request: ReadAttributesRequest) -> Result<()> {
        self.inner.lock().reads.push(request);
        Ok(())
    }

    fn send_command(&self, command: ZclCommand) -> Result<()> {
        self.inner.lock().commands.push(command);
        Ok(())
    }

    fn get_attribute(
        &self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
    ) -> Option<AttributeValue> {
        self.attribute(endpoint, cluster, role, attribute)
    }

    fn set_attribute(
        &self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
        value: AttributeValue,
    ) -> std::result::Result<(), ZclStatus> {
        let mut inner = self.inner.lock();
        if inner.reject_attributes {
            return Err(ZclStatus::ReadOnly);
        }
        inner
            .attributes
            .insert((endpoint, cluster, role, attribute), value);
        Ok(())
    }

    fn ota_query_image(
        &self,
        endpoint: u8,
        server_addr: u16,
        server_endpoint: u8,
        interval_min: u16,
    ) -> Result<()> {
        self.inner
            .lock()
            .ota_queries
            .push((endpoint, server_addr, server_endpoint, interval_min));
        Ok(())
    }
}
