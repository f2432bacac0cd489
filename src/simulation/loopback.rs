//! In-process `ZigbeeStack` with simulated peers.
//!
//! Stack calls never call back into the core directly. They queue a
//! [`StackEvent`] that the stack task delivers, so callbacks always run on
//! that task the same way a radio stack's would.

use super::remote::RemoteDevice;
use crate::commissioning::Role;
use crate::error::{Result, ZigbeeError};
use crate::zigbee::ZigbeeCore;
use crate::zigbee::dispatcher::{AttributeUpdateKind, DispatchStatus};
use crate::zigbee::messages::{ActionMessage, MessageInfo};
use crate::zigbee::scan::NetworkDescriptor;
use crate::zigbee::signals::{AppSignal, SignalStatus};
use crate::zigbee::stack::{
    BROADCAST_RX_ON_WHEN_IDLE, BindRequest, BindingDst, BindingRecord, BindingTablePage,
    CommandKind, CommandTarget, CommissioningMode, IeeeAddr, MatchDescRequest, MatchResult,
    NetworkInfo, ReadAttributesRequest, RequestToken, ZclCommand, ZdoStatus, ZigbeeStack,
    format_ieee,
};
use crate::zigbee::zcl::{
    AttributeValue, ClusterList, ClusterRole, EndpointConfig, ZclStatus, cluster,
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const FORMED_PAN_ID: u16 = 0x1A62;
const JOINED_SHORT_ADDR: u16 = 0x4F2C;
const FAILED_SIGNAL: i32 = -1;
/// Binding table entries returned per response.
const BINDING_TABLE_PAGE: usize = 2;

/// Work queued for the stack task.
#[derive(Debug, Clone)]
pub enum StackEvent {
    Commission(CommissioningMode),
    Signal(AppSignal),
    Match {
        token: RequestToken,
        result: MatchResult,
    },
    Bind {
        token: RequestToken,
        status: ZdoStatus,
    },
    BindingTable {
        token: RequestToken,
        page: BindingTablePage,
    },
    Action(ActionMessage),
    /// A peer writes an attribute of a local endpoint.
    AttributeWrite {
        endpoint: u8,
        cluster_id: u16,
        attribute_id: u16,
        value: AttributeValue,
    },
    ScanComplete {
        success: bool,
        networks: Vec<NetworkDescriptor>,
    },
    Restart,
}

#[derive(Debug, Default)]
struct LoopbackState {
    factory_new: bool,
    joined: bool,
    network: NetworkInfo,
    channel_mask: u32,
    permit_join_secs: u8,
    endpoints: Vec<EndpointConfig>,
    attributes: HashMap<(u8, u16, ClusterRole, u16), AttributeValue>,
    remotes: Vec<RemoteDevice>,
    /// Bindings whose source is a local endpoint.
    bindings: Vec<BindRequest>,
    neighbours: Vec<NetworkDescriptor>,
    next_zone_id: u8,
}

pub struct LoopbackStack {
    role: Role,
    local_ieee: IeeeAddr,
    state: Mutex<LoopbackState>,
    events: mpsc::UnboundedSender<StackEvent>,
}

fn lowest_channel(mask: u32) -> u8 {
    (11..=26).find(|c| mask & (1 << c) != 0).unwrap_or(11)
}

fn command_cluster(kind: &CommandKind) -> u16 {
    match kind {
        CommandKind::OnOff(_) => cluster::ON_OFF,
        CommandKind::MoveToLevel { .. } => cluster::LEVEL_CONTROL,
        CommandKind::MoveToColor { .. } | CommandKind::MoveToHueAndSaturation { .. } => {
            cluster::COLOR_CONTROL
        }
        CommandKind::ReportAttribute { cluster_id, .. } => *cluster_id,
        CommandKind::IasZoneEnrollRequest { .. } | CommandKind::IasZoneStatusChange { .. } => {
            cluster::IAS_ZONE
        }
    }
}

impl LoopbackStack {
    pub fn new(
        role: Role,
        local_ieee: IeeeAddr,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<StackEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let stack = Arc::new(Self {
            role,
            local_ieee,
            state: Mutex::new(LoopbackState {
                factory_new: true,
                next_zone_id: 1,
                ..Default::default()
            }),
            events,
        });
        (stack, rx)
    }

    fn queue(&self, event: StackEvent) {
        if self.events.send(event).is_err() {
            warn!("[Sim] Stack task gone, event dropped");
        }
    }

    /// Power on. The core answers the startup signal by initializing the stack.
    pub fn boot(&self) {
        self.queue(StackEvent::Signal(AppSignal::SkipStartup));
    }

    /// Lose what a power cycle loses. Network, bindings and peers survive;
    /// endpoints have to be registered again before the next `boot`.
    pub fn power_cycle(&self) {
        let mut state = self.state.lock();
        state.endpoints.clear();
        state.attributes.clear();
        state.permit_join_secs = 0;
        info!(
            "[Sim] Power cycle, {} binding(s) kept",
            state.bindings.len()
        );
    }

    /// Make a network visible to scans and joinable by steering.
    pub fn add_neighbour(&self, network: NetworkDescriptor) {
        self.state.lock().neighbours.push(network);
    }

    /// Add a peer to the network and announce it.
    pub fn join_device(&self, device: RemoteDevice) {
        let (short_addr, ieee_addr) = (device.short_addr, device.ieee_addr);
        info!(
            "[Sim] Device 0x{:04x} ({}) joins",
            short_addr,
            format_ieee(&ieee_addr)
        );
        {
            let mut state = self.state.lock();
            state
                .remotes
                .retain(|r| !(r.short_addr == short_addr && r.endpoint == device.endpoint));
            state.remotes.push(device);
        }
        let signal = match self.role {
            Role::Router => AppSignal::DeviceUpdate {
                short_addr,
                ieee_addr,
            },
            _ => AppSignal::DeviceAnnounce {
                short_addr,
                ieee_addr,
            },
        };
        self.queue(StackEvent::Signal(signal));
    }

    /// Simulate a peer writing one of our attributes.
    pub fn remote_write(
        &self,
        endpoint: u8,
        cluster_id: u16,
        attribute_id: u16,
        value: AttributeValue,
    ) {
        self.queue(StackEvent::AttributeWrite {
            endpoint,
            cluster_id,
            attribute_id,
            value,
        });
    }

    /// Deliver an arbitrary action message as if it came off the air.
    pub fn inject_action(&self, message: ActionMessage) {
        self.queue(StackEvent::Action(message));
    }

    pub fn remote(&self, short_addr: u16, endpoint: u8) -> Option<RemoteDevice> {
        self.state
            .lock()
            .remotes
            .iter()
            .find(|r| r.short_addr == short_addr && r.endpoint == endpoint)
            .cloned()
    }

    /// Indices of remotes addressed by `target` from `src_endpoint`.
    fn resolve(
        state: &LoopbackState,
        src_endpoint: u8,
        cluster_id: u16,
        target: CommandTarget,
    ) -> Vec<usize> {
        state
            .remotes
            .iter()
            .enumerate()
            .filter(|(_, r)| match target {
                CommandTarget::Bound => state.bindings.iter().any(|b| {
                    b.src_endpoint == src_endpoint
                        && b.cluster_id == cluster_id
                        && b.dst_ieee == r.ieee_addr
                        && b.dst_endpoint == r.endpoint
                }),
                CommandTarget::Group(_) => r.matches(&[cluster_id], &[]),
                CommandTarget::Short { addr, endpoint } => {
                    r.short_addr == addr && r.endpoint == endpoint
                }
                CommandTarget::Ieee { addr, endpoint } => {
                    r.ieee_addr == addr && r.endpoint == endpoint
                }
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Stack-side handling of a commissioning step; returns the signal to raise.
    fn commission(&self, mode: CommissioningMode) -> AppSignal {
        let mut state = self.state.lock();
        match mode {
            CommissioningMode::Initialization => {
                let status = SignalStatus::Ok;
                if state.factory_new {
                    AppSignal::DeviceFirstStart { status }
                } else {
                    AppSignal::DeviceReboot { status }
                }
            }
            CommissioningMode::NetworkFormation => {
                if self.role != Role::Coordinator {
                    return AppSignal::Formation {
                        status: SignalStatus::Error(FAILED_SIGNAL),
                    };
                }
                state.network = NetworkInfo {
                    pan_id: FORMED_PAN_ID,
                    extended_pan_id: self.local_ieee,
                    channel: lowest_channel(state.channel_mask),
                    short_addr: 0x0000,
                };
                state.joined = true;
                state.factory_new = false;
                AppSignal::Formation {
                    status: SignalStatus::Ok,
                }
            }
            CommissioningMode::NetworkSteering => {
                if self.role == Role::Coordinator {
                    return AppSignal::Steering {
                        status: if state.joined {
                            SignalStatus::Ok
                        } else {
                            SignalStatus::Error(FAILED_SIGNAL)
                        },
                    };
                }
                let mask = state.channel_mask;
                let Some(network) = state
                    .neighbours
                    .iter()
                    .find(|n| n.permit_joining && mask & (1 << n.channel) != 0)
                    .cloned()
                else {
                    return AppSignal::Steering {
                        status: SignalStatus::Error(FAILED_SIGNAL),
                    };
                };
                state.network = NetworkInfo {
                    pan_id: network.short_pan_id,
                    extended_pan_id: network.extended_pan_id,
                    channel: network.channel,
                    short_addr: JOINED_SHORT_ADDR,
                };
                state.joined = true;
                state.factory_new = false;
                AppSignal::Steering {
                    status: SignalStatus::Ok,
                }
            }
        }
    }

    fn store_attribute(
        &self,
        endpoint: u8,
        cluster_id: u16,
        attribute_id: u16,
        value: AttributeValue,
    ) {
        self.state
            .lock()
            .attributes
            .insert(
                (endpoint, cluster_id, ClusterRole::Server, attribute_id),
                value,
            );
    }

    /// Process one queued event on the stack task.
    pub fn handle_event(&self, core: &ZigbeeCore, event: StackEvent) {
        match event {
            StackEvent::Commission(mode) => {
                let signal = self.commission(mode);
                core.on_app_signal(&signal);
            }
            StackEvent::Signal(signal) => core.on_app_signal(&signal),
            StackEvent::Match { token, result } => core.on_match_result(token, result),
            StackEvent::Bind { token, status } => core.on_bind_result(token, status),
            StackEvent::BindingTable { token, page } => core.on_binding_table(token, page),
            StackEvent::Action(message) => {
                let status = core.on_action(Some(&message));
                if status != DispatchStatus::Ok {
                    debug!("[Sim] {} handled with {:?}", message.kind(), status);
                }
            }
            StackEvent::AttributeWrite {
                endpoint,
                cluster_id,
                attribute_id,
                value,
            } => {
                let status = core.on_attribute_update(
                    AttributeUpdateKind::PreUpdate,
                    endpoint,
                    cluster_id,
                    attribute_id,
                    Some(&value),
                );
                if status == DispatchStatus::Ok {
                    self.store_attribute(endpoint, cluster_id, attribute_id, value);
                } else {
                    info!(
                        "[Sim] Write of 0x{:04x}/0x{:04x} on endpoint {} refused: {:?}",
                        cluster_id, attribute_id, endpoint, status
                    );
                }
            }
            StackEvent::ScanComplete { success, networks } => {
                core.on_scan_complete(success, networks)
            }
            StackEvent::Restart => {
                info!("[Sim] Restarting stack");
                let signal = self.commission(CommissioningMode::Initialization);
                core.on_app_signal(&signal);
            }
        }
    }
}

/// Spawn the stack task that delivers queued events to `core`.
///
/// Returns a `JoinHandle` that can be used to abort the task on shutdown.
pub fn run_stack_task(
    stack: Arc<LoopbackStack>,
    core: Arc<ZigbeeCore>,
    mut events: mpsc::UnboundedReceiver<StackEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("[Sim] Stack task running");
        while let Some(event) = events.recv().await {
            stack.handle_event(&core, event);
        }
        info!("[Sim] Stack task stopped");
    })
}

impl ZigbeeStack for LoopbackStack {
    fn register_endpoint(&self, config: &EndpointConfig, clusters: &ClusterList) -> Result<()> {
        let mut state = self.state.lock();
        if state.endpoints.iter().any(|e| e.endpoint == config.endpoint) {
            return Err(ZigbeeError::Stack(format!(
                "endpoint {} already registered",
                config.endpoint
            )));
        }
        state.endpoints.push(*config);
        for role in [ClusterRole::Server, ClusterRole::Client] {
            for cluster_id in clusters.cluster_ids(role) {
                for (attribute_id, value) in clusters.attributes(cluster_id, role) {
                    let key = (config.endpoint, cluster_id, role, attribute_id);
                    state.attributes.insert(key, value.clone());
                }
            }
        }
        Ok(())
    }

    fn start_commissioning(&self, mode: CommissioningMode) -> Result<()> {
        self.queue(StackEvent::Commission(mode));
        Ok(())
    }

    fn schedule_commissioning(&self, mode: CommissioningMode, delay: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("[Sim] No runtime to schedule {:?}", mode);
            return;
        };
        let events = self.events.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(StackEvent::Commission(mode));
        });
    }

    fn is_factory_new(&self) -> bool {
        self.state.lock().factory_new
    }

    fn open_network(&self, duration_secs: u8) -> Result<()> {
        {
            let mut state = self.state.lock();
            if !state.joined {
                return Err(ZigbeeError::Stack("no network to open".into()));
            }
            state.permit_join_secs = duration_secs;
        }
        self.queue(StackEvent::Signal(AppSignal::PermitJoinStatus {
            duration: duration_secs,
        }));
        Ok(())
    }

    fn network_info(&self) -> NetworkInfo {
        self.state.lock().network
    }

    fn primary_channel_mask(&self) -> u32 {
        self.state.lock().channel_mask
    }

    fn set_primary_channel_mask(&self, mask: u32) {
        self.state.lock().channel_mask = mask;
    }

    fn factory_reset(&self, restart: bool) {
        {
            let mut state = self.state.lock();
            state.factory_new = true;
            state.joined = false;
            state.network = NetworkInfo::default();
            state.bindings.clear();
        }
        if restart {
            self.queue(StackEvent::Restart);
        }
    }

    fn restart(&self) {
        self.queue(StackEvent::Restart);
    }

    fn active_scan(&self, channel_mask: u32, duration: u8) -> Result<()> {
        let networks: Vec<_> = self
            .state
            .lock()
            .neighbours
            .iter()
            .filter(|n| channel_mask & (1 << n.channel) != 0)
            .cloned()
            .collect();
        debug!(
            "[Sim] Scan of 0x{:08x} ({}) finds {} network(s)",
            channel_mask,
            duration,
            networks.len()
        );
        self.queue(StackEvent::ScanComplete {
            success: true,
            networks,
        });
        Ok(())
    }

    fn match_descriptor(&self, request: MatchDescRequest, token: RequestToken) {
        let found = self
            .state
            .lock()
            .remotes
            .iter()
            .find(|r| {
                let addressed = request.dst_nwk_addr == BROADCAST_RX_ON_WHEN_IDLE
                    || r.short_addr == request.dst_nwk_addr;
                addressed && r.matches(&request.in_clusters, &request.out_clusters)
            })
            .map(|r| (r.short_addr, r.endpoint));
        let result = match found {
            Some((short_addr, endpoint)) => MatchResult {
                status: ZdoStatus::Success,
                short_addr,
                endpoint,
            },
            None => MatchResult {
                status: ZdoStatus::NoMatch,
                short_addr: request.dst_nwk_addr,
                endpoint: 0,
            },
        };
        self.queue(StackEvent::Match { token, result });
    }

    fn bind(&self, request: BindRequest, token: RequestToken) {
        let dst = request.req_dst_addr;
        let status = {
            let mut state = self.state.lock();
            if request.src_ieee == self.local_ieee {
                if !state.bindings.contains(&request) {
                    state.bindings.push(request);
                }
                ZdoStatus::Success
            } else if state.remotes.iter().any(|r| r.short_addr == dst) {
                // remote tables are not modelled
                ZdoStatus::Success
            } else {
                ZdoStatus::Timeout
            }
        };
        self.queue(StackEvent::Bind { token, status });
    }

    fn binding_table(&self, start_index: usize, token: RequestToken) {
        let page = {
            let state = self.state.lock();
            BindingTablePage {
                status: ZdoStatus::Success,
                total: state.bindings.len(),
                start_index,
                records: state
                    .bindings
                    .iter()
                    .skip(start_index)
                    .take(BINDING_TABLE_PAGE)
                    .map(|b| BindingRecord {
                        src_endpoint: b.src_endpoint,
                        cluster_id: b.cluster_id,
                        dst: BindingDst::Ieee(b.dst_ieee),
                        dst_endpoint: b.dst_endpoint,
                    })
                    .collect(),
            }
        };
        self.queue(StackEvent::BindingTable { token, page });
    }

    fn ieee_address_of(&self, short_addr: u16) -> Option<IeeeAddr> {
        self.state
            .lock()
            .remotes
            .iter()
            .find(|r| r.short_addr == short_addr)
            .map(|r| r.ieee_addr)
    }

    fn short_address_of(&self, ieee_addr: &IeeeAddr) -> Option<u16> {
        self.state
            .lock()
            .remotes
            .iter()
            .find(|r| &r.ieee_addr == ieee_addr)
            .map(|r| r.short_addr)
    }

    fn local_ieee_address(&self) -> IeeeAddr {
        self.local_ieee
    }

    fn read_attributes(&self, request: ReadAttributesRequest) -> Result<()> {
        let responses: Vec<_> = {
            let state = self.state.lock();
            let targets = Self::resolve(
                &state,
                request.src_endpoint,
                request.cluster_id,
                request.target,
            );
            targets
                .into_iter()
                .map(|i| {
                    let remote = &state.remotes[i];
                    ActionMessage::ReadAttributeResponse {
                        info: MessageInfo {
                            status: ZclStatus::Success,
                            src_addr: remote.short_addr,
                            src_endpoint: remote.endpoint,
                            dst_endpoint: request.src_endpoint,
                            cluster: request.cluster_id,
                        },
                        variables: remote.read(request.cluster_id, &request.attributes),
                    }
                })
                .collect()
        };
        if responses.is_empty() {
            debug!(
                "[Sim] Read of cluster 0x{:04x} reached nobody",
                request.cluster_id
            );
        }
        for response in responses {
            self.queue(StackEvent::Action(response));
        }
        Ok(())
    }

    fn send_command(&self, command: ZclCommand) -> Result<()> {
        let cluster_id = command_cluster(&command.kind);
        if let CommandKind::IasZoneEnrollRequest { zone_type, .. } = command.kind {
            // act as the CIE and accept every enrollment
            let zone_id = {
                let mut state = self.state.lock();
                let id = state.next_zone_id;
                state.next_zone_id = state.next_zone_id.wrapping_add(1);
                id
            };
            debug!("[Sim] Enroll request for zone type 0x{:04x}", zone_type);
            self.queue(StackEvent::Action(ActionMessage::IasZoneEnrollResponse {
                info: MessageInfo {
                    status: ZclStatus::Success,
                    src_addr: 0x0000,
                    src_endpoint: 1,
                    dst_endpoint: command.src_endpoint,
                    cluster: cluster::IAS_ZONE,
                },
                response_code: 0,
                zone_id,
            }));
            return Ok(());
        }

        let mut state = self.state.lock();
        let targets = Self::resolve(&state, command.src_endpoint, cluster_id, command.target);
        if targets.is_empty() {
            debug!(
                "[Sim] {:?} from endpoint {} reached nobody",
                command.kind, command.src_endpoint
            );
        }
        for i in targets {
            if !state.remotes[i].apply(&command.kind) {
                debug!(
                    "[Sim] 0x{:04x} ignored {:?}",
                    state.remotes[i].short_addr, command.kind
                );
            }
        }
        Ok(())
    }

    fn get_attribute(
        &self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
    ) -> Option<AttributeValue> {
        self.state
            .lock()
            .attributes
            .get(&(endpoint, cluster, role, attribute))
            .cloned()
    }

    fn set_attribute(
        &self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
        value: AttributeValue,
    ) -> std::result::Result<(), ZclStatus> {
        let mut state = self.state.lock();
        if !state.endpoints.iter().any(|e| e.endpoint == endpoint) {
            return Err(ZclStatus::NotFound);
        }
        state.attributes.insert((endpoint, cluster, role, attribute), value);
        Ok(())
    }

    fn ota_query_image(
        &self,
        endpoint: u8,
        server_addr: u16,
        server_endpoint: u8,
        interval_min: u16,
    ) -> Result<()> {
        info!(
            "[Sim] Endpoint {} queries OTA server 0x{:04x}/{} every {} min",
            endpoint, server_addr, server_endpoint, interval_min
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commissioning::CommissioningState;
    use crate::config::Config;
    use crate::zigbee::endpoints::{ColorDimmableLight, OnOffSwitch, PeerRef, ZigbeeEndpoint};
    use crate::zigbee::registry::EndpointRegistry;
    use crate::zigbee::zcl::on_off_attrs;

    const LOCAL: IeeeAddr = [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7];
    const REMOTE: IeeeAddr = [0xB0, 0xB1, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7];

    struct Harness {
        stack: Arc<LoopbackStack>,
        core: Arc<ZigbeeCore>,
        rx: mpsc::UnboundedReceiver<StackEvent>,
        light: Arc<ColorDimmableLight>,
        switch: Arc<OnOffSwitch>,
    }

    impl Harness {
        fn new() -> Self {
            let (stack, rx) = LoopbackStack::new(Role::Coordinator, LOCAL);
            let light = Arc::new(ColorDimmableLight::new(10));
            let switch = Arc::new(OnOffSwitch::new(1));
            let mut registry = EndpointRegistry::new();
            registry.register(light.clone()).unwrap();
            registry.register(switch.clone()).unwrap();
            let core = ZigbeeCore::new(Config::default(), stack.clone(), registry).unwrap();
            Self {
                stack,
                core: Arc::new(core),
                rx,
                light,
                switch,
            }
        }

        /// Deliver queued events until the queue is empty.
        fn pump(&mut self) {
            while let Ok(event) = self.rx.try_recv() {
                self.stack.handle_event(&self.core, event);
            }
        }
    }

    #[test]
    fn test_coordinator_forms_network() {
        let mut h = Harness::new();
        h.stack.boot();
        h.pump();
        assert_eq!(h.core.state(), CommissioningState::Operational);
        assert!(h.core.is_started());
        assert_eq!(h.stack.network_info().pan_id, FORMED_PAN_ID);
        assert!(!h.stack.is_factory_new());
    }

    #[test]
    fn test_announce_binds_and_switch_controls_remote() {
        let mut h = Harness::new();
        h.stack.boot();
        h.pump();

        h.stack.join_device(RemoteDevice::color_light(0x1234, REMOTE, 11));
        h.pump();
        assert!(h.switch.core().is_bound_to(0x1234, &REMOTE));

        h.switch.light_toggle().unwrap();
        let remote = h.stack.remote(0x1234, 11).unwrap();
        assert_eq!(
            remote.attribute(cluster::ON_OFF, on_off_attrs::ON_OFF),
            Some(&AttributeValue::Bool(true))
        );
    }

    #[test]
    fn test_reboot_recalls_bindings_from_stack() {
        let mut h = Harness::new();
        h.stack.boot();
        h.pump();
        h.stack.join_device(RemoteDevice::color_light(0x1234, REMOTE, 11));
        h.stack.join_device(RemoteDevice::color_light(0x5678, [0xC0; 8], 3));
        h.pump();
        // the switch takes a single peer
        assert_eq!(h.switch.core().bound_peers().len(), 1);

        h.stack.power_cycle();
        let switch = Arc::new(OnOffSwitch::new(1));
        let mut registry = EndpointRegistry::new();
        registry.register(switch.clone()).unwrap();
        let stack = h.stack.clone();
        h.core = Arc::new(ZigbeeCore::new(Config::default(), stack, registry).unwrap());
        assert!(!switch.core().is_bound());

        h.stack.boot();
        h.pump();
        assert_eq!(h.core.state(), CommissioningState::Operational);
        assert_eq!(
            switch.core().bound_peers(),
            vec![PeerRef {
                short_addr: 0x1234,
                ieee_addr: REMOTE,
                endpoint: 11,
            }]
        );

        switch.light_toggle().unwrap();
        let remote = h.stack.remote(0x1234, 11).unwrap();
        assert_eq!(
            remote.attribute(cluster::ON_OFF, on_off_attrs::ON_OFF),
            Some(&AttributeValue::Bool(true))
        );
    }

    #[test]
    fn test_binding_table_is_paged() {
        let (stack, mut rx) = LoopbackStack::new(Role::Coordinator, LOCAL);
        for cluster_id in [cluster::ON_OFF, cluster::LEVEL_CONTROL, cluster::COLOR_CONTROL] {
            stack.bind(
                BindRequest {
                    src_ieee: LOCAL,
                    src_endpoint: 1,
                    cluster_id,
                    dst_ieee: REMOTE,
                    dst_endpoint: 11,
                    req_dst_addr: 0x0000,
                },
                RequestToken(cluster_id as u32),
            );
        }
        stack.binding_table(2, RequestToken(99));
        let mut pages = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let StackEvent::BindingTable { token, page } = event {
                pages.push((token, page));
            }
        }
        assert_eq!(pages.len(), 1);
        let (token, page) = &pages[0];
        assert_eq!(*token, RequestToken(99));
        assert_eq!(page.total, 3);
        assert_eq!(page.start_index, 2);
        assert_eq!(
            page.records,
            vec![BindingRecord {
                src_endpoint: 1,
                cluster_id: cluster::COLOR_CONTROL,
                dst: BindingDst::Ieee(REMOTE),
                dst_endpoint: 11,
            }]
        );
    }

    #[test]
    fn test_remote_write_reaches_local_light() {
        let mut h = Harness::new();
        let stack = h.stack.clone();
        let on = AttributeValue::Bool(true);
        stack.remote_write(10, cluster::ON_OFF, on_off_attrs::ON_OFF, on);
        h.pump();
        assert!(h.light.is_on());
        let role = ClusterRole::Server;
        assert_eq!(
            stack.get_attribute(10, cluster::ON_OFF, role, on_off_attrs::ON_OFF),
            Some(AttributeValue::Bool(true))
        );
    }

    #[test]
    fn test_router_without_neighbour_fails_steering() {
        let (stack, _rx) = LoopbackStack::new(Role::Router, LOCAL);
        assert!(matches!(
            stack.commission(CommissioningMode::NetworkSteering),
            AppSignal::Steering {
                status: SignalStatus::Error(_),
            }
        ));
        stack.add_neighbour(NetworkDescriptor {
            short_pan_id: 0x1A62,
            extended_pan_id: REMOTE,
            channel: 15,
            permit_joining: true,
            router_capacity: true,
            end_device_capacity: true,
            stack_profile: 2,
            nwk_update_id: 0,
        });
        stack.set_primary_channel_mask(1 << 15);
        assert_eq!(
            stack.commission(CommissioningMode::NetworkSteering),
            AppSignal::Steering {
                status: SignalStatus::Ok,
            }
        );
        assert_eq!(stack.network_info().short_addr, JOINED_SHORT_ADDR);
    }

    #[test]
    fn test_lowest_channel() {
        assert_eq!(lowest_channel(0x07FF_F800), 11);
        assert_eq!(lowest_channel(1 << 20), 20);
        assert_eq!(lowest_channel(0), 11);
    }
}
