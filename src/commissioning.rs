//! Network commissioning state machine.
//!
//! Consumes the stack's application signals and drives formation, steering
//! and rejoin depending on the device role. Retries of failed formation or
//! steering are paced by a [`RetryPolicy`].

use crate::zigbee::binding::BindingResolver;
use crate::zigbee::registry::EndpointRegistry;
use crate::zigbee::retry::RetryPolicy;
use crate::zigbee::signals::{AppSignal, LeaveType, SignalStatus};
use crate::zigbee::stack::{CommissioningMode, IeeeAddr, StackHandle, format_ieee};
use crate::error::{Result, ZigbeeError};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use strum::{Display, EnumString};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommissioningState {
    Uninitialized,
    FactoryNew,
    Forming,
    Steering,
    Operational,
}

/// Network role, fixed for the lifetime of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    Coordinator,
    Router,
    EndDevice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Status {
    state: CommissioningState,
    started: bool,
    connected: bool,
}

pub struct CommissioningStateMachine {
    role: Role,
    reopen_secs: u8,
    retry: RetryPolicy,
    stack: StackHandle,
    registry: Arc<EndpointRegistry>,
    binding: Arc<BindingResolver>,
    status: watch::Sender<Status>,
    formation_failures: AtomicU32,
    steering_failures: AtomicU32,
}

impl CommissioningStateMachine {
    pub fn new(
        role: Role,
        reopen_secs: u8,
        retry: RetryPolicy,
        stack: StackHandle,
        registry: Arc<EndpointRegistry>,
        binding: Arc<BindingResolver>,
    ) -> Self {
        let (status, _) = watch::channel(Status {
            state: CommissioningState::Uninitialized,
            started: false,
            connected: false,
        });
        Self {
            role,
            reopen_secs,
            retry,
            stack,
            registry,
            binding,
            status,
            formation_failures: AtomicU32::new(0),
            steering_failures: AtomicU32::new(0),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> CommissioningState {
        self.status.borrow().state
    }

    pub fn is_started(&self) -> bool {
        self.status.borrow().started
    }

    pub fn is_connected(&self) -> bool {
        self.status.borrow().connected
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Wait until the network is up, or fail with `Timeout`.
    pub async fn wait_started(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.status.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(|s| s.started)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(ZigbeeError::ResponseDropped),
            Err(_) => Err(ZigbeeError::Timeout(timeout)),
        }
    }

    fn set_state(&self, state: CommissioningState) {
        self.status.send_modify(|s| {
            if s.state != state {
                debug!("[Commission] {} -> {}", s.state, state);
                s.state = state;
            }
        });
    }

    fn mark_operational(&self, connected: bool) {
        self.status.send_modify(|s| {
            s.state = CommissioningState::Operational;
            s.started = true;
            s.connected |= connected;
        });
    }

    fn start(&self, mode: CommissioningMode) {
        if let Err(e) = self.stack.direct().start_commissioning(mode) {
            error!("[Commission] Failed to start {:?}: {}", mode, e);
        }
    }

    /// Schedule another attempt of `mode` after the policy delay.
    fn schedule_retry(&self, mode: CommissioningMode, failures: &AtomicU32) {
        let attempt = failures.fetch_add(1, Ordering::SeqCst) + 1;
        match self.retry.delay_for(attempt) {
            Some(delay) => {
                info!(
                    "[Commission] Retrying {:?} in {} ms (attempt {})",
                    mode,
                    delay.as_millis(),
                    attempt
                );
                self.stack.direct().schedule_commissioning(mode, delay);
            }
            None => error!(
                "[Commission] Giving up on {:?} after {} failed attempts",
                mode,
                attempt - 1
            ),
        }
    }

    fn persist_channel_mask(&self) {
        let stack = self.stack.direct();
        let channel = stack.network_info().channel;
        if (11..=26).contains(&channel) {
            stack.set_primary_channel_mask(1u32 << channel);
            debug!("[Commission] Saved channel mask 0x{:08x}", 1u32 << channel);
        }
    }

    fn log_network(&self, prefix: &str) {
        let info = self.stack.direct().network_info();
        info!(
            "[Commission] {} (Extended PAN ID: {}, PAN ID: 0x{:04x}, Channel: {}, Addr: 0x{:04x})",
            prefix,
            format_ieee(&info.extended_pan_id),
            info.pan_id,
            info.channel,
            info.short_addr
        );
    }

    /// Handle one application signal from the stack task.
    pub fn on_signal(&self, signal: &AppSignal) {
        match signal {
            AppSignal::SkipStartup => {
                info!("[Commission] Initializing Zigbee stack");
                self.start(CommissioningMode::Initialization);
            }
            AppSignal::DeviceFirstStart { status } | AppSignal::DeviceReboot { status } => {
                self.on_device_start(*status);
            }
            AppSignal::Formation { status } => self.on_formation(*status),
            AppSignal::Steering { status } => self.on_steering(*status),
            AppSignal::DeviceAnnounce {
                short_addr,
                ieee_addr,
            } => {
                if self.role == Role::Coordinator {
                    info!(
                        "[Commission] New device commissioned or rejoined (short: 0x{:04x})",
                        short_addr
                    );
                    self.auto_bind(*short_addr, ieee_addr);
                }
            }
            AppSignal::DeviceUpdate {
                short_addr,
                ieee_addr,
            } => {
                if self.role == Role::Router {
                    info!(
                        "[Commission] New device joined through router (short: 0x{:04x})",
                        short_addr
                    );
                    self.auto_bind(*short_addr, ieee_addr);
                }
            }
            AppSignal::PermitJoinStatus { duration } => {
                if *duration > 0 {
                    info!(
                        "[Commission] Network({}) is open for {} seconds",
                        self.role, duration
                    );
                } else {
                    info!(
                        "[Commission] Network({}) closed, devices joining not allowed",
                        self.role
                    );
                }
            }
            AppSignal::Leave { leave_type } => self.on_leave(*leave_type),
            AppSignal::Other { signal_id, status } => {
                debug!(
                    "[Commission] Ignoring signal 0x{:x} with status {:?}",
                    signal_id, status
                );
            }
        }
    }

    fn on_device_start(&self, status: SignalStatus) {
        if let SignalStatus::Error(code) = status {
            error!(
                "[Commission] Failed to initialize Zigbee stack (status: {})",
                code
            );
            return;
        }

        let factory_new = self.stack.direct().is_factory_new();
        info!(
            "[Commission] Device started up in {}factory-reset mode",
            if factory_new { "" } else { "non " }
        );

        if factory_new {
            self.set_state(CommissioningState::FactoryNew);
            match self.role {
                Role::Coordinator => {
                    info!("[Commission] Start network formation");
                    self.set_state(CommissioningState::Forming);
                    self.start(CommissioningMode::NetworkFormation);
                }
                Role::Router | Role::EndDevice => {
                    info!("[Commission] Start network steering");
                    self.set_state(CommissioningState::Steering);
                    self.start(CommissioningMode::NetworkSteering);
                    // joiners count as started once steering runs
                    self.status.send_modify(|s| s.started = true);
                }
            }
            return;
        }

        info!("[Commission] Device rebooted");
        self.mark_operational(true);
        self.binding.search_bindings();
        match self.role {
            Role::Coordinator if self.reopen_secs > 0 => {
                info!(
                    "[Commission] Opening network for {} seconds",
                    self.reopen_secs
                );
                if let Err(e) = self.stack.direct().open_network(self.reopen_secs) {
                    warn!("[Commission] Failed to reopen network: {}", e);
                }
            }
            Role::Coordinator => {}
            Role::Router | Role::EndDevice => self.persist_channel_mask(),
        }
    }

    fn on_formation(&self, status: SignalStatus) {
        if self.role != Role::Coordinator {
            return;
        }
        match status {
            SignalStatus::Ok => {
                self.formation_failures.store(0, Ordering::SeqCst);
                self.log_network("Formed network successfully");
                self.status.send_modify(|s| s.connected = true);
                self.set_state(CommissioningState::Steering);
                self.start(CommissioningMode::NetworkSteering);
            }
            SignalStatus::Error(code) => {
                info!("[Commission] Restart network formation (status: {})", code);
                self.set_state(CommissioningState::Forming);
                self.schedule_retry(
                    CommissioningMode::NetworkFormation,
                    &self.formation_failures,
                );
            }
        }
    }

    fn on_steering(&self, status: SignalStatus) {
        match (self.role, status) {
            (Role::Coordinator, SignalStatus::Ok) => {
                info!("[Commission] Network steering started");
                self.mark_operational(false);
            }
            (Role::Coordinator, SignalStatus::Error(code)) => {
                warn!("[Commission] Network steering failed (status: {})", code);
            }
            (_, SignalStatus::Ok) => {
                self.steering_failures.store(0, Ordering::SeqCst);
                self.log_network("Joined network successfully");
                self.mark_operational(true);
                self.persist_channel_mask();
            }
            (_, SignalStatus::Error(code)) => {
                info!(
                    "[Commission] Network steering was not successful (status: {})",
                    code
                );
                self.set_state(CommissioningState::Steering);
                self.schedule_retry(CommissioningMode::NetworkSteering, &self.steering_failures);
            }
        }
    }

    fn on_leave(&self, leave_type: LeaveType) {
        if self.role == Role::Coordinator {
            return;
        }
        self.status.send_modify(|s| {
            s.connected = false;
            s.started = false;
        });
        match leave_type {
            LeaveType::Reset => {
                info!("[Commission] Left the network, factory resetting");
                self.set_state(CommissioningState::Uninitialized);
                self.stack.direct().factory_reset(true);
            }
            LeaveType::Rejoin => {
                info!("[Commission] Left the network for rejoin, restarting");
                self.stack.direct().restart();
            }
        }
    }

    /// Offer the announced device to every endpoint that can still bind.
    fn auto_bind(&self, short_addr: u16, ieee_addr: &IeeeAddr) {
        for endpoint in self.registry.iter() {
            let core = endpoint.core();
            if core.uses_manual_binding() {
                continue;
            }
            if core.is_bound() && !core.allows_multiple_binding() {
                continue;
            }
            if core.is_bound_to(short_addr, ieee_addr) {
                debug!(
                    "[Commission] Endpoint {} already bound to {}",
                    core.endpoint_id(),
                    format_ieee(ieee_addr)
                );
                continue;
            }
            self.binding.find_endpoint(endpoint, short_addr);
        }
    }

    /// Wipe network state and restart from factory-new.
    pub fn factory_reset(&self) {
        warn!("[Commission] Factory resetting Zigbee stack, device will reboot");
        self.status.send_modify(|s| {
            s.state = CommissioningState::Uninitialized;
            s.started = false;
            s.connected = false;
        });
        self.stack.locked(|stack| stack.factory_reset(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zigbee::binding::BindProfile;
    use crate::zigbee::device_types::{DEV_TYPE_ON_OFF_LIGHT, DEV_TYPE_ON_OFF_SWITCH};
    use crate::zigbee::endpoints::{EndpointCore, PeerRef, ZigbeeEndpoint};
    use crate::zigbee::stack::{BindingDst, BindingRecord, BindingTablePage, ZdoStatus};
    use crate::zigbee::test_support::RecordingStack;
    use crate::zigbee::zcl::{ClusterList, ClusterRole, cluster};
    use tokio_test::{assert_err, assert_ok};

    struct Switch {
        core: EndpointCore,
    }

    impl ZigbeeEndpoint for Switch {
        fn core(&self) -> &EndpointCore {
            &self.core
        }
        fn bind_profile(&self) -> Option<BindProfile> {
            Some(BindProfile::client_of(&[cluster::ON_OFF]))
        }
    }

    struct Light {
        core: EndpointCore,
    }

    impl ZigbeeEndpoint for Light {
        fn core(&self) -> &EndpointCore {
            &self.core
        }
    }

    fn switch(id: u8) -> Arc<Switch> {
        Arc::new(Switch {
            core: EndpointCore::with_clusters(
                id,
                DEV_TYPE_ON_OFF_SWITCH,
                ClusterList::new().with_cluster(cluster::ON_OFF, ClusterRole::Client),
            ),
        })
    }

    fn machine(
        role: Role,
        stack: &RecordingStack,
        registry: EndpointRegistry,
    ) -> CommissioningStateMachine {
        machine_with(role, 0, RetryPolicy::default(), stack, registry)
    }

    fn machine_with(
        role: Role,
        reopen_secs: u8,
        retry: RetryPolicy,
        stack: &RecordingStack,
        registry: EndpointRegistry,
    ) -> CommissioningStateMachine {
        let handle = stack.handle();
        let binding = Arc::new(BindingResolver::new(handle.clone()));
        CommissioningStateMachine::new(
            role,
            reopen_secs,
            retry,
            handle,
            Arc::new(registry),
            binding,
        )
    }

    #[test]
    fn test_coordinator_factory_new_starts_formation_once() {
        let stack = RecordingStack::new();
        stack.set_factory_new(true);
        let sm = machine(Role::Coordinator, &stack, EndpointRegistry::new());
        assert_eq!(sm.state(), CommissioningState::Uninitialized);

        sm.on_signal(&AppSignal::SkipStartup);
        sm.on_signal(&AppSignal::DeviceFirstStart {
            status: SignalStatus::Ok,
        });

        assert_eq!(
            stack.started(),
            vec![
                CommissioningMode::Initialization,
                CommissioningMode::NetworkFormation
            ]
        );
        assert_eq!(
            stack
                .started()
                .iter()
                .filter(|m| **m == CommissioningMode::NetworkFormation)
                .count(),
            1
        );
        assert_eq!(sm.state(), CommissioningState::Forming);
        assert!(!sm.is_started());
    }

    #[test]
    fn test_router_factory_new_starts_steering() {
        let stack = RecordingStack::new();
        stack.set_factory_new(true);
        let sm = machine(Role::Router, &stack, EndpointRegistry::new());
        sm.on_signal(&AppSignal::DeviceFirstStart {
            status: SignalStatus::Ok,
        });
        assert_eq!(stack.started(), vec![CommissioningMode::NetworkSteering]);
        assert_eq!(sm.state(), CommissioningState::Steering);
        assert!(sm.is_started());
        assert!(!sm.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_joiner_wait_started_returns_while_steering() {
        let stack = RecordingStack::new();
        stack.set_factory_new(true);
        let sm = machine(Role::EndDevice, &stack, EndpointRegistry::new());
        sm.on_signal(&AppSignal::DeviceFirstStart {
            status: SignalStatus::Ok,
        });
        sm.on_signal(&AppSignal::Steering {
            status: SignalStatus::Error(-1),
        });
        assert_ok!(sm.wait_started(Duration::from_secs(1)).await);
        assert_eq!(sm.state(), CommissioningState::Steering);
    }

    #[test]
    fn test_factory_new_coordinator_is_connected_after_formation() {
        let stack = RecordingStack::new();
        stack.set_factory_new(true);
        let sm = machine(Role::Coordinator, &stack, EndpointRegistry::new());

        sm.on_signal(&AppSignal::SkipStartup);
        sm.on_signal(&AppSignal::DeviceFirstStart {
            status: SignalStatus::Ok,
        });
        assert!(!sm.is_connected());
        sm.on_signal(&AppSignal::Formation {
            status: SignalStatus::Ok,
        });
        assert!(sm.is_connected());
        assert!(!sm.is_started());
        sm.on_signal(&AppSignal::Steering {
            status: SignalStatus::Ok,
        });

        assert_eq!(sm.state(), CommissioningState::Operational);
        assert!(sm.is_started());
        assert!(sm.is_connected());
    }

    #[test]
    fn test_router_steering_error_retries_every_time_without_backoff() {
        let stack = RecordingStack::new();
        stack.set_factory_new(true);
        let sm = machine(Role::Router, &stack, EndpointRegistry::new());
        sm.on_signal(&AppSignal::DeviceFirstStart {
            status: SignalStatus::Ok,
        });

        sm.on_signal(&AppSignal::Steering {
            status: SignalStatus::Error(-1),
        });
        assert_eq!(
            stack.scheduled(),
            vec![(CommissioningMode::NetworkSteering, Duration::from_millis(1000))]
        );

        for _ in 0..24 {
            sm.on_signal(&AppSignal::Steering {
                status: SignalStatus::Error(-1),
            });
        }
        let scheduled = stack.scheduled();
        assert_eq!(scheduled.len(), 25);
        assert!(scheduled.iter().all(|(mode, delay)| {
            *mode == CommissioningMode::NetworkSteering && *delay == Duration::from_millis(1000)
        }));
        assert_eq!(sm.state(), CommissioningState::Steering);
    }

    #[test]
    fn test_retry_policy_cap_and_backoff() {
        let stack = RecordingStack::new();
        let policy = RetryPolicy::fixed(Duration::from_millis(500))
            .with_backoff(2.0, Duration::from_millis(1500))
            .with_max_attempts(3);
        let registry = EndpointRegistry::new();
        let sm = machine_with(Role::Coordinator, 0, policy, &stack, registry);
        for _ in 0..5 {
            sm.on_signal(&AppSignal::Formation {
                status: SignalStatus::Error(-3),
            });
        }
        let delays: Vec<_> = stack.scheduled().into_iter().map(|(_, d)| d).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(1500)
            ]
        );
        assert_eq!(sm.state(), CommissioningState::Forming);
    }

    #[test]
    fn test_formation_then_steering_marks_coordinator_operational() {
        let stack = RecordingStack::new();
        let sm = machine(Role::Coordinator, &stack, EndpointRegistry::new());
        sm.on_signal(&AppSignal::Formation {
            status: SignalStatus::Ok,
        });
        assert_eq!(sm.state(), CommissioningState::Steering);
        assert_eq!(stack.started(), vec![CommissioningMode::NetworkSteering]);

        sm.on_signal(&AppSignal::Steering {
            status: SignalStatus::Ok,
        });
        assert_eq!(sm.state(), CommissioningState::Operational);
        assert!(sm.is_started());
        assert!(stack.channel_masks().is_empty());
    }

    #[test]
    fn test_router_steering_ok_persists_channel() {
        let stack = RecordingStack::new();
        let sm = machine(Role::Router, &stack, EndpointRegistry::new());
        sm.on_signal(&AppSignal::Steering {
            status: SignalStatus::Ok,
        });
        assert_eq!(sm.state(), CommissioningState::Operational);
        assert!(sm.is_connected());
        assert_eq!(stack.channel_masks(), vec![1 << 15]);
    }

    #[test]
    fn test_reboot_reopens_network_for_coordinator() {
        let stack = RecordingStack::new();
        let registry = EndpointRegistry::new();
        let policy = RetryPolicy::default();
        let sm = machine_with(Role::Coordinator, 180, policy, &stack, registry);
        sm.on_signal(&AppSignal::DeviceReboot {
            status: SignalStatus::Ok,
        });
        assert_eq!(sm.state(), CommissioningState::Operational);
        assert_eq!(stack.opened(), vec![180]);
        assert!(stack.started().is_empty());
    }

    #[test]
    fn test_reboot_recalls_bound_peers_from_binding_table() {
        let stack = RecordingStack::new();
        stack.add_device(0x4A21, [7; 8]);
        let on_off = switch(1);
        let mut registry = EndpointRegistry::new();
        registry.register(on_off.clone()).unwrap();
        let registry = Arc::new(registry);
        let handle = stack.handle();
        let binding = Arc::new(BindingResolver::new(handle.clone()));
        let sm = CommissioningStateMachine::new(
            Role::Router,
            0,
            RetryPolicy::default(),
            handle,
            registry.clone(),
            binding.clone(),
        );

        sm.on_signal(&AppSignal::DeviceReboot {
            status: SignalStatus::Ok,
        });
        assert!(!on_off.core().is_bound());
        let requests = stack.binding_table_requests();
        assert_eq!(requests.len(), 1);
        let (start_index, token) = requests[0];
        assert_eq!(start_index, 0);

        binding.on_binding_table(
            token,
            BindingTablePage {
                status: ZdoStatus::Success,
                total: 1,
                start_index: 0,
                records: vec![BindingRecord {
                    src_endpoint: 1,
                    cluster_id: cluster::ON_OFF,
                    dst: BindingDst::Ieee([7; 8]),
                    dst_endpoint: 11,
                }],
            },
            &registry,
        );
        assert!(on_off.core().is_bound());
        assert_eq!(
            on_off.core().bound_peers(),
            vec![PeerRef {
                short_addr: 0x4A21,
                ieee_addr: [7; 8],
                endpoint: 11,
            }]
        );
    }

    #[test]
    fn test_start_error_stays_put() {
        let stack = RecordingStack::new();
        stack.set_factory_new(true);
        let sm = machine(Role::Router, &stack, EndpointRegistry::new());
        sm.on_signal(&AppSignal::DeviceFirstStart {
            status: SignalStatus::Error(-1),
        });
        assert_eq!(sm.state(), CommissioningState::Uninitialized);
        assert!(stack.started().is_empty());
        assert!(stack.scheduled().is_empty());
    }

    #[test]
    fn test_device_announce_triggers_every_eligible_endpoint() {
        let stack = RecordingStack::new();
        let first = switch(1);
        let second = switch(2);
        let manual = switch(3);
        manual.core().set_manual_binding(true);
        let bound = switch(4);
        bound.core().add_bound_peer(PeerRef {
            short_addr: 0x1111,
            ieee_addr: [1; 8],
            endpoint: 1,
        });
        let light = Arc::new(Light {
            core: EndpointCore::with_clusters(
                5,
                DEV_TYPE_ON_OFF_LIGHT,
                ClusterList::new().with_cluster(cluster::ON_OFF, ClusterRole::Server),
            ),
        });

        let mut registry = EndpointRegistry::new();
        for endpoint in [first, second, manual, bound] {
            registry.register(endpoint).unwrap();
        }
        registry.register(light).unwrap();
        let sm = machine(Role::Coordinator, &stack, registry);

        sm.on_signal(&AppSignal::DeviceAnnounce {
            short_addr: 0x4A21,
            ieee_addr: [7; 8],
        });
        let requests = stack.match_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|(r, _)| r.addr_of_interest == 0x4A21));
    }

    #[test]
    fn test_router_ignores_device_announce_but_handles_update() {
        let stack = RecordingStack::new();
        let mut registry = EndpointRegistry::new();
        registry.register(switch(1)).unwrap();
        let sm = machine(Role::Router, &stack, registry);
        sm.on_signal(&AppSignal::DeviceAnnounce {
            short_addr: 0x4A21,
            ieee_addr: [7; 8],
        });
        assert!(stack.match_requests().is_empty());
        sm.on_signal(&AppSignal::DeviceUpdate {
            short_addr: 0x4A21,
            ieee_addr: [7; 8],
        });
        assert_eq!(stack.match_requests().len(), 1);
    }

    #[test]
    fn test_leave_resets_or_restarts() {
        let stack = RecordingStack::new();
        let sm = machine(Role::EndDevice, &stack, EndpointRegistry::new());
        sm.on_signal(&AppSignal::Steering {
            status: SignalStatus::Ok,
        });
        sm.on_signal(&AppSignal::Leave {
            leave_type: LeaveType::Rejoin,
        });
        assert_eq!(stack.restarts(), 1);
        assert!(!sm.is_connected());
        sm.on_signal(&AppSignal::Leave {
            leave_type: LeaveType::Reset,
        });
        assert_eq!(stack.factory_resets(), vec![true]);
        assert_eq!(sm.state(), CommissioningState::Uninitialized);
    }

    #[test]
    fn test_other_signals_ignored() {
        let stack = RecordingStack::new();
        let sm = machine(Role::Coordinator, &stack, EndpointRegistry::new());
        sm.on_signal(&AppSignal::Other {
            signal_id: 0x36,
            status: SignalStatus::Ok,
        });
        sm.on_signal(&AppSignal::PermitJoinStatus { duration: 0 });
        assert_eq!(sm.state(), CommissioningState::Uninitialized);
        assert!(stack.started().is_empty());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("coordinator".parse::<Role>().ok(), Some(Role::Coordinator));
        assert_eq!("End_Device".parse::<Role>().ok(), Some(Role::EndDevice));
        assert_eq!(Role::Router.to_string(), "router");
        assert_eq!(CommissioningState::FactoryNew.to_string(), "factory_new");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_started() {
        let stack = RecordingStack::new();
        let sm = machine(Role::Router, &stack, EndpointRegistry::new());
        assert_err!(sm.wait_started(Duration::from_secs(2)).await);

        sm.on_signal(&AppSignal::Steering {
            status: SignalStatus::Ok,
        });
        assert_ok!(sm.wait_started(Duration::from_secs(2)).await);
    }
}
