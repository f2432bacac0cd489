//! Process-scoped Zigbee context.
//!
//! [`ZigbeeCore`] owns the registry, dispatcher, commissioning state machine,
//! binding resolver and scanner. The stack integration calls the `on_*`
//! methods from its task; applications use the rest.

use super::binding::BindingResolver;
use super::dispatcher::{AttributeUpdateKind, DispatchStatus, Dispatcher};
use super::endpoints::ZigbeeEndpoint;
use super::messages::ActionMessage;
use super::ota::{MemoryImageWriter, OtaImageWriter};
use super::registry::{EndpointRegistry, RegistryError};
use super::scan::{NetworkDescriptor, NetworkScanner, ScanStatus};
use super::signals::AppSignal;
use super::stack::{
    BindingTablePage, MatchResult, NetworkInfo, RequestToken, StackHandle, ZdoStatus, ZigbeeStack,
};
use super::zcl::{AttributeValue, cluster};
use crate::commissioning::{CommissioningState, CommissioningStateMachine, Role};
use crate::config::Config;
use crate::error::{Result, ZigbeeError};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

pub struct ZigbeeCore {
    config: Config,
    stack: StackHandle,
    registry: Arc<EndpointRegistry>,
    dispatcher: Dispatcher,
    binding: Arc<BindingResolver>,
    commissioning: CommissioningStateMachine,
    scanner: NetworkScanner,
}

impl ZigbeeCore {
    /// Register every endpoint with the stack and wire up the components.
    pub fn new(
        config: Config,
        stack: Arc<dyn ZigbeeStack>,
        registry: EndpointRegistry,
    ) -> Result<Self> {
        Self::with_ota_writer(config, stack, registry, Box::new(MemoryImageWriter::new()))
    }

    pub fn with_ota_writer(
        config: Config,
        stack: Arc<dyn ZigbeeStack>,
        registry: EndpointRegistry,
        ota_writer: Box<dyn OtaImageWriter>,
    ) -> Result<Self> {
        config.validate()?;
        let stack = StackHandle::new(stack);
        let read_timeout = Duration::from_millis(config.zigbee.read_timeout_ms);

        for endpoint in registry.iter() {
            let core = endpoint.core();
            let clusters = core
                .cluster_list()
                .ok_or(RegistryError::NotConfigured(core.endpoint_id()))?;
            stack.locked(|s| s.register_endpoint(&core.config(), &clusters))?;
            core.attach(stack.clone(), read_timeout);
        }
        stack.locked(|s| s.set_primary_channel_mask(config.zigbee.channel_mask));
        registry.log_listing();

        let registry = Arc::new(registry);
        let binding = Arc::new(BindingResolver::new(stack.clone()));
        let commissioning = CommissioningStateMachine::new(
            config.zigbee.role,
            config.zigbee.reopen_secs,
            config.retry.clone(),
            stack.clone(),
            registry.clone(),
            binding.clone(),
        );
        let dispatcher = Dispatcher::with_ota_writer(registry.clone(), stack.clone(), ota_writer);
        let scanner = NetworkScanner::new(stack.clone());

        info!(
            "[Zigbee] Core ready as {} with {} endpoint(s)",
            config.zigbee.role,
            registry.len()
        );

        Ok(Self {
            config,
            stack,
            registry,
            dispatcher,
            binding,
            commissioning,
            scanner,
        })
    }

    pub fn on_app_signal(&self, signal: &AppSignal) {
        self.commissioning.on_signal(signal);
    }

    pub fn on_action(&self, message: Option<&ActionMessage>) -> DispatchStatus {
        self.dispatcher.on_action(message)
    }

    pub fn on_attribute_update(
        &self,
        kind: AttributeUpdateKind,
        endpoint_id: u8,
        cluster_id: u16,
        attribute_id: u16,
        value: Option<&AttributeValue>,
    ) -> DispatchStatus {
        self.dispatcher
            .on_attribute_update(kind, endpoint_id, cluster_id, attribute_id, value)
    }

    pub fn on_identify_effect(
        &self,
        endpoint_id: u8,
        effect_id: u8,
        effect_variant: u8,
    ) -> DispatchStatus {
        self.dispatcher
            .on_identify_effect(endpoint_id, effect_id, effect_variant)
    }

    pub fn on_match_result(&self, token: RequestToken, result: MatchResult) {
        self.binding.on_match_result(token, result);
    }

    pub fn on_bind_result(&self, token: RequestToken, status: ZdoStatus) {
        self.binding.on_bind_result(token, status);
    }

    pub fn on_binding_table(&self, token: RequestToken, page: BindingTablePage) {
        self.binding.on_binding_table(token, page, &self.registry);
    }

    pub fn on_scan_complete(&self, success: bool, networks: Vec<NetworkDescriptor>) {
        self.scanner.on_scan_complete(success, networks);
    }

    fn endpoint(&self, endpoint_id: u8) -> Result<&Arc<dyn ZigbeeEndpoint>> {
        self.registry
            .find_by_id(endpoint_id)
            .ok_or(ZigbeeError::Registry(RegistryError::NotFound(endpoint_id)))
    }

    /// Discover and bind `short_addr` for one endpoint, outside of device announce.
    pub fn find_endpoint(&self, endpoint_id: u8, short_addr: u16) -> Result<Option<RequestToken>> {
        let endpoint = self.endpoint(endpoint_id)?;
        Ok(self
            .stack
            .locked(|_| self.binding.find_endpoint(endpoint, short_addr)))
    }

    /// Look for an OTA server and query it for a newer image.
    pub fn request_ota_update(&self, endpoint_id: u8) -> Result<RequestToken> {
        let endpoint = self.endpoint(endpoint_id)?;
        if !endpoint.core().has_ota_client() {
            warn!("[OTA] Endpoint {} has no OTA client cluster", endpoint_id);
            return Err(ZigbeeError::UnsupportedCluster(cluster::OTA_UPGRADE));
        }
        Ok(self.stack.locked(|_| self.binding.find_ota_server(endpoint)))
    }

    /// Permit joining for `duration_secs`; 0 closes the network.
    pub fn open_network(&self, duration_secs: u8) -> Result<()> {
        if duration_secs > 0 {
            info!("[Zigbee] Opening network for {} seconds", duration_secs);
        }
        self.stack.locked(|s| s.open_network(duration_secs))
    }

    pub fn close_network(&self) -> Result<()> {
        info!("[Zigbee] Closing network");
        self.open_network(0)
    }

    pub fn factory_reset(&self) {
        self.commissioning.factory_reset();
    }

    pub fn primary_channel_mask(&self) -> u32 {
        self.stack.locked(|s| s.primary_channel_mask())
    }

    pub fn set_primary_channel_mask(&self, mask: u32) {
        self.stack.locked(|s| s.set_primary_channel_mask(mask));
    }

    pub fn network_info(&self) -> NetworkInfo {
        self.stack.locked(|s| s.network_info())
    }

    /// Scan with the configured channel mask and duration.
    pub fn start_scan(&self) -> Result<()> {
        let zigbee = &self.config.zigbee;
        self.scanner
            .start_scan(zigbee.channel_mask, zigbee.scan_duration)
    }

    pub fn start_scan_with(&self, channel_mask: u32, duration: u8) -> Result<()> {
        self.scanner.start_scan(channel_mask, duration)
    }

    pub fn scan_status(&self) -> ScanStatus {
        self.scanner.scan_status()
    }

    pub fn scan_result(&self) -> Option<Vec<NetworkDescriptor>> {
        self.scanner.scan_result()
    }

    pub fn delete_scan_result(&self) {
        self.scanner.delete_scan_result();
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stack(&self) -> &StackHandle {
        &self.stack
    }

    pub fn role(&self) -> Role {
        self.commissioning.role()
    }

    pub fn state(&self) -> CommissioningState {
        self.commissioning.state()
    }

    pub fn is_started(&self) -> bool {
        self.commissioning.is_started()
    }

    pub fn is_connected(&self) -> bool {
        self.commissioning.is_connected()
    }

    pub async fn wait_started(&self, timeout: Duration) -> Result<()> {
        self.commissioning.wait_started(timeout).await
    }
}
