//! Routes stack events to the endpoint they address.
//!
//! Every entry point is total: failures are logged and mapped to a
//! [`DispatchStatus`], never propagated back into the stack.

use super::endpoints::ZigbeeEndpoint;
use super::messages::{ActionMessage, Attribute, MessageInfo};
use super::ota::{MemoryImageWriter, OtaImageWriter, OtaProgress, OtaUpgrade, approve_image};
use super::registry::EndpointRegistry;
use super::stack::StackHandle;
use super::zcl::{AttributeValue, cluster, identify_attrs};
use log::{debug, error, trace, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// Status returned to the stack for every callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    Ok,
    /// The endpoint refused the attribute change.
    Rejected,
    /// Missing payload or error status in the message.
    InvalidArg,
    Fail,
}

/// Phase of an attribute callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeUpdateKind {
    PreUpdate,
    PostUpdate,
    Read,
    Write,
}

pub struct Dispatcher {
    registry: Arc<EndpointRegistry>,
    stack: StackHandle,
    ota: Mutex<OtaUpgrade>,
}

impl Dispatcher {
    pub fn new(registry: Arc<EndpointRegistry>, stack: StackHandle) -> Self {
        Self::with_ota_writer(registry, stack, Box::new(MemoryImageWriter::new()))
    }

    pub fn with_ota_writer(
        registry: Arc<EndpointRegistry>,
        stack: StackHandle,
        writer: Box<dyn OtaImageWriter>,
    ) -> Self {
        Self {
            registry,
            stack,
            ota: Mutex::new(OtaUpgrade::new(writer)),
        }
    }

    fn endpoint(&self, endpoint_id: u8) -> Option<&Arc<dyn ZigbeeEndpoint>> {
        self.registry.find_by_id(endpoint_id)
    }

    /// Attribute pre/post-update and read/write override callback.
    pub fn on_attribute_update(
        &self,
        kind: AttributeUpdateKind,
        endpoint_id: u8,
        cluster_id: u16,
        attribute_id: u16,
        value: Option<&AttributeValue>,
    ) -> DispatchStatus {
        let Some(value) = value else {
            warn!(
                "[Dispatch] Empty attribute payload for endpoint {}, cluster 0x{:04x}",
                endpoint_id, cluster_id
            );
            return DispatchStatus::InvalidArg;
        };

        match kind {
            AttributeUpdateKind::PreUpdate => {
                let attribute = Attribute {
                    id: attribute_id,
                    value: value.clone(),
                };
                self.deliver_attribute_set(endpoint_id, cluster_id, &attribute)
            }
            AttributeUpdateKind::PostUpdate => {
                trace!(
                    "[Dispatch] Post-update endpoint {}, cluster 0x{:04x}, attribute 0x{:04x}",
                    endpoint_id, cluster_id, attribute_id
                );
                DispatchStatus::Ok
            }
            AttributeUpdateKind::Read | AttributeUpdateKind::Write => DispatchStatus::Ok,
        }
    }

    fn deliver_attribute_set(
        &self,
        endpoint_id: u8,
        cluster_id: u16,
        attribute: &Attribute,
    ) -> DispatchStatus {
        let Some(endpoint) = self.endpoint(endpoint_id) else {
            trace!("[Dispatch] No endpoint {} for attribute set", endpoint_id);
            return DispatchStatus::Ok;
        };

        if cluster_id == cluster::IDENTIFY {
            match (attribute.id, attribute.value.as_u16()) {
                (identify_attrs::IDENTIFY_TIME, Some(time)) => endpoint.on_identify(time),
                (id, _) => warn!(
                    "[Dispatch] Unsupported identify attribute 0x{:04x} on endpoint {}",
                    id, endpoint_id
                ),
            }
            return DispatchStatus::Ok;
        }

        if endpoint.on_attribute_set(cluster_id, attribute) {
            DispatchStatus::Ok
        } else {
            debug!(
                "[Dispatch] Endpoint {} rejected attribute 0x{:04x} of cluster 0x{:04x}",
                endpoint_id, attribute.id, cluster_id
            );
            DispatchStatus::Rejected
        }
    }

    /// Identify effect callback.
    pub fn on_identify_effect(
        &self,
        endpoint_id: u8,
        effect_id: u8,
        effect_variant: u8,
    ) -> DispatchStatus {
        if let Some(endpoint) = self.endpoint(endpoint_id) {
            endpoint.on_identify_effect(effect_id, effect_variant);
        }
        DispatchStatus::Ok
    }

    /// Multiplexed action callback.
    pub fn on_action(&self, message: Option<&ActionMessage>) -> DispatchStatus {
        let Some(message) = message else {
            error!("[Dispatch] Empty message");
            return DispatchStatus::InvalidArg;
        };

        if let Some(info) = message.info()
            && !info.status.is_success()
            && !Self::ignores_info_status(message)
        {
            error!(
                "[Dispatch] Received {}: error status {}",
                message.kind(),
                info.status
            );
            return DispatchStatus::InvalidArg;
        }

        match message {
            ActionMessage::SetAttributeValue { info, attribute } => {
                trace!(
                    "[Dispatch] Set attribute: endpoint {}, cluster 0x{:04x}, attribute 0x{:04x}",
                    info.dst_endpoint, info.cluster, attribute.id
                );
                self.deliver_attribute_set(info.dst_endpoint, info.cluster, attribute)
            }
            ActionMessage::ReportAttribute { info, attribute } => {
                trace!(
                    "[Dispatch] Report from 0x{:04x}/{} to endpoint {}, cluster 0x{:04x}",
                    info.src_addr, info.src_endpoint, info.dst_endpoint, info.cluster
                );
                if let Some(endpoint) = self.endpoint(info.dst_endpoint) {
                    endpoint.on_attribute_read(
                        info.cluster,
                        attribute,
                        info.src_endpoint,
                        info.src_addr,
                    );
                }
                DispatchStatus::Ok
            }
            ActionMessage::ReadAttributeResponse { info, variables } => {
                let Some(endpoint) = self.endpoint(info.dst_endpoint) else {
                    return DispatchStatus::Ok;
                };
                for variable in variables {
                    if !variable.status.is_success() {
                        debug!(
                            "[Dispatch] Read of attribute 0x{:04x} failed: {}",
                            variable.attribute.id, variable.status
                        );
                        continue;
                    }
                    self.deliver_read(endpoint, info, &variable.attribute);
                }
                DispatchStatus::Ok
            }
            ActionMessage::ConfigureReportResponse { info, variables } => {
                for variable in variables {
                    debug!(
                        "[Dispatch] Report config 0x{:04x}/0x{:04x} direction {}: {}",
                        info.cluster, variable.attribute_id, variable.direction, variable.status
                    );
                }
                DispatchStatus::Ok
            }
            ActionMessage::IasZoneStatusChange { info, change } => {
                if let Some(endpoint) = self.endpoint(info.dst_endpoint) {
                    endpoint.on_ias_zone_status_change(change, info.src_addr);
                }
                DispatchStatus::Ok
            }
            ActionMessage::IasZoneEnrollResponse {
                info,
                response_code,
                zone_id,
            } => {
                if let Some(endpoint) = self.endpoint(info.dst_endpoint) {
                    endpoint.on_ias_zone_enroll_response(*response_code, *zone_id);
                }
                DispatchStatus::Ok
            }
            ActionMessage::WindowCoveringMovement { info, command } => {
                if let Some(endpoint) = self.endpoint(info.dst_endpoint) {
                    endpoint.on_window_covering_movement(*command);
                }
                DispatchStatus::Ok
            }
            ActionMessage::OtaUpgradeValue { info, upgrade } => {
                if !info.status.is_success() {
                    return DispatchStatus::Ok;
                }
                let result = self.ota.lock().process(upgrade);
                match result {
                    Ok(progress) => {
                        if let Some(endpoint) = self.endpoint(info.dst_endpoint) {
                            endpoint.on_ota_progress(progress);
                        }
                        if let OtaProgress::Finished { .. } = progress {
                            warn!("[OTA] Prepare to restart system");
                            self.stack.direct().restart();
                        }
                        DispatchStatus::Ok
                    }
                    Err(e) => {
                        error!("[OTA] Upgrade step failed: {}", e);
                        DispatchStatus::Fail
                    }
                }
            }
            ActionMessage::OtaQueryImageResponse { info, image } => {
                if !info.status.is_success() {
                    debug!("[OTA] Image upgrade response status {}", info.status);
                    return DispatchStatus::Ok;
                }
                if approve_image(image) {
                    DispatchStatus::Ok
                } else {
                    DispatchStatus::Fail
                }
            }
            ActionMessage::DefaultResponse {
                info,
                command_id,
                status,
            } => {
                trace!(
                    "[Dispatch] Default response 0x{:04x}/{} -> {}, 0x{:04x}/0x{:02x}: {}",
                    info.src_addr,
                    info.src_endpoint,
                    info.dst_endpoint,
                    info.cluster,
                    command_id,
                    status
                );
                DispatchStatus::Ok
            }
            ActionMessage::Other { callback_id } => {
                warn!(
                    "[Dispatch] Received unhandled action (0x{:x}) callback",
                    callback_id
                );
                DispatchStatus::Ok
            }
        }
    }

    /// OTA messages carry their own status semantics.
    fn ignores_info_status(message: &ActionMessage) -> bool {
        matches!(
            message,
            ActionMessage::OtaUpgradeValue { .. } | ActionMessage::OtaQueryImageResponse { .. }
        )
    }

    fn deliver_read(
        &self,
        endpoint: &Arc<dyn ZigbeeEndpoint>,
        info: &MessageInfo,
        attribute: &Attribute,
    ) {
        match info.cluster {
            cluster::BASIC => endpoint.core().handle_basic_read(attribute),
            cluster::TIME => endpoint.core().handle_time_read(attribute),
            other => endpoint.on_attribute_read(other, attribute, info.src_endpoint, info.src_addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zigbee::device_types::DEV_TYPE_ON_OFF_LIGHT;
    use crate::zigbee::endpoints::EndpointCore;
    use crate::zigbee::messages::{IasZoneStatusChange, ReadVariable, WindowCoveringCommand};
    use crate::zigbee::ota::{OtaHeader, OtaImageInfo, OtaUpgradeMessage, OtaUpgradeStatus};
    use crate::zigbee::test_support::RecordingStack;
    use crate::zigbee::zcl::{
        ClusterList, ClusterRole, ZclStatus, basic_attrs, color_attrs, encode_char_string,
        on_off_attrs,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Set(u16, u16),
        Read(u16, u16, u8, u16),
        Identify(u16),
        Effect(u8, u8),
        IasStatus(u16),
        IasEnroll(u8, u8),
        Covering(WindowCoveringCommand),
        Ota(OtaProgress),
    }

    struct Recorder {
        core: EndpointCore,
        accept: bool,
        calls: Mutex<Vec<Call>>,
    }

    impl Recorder {
        fn new(id: u8, accept: bool) -> Arc<Self> {
            Arc::new(Self {
                core: EndpointCore::with_clusters(
                    id,
                    DEV_TYPE_ON_OFF_LIGHT,
                    ClusterList::new().with_cluster(cluster::ON_OFF, ClusterRole::Server),
                ),
                accept,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    impl ZigbeeEndpoint for Recorder {
        fn core(&self) -> &EndpointCore {
            &self.core
        }
        fn on_attribute_set(&self, cluster_id: u16, attribute: &Attribute) -> bool {
            self.calls.lock().push(Call::Set(cluster_id, attribute.id));
            self.accept
        }
        fn on_attribute_read(
            &self,
            cluster_id: u16,
            attribute: &Attribute,
            src_endpoint: u8,
            src_addr: u16,
        ) {
            self.calls
                .lock()
                .push(Call::Read(cluster_id, attribute.id, src_endpoint, src_addr));
        }
        fn on_identify(&self, time: u16) {
            self.calls.lock().push(Call::Identify(time));
        }
        fn on_identify_effect(&self, effect_id: u8, effect_variant: u8) {
            self.calls
                .lock()
                .push(Call::Effect(effect_id, effect_variant));
        }
        fn on_ias_zone_status_change(&self, change: &IasZoneStatusChange, _src_addr: u16) {
            self.calls.lock().push(Call::IasStatus(change.zone_status));
        }
        fn on_ias_zone_enroll_response(&self, response_code: u8, zone_id: u8) {
            self.calls
                .lock()
                .push(Call::IasEnroll(response_code, zone_id));
        }
        fn on_window_covering_movement(&self, command: WindowCoveringCommand) {
            self.calls.lock().push(Call::Covering(command));
        }
        fn on_ota_progress(&self, progress: OtaProgress) {
            self.calls.lock().push(Call::Ota(progress));
        }
    }

    fn dispatcher_with(recorders: &[Arc<Recorder>]) -> (Dispatcher, RecordingStack) {
        let mut registry = EndpointRegistry::new();
        for recorder in recorders {
            registry.register(recorder.clone()).unwrap();
        }
        let stack = RecordingStack::new();
        (Dispatcher::new(Arc::new(registry), stack.handle()), stack)
    }

    fn pre_update(
        dispatcher: &Dispatcher,
        endpoint_id: u8,
        value: Option<&AttributeValue>,
    ) -> DispatchStatus {
        let kind = AttributeUpdateKind::PreUpdate;
        dispatcher.on_attribute_update(kind, endpoint_id, cluster::ON_OFF, 0, value)
    }

    fn info(dst_endpoint: u8, cluster: u16) -> MessageInfo {
        MessageInfo {
            status: ZclStatus::Success,
            src_addr: 0x4A21,
            src_endpoint: 10,
            dst_endpoint,
            cluster,
        }
    }

    #[test]
    fn test_pre_update_maps_result() {
        let accepting = Recorder::new(1, true);
        let rejecting = Recorder::new(2, false);
        let (dispatcher, _) = dispatcher_with(&[accepting.clone(), rejecting.clone()]);
        let value = AttributeValue::Bool(true);

        let accepted = pre_update(&dispatcher, 1, Some(&value));
        assert_eq!(accepted, DispatchStatus::Ok);
        let rejected = pre_update(&dispatcher, 2, Some(&value));
        assert_eq!(rejected, DispatchStatus::Rejected);
        assert_eq!(accepting.calls(), vec![Call::Set(cluster::ON_OFF, 0)]);
        assert_eq!(rejecting.calls(), vec![Call::Set(cluster::ON_OFF, 0)]);
    }

    #[test]
    fn test_unknown_endpoint_is_noop_success() {
        let recorder = Recorder::new(1, false);
        let (dispatcher, _) = dispatcher_with(&[recorder.clone()]);
        let value = AttributeValue::U8(3);

        for endpoint_id in [0u8, 2, 99, 240] {
            assert_eq!(
                dispatcher.on_attribute_update(
                    AttributeUpdateKind::PreUpdate,
                    endpoint_id,
                    cluster::LEVEL_CONTROL,
                    0,
                    Some(&value),
                ),
                DispatchStatus::Ok
            );
        }
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_missing_payload_rejected_before_lookup() {
        let recorder = Recorder::new(1, true);
        let (dispatcher, _) = dispatcher_with(&[recorder.clone()]);
        let known = pre_update(&dispatcher, 1, None);
        assert_eq!(known, DispatchStatus::InvalidArg);
        let unknown = pre_update(&dispatcher, 77, None);
        assert_eq!(unknown, DispatchStatus::InvalidArg);
        assert_eq!(dispatcher.on_action(None), DispatchStatus::InvalidArg);
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_post_update_read_write_are_passthrough() {
        let recorder = Recorder::new(1, false);
        let (dispatcher, _) = dispatcher_with(&[recorder.clone()]);
        let value = AttributeValue::Bool(false);
        for kind in [
            AttributeUpdateKind::PostUpdate,
            AttributeUpdateKind::Read,
            AttributeUpdateKind::Write,
        ] {
            assert_eq!(
                dispatcher.on_attribute_update(kind, 1, cluster::ON_OFF, 0, Some(&value)),
                DispatchStatus::Ok
            );
        }
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_identify_write_intercepted() {
        let recorder = Recorder::new(1, false);
        let (dispatcher, _) = dispatcher_with(&[recorder.clone()]);
        let status = dispatcher.on_attribute_update(
            AttributeUpdateKind::PreUpdate,
            1,
            cluster::IDENTIFY,
            identify_attrs::IDENTIFY_TIME,
            Some(&AttributeValue::U16(5)),
        );
        assert_eq!(status, DispatchStatus::Ok);
        assert_eq!(recorder.calls(), vec![Call::Identify(5)]);
    }

    #[test]
    fn test_read_response_dispatched_per_attribute_in_order() {
        let recorder = Recorder::new(1, true);
        let (dispatcher, _) = dispatcher_with(&[recorder.clone()]);
        let message = ActionMessage::ReadAttributeResponse {
            info: info(1, cluster::COLOR_CONTROL),
            variables: vec![
                ReadVariable {
                    status: ZclStatus::Success,
                    attribute: Attribute {
                        id: color_attrs::CURRENT_X,
                        value: AttributeValue::U16(41000),
                    },
                },
                ReadVariable {
                    status: ZclStatus::UnsupAttrib,
                    attribute: Attribute {
                        id: color_attrs::COLOR_MODE,
                        value: AttributeValue::Enum8(1),
                    },
                },
                ReadVariable {
                    status: ZclStatus::Success,
                    attribute: Attribute {
                        id: color_attrs::CURRENT_Y,
                        value: AttributeValue::U16(21000),
                    },
                },
            ],
        };

        assert_eq!(dispatcher.on_action(Some(&message)), DispatchStatus::Ok);
        assert_eq!(
            recorder.calls(),
            vec![
                Call::Read(cluster::COLOR_CONTROL, color_attrs::CURRENT_X, 10, 0x4A21),
                Call::Read(cluster::COLOR_CONTROL, color_attrs::CURRENT_Y, 10, 0x4A21),
            ]
        );
    }

    #[test]
    fn test_basic_read_response_fills_core_slot() {
        let recorder = Recorder::new(1, true);
        let (dispatcher, _) = dispatcher_with(&[recorder.clone()]);
        let message = ActionMessage::ReadAttributeResponse {
            info: info(1, cluster::BASIC),
            variables: vec![ReadVariable {
                status: ZclStatus::Success,
                attribute: Attribute {
                    id: basic_attrs::MODEL_IDENTIFIER,
                    value: AttributeValue::CharString(encode_char_string("X1", 32).unwrap()),
                },
            }],
        };
        dispatcher.on_action(Some(&message));
        assert_eq!(recorder.core().last_read_model().as_deref(), Some("X1"));
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_error_status_rejected() {
        let recorder = Recorder::new(1, true);
        let (dispatcher, _) = dispatcher_with(&[recorder.clone()]);
        let mut header = info(1, cluster::ON_OFF);
        header.status = ZclStatus::Fail;
        let message = ActionMessage::ReportAttribute {
            info: header,
            attribute: Attribute {
                id: on_off_attrs::ON_OFF,
                value: AttributeValue::Bool(true),
            },
        };
        assert_eq!(
            dispatcher.on_action(Some(&message)),
            DispatchStatus::InvalidArg
        );
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_typed_callbacks() {
        let recorder = Recorder::new(1, true);
        let (dispatcher, _) = dispatcher_with(&[recorder.clone()]);

        dispatcher.on_action(Some(&ActionMessage::IasZoneStatusChange {
            info: info(1, cluster::IAS_ZONE),
            change: IasZoneStatusChange {
                zone_status: 0x0001,
                extended_status: 0,
                zone_id: 3,
                delay: 0,
            },
        }));
        dispatcher.on_action(Some(&ActionMessage::IasZoneEnrollResponse {
            info: info(1, cluster::IAS_ZONE),
            response_code: 0,
            zone_id: 3,
        }));
        dispatcher.on_action(Some(&ActionMessage::WindowCoveringMovement {
            info: info(1, cluster::WINDOW_COVERING),
            command: WindowCoveringCommand::GoToLiftPercentage(40),
        }));
        dispatcher.on_identify_effect(1, 0x01, 0x00);

        assert_eq!(
            recorder.calls(),
            vec![
                Call::IasStatus(0x0001),
                Call::IasEnroll(0, 3),
                Call::Covering(WindowCoveringCommand::GoToLiftPercentage(40)),
                Call::Effect(0x01, 0x00),
            ]
        );
    }

    #[test]
    fn test_ota_finish_restarts() {
        let recorder = Recorder::new(1, true);
        let (dispatcher, stack) = dispatcher_with(&[recorder.clone()]);
        let upgrade = |status| ActionMessage::OtaUpgradeValue {
            info: info(1, cluster::OTA_UPGRADE),
            upgrade: OtaUpgradeMessage {
                status,
                header: OtaHeader::default(),
                payload: Vec::new(),
            },
        };

        let started = dispatcher.on_action(Some(&upgrade(OtaUpgradeStatus::Start)));
        assert_eq!(started, DispatchStatus::Ok);
        let finished = dispatcher.on_action(Some(&upgrade(OtaUpgradeStatus::Finish)));
        assert_eq!(finished, DispatchStatus::Ok);
        assert_eq!(stack.restarts(), 1);
        assert_eq!(
            recorder.calls(),
            vec![
                Call::Ota(OtaProgress::Started),
                Call::Ota(OtaProgress::Finished { file_version: 0 }),
            ]
        );
    }

    #[test]
    fn test_ota_query_image_approval() {
        let (dispatcher, _) = dispatcher_with(&[]);
        let mut image = OtaImageInfo {
            server_addr: 0,
            server_endpoint: 1,
            manufacturer_code: 0x1001,
            image_type: 1,
            file_version: 0x0200,
            image_size: 4096,
        };
        let message = |image| ActionMessage::OtaQueryImageResponse {
            info: info(1, cluster::OTA_UPGRADE),
            image,
        };
        let approved = dispatcher.on_action(Some(&message(image)));
        assert_eq!(approved, DispatchStatus::Ok);
        image.image_size = 0;
        let refused = dispatcher.on_action(Some(&message(image)));
        assert_eq!(refused, DispatchStatus::Fail);
    }

    #[test]
    fn test_unhandled_action_is_ok() {
        let (dispatcher, _) = dispatcher_with(&[]);
        let message = ActionMessage::Other {
            callback_id: 0x1005,
        };
        assert_eq!(dispatcher.on_action(Some(&message)), DispatchStatus::Ok);
    }
}
