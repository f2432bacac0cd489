//! IAS zone contact switch (door/window sensor).
//!
//! Enrollment follows the auto-enroll-request flow: the CIE writes its IEEE
//! address into `IAS_CIE_ADDRESS`, the switch answers with a Zone Enroll
//! Request and waits for the CIE's response to learn its zone id.

use crate::error::{Result, ZigbeeError};
use crate::zigbee::device_types::DEV_TYPE_IAS_ZONE;
use crate::zigbee::endpoints::{EndpointCore, ZigbeeEndpoint};
use crate::zigbee::messages::Attribute;
use crate::zigbee::stack::{CommandKind, CommandTarget, IeeeAddr, format_ieee};
use crate::zigbee::zcl::{AttributeValue, ClusterList, ClusterRole, cluster, ias_zone_attrs};
use log::{info, warn};
use parking_lot::RwLock;

const ZONE_STATE_NOT_ENROLLED: u8 = 0x00;
const ZONE_STATE_ENROLLED: u8 = 0x01;
const ZONE_ID_UNASSIGNED: u8 = 0xFF;
const ENROLL_SUCCESS: u8 = 0x00;
/// Endpoint the CIE listens on when it did not tell us otherwise.
const CIE_ENDPOINT: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Enrollment {
    cie_addr: Option<IeeeAddr>,
    zone_id: Option<u8>,
}

pub struct ContactSwitch {
    core: EndpointCore,
    enrollment: RwLock<Enrollment>,
    zone_status: RwLock<u16>,
}

impl ContactSwitch {
    pub fn new(endpoint_id: u8) -> Self {
        let mut clusters = ClusterList::new()
            .with_cluster(cluster::BASIC, ClusterRole::Server)
            .with_cluster(cluster::IDENTIFY, ClusterRole::Server);
        let ias = cluster::IAS_ZONE;
        clusters
            .set_attribute(
                ias,
                ClusterRole::Server,
                ias_zone_attrs::ZONE_STATE,
                AttributeValue::Enum8(ZONE_STATE_NOT_ENROLLED),
            )
            .set_attribute(
                ias,
                ClusterRole::Server,
                ias_zone_attrs::ZONE_TYPE,
                AttributeValue::U16(ias_zone_attrs::ZONE_TYPE_CONTACT_SWITCH),
            )
            .set_attribute(
                ias,
                ClusterRole::Server,
                ias_zone_attrs::ZONE_STATUS,
                AttributeValue::Bitmap16(0),
            )
            .set_attribute(
                ias,
                ClusterRole::Server,
                ias_zone_attrs::IAS_CIE_ADDRESS,
                AttributeValue::Ieee([0; 8]),
            )
            .set_attribute(
                ias,
                ClusterRole::Server,
                ias_zone_attrs::ZONE_ID,
                AttributeValue::U8(ZONE_ID_UNASSIGNED),
            );
        Self {
            core: EndpointCore::with_clusters(endpoint_id, DEV_TYPE_IAS_ZONE, clusters),
            enrollment: RwLock::new(Enrollment::default()),
            zone_status: RwLock::new(0),
        }
    }

    pub fn is_enrolled(&self) -> bool {
        self.enrollment.read().zone_id.is_some()
    }

    pub fn zone_id(&self) -> Option<u8> {
        self.enrollment.read().zone_id
    }

    pub fn cie_address(&self) -> Option<IeeeAddr> {
        self.enrollment.read().cie_addr
    }

    pub fn is_open(&self) -> bool {
        *self.zone_status.read() & ias_zone_attrs::STATUS_ALARM1 != 0
    }

    pub fn set_open(&self) -> Result<()> {
        self.set_alarm(true)
    }

    pub fn set_closed(&self) -> Result<()> {
        self.set_alarm(false)
    }

    fn set_alarm(&self, open: bool) -> Result<()> {
        let status = {
            let mut status = self.zone_status.write();
            if open {
                *status |= ias_zone_attrs::STATUS_ALARM1;
            } else {
                *status &= !ias_zone_attrs::STATUS_ALARM1;
            }
            *status
        };
        self.core.write_attribute(
            cluster::IAS_ZONE,
            ClusterRole::Server,
            ias_zone_attrs::ZONE_STATUS,
            AttributeValue::Bitmap16(status),
        )?;
        self.report()
    }

    /// Send a Zone Status Change Notification to the CIE.
    pub fn report(&self) -> Result<()> {
        let enrollment = *self.enrollment.read();
        let (Some(cie), Some(zone_id)) = (enrollment.cie_addr, enrollment.zone_id) else {
            warn!(
                "[Zigbee] Contact switch {} not enrolled, status not sent",
                self.core.endpoint_id()
            );
            return Err(ZigbeeError::NotBound(self.core.endpoint_id()));
        };
        let zone_status = *self.zone_status.read();
        info!(
            "[Zigbee] Contact switch {} {} (zone {})",
            self.core.endpoint_id(),
            if self.is_open() { "open" } else { "closed" },
            zone_id
        );
        self.core.send_command(
            CommandTarget::Ieee {
                addr: cie,
                endpoint: CIE_ENDPOINT,
            },
            CommandKind::IasZoneStatusChange {
                zone_status,
                extended_status: 0,
                zone_id,
                delay: 0,
            },
        )
    }

    fn request_enroll(&self, cie: IeeeAddr) -> Result<()> {
        info!("[Zigbee] Enrolling with CIE {}", format_ieee(&cie));
        self.core.send_command_from_stack(
            CommandTarget::Ieee {
                addr: cie,
                endpoint: CIE_ENDPOINT,
            },
            CommandKind::IasZoneEnrollRequest {
                zone_type: ias_zone_attrs::ZONE_TYPE_CONTACT_SWITCH,
                manufacturer_code: 0,
            },
        )
    }
}

impl ZigbeeEndpoint for ContactSwitch {
    fn core(&self) -> &EndpointCore {
        &self.core
    }

    fn on_attribute_set(&self, cluster_id: u16, attribute: &Attribute) -> bool {
        if cluster_id != cluster::IAS_ZONE || attribute.id != ias_zone_attrs::IAS_CIE_ADDRESS {
            return true;
        }
        let Some(cie) = attribute.value.as_ieee() else {
            warn!(
                "[Zigbee] IAS CIE address with unexpected type {:?}",
                attribute.value
            );
            return false;
        };
        *self.enrollment.write() = Enrollment {
            cie_addr: Some(cie),
            zone_id: None,
        };
        if let Err(e) = self.request_enroll(cie) {
            warn!("[Zigbee] Zone enroll request failed: {}", e);
        }
        true
    }

    fn on_ias_zone_enroll_response(&self, response_code: u8, zone_id: u8) {
        if response_code != ENROLL_SUCCESS {
            warn!(
                "[Zigbee] Contact switch {} enrollment refused (code {})",
                self.core.endpoint_id(),
                response_code
            );
            return;
        }
        self.enrollment.write().zone_id = Some(zone_id);
        let endpoint = self.core.endpoint_id();
        info!(
            "[Zigbee] Contact switch {} enrolled as zone {}",
            endpoint, zone_id
        );
        let Ok(stack) = self.core.stack() else {
            return;
        };
        // response arrives on the stack task
        let direct = stack.direct();
        let (ias, role) = (cluster::IAS_ZONE, ClusterRole::Server);
        for (attribute_id, value) in [
            (ias_zone_attrs::ZONE_STATE, AttributeValue::Enum8(ZONE_STATE_ENROLLED)),
            (ias_zone_attrs::ZONE_ID, AttributeValue::U8(zone_id)),
        ] {
            if let Err(status) = direct.set_attribute(endpoint, ias, role, attribute_id, value) {
                warn!(
                    "[Zigbee] Failed to store IAS attribute 0x{:04x}: {}",
                    attribute_id, status
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zigbee::endpoints::DEFAULT_READ_TIMEOUT;
    use crate::zigbee::test_support::RecordingStack;

    const CIE: IeeeAddr = [0xAA, 0xBB, 0xCC, 0xDD, 0x01, 0x02, 0x03, 0x04];

    fn attached() -> (ContactSwitch, RecordingStack) {
        let stack = RecordingStack::new();
        let switch = ContactSwitch::new(5);
        switch.core().attach(stack.handle(), DEFAULT_READ_TIMEOUT);
        (switch, stack)
    }

    fn cie_write() -> Attribute {
        Attribute {
            id: ias_zone_attrs::IAS_CIE_ADDRESS,
            value: AttributeValue::Ieee(CIE),
        }
    }

    #[test]
    fn test_cie_write_sends_enroll_request() {
        let (switch, stack) = attached();
        assert!(switch.on_attribute_set(cluster::IAS_ZONE, &cie_write()));
        assert_eq!(switch.cie_address(), Some(CIE));
        assert!(!switch.is_enrolled());

        let commands = stack.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(
            commands[0].target,
            CommandTarget::Ieee {
                addr: CIE,
                endpoint: CIE_ENDPOINT,
            }
        );
        assert!(matches!(commands[0].kind, CommandKind::IasZoneEnrollRequest { .. }));
    }

    #[test]
    fn test_wrong_cie_type_rejected() {
        let (switch, stack) = attached();
        let attr = Attribute {
            id: ias_zone_attrs::IAS_CIE_ADDRESS,
            value: AttributeValue::U16(1),
        };
        assert!(!switch.on_attribute_set(cluster::IAS_ZONE, &attr));
        assert!(stack.commands().is_empty());
    }

    #[test]
    fn test_enroll_response_and_status_report() {
        let (switch, stack) = attached();
        assert!(matches!(switch.set_open(), Err(ZigbeeError::NotBound(5))));

        switch.on_attribute_set(cluster::IAS_ZONE, &cie_write());
        switch.on_ias_zone_enroll_response(0x01, 3);
        assert!(!switch.is_enrolled());
        switch.on_ias_zone_enroll_response(ENROLL_SUCCESS, 3);
        assert_eq!(switch.zone_id(), Some(3));
        assert_eq!(
            stack.attribute(
                5,
                cluster::IAS_ZONE,
                ClusterRole::Server,
                ias_zone_attrs::ZONE_STATE,
            ),
            Some(AttributeValue::Enum8(ZONE_STATE_ENROLLED))
        );

        switch.set_open().unwrap();
        assert!(switch.is_open());
        switch.set_closed().unwrap();
        assert!(!switch.is_open());

        let statuses: Vec<_> = stack
            .commands()
            .into_iter()
            .filter_map(|c| match c.kind {
                CommandKind::IasZoneStatusChange {
                    zone_status,
                    zone_id,
                    ..
                } => Some((zone_status, zone_id)),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, vec![(ias_zone_attrs::STATUS_ALARM1, 3), (0, 3)]);
    }
}
