//! The endpoint trait dispatched to by the core.

use super::endpoint_core::EndpointCore;
use crate::zigbee::binding::BindProfile;
use crate::zigbee::messages::{Attribute, IasZoneStatusChange, WindowCoveringCommand};
use crate::zigbee::ota::OtaProgress;
use log::debug;

/// One logical device on the network.
///
/// Every handler has a logged no-op default; device types override the ones
/// for the clusters they serve. Handlers run on the stack task and must not
/// take the stack lock.
///
/// # Example
/// ```ignore
/// struct Plug {
///     core: EndpointCore,
///     on: AtomicBool,
/// }
///
/// impl ZigbeeEndpoint for Plug {
///     fn core(&self) -> &EndpointCore {
///         &self.core
///     }
///
///     fn on_attribute_set(&self, cluster_id: u16, attribute: &Attribute) -> bool {
///         if cluster_id == cluster::ON_OFF {
///             self.on.store(attribute.value.as_bool().unwrap_or(false), Ordering::SeqCst);
///         }
///         true
///     }
/// }
/// ```
pub trait ZigbeeEndpoint: Send + Sync + 'static {
    fn core(&self) -> &EndpointCore;

    fn endpoint_id(&self) -> u8 {
        self.core().endpoint_id()
    }

    /// A local attribute is about to change. Returning `false` rejects it.
    fn on_attribute_set(&self, cluster_id: u16, attribute: &Attribute) -> bool {
        debug!(
            "[Zigbee] Endpoint {} has no handler for attribute 0x{:04x} of cluster 0x{:04x}",
            self.endpoint_id(),
            attribute.id,
            cluster_id
        );
        true
    }

    /// A remote attribute arrived in a report or read response.
    fn on_attribute_read(
        &self,
        cluster_id: u16,
        attribute: &Attribute,
        src_endpoint: u8,
        src_addr: u16,
    ) {
        debug!(
            "[Zigbee] Endpoint {} ignoring attribute 0x{:04x} of cluster 0x{:04x} from 0x{:04x}/{}",
            self.endpoint_id(),
            attribute.id,
            cluster_id,
            src_addr,
            src_endpoint
        );
    }

    /// Identify time was written; 0 stops identifying.
    fn on_identify(&self, time: u16) {
        self.core().identify(time);
    }

    fn on_identify_effect(&self, effect_id: u8, effect_variant: u8) {
        debug!(
            "[Zigbee] Endpoint {} identify effect 0x{:02x} variant 0x{:02x}",
            self.endpoint_id(),
            effect_id,
            effect_variant
        );
    }

    fn on_ias_zone_status_change(&self, change: &IasZoneStatusChange, src_addr: u16) {
        debug!(
            "[Zigbee] Endpoint {} ignoring IAS zone status 0x{:04x} from 0x{:04x}",
            self.endpoint_id(),
            change.zone_status,
            src_addr
        );
    }

    fn on_ias_zone_enroll_response(&self, response_code: u8, zone_id: u8) {
        debug!(
            "[Zigbee] Endpoint {} ignoring IAS enroll response {} (zone {})",
            self.endpoint_id(),
            response_code,
            zone_id
        );
    }

    fn on_window_covering_movement(&self, command: WindowCoveringCommand) {
        debug!(
            "[Zigbee] Endpoint {} ignoring window covering command {:?}",
            self.endpoint_id(),
            command
        );
    }

    fn on_ota_progress(&self, progress: OtaProgress) {
        debug!(
            "[OTA] Endpoint {} progress {:?}",
            self.endpoint_id(),
            progress
        );
    }

    /// Clusters this endpoint discovers and binds to on device announce.
    /// `None` means the endpoint never auto-binds.
    fn bind_profile(&self) -> Option<BindProfile> {
        None
    }
}
