//! State shared by every endpoint type.
//!
//! Concrete endpoints embed an [`EndpointCore`] and expose it through
//! [`ZigbeeEndpoint::core`](super::ZigbeeEndpoint::core). The core owns the
//! cluster list until the stack starts, the bound-peer list, and the slots
//! used by synchronous Basic/Time cluster reads.

use super::read_slot::ReadSlot;
use crate::error::{Result, ZigbeeError};
use crate::zigbee::device_types::device_type_name;
use crate::zigbee::messages::Attribute;
use crate::zigbee::ota::DEFAULT_QUERY_INTERVAL_MIN;
use crate::zigbee::registry::RegistryError;
use crate::zigbee::stack::{
    CommandKind, CommandTarget, IeeeAddr, ReadAttributesRequest, StackHandle, ZclCommand,
    format_ieee,
};
use crate::zigbee::zcl::{
    AttributeValue, ClusterList, ClusterRole, EndpointConfig, MAX_NAME_LENGTH,
    PROFILE_HOME_AUTOMATION, basic_attrs, cluster, decode_char_string, encode_char_string,
    ota_attrs, power_config_attrs, time_attrs,
};
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

/// Default timeout for synchronous remote reads.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Seconds between the Unix epoch and the ZCL epoch (2000-01-01T00:00:00Z).
const ZCL_EPOCH_OFFSET: i64 = 946_684_800;

/// Remote endpoint this endpoint has bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRef {
    pub short_addr: u16,
    pub ieee_addr: IeeeAddr,
    pub endpoint: u8,
}

impl PeerRef {
    /// Address a command or read to this peer by short address.
    pub fn target(&self) -> CommandTarget {
        CommandTarget::Short {
            addr: self.short_addr,
            endpoint: self.endpoint,
        }
    }
}

/// Basic cluster power source values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PowerSource {
    Unknown = 0x00,
    Mains = 0x01,
    Battery = 0x03,
    Dc = 0x04,
}

pub type IdentifyCallback = Arc<dyn Fn(u16) + Send + Sync>;

pub struct EndpointCore {
    endpoint_id: u8,
    device_type: u16,
    clusters: RwLock<Option<ClusterList>>,
    stack: RwLock<Option<StackHandle>>,
    read_timeout: RwLock<Duration>,

    bound_peers: RwLock<Vec<PeerRef>>,
    is_bound: AtomicBool,
    allow_multiple_binding: AtomicBool,
    manual_binding: AtomicBool,

    identify_callback: RwLock<Option<IdentifyCallback>>,
    time_status: AtomicU8,

    manufacturer: ReadSlot<String>,
    model: ReadSlot<String>,
    time: ReadSlot<u32>,
    timezone: ReadSlot<i32>,
}

impl EndpointCore {
    /// Create an unconfigured core. Endpoint id 0 is the "not configured" sentinel.
    pub fn new(endpoint_id: u8, device_type: u16) -> Self {
        Self {
            endpoint_id,
            device_type,
            clusters: RwLock::new(None),
            stack: RwLock::new(None),
            read_timeout: RwLock::new(DEFAULT_READ_TIMEOUT),
            bound_peers: RwLock::new(Vec::new()),
            is_bound: AtomicBool::new(false),
            allow_multiple_binding: AtomicBool::new(false),
            manual_binding: AtomicBool::new(false),
            identify_callback: RwLock::new(None),
            time_status: AtomicU8::new(0),
            manufacturer: ReadSlot::new(),
            model: ReadSlot::new(),
            time: ReadSlot::new(),
            timezone: ReadSlot::new(),
        }
    }

    /// Create a core with its cluster list already in place.
    pub fn with_clusters(endpoint_id: u8, device_type: u16, clusters: ClusterList) -> Self {
        let core = Self::new(endpoint_id, device_type);
        core.configure(clusters);
        core
    }

    pub fn configure(&self, clusters: ClusterList) {
        *self.clusters.write() = Some(clusters);
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint_id != 0 && self.clusters.read().is_some()
    }

    pub fn endpoint_id(&self) -> u8 {
        self.endpoint_id
    }

    pub fn device_type(&self) -> u16 {
        self.device_type
    }

    pub fn device_type_name(&self) -> &'static str {
        device_type_name(self.device_type)
    }

    pub fn config(&self) -> EndpointConfig {
        EndpointConfig {
            endpoint: self.endpoint_id,
            profile_id: PROFILE_HOME_AUTOMATION,
            device_id: self.device_type,
            device_version: 0,
        }
    }

    /// Snapshot of the cluster list handed to the stack at start.
    pub fn cluster_list(&self) -> Option<ClusterList> {
        self.clusters.read().clone()
    }

    /// Edit the cluster list before the stack starts.
    pub fn update_clusters<R>(&self, f: impl FnOnce(&mut ClusterList) -> R) -> Result<R> {
        let mut guard = self.clusters.write();
        let clusters = guard
            .as_mut()
            .ok_or(RegistryError::NotConfigured(self.endpoint_id))?;
        Ok(f(clusters))
    }

    pub fn attach(&self, stack: StackHandle, read_timeout: Duration) {
        *self.stack.write() = Some(stack);
        *self.read_timeout.write() = read_timeout;
    }

    pub fn is_attached(&self) -> bool {
        self.stack.read().is_some()
    }

    pub fn stack(&self) -> Result<StackHandle> {
        self.stack
            .read()
            .clone()
            .ok_or(ZigbeeError::NotAttached(self.endpoint_id))
    }

    pub fn read_timeout(&self) -> Duration {
        *self.read_timeout.read()
    }

    /// Attribute value from the stack's storage, for use on the stack task.
    pub fn stored_attribute(
        &self,
        cluster_id: u16,
        role: ClusterRole,
        attribute_id: u16,
    ) -> Option<AttributeValue> {
        match self.stack.read().as_ref() {
            Some(stack) => stack
                .direct()
                .get_attribute(self.endpoint_id, cluster_id, role, attribute_id),
            None => self
                .clusters
                .read()
                .as_ref()
                .and_then(|c| c.attribute(cluster_id, role, attribute_id).cloned()),
        }
    }

    /// Write an attribute. Goes to the stack under lock once attached,
    /// otherwise into the cluster list.
    pub fn write_attribute(
        &self,
        cluster_id: u16,
        role: ClusterRole,
        attribute_id: u16,
        value: AttributeValue,
    ) -> Result<()> {
        let attached = self.stack.read().clone();
        let endpoint = self.endpoint_id;
        if let Some(stack) = attached {
            return stack
                .locked(|s| s.set_attribute(endpoint, cluster_id, role, attribute_id, value))
                .map_err(|status| {
                    warn!(
                        "[Zigbee] Endpoint {} rejected attribute 0x{:04x} of cluster 0x{:04x}: {}",
                        endpoint, attribute_id, cluster_id, status
                    );
                    ZigbeeError::AttributeRejected {
                        cluster: cluster_id,
                        attribute: attribute_id,
                        status,
                    }
                });
        }

        self.update_clusters(|c| {
            c.set_attribute(cluster_id, role, attribute_id, value);
        })
    }

    /// Send a ZCL command from this endpoint under the stack lock.
    pub fn send_command(&self, target: CommandTarget, kind: CommandKind) -> Result<()> {
        let stack = self.stack()?;
        let command = ZclCommand {
            src_endpoint: self.endpoint_id,
            target,
            kind,
        };
        stack.locked(|s| s.send_command(command))
    }

    /// Same as [`send_command`](Self::send_command) for handlers already
    /// running on the stack task.
    pub fn send_command_from_stack(&self, target: CommandTarget, kind: CommandKind) -> Result<()> {
        let stack = self.stack()?;
        stack.direct().send_command(ZclCommand {
            src_endpoint: self.endpoint_id,
            target,
            kind,
        })
    }

    /// Report one of this endpoint's attributes to its bound devices.
    pub fn report_attribute(&self, cluster_id: u16, attribute_id: u16) -> Result<()> {
        self.send_command(
            CommandTarget::Bound,
            CommandKind::ReportAttribute {
                cluster_id,
                attribute_id,
            },
        )
    }

    /// Issue a read-attributes request under the stack lock.
    pub fn request_read(
        &self,
        target: CommandTarget,
        cluster_id: u16,
        attributes: Vec<u16>,
    ) -> Result<()> {
        let stack = self.stack()?;
        let request = ReadAttributesRequest {
            src_endpoint: self.endpoint_id,
            target,
            cluster_id,
            attributes,
        };
        stack.locked(|s| s.read_attributes(request))
    }

    pub fn is_bound(&self) -> bool {
        self.is_bound.load(Ordering::SeqCst)
    }

    pub fn bound_peers(&self) -> Vec<PeerRef> {
        self.bound_peers.read().clone()
    }

    /// True if `short_addr` or `ieee_addr` is already among the bound peers.
    pub fn is_bound_to(&self, short_addr: u16, ieee_addr: &IeeeAddr) -> bool {
        self.bound_peers
            .read()
            .iter()
            .any(|p| p.short_addr == short_addr || &p.ieee_addr == ieee_addr)
    }

    /// Record a fully bound peer.
    pub fn add_bound_peer(&self, peer: PeerRef) {
        self.bound_peers.write().push(peer);
        self.is_bound.store(true, Ordering::SeqCst);
    }

    pub fn allows_multiple_binding(&self) -> bool {
        self.allow_multiple_binding.load(Ordering::SeqCst)
    }

    pub fn allow_multiple_binding(&self, allow: bool) {
        self.allow_multiple_binding.store(allow, Ordering::SeqCst);
    }

    pub fn uses_manual_binding(&self) -> bool {
        self.manual_binding.load(Ordering::SeqCst)
    }

    /// Skip automatic binding on device announce.
    pub fn set_manual_binding(&self, manual: bool) {
        self.manual_binding.store(manual, Ordering::SeqCst);
    }

    pub fn log_bound_peers(&self) {
        let peers = self.bound_peers.read();
        info!(
            "[Binding] Endpoint {} has {} bound device(s)",
            self.endpoint_id,
            peers.len()
        );
        for peer in peers.iter() {
            info!(
                "[Binding]   short 0x{:04x}, endpoint {}, ieee {}",
                peer.short_addr,
                peer.endpoint,
                format_ieee(&peer.ieee_addr)
            );
        }
    }

    pub fn on_identify(&self, callback: impl Fn(u16) + Send + Sync + 'static) {
        *self.identify_callback.write() = Some(Arc::new(callback));
    }

    /// Invoke the registered identify callback.
    pub fn identify(&self, time: u16) {
        let callback = self.identify_callback.read().clone();
        match callback {
            Some(cb) => cb(time),
            None => debug!(
                "[Zigbee] Identify for {} s on endpoint {} (no callback)",
                time, self.endpoint_id
            ),
        }
    }

    /// Set manufacturer and model names (ZCL char strings, max 32 bytes each).
    pub fn set_manufacturer_and_model(&self, manufacturer: &str, model: &str) -> Result<()> {
        let manufacturer = encode_char_string(manufacturer, MAX_NAME_LENGTH)?;
        let model = encode_char_string(model, MAX_NAME_LENGTH)?;

        self.write_attribute(
            cluster::BASIC,
            ClusterRole::Server,
            basic_attrs::MANUFACTURER_NAME,
            AttributeValue::CharString(manufacturer),
        )?;
        self.write_attribute(
            cluster::BASIC,
            ClusterRole::Server,
            basic_attrs::MODEL_IDENTIFIER,
            AttributeValue::CharString(model),
        )
    }

    /// Local manufacturer name.
    pub fn manufacturer(&self) -> Option<String> {
        self.local_string(basic_attrs::MANUFACTURER_NAME)
    }

    /// Local model identifier.
    pub fn model(&self) -> Option<String> {
        self.local_string(basic_attrs::MODEL_IDENTIFIER)
    }

    fn local_string(&self, attribute_id: u16) -> Option<String> {
        let value = self.stored_attribute(cluster::BASIC, ClusterRole::Server, attribute_id)?;
        decode_char_string(value.as_char_string()?).ok()
    }

    /// Add power source to the Basic cluster; battery sources also get a
    /// Power Configuration cluster with the initial percentage.
    pub fn set_power_source(&self, source: PowerSource, battery_percentage: u8) -> Result<()> {
        self.update_clusters(|c| {
            c.set_attribute(
                cluster::BASIC,
                ClusterRole::Server,
                basic_attrs::POWER_SOURCE,
                AttributeValue::Enum8(source as u8),
            );
            if source == PowerSource::Battery {
                c.set_attribute(
                    cluster::POWER_CONFIG,
                    ClusterRole::Server,
                    power_config_attrs::BATTERY_PERCENTAGE_REMAINING,
                    AttributeValue::U8(battery_percentage.min(100) * 2),
                );
            }
        })
    }

    /// Battery percentage (0-100), stored in half-percent units.
    pub fn set_battery_percentage(&self, percentage: u8) -> Result<()> {
        self.write_attribute(
            cluster::POWER_CONFIG,
            ClusterRole::Server,
            power_config_attrs::BATTERY_PERCENTAGE_REMAINING,
            AttributeValue::U8(percentage.min(100) * 2),
        )?;
        debug!(
            "[Zigbee] Battery percentage on endpoint {} set to {}%",
            self.endpoint_id, percentage
        );
        Ok(())
    }

    /// Battery voltage in 100 mV units.
    pub fn set_battery_voltage(&self, decivolts: u8) -> Result<()> {
        self.write_attribute(
            cluster::POWER_CONFIG,
            ClusterRole::Server,
            power_config_attrs::BATTERY_VOLTAGE,
            AttributeValue::U8(decivolts),
        )
    }

    pub fn report_battery_percentage(&self) -> Result<()> {
        self.report_attribute(
            cluster::POWER_CONFIG,
            power_config_attrs::BATTERY_PERCENTAGE_REMAINING,
        )
    }

    /// Read a remote device's manufacturer name, waiting up to the read timeout.
    pub async fn read_manufacturer(&self, target: CommandTarget) -> Result<String> {
        let rx = self.manufacturer.arm();
        let attributes = vec![basic_attrs::MANUFACTURER_NAME];
        if let Err(e) = self.request_read(target, cluster::BASIC, attributes) {
            self.manufacturer.disarm();
            return Err(e);
        }
        ReadSlot::wait(rx, self.read_timeout()).await
    }

    /// Read a remote device's model identifier, waiting up to the read timeout.
    pub async fn read_model(&self, target: CommandTarget) -> Result<String> {
        let rx = self.model.arm();
        let attributes = vec![basic_attrs::MODEL_IDENTIFIER];
        if let Err(e) = self.request_read(target, cluster::BASIC, attributes) {
            self.model.disarm();
            return Err(e);
        }
        ReadSlot::wait(rx, self.read_timeout()).await
    }

    /// Last remote manufacturer/model seen, including late responses.
    pub fn last_read_manufacturer(&self) -> Option<String> {
        self.manufacturer.last()
    }

    pub fn last_read_model(&self) -> Option<String> {
        self.model.last()
    }

    /// Basic cluster read-response entry from the stack task.
    pub fn handle_basic_read(&self, attribute: &Attribute) {
        let slot = match attribute.id {
            basic_attrs::MANUFACTURER_NAME => &self.manufacturer,
            basic_attrs::MODEL_IDENTIFIER => &self.model,
            other => {
                debug!("[Zigbee] Ignoring Basic attribute 0x{:04x}", other);
                return;
            }
        };
        let Some(raw) = attribute.value.as_char_string() else {
            warn!(
                "[Zigbee] Basic attribute 0x{:04x} is not a char string",
                attribute.id
            );
            return;
        };
        match decode_char_string(raw) {
            Ok(text) => slot.fulfil(text),
            Err(e) => warn!("[Zigbee] Bad Basic attribute string: {}", e),
        }
    }

    /// Add a Time server cluster. A non-epoch `time` marks the clock synchronized.
    pub fn add_time_cluster(
        &self,
        time: Option<DateTime<Utc>>,
        gmt_offset_secs: i32,
    ) -> Result<()> {
        let utc = time.map(to_zcl_time).unwrap_or(0);
        if utc != 0 {
            self.time_status
                .fetch_or(time_attrs::STATUS_SYNCHRONIZED, Ordering::SeqCst);
        }
        let status = self.time_status.load(Ordering::SeqCst);
        self.update_clusters(|c| {
            c.set_attribute(
                cluster::TIME,
                ClusterRole::Server,
                time_attrs::TIME,
                AttributeValue::UtcTime(utc),
            );
            c.set_attribute(
                cluster::TIME,
                ClusterRole::Server,
                time_attrs::TIME_ZONE,
                AttributeValue::S32(gmt_offset_secs),
            );
            c.set_attribute(
                cluster::TIME,
                ClusterRole::Server,
                time_attrs::TIME_STATUS,
                AttributeValue::Bitmap8(status),
            );
            c.add_cluster(cluster::TIME, ClusterRole::Client);
        })
    }

    pub fn set_time(&self, time: DateTime<Utc>) -> Result<()> {
        self.write_attribute(
            cluster::TIME,
            ClusterRole::Server,
            time_attrs::TIME,
            AttributeValue::UtcTime(to_zcl_time(time)),
        )?;
        let status = self
            .time_status
            .fetch_or(time_attrs::STATUS_SYNCHRONIZED, Ordering::SeqCst)
            | time_attrs::STATUS_SYNCHRONIZED;
        self.write_attribute(
            cluster::TIME,
            ClusterRole::Server,
            time_attrs::TIME_STATUS,
            AttributeValue::Bitmap8(status),
        )
    }

    pub fn set_timezone(&self, gmt_offset_secs: i32) -> Result<()> {
        self.write_attribute(
            cluster::TIME,
            ClusterRole::Server,
            time_attrs::TIME_ZONE,
            AttributeValue::S32(gmt_offset_secs),
        )
    }

    pub fn time_status(&self) -> u8 {
        self.time_status.load(Ordering::SeqCst)
    }

    /// Read the time of a remote Time server.
    pub async fn get_time(&self, target: CommandTarget) -> Result<DateTime<Utc>> {
        let rx = self.time.arm();
        if let Err(e) = self.request_read(target, cluster::TIME, vec![time_attrs::TIME]) {
            self.time.disarm();
            return Err(e);
        }
        let utc = ReadSlot::wait(rx, self.read_timeout()).await?;
        from_zcl_time(utc).ok_or_else(|| ZigbeeError::Stack(format!("invalid ZCL time {}", utc)))
    }

    /// Read the GMT offset (seconds) of a remote Time server.
    pub async fn get_timezone(&self, target: CommandTarget) -> Result<i32> {
        let rx = self.timezone.arm();
        if let Err(e) = self.request_read(target, cluster::TIME, vec![time_attrs::TIME_ZONE]) {
            self.timezone.disarm();
            return Err(e);
        }
        ReadSlot::wait(rx, self.read_timeout()).await
    }

    /// Time cluster read-response entry from the stack task.
    pub fn handle_time_read(&self, attribute: &Attribute) {
        match (attribute.id, &attribute.value) {
            (time_attrs::TIME, AttributeValue::UtcTime(t)) => self.time.fulfil(*t),
            (time_attrs::TIME_ZONE, AttributeValue::S32(z)) => self.timezone.fulfil(*z),
            (id, value) => debug!(
                "[Zigbee] Ignoring Time attribute 0x{:04x} ({:?})",
                id, value
            ),
        }
    }

    /// Add an OTA upgrade client cluster advertising `file_version`.
    pub fn add_ota_client(&self, file_version: u32) -> Result<()> {
        self.update_clusters(|c| {
            c.set_attribute(
                cluster::OTA_UPGRADE,
                ClusterRole::Client,
                ota_attrs::CURRENT_FILE_VERSION,
                AttributeValue::U32(file_version),
            );
        })
    }

    pub fn has_ota_client(&self) -> bool {
        self.clusters
            .read()
            .as_ref()
            .is_some_and(|c| c.has_cluster(cluster::OTA_UPGRADE, ClusterRole::Client))
    }

    /// Query an OTA server found by discovery.
    pub fn query_ota_image(&self, server_addr: u16, server_endpoint: u8) -> Result<()> {
        info!(
            "[OTA] Endpoint {} querying image from 0x{:04x}, endpoint {}",
            self.endpoint_id, server_addr, server_endpoint
        );
        self.stack()?.direct().ota_query_image(
            self.endpoint_id,
            server_addr,
            server_endpoint,
            DEFAULT_QUERY_INTERVAL_MIN,
        )
    }
}

/// Convert to seconds since the ZCL epoch.
pub fn to_zcl_time(time: DateTime<Utc>) -> u32 {
    (time.timestamp() - ZCL_EPOCH_OFFSET).clamp(0, u32::MAX as i64) as u32
}

pub fn from_zcl_time(seconds: u32) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(seconds as i64 + ZCL_EPOCH_OFFSET, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zigbee::device_types::DEV_TYPE_ON_OFF_LIGHT;
    use crate::zigbee::test_support::RecordingStack;
    use crate::zigbee::zcl::ZclStatus;

    fn configured(id: u8) -> EndpointCore {
        EndpointCore::with_clusters(
            id,
            DEV_TYPE_ON_OFF_LIGHT,
            ClusterList::new().with_cluster(cluster::BASIC, ClusterRole::Server),
        )
    }

    #[test]
    fn test_unconfigured_core() {
        let core = EndpointCore::new(5, DEV_TYPE_ON_OFF_LIGHT);
        assert!(!core.is_configured());
        assert!(core.set_manufacturer_and_model("Acme", "X1").is_err());

        let zero = EndpointCore::with_clusters(0, DEV_TYPE_ON_OFF_LIGHT, ClusterList::new());
        assert!(!zero.is_configured());
    }

    #[test]
    fn test_manufacturer_and_model_round_trip() {
        let core = configured(1);
        core.set_manufacturer_and_model("Acme", "X1").unwrap();
        assert_eq!(core.manufacturer().as_deref(), Some("Acme"));
        assert_eq!(core.model().as_deref(), Some("X1"));

        let raw = core
            .stored_attribute(
                cluster::BASIC,
                ClusterRole::Server,
                basic_attrs::MANUFACTURER_NAME,
            )
            .unwrap();
        assert_eq!(raw.as_char_string().map(|r| r[0]), Some(4));
    }

    #[test]
    fn test_manufacturer_round_trip_through_stack() {
        let core = configured(1);
        let stack = RecordingStack::new();
        core.attach(stack.handle(), DEFAULT_READ_TIMEOUT);
        core.set_manufacturer_and_model("Acme", "X1").unwrap();
        assert_eq!(core.manufacturer().as_deref(), Some("Acme"));
        assert_eq!(core.model().as_deref(), Some("X1"));
    }

    #[test]
    fn test_stack_refusal_surfaces_as_attribute_rejected() {
        let core = configured(1);
        let stack = RecordingStack::new();
        core.attach(stack.handle(), DEFAULT_READ_TIMEOUT);
        stack.reject_attribute_writes();

        let result = core.set_manufacturer_and_model("Acme", "X1");
        assert!(matches!(
            result,
            Err(ZigbeeError::AttributeRejected {
                cluster: cluster::BASIC,
                attribute: basic_attrs::MANUFACTURER_NAME,
                status: ZclStatus::ReadOnly,
            })
        ));
        assert_eq!(core.manufacturer(), None);
    }

    #[test]
    fn test_model_read_from_stack_storage() {
        let core = configured(2);
        let stack = RecordingStack::new();
        core.attach(stack.handle(), DEFAULT_READ_TIMEOUT);
        stack.store_attribute(
            2,
            cluster::BASIC,
            ClusterRole::Server,
            basic_attrs::MODEL_IDENTIFIER,
            AttributeValue::CharString(encode_char_string("Z3", MAX_NAME_LENGTH).unwrap()),
        );
        assert_eq!(core.model().as_deref(), Some("Z3"));
        assert_eq!(core.manufacturer(), None);
    }

    #[test]
    fn test_name_too_long_rejected() {
        let core = configured(1);
        let long = "m".repeat(33);
        assert!(matches!(
            core.set_manufacturer_and_model(&long, "X1"),
            Err(ZigbeeError::StringTooLong { .. })
        ));
        assert_eq!(core.manufacturer(), None);
    }

    #[test]
    fn test_battery_percentage_doubled() {
        let core = configured(1);
        core.set_power_source(PowerSource::Battery, 80).unwrap();
        assert_eq!(
            core.stored_attribute(
                cluster::POWER_CONFIG,
                ClusterRole::Server,
                power_config_attrs::BATTERY_PERCENTAGE_REMAINING,
            ),
            Some(AttributeValue::U8(160))
        );
        core.set_battery_percentage(150).unwrap();
        assert_eq!(
            core.stored_attribute(
                cluster::POWER_CONFIG,
                ClusterRole::Server,
                power_config_attrs::BATTERY_PERCENTAGE_REMAINING,
            ),
            Some(AttributeValue::U8(200))
        );
    }

    #[test]
    fn test_bound_peers() {
        let core = configured(1);
        assert!(!core.is_bound());
        let peer = PeerRef {
            short_addr: 0x1234,
            ieee_addr: [1; 8],
            endpoint: 10,
        };
        core.add_bound_peer(peer);
        assert!(core.is_bound());
        assert!(core.is_bound_to(0x1234, &[0; 8]));
        assert!(core.is_bound_to(0x9999, &[1; 8]));
        assert!(!core.is_bound_to(0x9999, &[2; 8]));
        assert_eq!(core.bound_peers(), vec![peer]);
    }

    #[test]
    fn test_zcl_time_conversion() {
        let t = Utc.with_ymd_and_hms(2000, 1, 1, 0, 1, 0).unwrap();
        assert_eq!(to_zcl_time(t), 60);
        assert_eq!(from_zcl_time(60), Some(t));
    }

    #[test]
    fn test_set_time_marks_synchronized() {
        let core = configured(1);
        core.add_time_cluster(None, 3600).unwrap();
        assert_eq!(core.time_status() & time_attrs::STATUS_SYNCHRONIZED, 0);
        core.set_time(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
            .unwrap();
        assert_ne!(core.time_status() & time_attrs::STATUS_SYNCHRONIZED, 0);
    }

    #[tokio::test]
    async fn test_read_manufacturer_satisfied_by_response() {
        let core = Arc::new(configured(1));
        let stack = RecordingStack::new();
        core.attach(stack.handle(), Duration::from_millis(500));

        let reader = {
            let core = core.clone();
            let target = CommandTarget::Short {
                addr: 0x1234,
                endpoint: 10,
            };
            tokio::spawn(async move { core.read_manufacturer(target).await })
        };
        // let the reader arm and issue its request
        while stack.reads().is_empty() {
            tokio::task::yield_now().await;
        }
        core.handle_basic_read(&Attribute {
            id: basic_attrs::MANUFACTURER_NAME,
            value: AttributeValue::CharString(encode_char_string("Acme", 32).unwrap()),
        });

        assert_eq!(reader.await.unwrap().unwrap(), "Acme");
        assert_eq!(stack.reads()[0].cluster_id, cluster::BASIC);
    }

    #[tokio::test]
    async fn test_read_model_times_out() {
        let core = configured(1);
        let stack = RecordingStack::new();
        core.attach(stack.handle(), Duration::from_millis(20));
        let target = CommandTarget::Short {
            addr: 0x1234,
            endpoint: 10,
        };
        let result = core.read_model(target).await;
        assert!(matches!(result, Err(ZigbeeError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_read_without_stack_fails_fast() {
        let core = configured(1);
        let result = core.read_model(CommandTarget::Bound).await;
        assert!(matches!(result, Err(ZigbeeError::NotAttached(1))));
    }
}
