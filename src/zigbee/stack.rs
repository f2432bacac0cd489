//! Boundary to the underlying Zigbee radio/network stack.
//!
//! The core never talks to the radio directly. It calls into a
//! [`ZigbeeStack`] implementation and receives callbacks through
//! [`ZigbeeCore`](super::ZigbeeCore) on the stack's own task.

use super::zcl::{AttributeValue, ClusterList, ClusterRole, EndpointConfig, ZclStatus};
use crate::error::Result;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// 64-bit IEEE (MAC) address, little-endian as stored by the stack.
pub type IeeeAddr = [u8; 8];

/// Broadcast short address for "all routers and coordinator" ZDO requests.
pub const BROADCAST_RX_ON_WHEN_IDLE: u16 = 0xFFFD;

/// Short address of a peer known only by its IEEE address.
pub const UNKNOWN_SHORT_ADDR: u16 = 0xFFFF;

/// Format an IEEE address most-significant byte first.
pub fn format_ieee(addr: &IeeeAddr) -> String {
    addr.iter()
        .rev()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Opaque context handed to the stack with an async request and returned
/// verbatim in its completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(pub(crate) u32);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// BDB top-level commissioning modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommissioningMode {
    Initialization,
    NetworkFormation,
    NetworkSteering,
}

/// ZDO response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZdoStatus {
    Success,
    NoMatch,
    Timeout,
    Failed(u8),
}

impl ZdoStatus {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Snapshot of the joined/formed network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkInfo {
    pub pan_id: u16,
    pub extended_pan_id: IeeeAddr,
    pub channel: u8,
    pub short_addr: u16,
}

/// Match descriptor request used for cluster discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDescRequest {
    pub dst_nwk_addr: u16,
    pub addr_of_interest: u16,
    pub profile_id: u16,
    pub in_clusters: Vec<u16>,
    pub out_clusters: Vec<u16>,
}

/// Result delivered to the match-descriptor callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub status: ZdoStatus,
    pub short_addr: u16,
    pub endpoint: u8,
}

/// Bind request: `src` endpoint sends `cluster_id` traffic to `dst`.
/// `req_dst_addr` is the device whose binding table is modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindRequest {
    pub src_ieee: IeeeAddr,
    pub src_endpoint: u8,
    pub cluster_id: u16,
    pub dst_ieee: IeeeAddr,
    pub dst_endpoint: u8,
    pub req_dst_addr: u16,
}

/// Destination of a binding table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingDst {
    Short(u16),
    Ieee(IeeeAddr),
}

/// One entry of the local binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingRecord {
    pub src_endpoint: u8,
    pub cluster_id: u16,
    pub dst: BindingDst,
    pub dst_endpoint: u8,
}

/// One page of a binding table response. `total` counts the whole table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTablePage {
    pub status: ZdoStatus,
    pub total: usize,
    pub start_index: usize,
    pub records: Vec<BindingRecord>,
}

/// How a ZCL command or read is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTarget {
    /// Every entry in the source endpoint's binding table.
    Bound,
    Group(u16),
    Short { addr: u16, endpoint: u8 },
    Ieee { addr: IeeeAddr, endpoint: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnOffCommand {
    Off,
    On,
    Toggle,
}

/// Outgoing ZCL command payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    OnOff(OnOffCommand),
    MoveToLevel { level: u8, transition_time: u16 },
    MoveToColor {
        x: u16,
        y: u16,
        transition_time: u16,
    },
    MoveToHueAndSaturation {
        hue: u8,
        saturation: u8,
        transition_time: u16,
    },
    ReportAttribute { cluster_id: u16, attribute_id: u16 },
    IasZoneEnrollRequest {
        zone_type: u16,
        manufacturer_code: u16,
    },
    IasZoneStatusChange {
        zone_status: u16,
        extended_status: u8,
        zone_id: u8,
        delay: u16,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZclCommand {
    pub src_endpoint: u8,
    pub target: CommandTarget,
    pub kind: CommandKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadAttributesRequest {
    pub src_endpoint: u8,
    pub target: CommandTarget,
    pub cluster_id: u16,
    pub attributes: Vec<u16>,
}

/// Operations the core needs from the network stack.
///
/// Calls that mutate attribute storage or send frames must be made through
/// [`StackHandle::locked`] when issued from an application task. Stack-task
/// callbacks already run under the stack and use [`StackHandle::direct`].
pub trait ZigbeeStack: Send + Sync {
    /// Add an endpoint's cluster list to the device descriptor.
    fn register_endpoint(&self, config: &EndpointConfig, clusters: &ClusterList) -> Result<()>;

    fn start_commissioning(&self, mode: CommissioningMode) -> Result<()>;

    /// Run `start_commissioning(mode)` on the stack task after `delay`.
    fn schedule_commissioning(&self, mode: CommissioningMode, delay: Duration);

    fn is_factory_new(&self) -> bool;

    /// Permit joining for `duration_secs`; 0 closes the network.
    fn open_network(&self, duration_secs: u8) -> Result<()>;

    fn network_info(&self) -> NetworkInfo;

    fn primary_channel_mask(&self) -> u32;

    /// Persist the channel mask used on the next join.
    fn set_primary_channel_mask(&self, mask: u32);

    fn factory_reset(&self, restart: bool);

    fn restart(&self);

    /// Start an active scan; completion arrives via `ZigbeeCore::on_scan_complete`.
    fn active_scan(&self, channel_mask: u32, duration: u8) -> Result<()>;

    fn match_descriptor(&self, request: MatchDescRequest, token: RequestToken);

    fn bind(&self, request: BindRequest, token: RequestToken);

    /// Ask for the local binding table from `start_index`. Each page arrives
    /// via `ZigbeeCore::on_binding_table` with `token`.
    fn binding_table(&self, start_index: usize, token: RequestToken);

    fn ieee_address_of(&self, short_addr: u16) -> Option<IeeeAddr>;

    fn short_address_of(&self, ieee_addr: &IeeeAddr) -> Option<u16>;

    fn local_ieee_address(&self) -> IeeeAddr;

    fn read_attributes(&self, request: ReadAttributesRequest) -> Result<()>;

    fn send_command(&self, command: ZclCommand) -> Result<()>;

    fn get_attribute(
        &self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
    ) -> Option<AttributeValue>;

    fn set_attribute(
        &self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
        value: AttributeValue,
    ) -> std::result::Result<(), ZclStatus>;

    /// Ask an OTA server for a new image and poll every `interval_min` minutes.
    fn ota_query_image(
        &self,
        endpoint: u8,
        server_addr: u16,
        server_endpoint: u8,
        interval_min: u16,
    ) -> Result<()>;
}

/// Shared handle to the stack plus the stack-wide lock.
///
/// The lock is per call; holding it across several calls is not supported.
#[derive(Clone)]
pub struct StackHandle {
    stack: Arc<dyn ZigbeeStack>,
    lock: Arc<Mutex<()>>,
}

impl StackHandle {
    pub fn new(stack: Arc<dyn ZigbeeStack>) -> Self {
        Self {
            stack,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run `f` with the stack lock held.
    pub fn locked<R>(&self, f: impl FnOnce(&dyn ZigbeeStack) -> R) -> R {
        let _guard = self.lock.lock();
        f(self.stack.as_ref())
    }

    /// Access from stack-task callbacks, which must not take the lock.
    pub fn direct(&self) -> &dyn ZigbeeStack {
        self.stack.as_ref()
    }
}

impl fmt::Debug for StackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackHandle").finish_non_exhaustive()
    }
}
