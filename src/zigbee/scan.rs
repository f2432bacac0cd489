//! Active network scan bookkeeping.

use super::stack::{IeeeAddr, StackHandle, format_ieee};
use crate::error::{Result, ZigbeeError};
use log::{error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;

/// All 2.4 GHz channels (11..=26).
pub const ALL_CHANNELS_MASK: u32 = 0x07FF_F800;
pub const DEFAULT_SCAN_DURATION: u8 = 4;

/// One network found by an active scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkDescriptor {
    pub short_pan_id: u16,
    #[serde(serialize_with = "serialize_ieee")]
    pub extended_pan_id: IeeeAddr,
    pub channel: u8,
    pub permit_joining: bool,
    pub router_capacity: bool,
    pub end_device_capacity: bool,
    pub stack_profile: u8,
    pub nwk_update_id: u8,
}

fn serialize_ieee<S: serde::Serializer>(
    addr: &IeeeAddr,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_ieee(addr))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Not started, failed, or result deleted.
    Failed,
    Running,
    Complete(usize),
}

impl ScanStatus {
    /// Integer form used by polling callers: -2 failed, -1 running, else count.
    pub fn as_sentinel(self) -> i32 {
        match self {
            Self::Failed => -2,
            Self::Running => -1,
            Self::Complete(count) => i32::try_from(count).unwrap_or(i32::MAX),
        }
    }
}

#[derive(Debug, Default)]
struct ScanState {
    running: bool,
    result: Option<Vec<NetworkDescriptor>>,
}

pub struct NetworkScanner {
    stack: StackHandle,
    state: Mutex<ScanState>,
}

impl NetworkScanner {
    pub fn new(stack: StackHandle) -> Self {
        Self {
            stack,
            state: Mutex::new(ScanState::default()),
        }
    }

    /// Kick off an active scan. `duration` is the per-channel exponent (1..=4).
    pub fn start_scan(&self, channel_mask: u32, duration: u8) -> Result<()> {
        if !(1..=4).contains(&duration) {
            return Err(ZigbeeError::InvalidConfig(format!(
                "scan duration {} out of range 1..=4",
                duration
            )));
        }

        {
            let mut state = self.state.lock();
            if state.running {
                warn!("[Scan] Scan already running");
                return Ok(());
            }
            state.running = true;
            state.result = None;
        }

        info!(
            "[Scan] Starting active scan on mask 0x{:08x}, duration {}",
            channel_mask, duration
        );
        let started = self
            .stack
            .locked(|stack| stack.active_scan(channel_mask, duration));
        if let Err(e) = started {
            error!("[Scan] Failed to start scan: {}", e);
            self.state.lock().running = false;
            return Err(e);
        }
        Ok(())
    }

    /// Scan completion from the stack task. The previous result is replaced.
    pub fn on_scan_complete(&self, success: bool, networks: Vec<NetworkDescriptor>) {
        let mut state = self.state.lock();
        state.running = false;
        if !success {
            error!("[Scan] Scan failed");
            state.result = None;
            return;
        }

        info!("[Scan] Found {} network(s)", networks.len());
        for network in &networks {
            info!(
                "[Scan] PAN 0x{:04x} ({}), channel {}, permit joining: {}",
                network.short_pan_id,
                format_ieee(&network.extended_pan_id),
                network.channel,
                network.permit_joining
            );
        }
        state.result = Some(networks);
    }

    pub fn scan_status(&self) -> ScanStatus {
        let state = self.state.lock();
        if state.running {
            return ScanStatus::Running;
        }
        match &state.result {
            Some(networks) => ScanStatus::Complete(networks.len()),
            None => ScanStatus::Failed,
        }
    }

    /// Copy of the last completed scan, if any.
    pub fn scan_result(&self) -> Option<Vec<NetworkDescriptor>> {
        self.state.lock().result.clone()
    }

    pub fn delete_scan_result(&self) {
        self.state.lock().result = None;
    }
}
