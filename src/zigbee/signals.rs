//! Application signals raised by the stack's commissioning engine.

use super::stack::IeeeAddr;

/// Error status carried by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStatus {
    Ok,
    Error(i32),
}

impl SignalStatus {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveType {
    /// Left the network without rejoin; wipe network state.
    Reset,
    Rejoin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppSignal {
    SkipStartup,
    DeviceFirstStart { status: SignalStatus },
    DeviceReboot { status: SignalStatus },
    Formation { status: SignalStatus },
    Steering { status: SignalStatus },
    /// A device joined or rejoined (seen by the coordinator).
    DeviceAnnounce {
        short_addr: u16,
        ieee_addr: IeeeAddr,
    },
    /// A child joined through this router.
    DeviceUpdate {
        short_addr: u16,
        ieee_addr: IeeeAddr,
    },
    /// Permit-join window changed; 0 means closed.
    PermitJoinStatus { duration: u8 },
    Leave { leave_type: LeaveType },
    /// Anything this layer does not handle (fabric, BLE, production config...).
    Other {
        signal_id: u32,
        status: SignalStatus,
    },
}
