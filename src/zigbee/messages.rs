//! Action messages delivered by the stack's multiplexed action handler.

use super::ota::{OtaImageInfo, OtaUpgradeMessage};
use super::zcl::{AttributeValue, ZclStatus};

/// Common header of every ZCL action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageInfo {
    pub status: ZclStatus,
    pub src_addr: u16,
    pub src_endpoint: u8,
    pub dst_endpoint: u8,
    pub cluster: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub id: u16,
    pub value: AttributeValue,
}

/// One entry of a read-attributes response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadVariable {
    pub status: ZclStatus,
    pub attribute: Attribute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigReportVariable {
    pub status: ZclStatus,
    pub direction: u8,
    pub attribute_id: u16,
}

/// IAS zone status change notification payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IasZoneStatusChange {
    pub zone_status: u16,
    pub extended_status: u8,
    pub zone_id: u8,
    pub delay: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowCoveringCommand {
    UpOpen,
    DownClose,
    Stop,
    GoToLiftPercentage(u8),
    GoToTiltPercentage(u8),
    GoToLiftValue(u16),
    GoToTiltValue(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionMessage {
    SetAttributeValue {
        info: MessageInfo,
        attribute: Attribute,
    },
    ReportAttribute {
        info: MessageInfo,
        attribute: Attribute,
    },
    ReadAttributeResponse {
        info: MessageInfo,
        variables: Vec<ReadVariable>,
    },
    ConfigureReportResponse {
        info: MessageInfo,
        variables: Vec<ConfigReportVariable>,
    },
    IasZoneStatusChange {
        info: MessageInfo,
        change: IasZoneStatusChange,
    },
    IasZoneEnrollResponse {
        info: MessageInfo,
        response_code: u8,
        zone_id: u8,
    },
    WindowCoveringMovement {
        info: MessageInfo,
        command: WindowCoveringCommand,
    },
    OtaUpgradeValue {
        info: MessageInfo,
        upgrade: OtaUpgradeMessage,
    },
    OtaQueryImageResponse {
        info: MessageInfo,
        image: OtaImageInfo,
    },
    DefaultResponse {
        info: MessageInfo,
        command_id: u8,
        status: ZclStatus,
    },
    Other { callback_id: u32 },
}

impl ActionMessage {
    pub fn info(&self) -> Option<&MessageInfo> {
        match self {
            Self::SetAttributeValue { info, .. }
            | Self::ReportAttribute { info, .. }
            | Self::ReadAttributeResponse { info, .. }
            | Self::ConfigureReportResponse { info, .. }
            | Self::IasZoneStatusChange { info, .. }
            | Self::IasZoneEnrollResponse { info, .. }
            | Self::WindowCoveringMovement { info, .. }
            | Self::OtaUpgradeValue { info, .. }
            | Self::OtaQueryImageResponse { info, .. }
            | Self::DefaultResponse { info, .. } => Some(info),
            Self::Other { .. } => None,
        }
    }

    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetAttributeValue { .. } => "set attribute value",
            Self::ReportAttribute { .. } => "report attribute",
            Self::ReadAttributeResponse { .. } => "read attribute response",
            Self::ConfigureReportResponse { .. } => "configure report response",
            Self::IasZoneStatusChange { .. } => "IAS zone status change",
            Self::IasZoneEnrollResponse { .. } => "IAS zone enroll response",
            Self::WindowCoveringMovement { .. } => "window covering movement",
            Self::OtaUpgradeValue { .. } => "OTA upgrade value",
            Self::OtaQueryImageResponse { .. } => "OTA query image response",
            Self::DefaultResponse { .. } => "default response",
            Self::Other { .. } => "unhandled action",
        }
    }
}
