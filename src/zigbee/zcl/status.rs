use strum::{Display, FromRepr, IntoStaticStr};

/// ZCL status codes carried in responses and attribute callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ZclStatus {
    Success = 0x00,
    Fail = 0x01,
    NotAuthorized = 0x7E,
    MalformedCmd = 0x80,
    UnsupClustCmd = 0x81,
    UnsupGenCmd = 0x82,
    UnsupManufClustCmd = 0x83,
    UnsupManufGenCmd = 0x84,
    InvalidField = 0x85,
    UnsupAttrib = 0x86,
    InvalidValue = 0x87,
    ReadOnly = 0x88,
    InsuffSpace = 0x89,
    DupeExists = 0x8A,
    NotFound = 0x8B,
    UnreportableAttrib = 0x8C,
    InvalidType = 0x8D,
    WriteOnly = 0x8F,
    Inconsistent = 0x92,
    ActionDenied = 0x93,
    Timeout = 0x94,
    Abort = 0x95,
    InvalidImage = 0x96,
    WaitForData = 0x97,
    NoImageAvailable = 0x98,
    RequireMoreImage = 0x99,
    NotificationPending = 0x9A,
    HwFail = 0xC0,
    SwFail = 0xC1,
    CalibErr = 0xC2,
    UnsupportedCluster = 0xC3,
    LimitReached = 0xC4,
}

impl ZclStatus {
    /// Map a raw status byte; unknown codes collapse to `Fail`.
    pub fn from_code(code: u8) -> Self {
        Self::from_repr(code).unwrap_or(Self::Fail)
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}
