use crate::zigbee::ota::OtaError;
use crate::zigbee::registry::RegistryError;
use crate::zigbee::zcl::ZclStatus;
use std::time::Duration;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ZigbeeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Ota(#[from] OtaError),

    #[error("Endpoint {0} is not attached to a running stack")]
    NotAttached(u8),

    #[error("Endpoint {0} has no bound device")]
    NotBound(u8),

    #[error("String too long: {len} bytes (max {max})")]
    StringTooLong { len: usize, max: usize },

    #[error("Malformed ZCL string: {0}")]
    MalformedString(String),

    #[error("Attribute 0x{attribute:04X} of cluster 0x{cluster:04X} rejected: {status}")]
    AttributeRejected {
        cluster: u16,
        attribute: u16,
        status: ZclStatus,
    },

    #[error("Unsupported cluster 0x{0:04X}")]
    UnsupportedCluster(u16),

    #[error("Timed out after {0:?} waiting for response")]
    Timeout(Duration),

    #[error("Response channel closed before a value arrived")]
    ResponseDropped,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Stack request failed: {0}")]
    Stack(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ZigbeeError>;
