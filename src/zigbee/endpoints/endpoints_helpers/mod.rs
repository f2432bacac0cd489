//! Shared building blocks for endpoint types.

mod endpoint_core;
mod read_slot;
mod traits;

pub use endpoint_core::{
    DEFAULT_READ_TIMEOUT, EndpointCore, IdentifyCallback, PeerRef, PowerSource, from_zcl_time,
    to_zcl_time,
};
pub use read_slot::ReadSlot;
pub use traits::ZigbeeEndpoint;
