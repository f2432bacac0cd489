//! Zigbee application layer: endpoints, binding, dispatch and network helpers.

pub mod binding;
pub mod color;
pub mod core;
pub mod device_types;
pub mod dispatcher;
pub mod endpoints;
pub mod messages;
pub mod ota;
pub mod registry;
pub mod retry;
pub mod scan;
pub mod signals;
pub mod stack;
pub mod zcl;

#[cfg(test)]
pub(crate) mod test_support;

pub use self::core::ZigbeeCore;
pub use dispatcher::{AttributeUpdateKind, DispatchStatus, Dispatcher};
pub use registry::EndpointRegistry;
pub use stack::{StackHandle, ZigbeeStack};
