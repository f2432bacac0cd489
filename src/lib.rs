//! Zigbee core library.
//!
//! Endpoint registry, commissioning state machine, binding resolver and
//! cluster dispatch on top of an abstract Zigbee network stack.

pub mod commissioning;
pub mod config;
pub mod error;
pub mod simulation;
pub mod zigbee;
