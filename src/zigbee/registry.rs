//! Ordered collection of all application endpoints.
//!
//! Filled during setup through `&mut self`, then frozen behind an `Arc`
//! when the core starts, so lookups during operation need no locking.

use super::endpoints::ZigbeeEndpoint;
use log::{error, info};
use std::sync::Arc;
use thiserror::Error as ThisError;

/// Highest endpoint id available to applications.
pub const MAX_ENDPOINT_ID: u8 = 240;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Endpoint {0} is already registered")]
    AlreadyExists(u8),

    #[error("Endpoint {0} is not configured")]
    NotConfigured(u8),

    #[error("Endpoint id {0} is outside 1..=240")]
    InvalidEndpointId(u8),

    #[error("No endpoint {0} registered")]
    NotFound(u8),
}

#[derive(Default)]
pub struct EndpointRegistry {
    endpoints: Vec<Arc<dyn ZigbeeEndpoint>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint. Rejections leave the registry unchanged.
    pub fn register(&mut self, endpoint: Arc<dyn ZigbeeEndpoint>) -> Result<(), RegistryError> {
        let core = endpoint.core();
        let id = core.endpoint_id();

        if !core.is_configured() {
            error!(
                "[Zigbee] Endpoint {} is not configured, not registering",
                id
            );
            return Err(RegistryError::NotConfigured(id));
        }
        if id > MAX_ENDPOINT_ID {
            error!("[Zigbee] Endpoint id {} is out of range", id);
            return Err(RegistryError::InvalidEndpointId(id));
        }
        if self.find_by_id(id).is_some() {
            error!("[Zigbee] Endpoint {} already exists, not registering", id);
            return Err(RegistryError::AlreadyExists(id));
        }

        info!(
            "[Zigbee] Endpoint: {}, Device ID: 0x{:04x} ({})",
            id,
            core.device_type(),
            core.device_type_name()
        );
        self.endpoints.push(endpoint);
        Ok(())
    }

    pub fn find_by_id(&self, endpoint_id: u8) -> Option<&Arc<dyn ZigbeeEndpoint>> {
        self.endpoints
            .iter()
            .find(|ep| ep.core().endpoint_id() == endpoint_id)
    }

    /// Endpoints in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ZigbeeEndpoint>> {
        self.endpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn log_listing(&self) {
        info!("[Zigbee] {} endpoint(s) registered", self.endpoints.len());
        for ep in &self.endpoints {
            let core = ep.core();
            info!(
                "[Zigbee]   {:>3}: {} (0x{:04x}), bound: {}",
                core.endpoint_id(),
                core.device_type_name(),
                core.device_type(),
                core.is_bound()
            );
        }
    }
}
