use super::AttributeValue;
use std::collections::BTreeMap;

/// Server or client side of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClusterRole {
    Server,
    Client,
}

/// Simple descriptor of an endpoint as registered with the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointConfig {
    pub endpoint: u8,
    pub profile_id: u16,
    pub device_id: u16,
    pub device_version: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ClusterAttributes {
    attributes: BTreeMap<u16, AttributeValue>,
}

/// Cluster composition of one endpoint with initial attribute values.
///
/// Built by the device type before registration and handed to the stack when
/// the core starts. After that the stack's attribute storage is authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterList {
    clusters: BTreeMap<(u16, ClusterRole), ClusterAttributes>,
}

impl ClusterList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cluster; a no-op when it already exists.
    pub fn add_cluster(&mut self, cluster: u16, role: ClusterRole) -> &mut Self {
        self.clusters.entry((cluster, role)).or_default();
        self
    }

    pub fn with_cluster(mut self, cluster: u16, role: ClusterRole) -> Self {
        self.add_cluster(cluster, role);
        self
    }

    pub fn has_cluster(&self, cluster: u16, role: ClusterRole) -> bool {
        self.clusters.contains_key(&(cluster, role))
    }

    /// Set an attribute, adding the cluster if needed.
    pub fn set_attribute(
        &mut self,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
        value: AttributeValue,
    ) -> &mut Self {
        self.clusters
            .entry((cluster, role))
            .or_default()
            .attributes
            .insert(attribute, value);
        self
    }

    pub fn attribute(
        &self,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
    ) -> Option<&AttributeValue> {
        self.clusters
            .get(&(cluster, role))
            .and_then(|c| c.attributes.get(&attribute))
    }

    /// Cluster ids present for `role`, ascending.
    pub fn cluster_ids(&self, role: ClusterRole) -> Vec<u16> {
        self.clusters
            .keys()
            .filter(|(_, r)| *r == role)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Every attribute of a cluster, ascending by id.
    pub fn attributes(
        &self,
        cluster: u16,
        role: ClusterRole,
    ) -> impl Iterator<Item = (u16, &AttributeValue)> {
        self.clusters
            .get(&(cluster, role))
            .into_iter()
            .flat_map(|c| c.attributes.iter().map(|(id, v)| (*id, v)))
    }
}
