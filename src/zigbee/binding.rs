//! Discover-then-bind workflow for switch-like endpoints.
//!
//! A discovery sends a match-descriptor request for the endpoint's cluster
//! lists. On a match, the resolver issues one bind request per cluster in the
//! profile's order, each waiting for the previous one to succeed. The peer is
//! recorded only after the last bind succeeds. A failure part way through
//! drops the candidate without undoing the binds already made.
//!
//! Each request carries its own [`RequestToken`]; completions come back
//! through [`BindingResolver::on_match_result`] and
//! [`BindingResolver::on_bind_result`].
//!
//! After a reboot the bound-peer lists are rebuilt from the stack's binding
//! table, one page at a time. Recall only appends peers.

use super::endpoints::{PeerRef, ZigbeeEndpoint};
use super::registry::EndpointRegistry;
use super::stack::{
    BROADCAST_RX_ON_WHEN_IDLE, BindRequest, BindingDst, BindingRecord, BindingTablePage,
    MatchDescRequest, MatchResult, RequestToken, StackHandle, UNKNOWN_SHORT_ADDR, ZdoStatus,
    format_ieee,
};
use super::zcl::{PROFILE_HOME_AUTOMATION, cluster};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Which side's binding table a bind step writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindDirection {
    /// Local endpoint sends to the peer (entry on the local device).
    Outbound,
    /// Peer sends to the local endpoint (entry on the remote device).
    Inbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindStep {
    pub cluster_id: u16,
    pub direction: BindDirection,
}

impl BindStep {
    pub const fn outbound(cluster_id: u16) -> Self {
        Self {
            cluster_id,
            direction: BindDirection::Outbound,
        }
    }

    pub const fn inbound(cluster_id: u16) -> Self {
        Self {
            cluster_id,
            direction: BindDirection::Inbound,
        }
    }
}

/// Discovery clusters and bind sequence of an endpoint type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindProfile {
    pub in_clusters: Vec<u16>,
    pub out_clusters: Vec<u16>,
    pub steps: Vec<BindStep>,
}

impl BindProfile {
    /// Find servers of `clusters` and bind to each, in order.
    pub fn client_of(clusters: &[u16]) -> Self {
        Self {
            in_clusters: clusters.to_vec(),
            out_clusters: clusters.to_vec(),
            steps: clusters.iter().copied().map(BindStep::outbound).collect(),
        }
    }
}

/// In-flight discover/bind sequence.
struct BindAttempt {
    endpoint: Arc<dyn ZigbeeEndpoint>,
    steps: Vec<BindStep>,
    current_index: usize,
    candidate: Option<PeerRef>,
}

enum PendingRequest {
    Bind(BindAttempt),
    OtaServer { endpoint: Arc<dyn ZigbeeEndpoint> },
    /// Binding table pages collected so far.
    BindingTable { records: Vec<BindingRecord> },
}

pub struct BindingResolver {
    stack: StackHandle,
    next_token: AtomicU32,
    pending: Mutex<HashMap<RequestToken, PendingRequest>>,
    /// Current attempt per endpoint id; a newer attempt supersedes the old one.
    active: Mutex<HashMap<u8, RequestToken>>,
}

impl BindingResolver {
    pub fn new(stack: StackHandle) -> Self {
        Self {
            stack,
            next_token: AtomicU32::new(1),
            pending: Mutex::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
        }
    }

    fn issue_token(&self) -> RequestToken {
        RequestToken(self.next_token.fetch_add(1, Ordering::SeqCst))
    }

    /// Number of requests waiting for a stack callback.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Start discovery of `short_addr` for `endpoint`. Returns `None` when the
    /// endpoint has no bind profile.
    pub fn find_endpoint(
        &self,
        endpoint: &Arc<dyn ZigbeeEndpoint>,
        short_addr: u16,
    ) -> Option<RequestToken> {
        let profile = endpoint.bind_profile()?;
        let endpoint_id = endpoint.endpoint_id();
        let token = self.issue_token();

        let request = MatchDescRequest {
            dst_nwk_addr: short_addr,
            addr_of_interest: short_addr,
            profile_id: PROFILE_HOME_AUTOMATION,
            in_clusters: profile.in_clusters,
            out_clusters: profile.out_clusters,
        };

        let attempt = BindAttempt {
            endpoint: endpoint.clone(),
            steps: profile.steps,
            current_index: 0,
            candidate: None,
        };

        {
            let mut pending = self.pending.lock();
            if let Some(previous) = self.active.lock().insert(endpoint_id, token)
                && pending.remove(&previous).is_some()
            {
                debug!(
                    "[Binding] Endpoint {} attempt {} superseded by {}",
                    endpoint_id, previous, token
                );
            }
            pending.insert(token, PendingRequest::Bind(attempt));
        }

        debug!(
            "[Binding] Endpoint {} searching 0x{:04x} ({})",
            endpoint_id, short_addr, token
        );
        self.stack.direct().match_descriptor(request, token);
        Some(token)
    }

    /// Look for an OTA server anywhere on the network.
    pub fn find_ota_server(&self, endpoint: &Arc<dyn ZigbeeEndpoint>) -> RequestToken {
        let token = self.issue_token();
        self.pending.lock().insert(
            token,
            PendingRequest::OtaServer {
                endpoint: endpoint.clone(),
            },
        );
        let request = MatchDescRequest {
            dst_nwk_addr: BROADCAST_RX_ON_WHEN_IDLE,
            addr_of_interest: BROADCAST_RX_ON_WHEN_IDLE,
            profile_id: PROFILE_HOME_AUTOMATION,
            in_clusters: vec![cluster::OTA_UPGRADE],
            out_clusters: Vec::new(),
        };
        info!(
            "[OTA] Endpoint {} searching for an OTA server ({})",
            endpoint.endpoint_id(),
            token
        );
        self.stack.direct().match_descriptor(request, token);
        token
    }

    /// Match-descriptor completion.
    pub fn on_match_result(&self, token: RequestToken, result: MatchResult) {
        let Some(request) = self.pending.lock().remove(&token) else {
            debug!("[Binding] Ignoring stale match result {}", token);
            return;
        };

        match request {
            PendingRequest::OtaServer { endpoint } => self.handle_ota_server(endpoint, result),
            PendingRequest::Bind(attempt) => self.handle_match(token, attempt, result),
            other @ PendingRequest::BindingTable { .. } => {
                self.pending.lock().insert(token, other);
                debug!("[Binding] Unexpected match result for {}", token);
            }
        }
    }

    fn handle_ota_server(&self, endpoint: Arc<dyn ZigbeeEndpoint>, result: MatchResult) {
        if !result.status.is_success() {
            warn!(
                "[OTA] No OTA server found for endpoint {}",
                endpoint.endpoint_id()
            );
            return;
        }
        if let Err(e) = endpoint
            .core()
            .query_ota_image(result.short_addr, result.endpoint)
        {
            warn!("[OTA] Query image failed: {}", e);
        }
    }

    fn handle_match(&self, token: RequestToken, mut attempt: BindAttempt, result: MatchResult) {
        let endpoint_id = attempt.endpoint.endpoint_id();
        if result.status != ZdoStatus::Success {
            info!(
                "[Binding] Endpoint {}: no matching endpoint found",
                endpoint_id
            );
            self.finish(endpoint_id, token);
            return;
        }

        let stack = self.stack.direct();
        let Some(ieee_addr) = stack.ieee_address_of(result.short_addr) else {
            warn!(
                "[Binding] Endpoint {}: no IEEE address known for 0x{:04x}",
                endpoint_id, result.short_addr
            );
            self.finish(endpoint_id, token);
            return;
        };

        info!(
            "[Binding] Endpoint {} found 0x{:04x} endpoint {} ({})",
            endpoint_id,
            result.short_addr,
            result.endpoint,
            format_ieee(&ieee_addr)
        );
        attempt.candidate = Some(PeerRef {
            short_addr: result.short_addr,
            ieee_addr,
            endpoint: result.endpoint,
        });

        if attempt.steps.is_empty() {
            self.complete(token, attempt);
            return;
        }
        self.issue_bind(token, attempt);
    }

    /// Send the bind for `attempt.current_index` under a fresh token and park
    /// the attempt. `previous` is the token of the step that just finished.
    fn issue_bind(&self, previous: RequestToken, attempt: BindAttempt) {
        let Some(candidate) = attempt.candidate else {
            return;
        };
        let step = attempt.steps[attempt.current_index];
        let stack = self.stack.direct();
        let local_ieee = stack.local_ieee_address();
        let local_short = stack.network_info().short_addr;
        let local_endpoint = attempt.endpoint.endpoint_id();

        let request = match step.direction {
            BindDirection::Outbound => BindRequest {
                src_ieee: local_ieee,
                src_endpoint: local_endpoint,
                cluster_id: step.cluster_id,
                dst_ieee: candidate.ieee_addr,
                dst_endpoint: candidate.endpoint,
                req_dst_addr: local_short,
            },
            BindDirection::Inbound => BindRequest {
                src_ieee: candidate.ieee_addr,
                src_endpoint: candidate.endpoint,
                cluster_id: step.cluster_id,
                dst_ieee: local_ieee,
                dst_endpoint: local_endpoint,
                req_dst_addr: candidate.short_addr,
            },
        };

        let token = self.issue_token();
        debug!(
            "[Binding] Endpoint {} binding cluster 0x{:04x} ({}/{}) {}",
            local_endpoint,
            step.cluster_id,
            attempt.current_index + 1,
            attempt.steps.len(),
            token
        );
        {
            let mut pending = self.pending.lock();
            let mut active = self.active.lock();
            if active.get(&local_endpoint) != Some(&previous) {
                debug!(
                    "[Binding] Endpoint {} attempt {} superseded before binding",
                    local_endpoint, previous
                );
                return;
            }
            active.insert(local_endpoint, token);
            pending.insert(token, PendingRequest::Bind(attempt));
        }
        stack.bind(request, token);
    }

    /// Bind completion.
    pub fn on_bind_result(&self, token: RequestToken, status: ZdoStatus) {
        let attempt = {
            let mut pending = self.pending.lock();
            match pending.remove(&token) {
                Some(PendingRequest::Bind(attempt)) if attempt.candidate.is_some() => attempt,
                Some(other) => {
                    // not waiting for a bind; put it back untouched
                    pending.insert(token, other);
                    debug!("[Binding] Unexpected bind result for {}", token);
                    return;
                }
                None => {
                    debug!("[Binding] Ignoring stale bind result {}", token);
                    return;
                }
            }
        };

        let endpoint_id = attempt.endpoint.endpoint_id();
        if !status.is_success() {
            warn!(
                "[Binding] Endpoint {}: bind of cluster 0x{:04x} failed ({:?}), dropping candidate",
                endpoint_id, attempt.steps[attempt.current_index].cluster_id, status
            );
            self.finish(endpoint_id, token);
            return;
        }

        let mut attempt = attempt;
        attempt.current_index += 1;
        if attempt.current_index < attempt.steps.len() {
            self.issue_bind(token, attempt);
        } else {
            self.complete(token, attempt);
        }
    }

    fn complete(&self, token: RequestToken, attempt: BindAttempt) {
        let endpoint_id = attempt.endpoint.endpoint_id();
        if let Some(peer) = attempt.candidate {
            info!(
                "[Binding] Endpoint {} bound to 0x{:04x} endpoint {}",
                endpoint_id, peer.short_addr, peer.endpoint
            );
            attempt.endpoint.core().add_bound_peer(peer);
        }
        self.finish(endpoint_id, token);
    }

    fn finish(&self, endpoint_id: u8, token: RequestToken) {
        let mut active = self.active.lock();
        if active.get(&endpoint_id) == Some(&token) {
            active.remove(&endpoint_id);
        }
    }

    /// Request the local binding table to rebuild bound-peer lists. A newer
    /// search replaces one still in progress.
    pub fn search_bindings(&self) -> RequestToken {
        let token = self.issue_token();
        {
            let mut pending = self.pending.lock();
            pending.retain(|_, r| !matches!(r, PendingRequest::BindingTable { .. }));
            pending.insert(token, PendingRequest::BindingTable { records: vec![] });
        }
        debug!("[Binding] Requesting binding table ({})", token);
        self.stack.direct().binding_table(0, token);
        token
    }

    /// Binding table page completion. The last page updates the endpoints
    /// in `registry`.
    pub fn on_binding_table(
        &self,
        token: RequestToken,
        page: BindingTablePage,
        registry: &EndpointRegistry,
    ) {
        let mut records = {
            let mut pending = self.pending.lock();
            match pending.remove(&token) {
                Some(PendingRequest::BindingTable { records }) => records,
                Some(other) => {
                    pending.insert(token, other);
                    debug!("[Binding] Unexpected binding table page for {}", token);
                    return;
                }
                None => {
                    debug!("[Binding] Ignoring stale binding table page {}", token);
                    return;
                }
            }
        };

        if !page.status.is_success() {
            error!("[Binding] Binding table request failed ({:?})", page.status);
            return;
        }
        debug!(
            "[Binding] Binding table: total {}, index {}, count {}",
            page.total,
            page.start_index,
            page.records.len()
        );

        let next_index = page.start_index + page.records.len();
        let last_page = page.records.is_empty() || next_index >= page.total;
        records.extend(page.records);

        if !last_page {
            let next = self.issue_token();
            self.pending
                .lock()
                .insert(next, PendingRequest::BindingTable { records });
            self.stack.direct().binding_table(next_index, next);
            return;
        }
        self.recall(&records, registry);
    }

    fn recall(&self, records: &[BindingRecord], registry: &EndpointRegistry) {
        let stack = self.stack.direct();
        for endpoint in registry.iter() {
            let core = endpoint.core();
            let endpoint_id = core.endpoint_id();
            for record in records.iter().filter(|r| r.src_endpoint == endpoint_id) {
                let known = core.bound_peers().iter().any(|p| match record.dst {
                    BindingDst::Short(addr) => p.short_addr == addr,
                    BindingDst::Ieee(addr) => p.ieee_addr == addr,
                });
                if known {
                    continue;
                }
                let peer = match record.dst {
                    BindingDst::Short(addr) => PeerRef {
                        short_addr: addr,
                        ieee_addr: stack.ieee_address_of(addr).unwrap_or_default(),
                        endpoint: record.dst_endpoint,
                    },
                    BindingDst::Ieee(addr) => PeerRef {
                        short_addr: stack.short_address_of(&addr).unwrap_or(UNKNOWN_SHORT_ADDR),
                        ieee_addr: addr,
                        endpoint: record.dst_endpoint,
                    },
                };
                info!(
                    "[Binding] Endpoint {} recalled 0x{:04x} endpoint {} ({})",
                    endpoint_id,
                    peer.short_addr,
                    peer.endpoint,
                    format_ieee(&peer.ieee_addr)
                );
                core.add_bound_peer(peer);
            }
        }
    }
}
