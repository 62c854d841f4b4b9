//! Audit trail for mutations applied through the dispatcher.
//!
//! Events are emitted on the `podnet::audit` tracing target, so they can be
//! routed or filtered independently of the operational logs. Emitting never
//! blocks a handler.

use std::sync::Arc;

use tracing::info;

/// Audit logger with domain-specific methods.
pub struct AuditLogger {
    enabled: bool,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// Create a noop audit logger (for testing)
    pub fn new_noop() -> Self {
        Self { enabled: false }
    }

    fn record(&self, message: String, object_ids: &[&str]) {
        if !self.enabled {
            return;
        }
        info!(target: "podnet::audit", objects = ?object_ids, "{}", message);
    }

    // === Network Events ===

    pub fn network_created(&self, network_name: &str, tenant_id: &str) {
        self.record(
            format!("Network '{}' created", network_name),
            &[network_name, tenant_id],
        );
    }

    pub fn network_updated(&self, network_id: &str, network_name: &str) {
        self.record(format!("Network '{}' updated", network_name), &[network_id]);
    }

    pub fn network_deleted(&self, network_id: &str) {
        self.record("Network deleted".to_string(), &[network_id]);
    }

    // === Subnet Events ===

    pub fn subnet_created(&self, network_id: &str, cidr: &str) {
        self.record(format!("Subnet {} created", cidr), &[network_id]);
    }

    pub fn subnet_updated(&self, subnet_id: &str) {
        self.record("Subnet updated".to_string(), &[subnet_id]);
    }

    pub fn subnet_deleted(&self, subnet_id: &str, network_id: &str) {
        self.record("Subnet deleted".to_string(), &[subnet_id, network_id]);
    }

    pub fn subnets_connected(&self, subnet1: &str, subnet2: &str) {
        self.record("Subnets connected".to_string(), &[subnet1, subnet2]);
    }

    // === Floating IP Events ===

    pub fn floating_ip_created(&self, floating_ip_id: &str, address: &str) {
        self.record(format!("Floating IP {} allocated", address), &[floating_ip_id]);
    }

    pub fn floating_ip_bound(&self, floating_ip_id: &str, port_id: &str) {
        self.record("Floating IP bound".to_string(), &[floating_ip_id, port_id]);
    }

    pub fn floating_ip_unbound(&self, floating_ip_id: &str) {
        self.record("Floating IP unbound".to_string(), &[floating_ip_id]);
    }

    pub fn floating_ip_deleted(&self, floating_ip_id: &str) {
        self.record("Floating IP released".to_string(), &[floating_ip_id]);
    }

    pub fn port_exposed(&self, port_name: &str, address: &str) {
        self.record(format!("Port exposed at {}", address), &[port_name]);
    }

    pub fn port_unexposed(&self, port_name: &str) {
        self.record("Port external binding removed".to_string(), &[port_name]);
    }

    // === Load Balancer Events ===

    pub fn load_balancer_created(&self, name: &str, vip: &str) {
        self.record(format!("Load balancer '{}' created at {}", name, vip), &[name]);
    }

    pub fn load_balancer_updated(&self, name: &str, hosts: usize) {
        self.record(
            format!("Load balancer '{}' updated ({} hosts)", name, hosts),
            &[name],
        );
    }

    pub fn load_balancer_deleted(&self, name: &str) {
        self.record(format!("Load balancer '{}' deleted", name), &[name]);
    }

    // === Pod Events ===

    pub fn pod_setup(&self, pod: &str, network: &str) {
        self.record(format!("Pod {} attached", pod), &[pod, network]);
    }

    pub fn pod_teardown(&self, pod: &str, network: &str) {
        self.record(format!("Pod {} detached", pod), &[pod, network]);
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a shared audit logger
pub fn create_audit_logger() -> Arc<AuditLogger> {
    Arc::new(AuditLogger::new())
}
