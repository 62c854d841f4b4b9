//! Resource model shared by the dispatcher, the client stub and backends.
//!
//! These are plain values: no entity here outlives the call that carries it.
//! All persistent state belongs to the backend.

use serde::{Deserialize, Serialize};

/// A tenant network and its ordered subnets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    #[serde(default)]
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
}

/// An address range inside a network.
///
/// The gateway is fixed when the subnet is created. Overlap between sibling
/// subnets is the backend's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    #[serde(default)]
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub network_id: String,
    pub cidr: String,
    #[serde(default)]
    pub gateway: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub dns_nameservers: Vec<String>,
}

/// A publicly reachable address that can be bound to a port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatingIp {
    pub id: String,
    pub address: String,
    pub tenant_id: String,
    /// Port the address is currently bound to.
    pub port_id: Option<String>,
    pub floating_network_id: String,
}

impl FloatingIp {
    pub fn is_bound(&self) -> bool {
        self.port_id.is_some()
    }
}

/// A load balancer member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPort {
    pub name: String,
    pub ip_address: String,
    pub port: u32,
    pub target_port: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub uid: String,
    pub name: String,
    pub tenant_id: String,
    pub hosts: Vec<HostPort>,
    pub external_ips: Vec<String>,
    pub vip: String,
}

/// Session affinity policy requested when a load balancer is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionAffinity {
    #[default]
    None,
    ClientIp,
}

impl SessionAffinity {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionAffinity::None => "None",
            SessionAffinity::ClientIp => "ClientIP",
        }
    }
}

/// Identifies where a pod attaches to the network for setup, teardown and
/// status calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodContext {
    pub pod_name: String,
    pub namespace: String,
    pub infra_container_id: String,
    pub container_runtime: String,
    pub network: Network,
}

impl PodContext {
    /// `namespace/name`, used in logs and as a lookup key.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.pod_name)
    }
}

/// Resources that carry an owning tenant.
///
/// The dispatcher rewrites the tenant of every such resource through the
/// backend's canonical form before creating or updating it.
pub trait TenantScoped {
    fn tenant_id(&self) -> &str;
    fn set_tenant_id(&mut self, tenant_id: String);
}

impl TenantScoped for Network {
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: String) {
        self.tenant_id = tenant_id;
    }
}

impl TenantScoped for Subnet {
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: String) {
        self.tenant_id = tenant_id;
    }
}

impl TenantScoped for LoadBalancer {
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: String) {
        self.tenant_id = tenant_id;
    }
}
