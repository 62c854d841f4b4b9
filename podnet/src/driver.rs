//! Backend capability traits.
//!
//! A backend driver realizes networks, subnets, floating IPs, load balancers
//! and pod attachments against a concrete SDN. Each capability group is its
//! own trait so a backend can provide only part of the surface; the
//! dispatcher only ever talks to these traits.
//!
//! Implementations must be safe for concurrent invocation. None of these
//! operations are expected to be idempotent.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{FloatingIp, HostPort, LoadBalancer, Network, PodContext, SessionAffinity, Subnet};

/// Errors reported by a backend driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("internal: {0}")]
    Internal(String),

    /// Error text relayed unchanged from a remote peer.
    #[error("{0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, DriverError>;

#[async_trait]
pub trait Networks: Send + Sync {
    /// Readiness probe behind the `Active` RPC.
    async fn active(&self) -> Result<bool> {
        Ok(true)
    }

    async fn get_network_by_name(&self, name: &str) -> Result<Network>;

    async fn get_network_by_id(&self, id: &str) -> Result<Network>;

    async fn create_network(&self, network: Network) -> Result<()>;

    async fn update_network(&self, network: Network) -> Result<()>;

    async fn delete_network(&self, id: &str) -> Result<()>;

    /// Networks owned by `tenant_id`; all networks when it is empty.
    async fn list_networks(&self, tenant_id: &str) -> Result<Vec<Network>>;
}

#[async_trait]
pub trait Subnets: Send + Sync {
    async fn get_subnet(&self, id: &str) -> Result<Subnet>;

    async fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>>;

    async fn create_subnet(&self, subnet: Subnet) -> Result<()>;

    async fn update_subnet(&self, subnet: Subnet) -> Result<()>;

    async fn delete_subnet(&self, subnet_id: &str, network_id: &str) -> Result<()>;

    /// Route traffic between two subnets.
    async fn connect_subnets(&self, subnet1: &str, subnet2: &str) -> Result<()>;
}

#[async_trait]
pub trait FloatingIps: Send + Sync {
    /// Allocate an unbound floating IP for `tenant_id`.
    async fn create_floating_ip(&self, tenant_id: &str) -> Result<FloatingIp>;

    async fn bind_floating_ip(&self, port_id: &str, floating_ip_id: &str) -> Result<()>;

    async fn unbind_floating_ip(&self, floating_ip_id: &str) -> Result<()>;

    async fn delete_floating_ip(&self, floating_ip_id: &str) -> Result<()>;

    /// Expose a port externally, returning the floating address.
    async fn bind_port_to_external(&self, port_name: &str, tenant_id: &str) -> Result<String>;

    async fn unbind_port_from_external(&self, port_name: &str) -> Result<()>;

    async fn list_floating_ips(&self, floating_network_id: &str) -> Result<Vec<FloatingIp>>;
}

#[async_trait]
pub trait LoadBalancers: Send + Sync {
    async fn get_load_balancer(&self, name: &str) -> Result<LoadBalancer>;

    /// Create a load balancer, returning its virtual IP.
    async fn create_load_balancer(
        &self,
        load_balancer: LoadBalancer,
        affinity: SessionAffinity,
    ) -> Result<String>;

    /// Replace the member hosts and external IPs, returning the virtual IP.
    async fn update_load_balancer(
        &self,
        name: &str,
        hosts: Vec<HostPort>,
        external_ips: Vec<String>,
    ) -> Result<String>;

    async fn delete_load_balancer(&self, name: &str) -> Result<()>;
}

#[async_trait]
pub trait Pods: Send + Sync {
    async fn setup_pod(&self, pod: &PodContext, subnet_id: &str) -> Result<()>;

    async fn teardown_pod(&self, pod: &PodContext) -> Result<()>;

    /// Address assigned to the pod.
    async fn pod_status(&self, pod: &PodContext) -> Result<String>;
}

#[async_trait]
pub trait TenantResolver: Send + Sync {
    async fn check_tenant_id(&self, tenant_id: &str) -> Result<bool>;

    /// Canonical tenant identifier for a caller-supplied tenant string.
    async fn to_tenant_id(&self, raw: &str) -> String;
}

/// The capability set a dispatcher serves.
///
/// Tenant resolution is always required; every other group is optional and
/// its RPC service is only registered when present.
#[derive(Clone)]
pub struct Backend {
    pub tenants: Arc<dyn TenantResolver>,
    pub networks: Option<Arc<dyn Networks>>,
    pub subnets: Option<Arc<dyn Subnets>>,
    pub floating_ips: Option<Arc<dyn FloatingIps>>,
    pub load_balancers: Option<Arc<dyn LoadBalancers>>,
    pub pods: Option<Arc<dyn Pods>>,
}

impl Backend {
    /// A backend with tenant resolution and nothing else.
    pub fn new(tenants: Arc<dyn TenantResolver>) -> Self {
        Self {
            tenants,
            networks: None,
            subnets: None,
            floating_ips: None,
            load_balancers: None,
            pods: None,
        }
    }

    /// Wire a driver that implements every capability.
    pub fn from_driver<D>(driver: Arc<D>) -> Self
    where
        D: Networks + Subnets + FloatingIps + LoadBalancers + Pods + TenantResolver + 'static,
    {
        Self {
            tenants: driver.clone(),
            networks: Some(driver.clone()),
            subnets: Some(driver.clone()),
            floating_ips: Some(driver.clone()),
            load_balancers: Some(driver.clone()),
            pods: Some(driver),
        }
    }

    pub fn with_networks(mut self, networks: Arc<dyn Networks>) -> Self {
        self.networks = Some(networks);
        self
    }

    pub fn with_subnets(mut self, subnets: Arc<dyn Subnets>) -> Self {
        self.subnets = Some(subnets);
        self
    }

    pub fn with_floating_ips(mut self, floating_ips: Arc<dyn FloatingIps>) -> Self {
        self.floating_ips = Some(floating_ips);
        self
    }

    pub fn with_load_balancers(mut self, load_balancers: Arc<dyn LoadBalancers>) -> Self {
        self.load_balancers = Some(load_balancers);
        self
    }

    pub fn with_pods(mut self, pods: Arc<dyn Pods>) -> Self {
        self.pods = Some(pods);
        self
    }
}
