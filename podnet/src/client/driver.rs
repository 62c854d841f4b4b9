//! Driver capability traits backed by a remote podnet backend.

use async_trait::async_trait;

use super::{ClientError, PodnetClient};
use crate::driver::{
    DriverError, FloatingIps, LoadBalancers, Networks, Pods, Result, Subnets, TenantResolver,
};
use crate::model::{
    FloatingIp, HostPort, LoadBalancer, Network, PodContext, SessionAffinity, Subnet,
};

impl From<ClientError> for DriverError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Remote(message) => DriverError::Upstream(message),
            ClientError::InvalidArgument(message) => DriverError::InvalidArgument(message),
            ClientError::MissingField(_) => DriverError::Internal(e.to_string()),
            ClientError::Transport(_) | ClientError::Rpc(_) | ClientError::Inactive(_) => {
                DriverError::Unavailable(e.to_string())
            }
        }
    }
}

#[async_trait]
impl Networks for PodnetClient {
    async fn active(&self) -> Result<bool> {
        Ok(PodnetClient::active(self).await?)
    }

    async fn get_network_by_name(&self, name: &str) -> Result<Network> {
        Ok(PodnetClient::get_network_by_name(self, name).await?)
    }

    async fn get_network_by_id(&self, id: &str) -> Result<Network> {
        Ok(PodnetClient::get_network_by_id(self, id).await?)
    }

    async fn create_network(&self, network: Network) -> Result<()> {
        Ok(PodnetClient::create_network(self, network).await?)
    }

    async fn update_network(&self, network: Network) -> Result<()> {
        Ok(PodnetClient::update_network(self, network).await?)
    }

    async fn delete_network(&self, id: &str) -> Result<()> {
        Ok(PodnetClient::delete_network(self, id).await?)
    }

    async fn list_networks(&self, tenant_id: &str) -> Result<Vec<Network>> {
        Ok(PodnetClient::list_networks(self, tenant_id).await?)
    }
}

#[async_trait]
impl Subnets for PodnetClient {
    async fn get_subnet(&self, id: &str) -> Result<Subnet> {
        Ok(PodnetClient::get_subnet(self, id).await?)
    }

    async fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>> {
        Ok(PodnetClient::list_subnets(self, network_id).await?)
    }

    async fn create_subnet(&self, subnet: Subnet) -> Result<()> {
        Ok(PodnetClient::create_subnet(self, subnet).await?)
    }

    async fn update_subnet(&self, subnet: Subnet) -> Result<()> {
        Ok(PodnetClient::update_subnet(self, subnet).await?)
    }

    async fn delete_subnet(&self, subnet_id: &str, network_id: &str) -> Result<()> {
        Ok(PodnetClient::delete_subnet(self, subnet_id, network_id).await?)
    }

    async fn connect_subnets(&self, subnet1: &str, subnet2: &str) -> Result<()> {
        Ok(PodnetClient::connect_subnets(self, subnet1, subnet2).await?)
    }
}

#[async_trait]
impl FloatingIps for PodnetClient {
    async fn create_floating_ip(&self, tenant_id: &str) -> Result<FloatingIp> {
        Ok(PodnetClient::create_floating_ip(self, tenant_id).await?)
    }

    async fn bind_floating_ip(&self, port_id: &str, floating_ip_id: &str) -> Result<()> {
        Ok(PodnetClient::bind_floating_ip(self, port_id, floating_ip_id).await?)
    }

    async fn unbind_floating_ip(&self, floating_ip_id: &str) -> Result<()> {
        Ok(PodnetClient::unbind_floating_ip(self, floating_ip_id).await?)
    }

    async fn delete_floating_ip(&self, floating_ip_id: &str) -> Result<()> {
        Ok(PodnetClient::delete_floating_ip(self, floating_ip_id).await?)
    }

    async fn bind_port_to_external(&self, port_name: &str, tenant_id: &str) -> Result<String> {
        Ok(PodnetClient::bind_port_to_external(self, port_name, tenant_id).await?)
    }

    async fn unbind_port_from_external(&self, port_name: &str) -> Result<()> {
        Ok(PodnetClient::unbind_port_from_external(self, port_name).await?)
    }

    async fn list_floating_ips(&self, floating_network_id: &str) -> Result<Vec<FloatingIp>> {
        Ok(PodnetClient::list_floating_ips(self, floating_network_id).await?)
    }
}

#[async_trait]
impl LoadBalancers for PodnetClient {
    async fn get_load_balancer(&self, name: &str) -> Result<LoadBalancer> {
        Ok(PodnetClient::get_load_balancer(self, name).await?)
    }

    async fn create_load_balancer(
        &self,
        load_balancer: LoadBalancer,
        affinity: SessionAffinity,
    ) -> Result<String> {
        Ok(PodnetClient::create_load_balancer(self, load_balancer, affinity).await?)
    }

    async fn update_load_balancer(
        &self,
        name: &str,
        hosts: Vec<HostPort>,
        external_ips: Vec<String>,
    ) -> Result<String> {
        Ok(PodnetClient::update_load_balancer(self, name, hosts, external_ips).await?)
    }

    async fn delete_load_balancer(&self, name: &str) -> Result<()> {
        Ok(PodnetClient::delete_load_balancer(self, name).await?)
    }
}

#[async_trait]
impl Pods for PodnetClient {
    async fn setup_pod(&self, pod: &PodContext, subnet_id: &str) -> Result<()> {
        Ok(PodnetClient::setup_pod(self, pod, subnet_id).await?)
    }

    async fn teardown_pod(&self, pod: &PodContext) -> Result<()> {
        Ok(PodnetClient::teardown_pod(self, pod).await?)
    }

    async fn pod_status(&self, pod: &PodContext) -> Result<String> {
        Ok(PodnetClient::pod_status(self, pod).await?)
    }
}

/// Tenants are canonicalized by the remote dispatcher, so identifiers are
/// forwarded unchanged.
#[async_trait]
impl TenantResolver for PodnetClient {
    async fn check_tenant_id(&self, tenant_id: &str) -> Result<bool> {
        Ok(PodnetClient::check_tenant_id(self, tenant_id).await?)
    }

    async fn to_tenant_id(&self, raw: &str) -> String {
        raw.to_string()
    }
}
