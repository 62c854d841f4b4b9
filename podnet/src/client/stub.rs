//! Typed operations of [`PodnetClient`].

use tracing::debug;

use super::{ClientError, PodnetClient, Result, in_band, require};
use crate::grpc::proto;
use crate::model::{
    FloatingIp, HostPort, LoadBalancer, Network, PodContext, SessionAffinity, Subnet,
};

impl PodnetClient {
    // === NetworkService ===

    /// Readiness probe. Transport failures are returned as errors.
    pub async fn active(&self) -> Result<bool> {
        let resp = self
            .network_client
            .clone()
            .active(self.request(proto::ActiveRequest {}))
            .await?;
        Ok(resp.into_inner().result)
    }

    pub async fn check_tenant_id(&self, tenant_id: &str) -> Result<bool> {
        let req = proto::CheckTenantIdRequest {
            tenant_id: tenant_id.to_string(),
        };
        let result = self
            .network_client
            .clone()
            .check_tenant_id(self.request(req))
            .await;
        Ok(in_band("CheckTenantId", result)?.result)
    }

    pub async fn get_network_by_name(&self, name: &str) -> Result<Network> {
        require("GetNetwork", name, "network name")?;
        self.get_network(proto::GetNetworkRequest {
            id: String::new(),
            name: name.to_string(),
        })
        .await
    }

    pub async fn get_network_by_id(&self, id: &str) -> Result<Network> {
        require("GetNetwork", id, "network id")?;
        self.get_network(proto::GetNetworkRequest {
            id: id.to_string(),
            name: String::new(),
        })
        .await
    }

    async fn get_network(&self, req: proto::GetNetworkRequest) -> Result<Network> {
        let result = self
            .network_client
            .clone()
            .get_network(self.request(req))
            .await;
        in_band("GetNetwork", result)?
            .network
            .map(Into::into)
            .ok_or(ClientError::MissingField("network"))
    }

    pub async fn create_network(&self, network: Network) -> Result<()> {
        require("CreateNetwork", &network.name, "network name")?;
        debug!(name = %network.name, "Creating network");
        let req = proto::CreateNetworkRequest {
            network: Some(network.into()),
        };
        let result = self
            .network_client
            .clone()
            .create_network(self.request(req))
            .await;
        in_band("CreateNetwork", result).map(drop)
    }

    pub async fn update_network(&self, network: Network) -> Result<()> {
        require("UpdateNetwork", &network.uid, "network id")?;
        let req = proto::UpdateNetworkRequest {
            network: Some(network.into()),
        };
        let result = self
            .network_client
            .clone()
            .update_network(self.request(req))
            .await;
        in_band("UpdateNetwork", result).map(drop)
    }

    pub async fn delete_network(&self, network_id: &str) -> Result<()> {
        require("DeleteNetwork", network_id, "network id")?;
        let req = proto::DeleteNetworkRequest {
            network_id: network_id.to_string(),
        };
        let result = self
            .network_client
            .clone()
            .delete_network(self.request(req))
            .await;
        in_band("DeleteNetwork", result).map(drop)
    }

    pub async fn list_networks(&self, tenant_id: &str) -> Result<Vec<Network>> {
        let req = proto::ListNetworksRequest {
            tenant_id: tenant_id.to_string(),
        };
        let result = self
            .network_client
            .clone()
            .list_networks(self.request(req))
            .await;
        Ok(in_band("ListNetworks", result)?
            .networks
            .into_iter()
            .map(Into::into)
            .collect())
    }

    // === SubnetService ===

    pub async fn get_subnet(&self, subnet_id: &str) -> Result<Subnet> {
        require("GetSubnet", subnet_id, "subnet id")?;
        let req = proto::GetSubnetRequest {
            subnet_id: subnet_id.to_string(),
        };
        let result = self.subnet_client.clone().get_subnet(self.request(req)).await;
        in_band("GetSubnet", result)?
            .subnet
            .map(Into::into)
            .ok_or(ClientError::MissingField("subnet"))
    }

    pub async fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>> {
        require("ListSubnets", network_id, "network id")?;
        let req = proto::ListSubnetsRequest {
            network_id: network_id.to_string(),
        };
        let result = self
            .subnet_client
            .clone()
            .list_subnets(self.request(req))
            .await;
        Ok(in_band("ListSubnets", result)?
            .subnets
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn create_subnet(&self, subnet: Subnet) -> Result<()> {
        require("CreateSubnet", &subnet.network_id, "network id")?;
        let req = proto::CreateSubnetRequest {
            subnet: Some(subnet.into()),
        };
        let result = self
            .subnet_client
            .clone()
            .create_subnet(self.request(req))
            .await;
        in_band("CreateSubnet", result).map(drop)
    }

    pub async fn update_subnet(&self, subnet: Subnet) -> Result<()> {
        require("UpdateSubnet", &subnet.uid, "subnet id")?;
        let req = proto::UpdateSubnetRequest {
            subnet: Some(subnet.into()),
        };
        let result = self
            .subnet_client
            .clone()
            .update_subnet(self.request(req))
            .await;
        in_band("UpdateSubnet", result).map(drop)
    }

    pub async fn delete_subnet(&self, subnet_id: &str, network_id: &str) -> Result<()> {
        require("DeleteSubnet", subnet_id, "subnet id")?;
        require("DeleteSubnet", network_id, "network id")?;
        let req = proto::DeleteSubnetRequest {
            subnet_id: subnet_id.to_string(),
            network_id: network_id.to_string(),
        };
        let result = self
            .subnet_client
            .clone()
            .delete_subnet(self.request(req))
            .await;
        in_band("DeleteSubnet", result).map(drop)
    }

    pub async fn connect_subnets(&self, subnet1: &str, subnet2: &str) -> Result<()> {
        require("ConnectSubnets", subnet1, "subnet id")?;
        require("ConnectSubnets", subnet2, "subnet id")?;
        let req = proto::ConnectSubnetsRequest {
            subnet1: subnet1.to_string(),
            subnet2: subnet2.to_string(),
        };
        let result = self
            .subnet_client
            .clone()
            .connect_subnets(self.request(req))
            .await;
        in_band("ConnectSubnets", result).map(drop)
    }

    // === FloatingIpService ===

    pub async fn create_floating_ip(&self, tenant_id: &str) -> Result<FloatingIp> {
        let req = proto::CreateFloatingIpRequest {
            tenant_id: tenant_id.to_string(),
        };
        let result = self
            .floating_ip_client
            .clone()
            .create_floating_ip(self.request(req))
            .await;
        in_band("CreateFloatingIp", result)?
            .floating_ip
            .map(Into::into)
            .ok_or(ClientError::MissingField("floating_ip"))
    }

    pub async fn bind_floating_ip(&self, port_id: &str, floating_ip_id: &str) -> Result<()> {
        require("BindFloatingIp", port_id, "port id")?;
        require("BindFloatingIp", floating_ip_id, "floating IP id")?;
        let req = proto::BindFloatingIpRequest {
            port_id: port_id.to_string(),
            floatingip_id: floating_ip_id.to_string(),
        };
        let result = self
            .floating_ip_client
            .clone()
            .bind_floating_ip(self.request(req))
            .await;
        in_band("BindFloatingIp", result).map(drop)
    }

    pub async fn unbind_floating_ip(&self, floating_ip_id: &str) -> Result<()> {
        require("UnbindFloatingIp", floating_ip_id, "floating IP id")?;
        let req = proto::UnbindFloatingIpRequest {
            floatingip_id: floating_ip_id.to_string(),
        };
        let result = self
            .floating_ip_client
            .clone()
            .unbind_floating_ip(self.request(req))
            .await;
        in_band("UnbindFloatingIp", result).map(drop)
    }

    pub async fn delete_floating_ip(&self, floating_ip_id: &str) -> Result<()> {
        require("DelFloatingIp", floating_ip_id, "floating IP id")?;
        let req = proto::DelFloatingIpRequest {
            floatingip_id: floating_ip_id.to_string(),
        };
        let result = self
            .floating_ip_client
            .clone()
            .del_floating_ip(self.request(req))
            .await;
        in_band("DelFloatingIp", result).map(drop)
    }

    pub async fn list_floating_ips(&self, floating_network_id: &str) -> Result<Vec<FloatingIp>> {
        let req = proto::ListFloatingIpsRequest {
            floating_network_id: floating_network_id.to_string(),
        };
        let result = self
            .floating_ip_client
            .clone()
            .list_floating_ips(self.request(req))
            .await;
        Ok(in_band("ListFloatingIps", result)?
            .floatings
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Expose a port externally, returning its floating address.
    pub async fn bind_port_to_external(&self, port_name: &str, tenant_id: &str) -> Result<String> {
        require("BindPortToExternal", port_name, "port name")?;
        let req = proto::BindPortToExternalRequest {
            port_name: port_name.to_string(),
            tenant_id: tenant_id.to_string(),
        };
        let result = self
            .floating_ip_client
            .clone()
            .bind_port_to_external(self.request(req))
            .await;
        Ok(in_band("BindPortToExternal", result)?.floatingip)
    }

    pub async fn unbind_port_from_external(&self, port_name: &str) -> Result<()> {
        require("UnbindPortFromExternal", port_name, "port name")?;
        let req = proto::UnbindPortFromExternalRequest {
            port_name: port_name.to_string(),
        };
        let result = self
            .floating_ip_client
            .clone()
            .unbind_port_from_external(self.request(req))
            .await;
        in_band("UnbindPortFromExternal", result).map(drop)
    }

    // === LoadBalancerService ===

    pub async fn get_load_balancer(&self, name: &str) -> Result<LoadBalancer> {
        require("GetLoadBalancer", name, "load balancer name")?;
        let req = proto::GetLoadBalancerRequest {
            name: name.to_string(),
        };
        let result = self
            .load_balancer_client
            .clone()
            .get_load_balancer(self.request(req))
            .await;
        in_band("GetLoadBalancer", result)?
            .load_balancer
            .map(Into::into)
            .ok_or(ClientError::MissingField("load_balancer"))
    }

    /// Create a load balancer, returning its virtual IP.
    pub async fn create_load_balancer(
        &self,
        load_balancer: LoadBalancer,
        affinity: SessionAffinity,
    ) -> Result<String> {
        require("CreateLoadBalancer", &load_balancer.name, "load balancer name")?;
        let req = proto::CreateLoadBalancerRequest {
            load_balancer: Some(load_balancer.into()),
            affinity: proto::SessionAffinity::from(affinity).into(),
        };
        let result = self
            .load_balancer_client
            .clone()
            .create_load_balancer(self.request(req))
            .await;
        Ok(in_band("CreateLoadBalancer", result)?.vip)
    }

    pub async fn update_load_balancer(
        &self,
        name: &str,
        hosts: Vec<HostPort>,
        external_ips: Vec<String>,
    ) -> Result<String> {
        require("UpdateLoadBalancer", name, "load balancer name")?;
        let req = proto::UpdateLoadBalancerRequest {
            name: name.to_string(),
            hosts: hosts.into_iter().map(Into::into).collect(),
            external_ips,
        };
        let result = self
            .load_balancer_client
            .clone()
            .update_load_balancer(self.request(req))
            .await;
        Ok(in_band("UpdateLoadBalancer", result)?.vip)
    }

    pub async fn delete_load_balancer(&self, name: &str) -> Result<()> {
        require("DeleteLoadBalancer", name, "load balancer name")?;
        let req = proto::DeleteLoadBalancerRequest {
            name: name.to_string(),
        };
        let result = self
            .load_balancer_client
            .clone()
            .delete_load_balancer(self.request(req))
            .await;
        in_band("DeleteLoadBalancer", result).map(drop)
    }

    // === PodService ===

    pub async fn setup_pod(&self, pod: &PodContext, subnet_id: &str) -> Result<()> {
        require("SetupPod", &pod.pod_name, "pod name")?;
        let req = proto::SetupPodRequest {
            pod_name: pod.pod_name.clone(),
            namespace: pod.namespace.clone(),
            pod_infra_container_id: pod.infra_container_id.clone(),
            container_runtime: pod.container_runtime.clone(),
            network: Some(pod.network.clone().into()),
            subnet_id: subnet_id.to_string(),
        };
        let result = self.pod_client.clone().setup_pod(self.request(req)).await;
        in_band("SetupPod", result).map(drop)
    }

    pub async fn teardown_pod(&self, pod: &PodContext) -> Result<()> {
        require("TeardownPod", &pod.pod_name, "pod name")?;
        let req = proto::TeardownPodRequest {
            pod_name: pod.pod_name.clone(),
            namespace: pod.namespace.clone(),
            pod_infra_container_id: pod.infra_container_id.clone(),
            container_runtime: pod.container_runtime.clone(),
            network: Some(pod.network.clone().into()),
        };
        let result = self.pod_client.clone().teardown_pod(self.request(req)).await;
        in_band("TeardownPod", result).map(drop)
    }

    /// Address assigned to the pod.
    pub async fn pod_status(&self, pod: &PodContext) -> Result<String> {
        require("PodStatus", &pod.pod_name, "pod name")?;
        let req = proto::PodStatusRequest {
            pod_name: pod.pod_name.clone(),
            namespace: pod.namespace.clone(),
            pod_infra_container_id: pod.infra_container_id.clone(),
            container_runtime: pod.container_runtime.clone(),
            network: Some(pod.network.clone().into()),
        };
        let result = self.pod_client.clone().pod_status(self.request(req)).await;
        Ok(in_band("PodStatus", result)?.ip)
    }
}
