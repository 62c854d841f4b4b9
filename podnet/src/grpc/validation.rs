//! Structural validation of incoming requests.
//!
//! Everything here runs before the backend is contacted. Semantic checks
//! (existence, overlap, conflicts) are left to the backend.

use std::net::IpAddr;

use ipnet::IpNet;
use thiserror::Error;

use super::proto;
use crate::model::{LoadBalancer, Network, PodContext, SessionAffinity, Subnet};

/// Validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("network is required")]
    NetworkRequired,

    #[error("network id or name is required")]
    NetworkIdentifierRequired,

    #[error("network id is required")]
    NetworkIdRequired,

    #[error("network name is required")]
    NetworkNameRequired,

    #[error("subnet is required")]
    SubnetRequired,

    #[error("subnet id is required")]
    SubnetIdRequired,

    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("invalid gateway address: {0}")]
    InvalidGateway(String),

    #[error("floating IP id is required")]
    FloatingIpIdRequired,

    #[error("port id is required")]
    PortIdRequired,

    #[error("port name is required")]
    PortNameRequired,

    #[error("load balancer is required")]
    LoadBalancerRequired,

    #[error("load balancer name is required")]
    LoadBalancerNameRequired,

    #[error("unknown session affinity: {0}")]
    InvalidAffinity(i32),

    #[error("invalid external IP: {0}")]
    InvalidExternalIp(String),

    #[error("invalid host address: {0}")]
    InvalidHostAddress(String),

    #[error("pod name is required")]
    PodNameRequired,

    #[error("pod namespace is required")]
    NamespaceRequired,
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Reject an empty identifier.
pub fn require(value: &str, err: ValidationError) -> Result<()> {
    if value.trim().is_empty() {
        return Err(err);
    }
    Ok(())
}

/// Network payload of a create request.
pub fn network_for_create(network: Option<proto::Network>) -> Result<Network> {
    let network: Network = network.ok_or(ValidationError::NetworkRequired)?.into();
    require(&network.name, ValidationError::NetworkNameRequired)?;
    for subnet in &network.subnets {
        validate_addressing(subnet)?;
    }
    Ok(network)
}

/// Network payload of an update request. Updates address the network by uid.
pub fn network_for_update(network: Option<proto::Network>) -> Result<Network> {
    let network: Network = network.ok_or(ValidationError::NetworkRequired)?.into();
    require(&network.uid, ValidationError::NetworkIdRequired)?;
    Ok(network)
}

/// Subnet payload of a create request.
pub fn subnet_for_create(subnet: Option<proto::Subnet>) -> Result<Subnet> {
    let subnet: Subnet = subnet.ok_or(ValidationError::SubnetRequired)?.into();
    require(&subnet.network_id, ValidationError::NetworkIdRequired)?;
    validate_addressing(&subnet)?;
    Ok(subnet)
}

/// Subnet payload of an update request.
///
/// The gateway is passed through untouched; whether it may change is up to
/// the backend.
pub fn subnet_for_update(subnet: Option<proto::Subnet>) -> Result<Subnet> {
    let subnet: Subnet = subnet.ok_or(ValidationError::SubnetRequired)?.into();
    require(&subnet.uid, ValidationError::SubnetIdRequired)?;
    if !subnet.cidr.is_empty() {
        parse_cidr(&subnet.cidr)?;
    }
    if !subnet.gateway.is_empty() {
        parse_gateway(&subnet.gateway)?;
    }
    Ok(subnet)
}

fn validate_addressing(subnet: &Subnet) -> Result<()> {
    parse_cidr(&subnet.cidr)?;
    if !subnet.gateway.is_empty() {
        parse_gateway(&subnet.gateway)?;
    }
    Ok(())
}

pub fn parse_cidr(cidr: &str) -> Result<IpNet> {
    cidr.parse()
        .map_err(|_| ValidationError::InvalidCidr(cidr.to_string()))
}

fn parse_gateway(gateway: &str) -> Result<IpAddr> {
    gateway
        .parse()
        .map_err(|_| ValidationError::InvalidGateway(gateway.to_string()))
}

pub fn parse_affinity(value: i32) -> Result<SessionAffinity> {
    proto::SessionAffinity::try_from(value)
        .map(Into::into)
        .map_err(|_| ValidationError::InvalidAffinity(value))
}

/// Load balancer payload of a create request.
pub fn load_balancer_for_create(lb: Option<proto::LoadBalancer>) -> Result<LoadBalancer> {
    let lb: LoadBalancer = lb.ok_or(ValidationError::LoadBalancerRequired)?.into();
    require(&lb.name, ValidationError::LoadBalancerNameRequired)?;
    validate_members(
        lb.hosts.iter().map(|h| h.ip_address.as_str()),
        &lb.external_ips,
    )?;
    Ok(lb)
}

/// Host and external IP sets of an update request.
pub fn validate_members<'a>(
    host_addresses: impl IntoIterator<Item = &'a str>,
    external_ips: &[String],
) -> Result<()> {
    for addr in host_addresses {
        addr.parse::<IpAddr>()
            .map_err(|_| ValidationError::InvalidHostAddress(addr.to_string()))?;
    }
    for ip in external_ips {
        ip.parse::<IpAddr>()
            .map_err(|_| ValidationError::InvalidExternalIp(ip.clone()))?;
    }
    Ok(())
}

/// Assemble the pod context shared by setup, teardown and status requests.
pub fn pod_context(
    pod_name: String,
    namespace: String,
    infra_container_id: String,
    container_runtime: String,
    network: Option<proto::Network>,
) -> Result<PodContext> {
    require(&pod_name, ValidationError::PodNameRequired)?;
    require(&namespace, ValidationError::NamespaceRequired)?;
    let network: Network = network.ok_or(ValidationError::NetworkRequired)?.into();
    if network.uid.is_empty() && network.name.is_empty() {
        return Err(ValidationError::NetworkIdentifierRequired);
    }
    Ok(PodContext {
        pod_name,
        namespace,
        infra_container_id,
        container_runtime,
        network,
    })
}
