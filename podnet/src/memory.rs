//! In-memory reference backend.
//!
//! Implements every capability against process-local state. Used by
//! `podnetd` when no external SDN is wired in, and by the test suites.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use ipnet::IpNet;
use tracing::debug;
use uuid::Uuid;

use crate::driver::{
    DriverError, FloatingIps, LoadBalancers, Networks, Pods, Result, Subnets, TenantResolver,
};
use crate::model::{
    FloatingIp, HostPort, LoadBalancer, Network, PodContext, SessionAffinity, Subnet,
};

/// Upper bound on addresses scanned per allocation.
const MAX_SCAN: usize = 65536;

/// Address pools and tenant mapping of a [`MemoryDriver`].
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Pool for floating IPs and externally exposed ports.
    pub floating_range: IpNet,
    /// Reported as `floating_network_id` on every floating IP.
    pub floating_network_id: String,
    /// Pool for load balancer VIPs not given by the caller.
    pub vip_range: IpNet,
    /// Tenant name to canonical tenant id.
    pub tenants: HashMap<String, String>,
    /// Tenant id assigned to resources that carry none.
    pub default_tenant: String,
}

impl MemoryConfig {
    pub fn new(floating_range: IpNet, vip_range: IpNet) -> Self {
        Self {
            floating_range,
            floating_network_id: "public".to_string(),
            vip_range,
            tenants: HashMap::new(),
            default_tenant: String::new(),
        }
    }

    pub fn with_floating_network(mut self, id: impl Into<String>) -> Self {
        self.floating_network_id = id.into();
        self
    }

    pub fn with_tenant(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.tenants.insert(name.into(), id.into());
        self
    }

    pub fn with_default_tenant(mut self, id: impl Into<String>) -> Self {
        self.default_tenant = id.into();
        self
    }
}

struct NetworkEntry {
    network: Network,
    /// Subnet ids in creation order.
    subnet_ids: Vec<String>,
}

struct PodEntry {
    network_id: String,
    subnet_id: String,
    address: IpAddr,
}

#[derive(Default)]
struct State {
    networks: BTreeMap<String, NetworkEntry>,
    subnets: HashMap<String, Subnet>,
    /// Connected subnet pairs, smaller id first.
    subnet_links: BTreeSet<(String, String)>,
    floating_ips: HashMap<String, FloatingIp>,
    /// Exposed port name to floating IP id.
    exposed_ports: HashMap<String, String>,
    load_balancers: BTreeMap<String, LoadBalancer>,
    /// Keyed by `namespace/name`.
    pods: HashMap<String, PodEntry>,
}

/// Backend driver keeping all state in memory.
pub struct MemoryDriver {
    config: MemoryConfig,
    state: Mutex<State>,
}

impl MemoryDriver {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Whether the two subnets have been connected.
    pub fn subnets_connected(&self, subnet1: &str, subnet2: &str) -> bool {
        self.state()
            .subnet_links
            .iter()
            .any(|(a, b)| (a == subnet1 && b == subnet2) || (a == subnet2 && b == subnet1))
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn mint_id(id: String) -> String {
    if id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        id
    }
}

fn parse_net(cidr: &str) -> Result<IpNet> {
    cidr.parse::<IpNet>()
        .map(|net| net.trunc())
        .map_err(|_| DriverError::InvalidArgument(format!("invalid CIDR {}", cidr)))
}

fn parse_addr(addr: &str) -> Result<IpAddr> {
    addr.parse()
        .map_err(|_| DriverError::InvalidArgument(format!("invalid address {}", addr)))
}

fn overlaps(a: &IpNet, b: &IpNet) -> bool {
    a.contains(&b.network()) || b.contains(&a.network())
}

/// First host address of `range` not in `used`.
fn allocate(range: &IpNet, used: &HashSet<IpAddr>) -> Option<IpAddr> {
    range
        .hosts()
        .take(MAX_SCAN)
        .find(|addr| !used.contains(addr))
}

impl State {
    fn network(&self, id: &str) -> Result<&NetworkEntry> {
        self.networks
            .get(id)
            .ok_or_else(|| DriverError::NotFound(format!("network {}", id)))
    }

    fn assemble(&self, entry: &NetworkEntry) -> Network {
        let mut network = entry.network.clone();
        network.subnets = entry
            .subnet_ids
            .iter()
            .filter_map(|id| self.subnets.get(id).cloned())
            .collect();
        network
    }

    fn network_id_by_name(&self, name: &str) -> Result<String> {
        let mut matches = self
            .networks
            .iter()
            .filter(|(_, e)| e.network.name == name)
            .map(|(id, _)| id);
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id.clone()),
            (None, _) => Err(DriverError::NotFound(format!("network {}", name))),
            (Some(_), Some(_)) => Err(DriverError::Conflict(format!(
                "network name {} is ambiguous",
                name
            ))),
        }
    }

    fn name_taken(&self, name: &str, tenant_id: &str, except: &str) -> bool {
        self.networks.iter().any(|(id, e)| {
            id != except && e.network.name == name && e.network.tenant_id == tenant_id
        })
    }

    fn has_pods(&self, pred: impl Fn(&PodEntry) -> bool) -> bool {
        self.pods.values().any(pred)
    }

    fn create_network(&mut self, mut network: Network) -> Result<()> {
        if self.name_taken(&network.name, &network.tenant_id, "") {
            return Err(DriverError::AlreadyExists(format!("network {}", network.name)));
        }
        let uid = mint_id(std::mem::take(&mut network.uid));
        if self.networks.contains_key(&uid) {
            return Err(DriverError::AlreadyExists(format!("network {}", uid)));
        }

        let subnets = std::mem::take(&mut network.subnets);
        let tenant_id = network.tenant_id.clone();
        network.uid = uid.clone();
        self.networks.insert(
            uid.clone(),
            NetworkEntry {
                network,
                subnet_ids: Vec::new(),
            },
        );

        for mut subnet in subnets {
            subnet.network_id = uid.clone();
            if subnet.tenant_id.is_empty() {
                subnet.tenant_id = tenant_id.clone();
            }
            if let Err(e) = self.insert_subnet(subnet) {
                self.remove_network(&uid);
                return Err(e);
            }
        }
        Ok(())
    }

    fn update_network(&mut self, network: Network) -> Result<()> {
        let Some(entry) = self.networks.get(&network.uid) else {
            return Err(DriverError::NotFound(format!("network {}", network.uid)));
        };
        let name = if network.name.is_empty() {
            entry.network.name.clone()
        } else {
            network.name
        };
        let tenant_id = if network.tenant_id.is_empty() {
            entry.network.tenant_id.clone()
        } else {
            network.tenant_id
        };
        if self.name_taken(&name, &tenant_id, &network.uid) {
            return Err(DriverError::AlreadyExists(format!("network {}", name)));
        }

        if let Some(entry) = self.networks.get_mut(&network.uid) {
            entry.network.name = name;
            entry.network.tenant_id = tenant_id;
        }
        Ok(())
    }

    fn delete_network(&mut self, id: &str) -> Result<()> {
        self.network(id)?;
        if self.has_pods(|p| p.network_id == id) {
            return Err(DriverError::Conflict(format!(
                "network {} still has attached pods",
                id
            )));
        }
        self.remove_network(id);
        Ok(())
    }

    fn remove_network(&mut self, id: &str) {
        if let Some(entry) = self.networks.remove(id) {
            for subnet_id in entry.subnet_ids {
                self.subnets.remove(&subnet_id);
                self.subnet_links
                    .retain(|(a, b)| *a != subnet_id && *b != subnet_id);
            }
        }
    }

    fn insert_subnet(&mut self, mut subnet: Subnet) -> Result<()> {
        let siblings = self.network(&subnet.network_id)?.subnet_ids.clone();
        let net = parse_net(&subnet.cidr)?;

        for sibling in siblings.iter().filter_map(|id| self.subnets.get(id)) {
            if overlaps(&net, &parse_net(&sibling.cidr)?) {
                return Err(DriverError::Conflict(format!(
                    "CIDR {} overlaps subnet {} ({})",
                    subnet.cidr, sibling.uid, sibling.cidr
                )));
            }
        }

        let gateway = if subnet.gateway.is_empty() {
            net.hosts().next().ok_or_else(|| {
                DriverError::InvalidArgument(format!("CIDR {} has no host addresses", subnet.cidr))
            })?
        } else {
            parse_addr(&subnet.gateway)?
        };
        if !net.contains(&gateway) {
            return Err(DriverError::InvalidArgument(format!(
                "gateway {} is outside {}",
                gateway, subnet.cidr
            )));
        }
        subnet.gateway = gateway.to_string();

        subnet.uid = mint_id(std::mem::take(&mut subnet.uid));
        if self.subnets.contains_key(&subnet.uid) {
            return Err(DriverError::AlreadyExists(format!("subnet {}", subnet.uid)));
        }

        let uid = subnet.uid.clone();
        if let Some(entry) = self.networks.get_mut(&subnet.network_id) {
            entry.subnet_ids.push(uid.clone());
        }
        self.subnets.insert(uid, subnet);
        Ok(())
    }

    fn subnet(&self, id: &str) -> Result<&Subnet> {
        self.subnets
            .get(id)
            .ok_or_else(|| DriverError::NotFound(format!("subnet {}", id)))
    }

    fn update_subnet(&mut self, update: Subnet) -> Result<()> {
        let current = self.subnet(&update.uid)?;

        if !update.network_id.is_empty() && update.network_id != current.network_id {
            return Err(DriverError::Conflict(format!(
                "subnet {} cannot move to another network",
                update.uid
            )));
        }
        if !update.cidr.is_empty() && parse_net(&update.cidr)? != parse_net(&current.cidr)? {
            return Err(DriverError::Conflict(format!(
                "the CIDR of subnet {} cannot be changed",
                update.uid
            )));
        }
        if !update.gateway.is_empty() && parse_addr(&update.gateway)? != parse_addr(&current.gateway)? {
            return Err(DriverError::Conflict(format!(
                "the gateway of subnet {} cannot be changed",
                update.uid
            )));
        }

        if let Some(subnet) = self.subnets.get_mut(&update.uid) {
            if !update.name.is_empty() {
                subnet.name = update.name;
            }
            if !update.tenant_id.is_empty() {
                subnet.tenant_id = update.tenant_id;
            }
            if !update.dns_nameservers.is_empty() {
                subnet.dns_nameservers = update.dns_nameservers;
            }
        }
        Ok(())
    }

    fn delete_subnet(&mut self, subnet_id: &str, network_id: &str) -> Result<()> {
        if self.subnet(subnet_id)?.network_id != network_id {
            return Err(DriverError::NotFound(format!(
                "subnet {} in network {}",
                subnet_id, network_id
            )));
        }
        if self.has_pods(|p| p.subnet_id == subnet_id) {
            return Err(DriverError::Conflict(format!(
                "subnet {} still has attached pods",
                subnet_id
            )));
        }
        self.subnets.remove(subnet_id);
        self.subnet_links
            .retain(|(a, b)| a != subnet_id && b != subnet_id);
        if let Some(entry) = self.networks.get_mut(network_id) {
            entry.subnet_ids.retain(|id| id != subnet_id);
        }
        Ok(())
    }

    fn connect_subnets(&mut self, subnet1: &str, subnet2: &str) -> Result<()> {
        if subnet1 == subnet2 {
            return Err(DriverError::InvalidArgument(format!(
                "subnet {} cannot be connected to itself",
                subnet1
            )));
        }
        let (first, second) = (self.subnet(subnet1)?, self.subnet(subnet2)?);
        if first.tenant_id != second.tenant_id {
            return Err(DriverError::Conflict(format!(
                "subnets {} and {} belong to different tenants",
                subnet1, subnet2
            )));
        }

        let link = if subnet1 < subnet2 {
            (subnet1.to_string(), subnet2.to_string())
        } else {
            (subnet2.to_string(), subnet1.to_string())
        };
        self.subnet_links.insert(link);
        Ok(())
    }

    fn floating_ip_mut(&mut self, id: &str) -> Result<&mut FloatingIp> {
        self.floating_ips
            .get_mut(id)
            .ok_or_else(|| DriverError::NotFound(format!("floating IP {}", id)))
    }

    fn allocate_floating_ip(
        &mut self,
        config: &MemoryConfig,
        tenant_id: &str,
        port_id: Option<String>,
    ) -> Result<FloatingIp> {
        let used: HashSet<IpAddr> = self
            .floating_ips
            .values()
            .filter_map(|f| f.address.parse().ok())
            .collect();
        let address = allocate(&config.floating_range, &used).ok_or_else(|| {
            DriverError::Unavailable(format!(
                "floating IP range {} exhausted",
                config.floating_range
            ))
        })?;

        let fip = FloatingIp {
            id: Uuid::new_v4().to_string(),
            address: address.to_string(),
            tenant_id: tenant_id.to_string(),
            port_id,
            floating_network_id: config.floating_network_id.clone(),
        };
        self.floating_ips.insert(fip.id.clone(), fip.clone());
        Ok(fip)
    }

    fn bind_floating_ip(&mut self, port_id: &str, floating_ip_id: &str) -> Result<()> {
        let fip = self.floating_ip_mut(floating_ip_id)?;
        match fip.port_id.as_deref() {
            Some(bound) if bound != port_id => Err(DriverError::Conflict(format!(
                "floating IP {} is bound to port {}",
                floating_ip_id, bound
            ))),
            _ => {
                fip.port_id = Some(port_id.to_string());
                Ok(())
            }
        }
    }

    fn unbind_floating_ip(&mut self, floating_ip_id: &str) -> Result<()> {
        self.floating_ip_mut(floating_ip_id)?.port_id = None;
        self.exposed_ports.retain(|_, id| *id != floating_ip_id);
        Ok(())
    }

    fn delete_floating_ip(&mut self, floating_ip_id: &str) -> Result<()> {
        if self.floating_ips.remove(floating_ip_id).is_none() {
            return Err(DriverError::NotFound(format!("floating IP {}", floating_ip_id)));
        }
        self.exposed_ports.retain(|_, id| *id != floating_ip_id);
        Ok(())
    }

    fn bind_port_to_external(
        &mut self,
        config: &MemoryConfig,
        port_name: &str,
        tenant_id: &str,
    ) -> Result<String> {
        let existing = self
            .exposed_ports
            .get(port_name)
            .and_then(|id| self.floating_ips.get(id));
        if let Some(fip) = existing {
            return Ok(fip.address.clone());
        }

        let fip = self.allocate_floating_ip(config, tenant_id, Some(port_name.to_string()))?;
        self.exposed_ports.insert(port_name.to_string(), fip.id);
        Ok(fip.address)
    }

    fn unbind_port_from_external(&mut self, port_name: &str) -> Result<()> {
        let id = self
            .exposed_ports
            .remove(port_name)
            .ok_or_else(|| DriverError::NotFound(format!("exposed port {}", port_name)))?;
        self.floating_ips.remove(&id);
        Ok(())
    }

    fn list_floating_ips(&self, floating_network_id: &str) -> Vec<FloatingIp> {
        let mut fips: Vec<FloatingIp> = self
            .floating_ips
            .values()
            .filter(|f| floating_network_id.is_empty() || f.floating_network_id == floating_network_id)
            .cloned()
            .collect();
        fips.sort_by_key(|f| f.address.parse::<IpAddr>().ok());
        fips
    }

    fn load_balancer(&self, name: &str) -> Result<&LoadBalancer> {
        self.load_balancers
            .get(name)
            .ok_or_else(|| DriverError::NotFound(format!("load balancer {}", name)))
    }

    fn create_load_balancer(&mut self, config: &MemoryConfig, mut lb: LoadBalancer) -> Result<String> {
        if self.load_balancers.contains_key(&lb.name) {
            return Err(DriverError::AlreadyExists(format!("load balancer {}", lb.name)));
        }

        let used: HashSet<IpAddr> = self
            .load_balancers
            .values()
            .filter_map(|lb| lb.vip.parse().ok())
            .collect();
        let vip = if lb.vip.is_empty() {
            allocate(&config.vip_range, &used).ok_or_else(|| {
                DriverError::Unavailable(format!("VIP range {} exhausted", config.vip_range))
            })?
        } else {
            let vip = parse_addr(&lb.vip)?;
            if used.contains(&vip) {
                return Err(DriverError::Conflict(format!("VIP {} is in use", vip)));
            }
            vip
        };

        lb.vip = vip.to_string();
        lb.uid = mint_id(std::mem::take(&mut lb.uid));
        self.load_balancers.insert(lb.name.clone(), lb);
        Ok(vip.to_string())
    }

    fn update_load_balancer(
        &mut self,
        name: &str,
        hosts: Vec<HostPort>,
        external_ips: Vec<String>,
    ) -> Result<String> {
        let lb = self
            .load_balancers
            .get_mut(name)
            .ok_or_else(|| DriverError::NotFound(format!("load balancer {}", name)))?;
        lb.hosts = hosts;
        lb.external_ips = external_ips;
        Ok(lb.vip.clone())
    }

    fn resolve_pod_network(&self, network: &Network) -> Result<String> {
        if !network.uid.is_empty() {
            self.network(&network.uid)?;
            Ok(network.uid.clone())
        } else {
            self.network_id_by_name(&network.name)
        }
    }

    fn setup_pod(&mut self, pod: &PodContext, subnet_id: &str) -> Result<IpAddr> {
        let key = pod.qualified_name();
        if self.pods.contains_key(&key) {
            return Err(DriverError::AlreadyExists(format!("pod {}", key)));
        }

        let network_id = self.resolve_pod_network(&pod.network)?;
        let subnet = if subnet_id.is_empty() {
            let first = self.network(&network_id)?.subnet_ids.first().ok_or_else(|| {
                DriverError::Conflict(format!("network {} has no subnets", network_id))
            })?;
            self.subnet(first)?
        } else {
            let subnet = self.subnet(subnet_id)?;
            if subnet.network_id != network_id {
                return Err(DriverError::NotFound(format!(
                    "subnet {} in network {}",
                    subnet_id, network_id
                )));
            }
            subnet
        };

        let net = parse_net(&subnet.cidr)?;
        let mut used: HashSet<IpAddr> = self
            .pods
            .values()
            .filter(|p| p.subnet_id == subnet.uid)
            .map(|p| p.address)
            .collect();
        used.insert(parse_addr(&subnet.gateway)?);
        let address = allocate(&net, &used).ok_or_else(|| {
            DriverError::Unavailable(format!("subnet {} has no free addresses", subnet.uid))
        })?;

        let subnet_id = subnet.uid.clone();
        self.pods.insert(
            key,
            PodEntry {
                network_id,
                subnet_id,
                address,
            },
        );
        Ok(address)
    }
}

#[async_trait]
impl Networks for MemoryDriver {
    async fn get_network_by_name(&self, name: &str) -> Result<Network> {
        let state = self.state();
        let id = state.network_id_by_name(name)?;
        let entry = state.network(&id)?;
        Ok(state.assemble(entry))
    }

    async fn get_network_by_id(&self, id: &str) -> Result<Network> {
        let state = self.state();
        let entry = state.network(id)?;
        Ok(state.assemble(entry))
    }

    async fn create_network(&self, network: Network) -> Result<()> {
        self.state().create_network(network)
    }

    async fn update_network(&self, network: Network) -> Result<()> {
        self.state().update_network(network)
    }

    async fn delete_network(&self, id: &str) -> Result<()> {
        self.state().delete_network(id)
    }

    async fn list_networks(&self, tenant_id: &str) -> Result<Vec<Network>> {
        let state = self.state();
        Ok(state
            .networks
            .values()
            .filter(|e| tenant_id.is_empty() || e.network.tenant_id == tenant_id)
            .map(|e| state.assemble(e))
            .collect())
    }
}

#[async_trait]
impl Subnets for MemoryDriver {
    async fn get_subnet(&self, id: &str) -> Result<Subnet> {
        self.state().subnet(id).cloned()
    }

    async fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>> {
        let state = self.state();
        let entry = state.network(network_id)?;
        Ok(state.assemble(entry).subnets)
    }

    async fn create_subnet(&self, subnet: Subnet) -> Result<()> {
        self.state().insert_subnet(subnet)
    }

    async fn update_subnet(&self, subnet: Subnet) -> Result<()> {
        self.state().update_subnet(subnet)
    }

    async fn delete_subnet(&self, subnet_id: &str, network_id: &str) -> Result<()> {
        self.state().delete_subnet(subnet_id, network_id)
    }

    async fn connect_subnets(&self, subnet1: &str, subnet2: &str) -> Result<()> {
        self.state().connect_subnets(subnet1, subnet2)
    }
}

#[async_trait]
impl FloatingIps for MemoryDriver {
    async fn create_floating_ip(&self, tenant_id: &str) -> Result<FloatingIp> {
        self.state()
            .allocate_floating_ip(&self.config, tenant_id, None)
    }

    async fn bind_floating_ip(&self, port_id: &str, floating_ip_id: &str) -> Result<()> {
        self.state().bind_floating_ip(port_id, floating_ip_id)
    }

    async fn unbind_floating_ip(&self, floating_ip_id: &str) -> Result<()> {
        self.state().unbind_floating_ip(floating_ip_id)
    }

    async fn delete_floating_ip(&self, floating_ip_id: &str) -> Result<()> {
        self.state().delete_floating_ip(floating_ip_id)
    }

    async fn bind_port_to_external(&self, port_name: &str, tenant_id: &str) -> Result<String> {
        self.state()
            .bind_port_to_external(&self.config, port_name, tenant_id)
    }

    async fn unbind_port_from_external(&self, port_name: &str) -> Result<()> {
        self.state().unbind_port_from_external(port_name)
    }

    async fn list_floating_ips(&self, floating_network_id: &str) -> Result<Vec<FloatingIp>> {
        Ok(self.state().list_floating_ips(floating_network_id))
    }
}

#[async_trait]
impl LoadBalancers for MemoryDriver {
    async fn get_load_balancer(&self, name: &str) -> Result<LoadBalancer> {
        self.state().load_balancer(name).cloned()
    }

    async fn create_load_balancer(
        &self,
        load_balancer: LoadBalancer,
        affinity: SessionAffinity,
    ) -> Result<String> {
        debug!(name = %load_balancer.name, affinity = affinity.as_str(), "Creating load balancer");
        self.state()
            .create_load_balancer(&self.config, load_balancer)
    }

    async fn update_load_balancer(
        &self,
        name: &str,
        hosts: Vec<HostPort>,
        external_ips: Vec<String>,
    ) -> Result<String> {
        self.state().update_load_balancer(name, hosts, external_ips)
    }

    async fn delete_load_balancer(&self, name: &str) -> Result<()> {
        self.state()
            .load_balancers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DriverError::NotFound(format!("load balancer {}", name)))
    }
}

#[async_trait]
impl Pods for MemoryDriver {
    async fn setup_pod(&self, pod: &PodContext, subnet_id: &str) -> Result<()> {
        let address = self.state().setup_pod(pod, subnet_id)?;
        debug!(pod = %pod.qualified_name(), address = %address, "Assigned pod address");
        Ok(())
    }

    async fn teardown_pod(&self, pod: &PodContext) -> Result<()> {
        if self.state().pods.remove(&pod.qualified_name()).is_none() {
            debug!(pod = %pod.qualified_name(), "Teardown of unknown pod");
        }
        Ok(())
    }

    async fn pod_status(&self, pod: &PodContext) -> Result<String> {
        let key = pod.qualified_name();
        self.state()
            .pods
            .get(&key)
            .map(|p| p.address.to_string())
            .ok_or_else(|| DriverError::NotFound(format!("pod {}", key)))
    }
}

#[async_trait]
impl TenantResolver for MemoryDriver {
    async fn check_tenant_id(&self, tenant_id: &str) -> Result<bool> {
        if tenant_id.is_empty() {
            return Ok(false);
        }
        if self.config.tenants.is_empty() {
            return Ok(true);
        }
        Ok(tenant_id == self.config.default_tenant
            || self.config.tenants.values().any(|id| id == tenant_id))
    }

    async fn to_tenant_id(&self, raw: &str) -> String {
        if raw.is_empty() {
            return self.config.default_tenant.clone();
        }
        self.config
            .tenants
            .get(raw)
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> MemoryDriver {
        MemoryDriver::new(
            MemoryConfig::new(
                "172.24.4.0/29".parse().unwrap(),
                "10.254.0.0/30".parse().unwrap(),
            )
            .with_tenant("demo", "t-demo")
            .with_default_tenant("t-admin"),
        )
    }

    fn network(name: &str, cidr: &str) -> Network {
        Network {
            name: name.to_string(),
            tenant_id: "t-demo".to_string(),
            subnets: vec![Subnet {
                name: format!("{}-sub", name),
                cidr: cidr.to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn pod(name: &str, network: &str) -> PodContext {
        PodContext {
            pod_name: name.to_string(),
            namespace: "default".to_string(),
            infra_container_id: "37d7676c80c3".to_string(),
            container_runtime: "docker".to_string(),
            network: Network {
                name: network.to_string(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_create_network_mints_ids_and_gateway() {
        let d = driver();
        d.create_network(network("net1", "192.168.1.0/24")).await.unwrap();

        let net = d.get_network_by_name("net1").await.unwrap();
        assert!(!net.uid.is_empty());
        assert_eq!(net.subnets.len(), 1);
        assert_eq!(net.subnets[0].network_id, net.uid);
        assert_eq!(net.subnets[0].gateway, "192.168.1.1");
        assert_eq!(net.subnets[0].tenant_id, "t-demo");

        let by_id = d.get_network_by_id(&net.uid).await.unwrap();
        assert_eq!(by_id, net);
    }

    #[tokio::test]
    async fn test_network_names_unique_per_tenant() {
        let d = driver();
        d.create_network(network("net1", "10.0.0.0/24")).await.unwrap();
        let err = d.create_network(network("net1", "10.1.0.0/24")).await.unwrap_err();
        assert!(matches!(err, DriverError::AlreadyExists(_)));

        let mut other = network("net1", "10.1.0.0/24");
        other.tenant_id = "t-other".to_string();
        d.create_network(other).await.unwrap();

        let err = d.get_network_by_name("net1").await.unwrap_err();
        assert!(matches!(err, DriverError::Conflict(_)));
        assert_eq!(d.list_networks("t-other").await.unwrap().len(), 1);
        assert_eq!(d.list_networks("").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_subnet_rejected() {
        let d = driver();
        d.create_network(network("net1", "10.0.0.0/16")).await.unwrap();
        let net = d.get_network_by_name("net1").await.unwrap();

        let err = d
            .create_subnet(Subnet {
                network_id: net.uid.clone(),
                cidr: "10.0.5.0/24".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Conflict(_)));

        d.create_subnet(Subnet {
            network_id: net.uid.clone(),
            cidr: "10.1.0.0/24".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
        let subnets = d.list_subnets(&net.uid).await.unwrap();
        assert_eq!(subnets.len(), 2);
        assert_eq!(subnets[1].cidr, "10.1.0.0/24");
    }

    #[tokio::test]
    async fn test_failed_embedded_subnet_rolls_back_network() {
        let d = driver();
        let mut net = network("net1", "10.0.0.0/24");
        net.subnets.push(Subnet {
            cidr: "10.0.0.128/25".to_string(),
            ..Default::default()
        });
        assert!(d.create_network(net).await.is_err());
        assert!(d.list_networks("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_cannot_change() {
        let d = driver();
        d.create_network(network("net1", "10.0.0.0/24")).await.unwrap();
        let subnet = d.get_network_by_name("net1").await.unwrap().subnets.remove(0);

        let moved = Subnet {
            gateway: "10.0.0.254".to_string(),
            ..subnet.clone()
        };
        for _ in 0..2 {
            let err = d.update_subnet(moved.clone()).await.unwrap_err();
            assert!(matches!(err, DriverError::Conflict(_)));
        }

        let renamed = Subnet {
            name: "renamed".to_string(),
            dns_nameservers: vec!["8.8.8.8".to_string()],
            ..subnet.clone()
        };
        d.update_subnet(renamed).await.unwrap();
        let stored = d.get_subnet(&subnet.uid).await.unwrap();
        assert_eq!(stored.name, "renamed");
        assert_eq!(stored.gateway, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_floating_ip_bind_conflict() {
        let d = driver();
        let fip = d.create_floating_ip("t-demo").await.unwrap();
        assert_eq!(fip.address, "172.24.4.1");
        assert_eq!(fip.floating_network_id, "public");
        assert!(!fip.is_bound());

        d.bind_floating_ip("port-a", &fip.id).await.unwrap();
        let err = d.bind_floating_ip("port-b", &fip.id).await.unwrap_err();
        assert!(matches!(err, DriverError::Conflict(_)));

        d.unbind_floating_ip(&fip.id).await.unwrap();
        d.bind_floating_ip("port-b", &fip.id).await.unwrap();

        let listed = d.list_floating_ips("public").await.unwrap();
        assert_eq!(listed[0].port_id.as_deref(), Some("port-b"));
        assert!(d.list_floating_ips("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_floating_range_exhaustion() {
        let d = driver();
        // a /29 has six host addresses
        for _ in 0..6 {
            d.create_floating_ip("t-demo").await.unwrap();
        }
        let err = d.create_floating_ip("t-demo").await.unwrap_err();
        assert!(matches!(err, DriverError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_port_exposure_is_stable() {
        let d = driver();
        let first = d.bind_port_to_external("svc-web", "t-demo").await.unwrap();
        let again = d.bind_port_to_external("svc-web", "t-demo").await.unwrap();
        assert_eq!(first, again);

        d.unbind_port_from_external("svc-web").await.unwrap();
        assert!(d.list_floating_ips("").await.unwrap().is_empty());
        assert!(matches!(
            d.unbind_port_from_external("svc-web").await,
            Err(DriverError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unbind_floating_ip_releases_port_exposure() {
        let d = driver();
        let first = d.bind_port_to_external("svc-web", "t-demo").await.unwrap();
        let fip = d.list_floating_ips("").await.unwrap().remove(0);
        assert_eq!(fip.port_id.as_deref(), Some("svc-web"));

        d.unbind_floating_ip(&fip.id).await.unwrap();
        let again = d.bind_port_to_external("svc-web", "t-demo").await.unwrap();
        assert_ne!(again, first);

        let bound: Vec<FloatingIp> = d
            .list_floating_ips("")
            .await
            .unwrap()
            .into_iter()
            .filter(|f| f.is_bound())
            .collect();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].address, again);
        assert_eq!(bound[0].port_id.as_deref(), Some("svc-web"));

        // the detached floating IP stays allocated until deleted
        d.delete_floating_ip(&fip.id).await.unwrap();
        d.unbind_port_from_external("svc-web").await.unwrap();
        assert!(d.list_floating_ips("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subnet_update_keeps_unset_fields() {
        let d = driver();
        let mut net = network("net1", "10.0.0.0/24");
        net.subnets[0].dns_nameservers = vec!["8.8.8.8".to_string()];
        d.create_network(net).await.unwrap();
        let subnet = d.get_network_by_name("net1").await.unwrap().subnets.remove(0);

        d.update_subnet(Subnet {
            uid: subnet.uid.clone(),
            name: "renamed".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
        let stored = d.get_subnet(&subnet.uid).await.unwrap();
        assert_eq!(stored.name, "renamed");
        assert_eq!(stored.tenant_id, "t-demo");
        assert_eq!(stored.dns_nameservers, vec!["8.8.8.8".to_string()]);

        d.update_subnet(Subnet {
            uid: subnet.uid.clone(),
            dns_nameservers: vec!["1.1.1.1".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();
        let stored = d.get_subnet(&subnet.uid).await.unwrap();
        assert_eq!(stored.name, "renamed");
        assert_eq!(stored.dns_nameservers, vec!["1.1.1.1".to_string()]);
    }

    #[tokio::test]
    async fn test_connect_subnets() {
        let d = driver();
        d.create_network(network("net1", "10.0.0.0/24")).await.unwrap();
        d.create_network(network("net2", "10.1.0.0/24")).await.unwrap();
        let mut other = network("net3", "10.2.0.0/24");
        other.tenant_id = "t-other".to_string();
        d.create_network(other).await.unwrap();

        let first = d.get_network_by_name("net1").await.unwrap().subnets.remove(0);
        let second = d.get_network_by_name("net2").await.unwrap().subnets.remove(0);
        let foreign = d.get_network_by_name("net3").await.unwrap().subnets.remove(0);

        d.connect_subnets(&first.uid, &second.uid).await.unwrap();
        // connecting again is a no-op
        d.connect_subnets(&second.uid, &first.uid).await.unwrap();
        assert!(d.subnets_connected(&second.uid, &first.uid));

        assert!(matches!(
            d.connect_subnets(&first.uid, &foreign.uid).await,
            Err(DriverError::Conflict(_))
        ));
        assert!(matches!(
            d.connect_subnets(&first.uid, "missing").await,
            Err(DriverError::NotFound(_))
        ));
        assert!(matches!(
            d.connect_subnets(&first.uid, &first.uid).await,
            Err(DriverError::InvalidArgument(_))
        ));
        assert!(!d.subnets_connected(&first.uid, &foreign.uid));

        d.delete_subnet(&second.uid, &second.network_id).await.unwrap();
        assert!(!d.subnets_connected(&first.uid, &second.uid));
    }

    #[tokio::test]
    async fn test_load_balancer_vip() {
        let d = driver();
        let lb = LoadBalancer {
            name: "web".to_string(),
            ..Default::default()
        };
        let vip = d
            .create_load_balancer(lb.clone(), SessionAffinity::ClientIp)
            .await
            .unwrap();
        assert_eq!(vip, "10.254.0.1");

        let err = d
            .create_load_balancer(lb, SessionAffinity::None)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::AlreadyExists(_)));

        let hosts = vec![HostPort {
            name: "web-0".to_string(),
            ip_address: "10.0.0.2".to_string(),
            port: 80,
            target_port: 8080,
        }];
        let updated = d
            .update_load_balancer("web", hosts.clone(), vec!["203.0.113.7".to_string()])
            .await
            .unwrap();
        assert_eq!(updated, vip);
        assert_eq!(d.get_load_balancer("web").await.unwrap().hosts, hosts);

        d.delete_load_balancer("web").await.unwrap();
        assert!(d.get_load_balancer("web").await.is_err());
    }

    #[tokio::test]
    async fn test_pod_lifecycle() {
        let d = driver();
        d.create_network(network("net1", "10.0.0.0/24")).await.unwrap();

        let web = pod("web-0", "net1");
        d.setup_pod(&web, "").await.unwrap();
        assert_eq!(d.pod_status(&web).await.unwrap(), "10.0.0.2");
        assert!(matches!(
            d.setup_pod(&web, "").await,
            Err(DriverError::AlreadyExists(_))
        ));

        let db = pod("db-0", "net1");
        d.setup_pod(&db, "").await.unwrap();
        assert_eq!(d.pod_status(&db).await.unwrap(), "10.0.0.3");

        let net = d.get_network_by_name("net1").await.unwrap();
        assert!(matches!(
            d.delete_network(&net.uid).await,
            Err(DriverError::Conflict(_))
        ));

        d.teardown_pod(&web).await.unwrap();
        d.teardown_pod(&db).await.unwrap();
        d.teardown_pod(&db).await.unwrap();
        assert!(matches!(
            d.pod_status(&web).await,
            Err(DriverError::NotFound(_))
        ));

        d.delete_network(&net.uid).await.unwrap();
        assert!(d.get_subnet(&net.subnets[0].uid).await.is_err());
    }

    #[tokio::test]
    async fn test_tenant_resolution() {
        let d = driver();
        assert_eq!(d.to_tenant_id("demo").await, "t-demo");
        assert_eq!(d.to_tenant_id("").await, "t-admin");
        assert_eq!(d.to_tenant_id("t-raw").await, "t-raw");

        assert!(d.check_tenant_id("t-demo").await.unwrap());
        assert!(d.check_tenant_id("t-admin").await.unwrap());
        assert!(!d.check_tenant_id("t-unknown").await.unwrap());
        assert!(!d.check_tenant_id("").await.unwrap());
    }
}
