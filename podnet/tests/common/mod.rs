//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use podnet::audit::AuditLogger;
use podnet::driver::{
    Backend, DriverError, FloatingIps, LoadBalancers, Networks, Pods, Result, Subnets,
    TenantResolver,
};
use podnet::grpc::PodnetServer;
use podnet::memory::{MemoryConfig, MemoryDriver};
use podnet::model::{
    FloatingIp, HostPort, LoadBalancer, Network, PodContext, SessionAffinity, Subnet,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub fn memory_driver() -> MemoryDriver {
    MemoryDriver::new(
        MemoryConfig::new(
            "172.24.4.0/24".parse().unwrap(),
            "10.254.0.0/16".parse().unwrap(),
        )
        .with_tenant("demo", "t-demo")
        .with_default_tenant("t-admin"),
    )
}

pub fn noop_audit() -> Arc<AuditLogger> {
    Arc::new(AuditLogger::new_noop())
}

pub fn network(name: &str, tenant_id: &str, cidr: &str) -> Network {
    Network {
        name: name.to_string(),
        tenant_id: tenant_id.to_string(),
        subnets: vec![Subnet {
            name: format!("{}-sub", name),
            cidr: cidr.to_string(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn pod(name: &str, network: &str) -> PodContext {
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

/// Memory backend that counts capability calls and records the tenant of
/// every resource it is asked to create or update.
pub struct CountingDriver {
    pub inner: MemoryDriver,
    calls: AtomicUsize,
    seen_tenants: Mutex<Vec<String>>,
    failure: Option<DriverError>,
    active: bool,
}

impl CountingDriver {
    pub fn new() -> Self {
        Self {
            inner: memory_driver(),
            calls: AtomicUsize::new(0),
            seen_tenants: Mutex::new(Vec::new()),
            failure: None,
            active: true,
        }
    }

    /// Every capability call fails with `error`.
    pub fn failing(error: DriverError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new()
        }
    }

    /// `Active` reports false.
    pub fn inactive() -> Self {
        Self {
            active: false,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_tenants(&self) -> Vec<String> {
        self.seen_tenants.lock().unwrap().clone()
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn saw(&self, tenant_id: &str) {
        self.seen_tenants.lock().unwrap().push(tenant_id.to_string());
    }
}

#[async_trait]
impl Networks for CountingDriver {
    async fn active(&self) -> Result<bool> {
        self.enter()?;
        Ok(self.active)
    }

    async fn get_network_by_name(&self, name: &str) -> Result<Network> {
        self.enter()?;
        self.inner.get_network_by_name(name).await
    }

    async fn get_network_by_id(&self, id: &str) -> Result<Network> {
        self.enter()?;
        self.inner.get_network_by_id(id).await
    }

    async fn create_network(&self, network: Network) -> Result<()> {
        self.enter()?;
        self.saw(&network.tenant_id);
        self.inner.create_network(network).await
    }

    async fn update_network(&self, network: Network) -> Result<()> {
        self.enter()?;
        self.saw(&network.tenant_id);
        self.inner.update_network(network).await
    }

    async fn delete_network(&self, id: &str) -> Result<()> {
        self.enter()?;
        self.inner.delete_network(id).await
    }

    async fn list_networks(&self, tenant_id: &str) -> Result<Vec<Network>> {
        self.enter()?;
        self.inner.list_networks(tenant_id).await
    }
}

#[async_trait]
impl Subnets for CountingDriver {
    async fn get_subnet(&self, id: &str) -> Result<Subnet> {
        self.enter()?;
        self.inner.get_subnet(id).await
    }

    async fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>> {
        self.enter()?;
        self.inner.list_subnets(network_id).await
    }

    async fn create_subnet(&self, subnet: Subnet) -> Result<()> {
        self.enter()?;
        self.saw(&subnet.tenant_id);
        self.inner.create_subnet(subnet).await
    }

    async fn update_subnet(&self, subnet: Subnet) -> Result<()> {
        self.enter()?;
        self.saw(&subnet.tenant_id);
        self.inner.update_subnet(subnet).await
    }

    async fn delete_subnet(&self, subnet_id: &str, network_id: &str) -> Result<()> {
        self.enter()?;
        self.inner.delete_subnet(subnet_id, network_id).await
    }

    async fn connect_subnets(&self, subnet1: &str, subnet2: &str) -> Result<()> {
        self.enter()?;
        self.inner.connect_subnets(subnet1, subnet2).await
    }
}

#[async_trait]
impl FloatingIps for CountingDriver {
    async fn create_floating_ip(&self, tenant_id: &str) -> Result<FloatingIp> {
        self.enter()?;
        self.inner.create_floating_ip(tenant_id).await
    }

    async fn bind_floating_ip(&self, port_id: &str, floating_ip_id: &str) -> Result<()> {
        self.enter()?;
        self.inner.bind_floating_ip(port_id, floating_ip_id).await
    }

    async fn unbind_floating_ip(&self, floating_ip_id: &str) -> Result<()> {
        self.enter()?;
        self.inner.unbind_floating_ip(floating_ip_id).await
    }

    async fn delete_floating_ip(&self, floating_ip_id: &str) -> Result<()> {
        self.enter()?;
        self.inner.delete_floating_ip(floating_ip_id).await
    }

    async fn bind_port_to_external(&self, port_name: &str, tenant_id: &str) -> Result<String> {
        self.enter()?;
        self.inner.bind_port_to_external(port_name, tenant_id).await
    }

    async fn unbind_port_from_external(&self, port_name: &str) -> Result<()> {
        self.enter()?;
        self.inner.unbind_port_from_external(port_name).await
    }

    async fn list_floating_ips(&self, floating_network_id: &str) -> Result<Vec<FloatingIp>> {
        self.enter()?;
        self.inner.list_floating_ips(floating_network_id).await
    }
}

#[async_trait]
impl LoadBalancers for CountingDriver {
    async fn get_load_balancer(&self, name: &str) -> Result<LoadBalancer> {
        self.enter()?;
        self.inner.get_load_balancer(name).await
    }

    async fn create_load_balancer(
        &self,
        load_balancer: LoadBalancer,
        affinity: SessionAffinity,
    ) -> Result<String> {
        self.enter()?;
        self.saw(&load_balancer.tenant_id);
        self.inner.create_load_balancer(load_balancer, affinity).await
    }

    async fn update_load_balancer(
        &self,
        name: &str,
        hosts: Vec<HostPort>,
        external_ips: Vec<String>,
    ) -> Result<String> {
        self.enter()?;
        self.inner.update_load_balancer(name, hosts, external_ips).await
    }

    async fn delete_load_balancer(&self, name: &str) -> Result<()> {
        self.enter()?;
        self.inner.delete_load_balancer(name).await
    }
}

#[async_trait]
impl Pods for CountingDriver {
    async fn setup_pod(&self, pod: &PodContext, subnet_id: &str) -> Result<()> {
        self.enter()?;
        self.inner.setup_pod(pod, subnet_id).await
    }

    async fn teardown_pod(&self, pod: &PodContext) -> Result<()> {
        self.enter()?;
        self.inner.teardown_pod(pod).await
    }

    async fn pod_status(&self, pod: &PodContext) -> Result<String> {
        self.enter()?;
        self.inner.pod_status(pod).await
    }
}

#[async_trait]
impl TenantResolver for CountingDriver {
    async fn check_tenant_id(&self, tenant_id: &str) -> Result<bool> {
        self.enter()?;
        self.inner.check_tenant_id(tenant_id).await
    }

    async fn to_tenant_id(&self, raw: &str) -> String {
        self.inner.to_tenant_id(raw).await
    }
}

/// A `PodnetServer` running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::result::Result<(), tonic::transport::Error>>,
}

impl TestServer {
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

pub async fn spawn_server(backend: Backend) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let server = PodnetServer::new(backend).with_audit(noop_audit());
    let handle = tokio::spawn(server.serve(listener, async {
        let _ = rx.await;
    }));

    TestServer {
        addr,
        shutdown: Some(tx),
        handle,
    }
}
