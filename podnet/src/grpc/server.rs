//! gRPC server assembly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::info;

use super::proto::floating_ip_service_server::FloatingIpServiceServer;
use super::proto::load_balancer_service_server::LoadBalancerServiceServer;
use super::proto::network_service_server::NetworkServiceServer;
use super::proto::pod_service_server::PodServiceServer;
use super::proto::subnet_service_server::SubnetServiceServer;
use super::{
    FloatingIpServiceImpl, LoadBalancerServiceImpl, NetworkServiceImpl, PodServiceImpl,
    SubnetServiceImpl,
};
use crate::audit::{AuditLogger, create_audit_logger};
use crate::driver::Backend;

/// Serves the capabilities of a backend.
///
/// Only services whose capability is present are registered; calls to the
/// others fail at the transport with `Unimplemented`.
pub struct PodnetServer {
    backend: Backend,
    audit: Arc<AuditLogger>,
    request_timeout: Option<Duration>,
}

impl PodnetServer {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            audit: create_audit_logger(),
            request_timeout: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Upper bound for a single request, on top of any client deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Names of the services that will be registered.
    pub fn services(&self) -> Vec<&'static str> {
        let b = &self.backend;
        [
            b.networks.as_ref().map(|_| "NetworkService"),
            b.subnets.as_ref().map(|_| "SubnetService"),
            b.floating_ips.as_ref().map(|_| "FloatingIpService"),
            b.load_balancers.as_ref().map(|_| "LoadBalancerService"),
            b.pods.as_ref().map(|_| "PodService"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Serve on `listener` until `shutdown` completes.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()> + Send,
    {
        info!(services = ?self.services(), "Registering services");

        let Backend {
            tenants,
            networks,
            subnets,
            floating_ips,
            load_balancers,
            pods,
        } = self.backend;
        let audit = self.audit;

        let networks = networks.map(|n| {
            NetworkServiceServer::new(NetworkServiceImpl::new(n, tenants.clone(), audit.clone()))
        });
        let subnets = subnets.map(|s| {
            SubnetServiceServer::new(SubnetServiceImpl::new(s, tenants.clone(), audit.clone()))
        });
        let floating_ips = floating_ips
            .map(|f| FloatingIpServiceServer::new(FloatingIpServiceImpl::new(f, audit.clone())));
        let load_balancers = load_balancers.map(|lb| {
            LoadBalancerServiceServer::new(LoadBalancerServiceImpl::new(
                lb,
                tenants.clone(),
                audit.clone(),
            ))
        });
        let pods = pods.map(|p| PodServiceServer::new(PodServiceImpl::new(p, audit.clone())));

        let mut server = Server::builder();
        if let Some(timeout) = self.request_timeout {
            server = server.timeout(timeout);
        }

        server
            .add_optional_service(networks)
            .add_optional_service(subnets)
            .add_optional_service(floating_ips)
            .add_optional_service(load_balancers)
            .add_optional_service(pods)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .await
    }
}
