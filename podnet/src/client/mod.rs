//! Client stub for a remote podnet backend.
//!
//! `PodnetClient` holds one HTTP/2 channel shared by the five generated
//! service clients. Every call goes through the same two checks: a transport
//! `Status` is reported first, then a non-empty in-band `error`. A response
//! carrying an error is never returned to the caller.
//!
//! The client also implements every driver capability trait, so it can be
//! plugged into a [`Backend`](crate::driver::Backend) and served again.

mod driver;
mod stub;

use std::time::Duration;

use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Response, Status};
use tracing::{info, warn};

use crate::driver::{FloatingIps, LoadBalancers, Networks, Pods, Subnets};
use crate::grpc::Envelope;
use crate::grpc::proto::floating_ip_service_client::FloatingIpServiceClient;
use crate::grpc::proto::load_balancer_service_client::LoadBalancerServiceClient;
use crate::grpc::proto::network_service_client::NetworkServiceClient;
use crate::grpc::proto::pod_service_client::PodServiceClient;
use crate::grpc::proto::subnet_service_client::SubnetServiceClient;

/// Where and how to reach a backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// e.g. `http://[::1]:4237`
    pub endpoint: String,
    pub connect_timeout: Duration,
    /// Deadline attached to every call; `None` leaves calls unbounded.
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Some(Duration::from_secs(30)),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("rpc failed: {}: {}", .0.code(), .0.message())]
    Rpc(#[from] Status),

    /// In-band error text returned by the backend.
    #[error("{0}")]
    Remote(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("response is missing {0}")]
    MissingField(&'static str),

    #[error("backend at {0} is not active")]
    Inactive(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for a podnet backend.
#[derive(Clone)]
pub struct PodnetClient {
    network_client: NetworkServiceClient<Channel>,
    subnet_client: SubnetServiceClient<Channel>,
    floating_ip_client: FloatingIpServiceClient<Channel>,
    load_balancer_client: LoadBalancerServiceClient<Channel>,
    pod_client: PodServiceClient<Channel>,
    request_timeout: Option<Duration>,
    provider: String,
}

impl PodnetClient {
    /// Dial the backend and verify it reports itself active.
    ///
    /// Fails with [`ClientError::Inactive`] when the probe fails or answers
    /// `false`; no other call is made in that case.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        info!(endpoint = %config.endpoint, "Connecting to backend");
        let channel = Endpoint::from_shared(config.endpoint.clone())
            .map_err(|e| {
                ClientError::InvalidArgument(format!("endpoint {}: {}", config.endpoint, e))
            })?
            .connect_timeout(config.connect_timeout)
            .connect()
            .await
            .inspect_err(|e| warn!(endpoint = %config.endpoint, error = %e, "Failed to connect"))?;

        let client = Self {
            provider: config.endpoint.clone(),
            ..Self::from_channel(channel, config.request_timeout)
        };
        match client.active().await {
            Ok(true) => {
                info!(endpoint = %config.endpoint, "Backend is active");
                Ok(client)
            }
            Ok(false) => {
                warn!(endpoint = %config.endpoint, "Backend reported inactive");
                Err(ClientError::Inactive(config.endpoint))
            }
            Err(e) => {
                warn!(endpoint = %config.endpoint, error = %e, "Readiness probe failed");
                Err(ClientError::Inactive(config.endpoint))
            }
        }
    }

    /// Build a client on an existing channel without probing.
    pub fn from_channel(channel: Channel, request_timeout: Option<Duration>) -> Self {
        Self {
            network_client: NetworkServiceClient::new(channel.clone()),
            subnet_client: SubnetServiceClient::new(channel.clone()),
            floating_ip_client: FloatingIpServiceClient::new(channel.clone()),
            load_balancer_client: LoadBalancerServiceClient::new(channel.clone()),
            pod_client: PodServiceClient::new(channel),
            request_timeout,
            provider: String::new(),
        }
    }

    /// Identifies the backend this client talks to: its endpoint, or empty
    /// for a client built with [`from_channel`](Self::from_channel).
    pub fn provider_name(&self) -> &str {
        &self.provider
    }

    pub fn networks(&self) -> &dyn Networks {
        self
    }

    pub fn subnets(&self) -> &dyn Subnets {
        self
    }

    pub fn floating_ips(&self) -> &dyn FloatingIps {
        self
    }

    pub fn load_balancers(&self) -> &dyn LoadBalancers {
        self
    }

    pub fn pods(&self) -> &dyn Pods {
        self
    }

    fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        if let Some(timeout) = self.request_timeout {
            request.set_timeout(timeout);
        }
        request
    }
}

/// Unwrap a call result: transport status first, then the in-band error.
fn in_band<R: Envelope>(method: &'static str, result: std::result::Result<Response<R>, Status>) -> Result<R> {
    let resp = match result {
        Ok(resp) => resp.into_inner(),
        Err(status) => {
            warn!(method, code = ?status.code(), message = %status.message(), "RPC failed");
            return Err(ClientError::Rpc(status));
        }
    };

    if resp.is_error() {
        warn!(method, error = %resp.error(), "Backend returned error");
        return Err(ClientError::Remote(resp.error().to_string()));
    }
    Ok(resp)
}

/// Contract check performed before any round trip.
fn require(method: &'static str, value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        warn!(method, "{} is required", what);
        return Err(ClientError::InvalidArgument(format!("{} is required", what)));
    }
    Ok(())
}
