//! gRPC dispatcher for the podnet services.
//!
//! Each service validates its request, normalizes tenants, calls the backend
//! capability and maps the outcome into a response. Backend and validation
//! failures are reported in the response's `error` field; a tonic `Status`
//! only ever comes from the transport.

pub mod convert;
pub mod envelope;
pub mod floating_ips;
pub mod load_balancers;
pub mod networks;
pub mod pods;
pub mod server;
pub mod subnets;
pub mod tenant;
pub mod validation;

// Re-export generated protobuf types
pub mod proto {
    tonic::include_proto!("podnet");
}

use thiserror::Error;

use crate::driver::DriverError;
use validation::ValidationError;

pub use envelope::Envelope;
pub use floating_ips::FloatingIpServiceImpl;
pub use load_balancers::LoadBalancerServiceImpl;
pub use networks::NetworkServiceImpl;
pub use pods::PodServiceImpl;
pub use server::PodnetServer;
pub use subnets::SubnetServiceImpl;

/// Failure of a single dispatched call, rendered into the in-band error.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}
