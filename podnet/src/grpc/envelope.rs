//! In-band error envelope shared by every response message.
//!
//! A response is either a result or an error string, never both: failures
//! are built from `Default`, so every result field stays at its zero value.

use tonic::Response;
use tracing::warn;

use super::ServiceError;
use super::proto::*;

/// A response message carrying an in-band `error` field.
pub trait Envelope: Default {
    fn error(&self) -> &str;

    fn set_error(&mut self, error: String);

    /// A response holding only `error`.
    fn failed(error: impl ToString) -> Self {
        let mut resp = Self::default();
        resp.set_error(error.to_string());
        resp
    }

    fn is_error(&self) -> bool {
        !self.error().is_empty()
    }
}

macro_rules! envelope {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Envelope for $ty {
                fn error(&self) -> &str {
                    &self.error
                }

                fn set_error(&mut self, error: String) {
                    self.error = error;
                }
            }
        )+
    };
}

envelope!(
    CommonResponse,
    CheckTenantIdResponse,
    GetNetworkResponse,
    ListNetworksResponse,
    GetSubnetResponse,
    ListSubnetsResponse,
    CreateFloatingIpResponse,
    ListFloatingIpsResponse,
    BindPortToExternalResponse,
    GetLoadBalancerResponse,
    CreateLoadBalancerResponse,
    UpdateLoadBalancerResponse,
    PodStatusResponse,
);

/// Map a dispatched outcome into a response.
///
/// `build` only sees successful values; errors become `R::failed`.
pub fn respond<T, R, F>(method: &str, outcome: Result<T, ServiceError>, build: F) -> Response<R>
where
    R: Envelope,
    F: FnOnce(T) -> R,
{
    let resp = match outcome {
        Ok(value) => build(value),
        Err(e) => {
            warn!(method, error = %e, "request failed");
            R::failed(e)
        }
    };
    Response::new(resp)
}

/// Response for operations that only report success or failure.
pub fn common(method: &str, outcome: Result<(), ServiceError>) -> Response<CommonResponse> {
    respond(method, outcome, |()| CommonResponse::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverError;
    use crate::grpc::validation::ValidationError;

    #[test]
    fn test_failed_leaves_results_zeroed() {
        let outcome: Result<Network, ServiceError> =
            Err(DriverError::NotFound("net1".to_string()).into());
        let resp = respond("GetNetwork", outcome, |n| GetNetworkResponse {
            network: Some(n),
            ..Default::default()
        })
        .into_inner();

        assert_eq!(resp.error, "not found: net1");
        assert!(resp.network.is_none());
    }

    #[test]
    fn test_success_has_no_error() {
        let outcome: Result<String, ServiceError> = Ok("10.254.0.1".to_string());
        let resp = respond("CreateLoadBalancer", outcome, |vip| CreateLoadBalancerResponse {
            vip,
            ..Default::default()
        })
        .into_inner();

        assert!(!resp.is_error());
        assert_eq!(resp.vip, "10.254.0.1");
    }

    #[test]
    fn test_validation_error_is_prefixed() {
        let outcome = Err(ValidationError::FloatingIpIdRequired.into());
        let resp = common("DelFloatingIp", outcome).into_inner();
        assert_eq!(resp.error, "invalid request: floating IP id is required");
    }

    #[test]
    fn test_list_failure_drops_partial_results() {
        let resp = ListSubnetsResponse::failed("backend unavailable: timeout");
        assert!(resp.subnets.is_empty());
        assert!(resp.is_error());
    }
}
