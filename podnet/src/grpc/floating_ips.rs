//! FloatingIpService: floating IP lifecycle and external port bindings.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{debug, info};

use super::ServiceError;
use super::envelope::{common, respond};
use super::proto::floating_ip_service_server::FloatingIpService;
use super::proto::*;
use super::validation::{self, ValidationError};
use crate::audit::AuditLogger;
use crate::driver::FloatingIps;

/// FloatingIpService gRPC implementation.
pub struct FloatingIpServiceImpl {
    floating_ips: Arc<dyn FloatingIps>,
    audit: Arc<AuditLogger>,
}

impl FloatingIpServiceImpl {
    pub fn new(floating_ips: Arc<dyn FloatingIps>, audit: Arc<AuditLogger>) -> Self {
        Self {
            floating_ips,
            audit,
        }
    }
}

#[tonic::async_trait]
impl FloatingIpService for FloatingIpServiceImpl {
    async fn create_floating_ip(
        &self,
        request: Request<CreateFloatingIpRequest>,
    ) -> Result<Response<CreateFloatingIpResponse>, Status> {
        let req = request.into_inner();
        debug!(tenant_id = %req.tenant_id, "CreateFloatingIp");

        let outcome = async {
            let fip = self.floating_ips.create_floating_ip(&req.tenant_id).await?;

            info!(id = %fip.id, address = %fip.address, "Floating IP created");
            self.audit.floating_ip_created(&fip.id, &fip.address);
            Ok::<_, ServiceError>(fip)
        }
        .await;

        Ok(respond("CreateFloatingIp", outcome, |fip| {
            CreateFloatingIpResponse {
                floating_ip: Some(fip.into()),
                ..Default::default()
            }
        }))
    }

    async fn bind_floating_ip(
        &self,
        request: Request<BindFloatingIpRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(port_id = %req.port_id, floatingip_id = %req.floatingip_id, "BindFloatingIp");

        let outcome = async {
            validation::require(&req.port_id, ValidationError::PortIdRequired)?;
            validation::require(&req.floatingip_id, ValidationError::FloatingIpIdRequired)?;
            self.floating_ips
                .bind_floating_ip(&req.port_id, &req.floatingip_id)
                .await?;

            info!(id = %req.floatingip_id, port_id = %req.port_id, "Floating IP bound");
            self.audit
                .floating_ip_bound(&req.floatingip_id, &req.port_id);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("BindFloatingIp", outcome))
    }

    async fn unbind_floating_ip(
        &self,
        request: Request<UnbindFloatingIpRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(floatingip_id = %req.floatingip_id, "UnbindFloatingIp");

        let outcome = async {
            validation::require(&req.floatingip_id, ValidationError::FloatingIpIdRequired)?;
            self.floating_ips
                .unbind_floating_ip(&req.floatingip_id)
                .await?;

            info!(id = %req.floatingip_id, "Floating IP unbound");
            self.audit.floating_ip_unbound(&req.floatingip_id);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("UnbindFloatingIp", outcome))
    }

    async fn del_floating_ip(
        &self,
        request: Request<DelFloatingIpRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(floatingip_id = %req.floatingip_id, "DelFloatingIp");

        let outcome = async {
            validation::require(&req.floatingip_id, ValidationError::FloatingIpIdRequired)?;
            self.floating_ips
                .delete_floating_ip(&req.floatingip_id)
                .await?;

            info!(id = %req.floatingip_id, "Floating IP deleted");
            self.audit.floating_ip_deleted(&req.floatingip_id);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("DelFloatingIp", outcome))
    }

    async fn list_floating_ips(
        &self,
        request: Request<ListFloatingIpsRequest>,
    ) -> Result<Response<ListFloatingIpsResponse>, Status> {
        let req = request.into_inner();
        debug!(floating_network_id = %req.floating_network_id, "ListFloatingIps");

        let outcome = self
            .floating_ips
            .list_floating_ips(&req.floating_network_id)
            .await
            .map_err(ServiceError::from);

        Ok(respond("ListFloatingIps", outcome, |floatings| {
            ListFloatingIpsResponse {
                floatings: floatings.into_iter().map(Into::into).collect(),
                ..Default::default()
            }
        }))
    }

    async fn bind_port_to_external(
        &self,
        request: Request<BindPortToExternalRequest>,
    ) -> Result<Response<BindPortToExternalResponse>, Status> {
        let req = request.into_inner();
        debug!(port_name = %req.port_name, tenant_id = %req.tenant_id, "BindPortToExternal");

        let outcome = async {
            validation::require(&req.port_name, ValidationError::PortNameRequired)?;
            let address = self
                .floating_ips
                .bind_port_to_external(&req.port_name, &req.tenant_id)
                .await?;

            info!(port_name = %req.port_name, address = %address, "Port bound to external network");
            self.audit.port_exposed(&req.port_name, &address);
            Ok::<_, ServiceError>(address)
        }
        .await;

        Ok(respond("BindPortToExternal", outcome, |floatingip| {
            BindPortToExternalResponse {
                floatingip,
                ..Default::default()
            }
        }))
    }

    async fn unbind_port_from_external(
        &self,
        request: Request<UnbindPortFromExternalRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(port_name = %req.port_name, "UnbindPortFromExternal");

        let outcome = async {
            validation::require(&req.port_name, ValidationError::PortNameRequired)?;
            self.floating_ips
                .unbind_port_from_external(&req.port_name)
                .await?;

            info!(port_name = %req.port_name, "Port unbound from external network");
            self.audit.port_unexposed(&req.port_name);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("UnbindPortFromExternal", outcome))
    }
}
