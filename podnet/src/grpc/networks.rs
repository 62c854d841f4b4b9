//! NetworkService: readiness, tenant checks and network CRUD.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

use super::ServiceError;
use super::envelope::{common, respond};
use super::proto::network_service_server::NetworkService;
use super::proto::*;
use super::tenant;
use super::validation::{self, ValidationError};
use crate::audit::AuditLogger;
use crate::driver::{Networks, TenantResolver};
use crate::model;

/// NetworkService gRPC implementation.
pub struct NetworkServiceImpl {
    networks: Arc<dyn Networks>,
    tenants: Arc<dyn TenantResolver>,
    audit: Arc<AuditLogger>,
}

impl NetworkServiceImpl {
    pub fn new(
        networks: Arc<dyn Networks>,
        tenants: Arc<dyn TenantResolver>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            networks,
            tenants,
            audit,
        }
    }

    /// Resolve a network by ID, falling back to name only when no ID is given.
    async fn resolve_network(&self, id: &str, name: &str) -> Result<model::Network, ServiceError> {
        if !id.is_empty() {
            Ok(self.networks.get_network_by_id(id).await?)
        } else if !name.is_empty() {
            Ok(self.networks.get_network_by_name(name).await?)
        } else {
            Err(ValidationError::NetworkIdentifierRequired.into())
        }
    }
}

#[tonic::async_trait]
impl NetworkService for NetworkServiceImpl {
    async fn active(
        &self,
        _request: Request<ActiveRequest>,
    ) -> Result<Response<ActiveResponse>, Status> {
        let result = match self.networks.active().await {
            Ok(active) => active,
            Err(e) => {
                warn!(error = %e, "Backend readiness probe failed");
                false
            }
        };

        debug!(result, "Active");
        Ok(Response::new(ActiveResponse { result }))
    }

    async fn check_tenant_id(
        &self,
        request: Request<CheckTenantIdRequest>,
    ) -> Result<Response<CheckTenantIdResponse>, Status> {
        let req = request.into_inner();
        debug!(tenant_id = %req.tenant_id, "CheckTenantId");

        let outcome = self
            .tenants
            .check_tenant_id(&req.tenant_id)
            .await
            .map_err(ServiceError::from);

        Ok(respond("CheckTenantId", outcome, |result| {
            CheckTenantIdResponse {
                result,
                ..Default::default()
            }
        }))
    }

    async fn get_network(
        &self,
        request: Request<GetNetworkRequest>,
    ) -> Result<Response<GetNetworkResponse>, Status> {
        let req = request.into_inner();
        debug!(id = %req.id, name = %req.name, "GetNetwork");

        let outcome = self.resolve_network(&req.id, &req.name).await;

        Ok(respond("GetNetwork", outcome, |network| {
            GetNetworkResponse {
                network: Some(network.into()),
                ..Default::default()
            }
        }))
    }

    async fn create_network(
        &self,
        request: Request<CreateNetworkRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(network = ?req.network, "CreateNetwork");

        let outcome = async {
            let network = validation::network_for_create(req.network)?;
            let network = tenant::normalize(self.tenants.as_ref(), network).await;
            let (name, tenant_id) = (network.name.clone(), network.tenant_id.clone());

            self.networks.create_network(network).await?;

            info!(name = %name, tenant_id = %tenant_id, "Network created");
            self.audit.network_created(&name, &tenant_id);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("CreateNetwork", outcome))
    }

    async fn update_network(
        &self,
        request: Request<UpdateNetworkRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(network = ?req.network, "UpdateNetwork");

        let outcome = async {
            let network = validation::network_for_update(req.network)?;
            let network = tenant::normalize_update(self.tenants.as_ref(), network).await;
            let (uid, name) = (network.uid.clone(), network.name.clone());

            self.networks.update_network(network).await?;

            info!(id = %uid, "Network updated");
            self.audit.network_updated(&uid, &name);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("UpdateNetwork", outcome))
    }

    async fn delete_network(
        &self,
        request: Request<DeleteNetworkRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(network_id = %req.network_id, "DeleteNetwork");

        let outcome = async {
            validation::require(&req.network_id, ValidationError::NetworkIdRequired)?;
            self.networks.delete_network(&req.network_id).await?;

            info!(id = %req.network_id, "Network deleted");
            self.audit.network_deleted(&req.network_id);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("DeleteNetwork", outcome))
    }

    async fn list_networks(
        &self,
        request: Request<ListNetworksRequest>,
    ) -> Result<Response<ListNetworksResponse>, Status> {
        let req = request.into_inner();
        debug!(tenant_id = %req.tenant_id, "ListNetworks");

        let outcome = self
            .networks
            .list_networks(&req.tenant_id)
            .await
            .map_err(ServiceError::from);

        Ok(respond("ListNetworks", outcome, |networks| {
            ListNetworksResponse {
                networks: networks.into_iter().map(Into::into).collect(),
                ..Default::default()
            }
        }))
    }
}
