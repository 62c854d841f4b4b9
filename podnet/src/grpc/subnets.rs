//! SubnetService: subnet CRUD within a network, plus subnet interconnects.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{debug, info};

use super::ServiceError;
use super::envelope::{common, respond};
use super::proto::subnet_service_server::SubnetService;
use super::proto::*;
use super::tenant;
use super::validation::{self, ValidationError};
use crate::audit::AuditLogger;
use crate::driver::{Subnets, TenantResolver};

/// SubnetService gRPC implementation.
pub struct SubnetServiceImpl {
    subnets: Arc<dyn Subnets>,
    tenants: Arc<dyn TenantResolver>,
    audit: Arc<AuditLogger>,
}

impl SubnetServiceImpl {
    pub fn new(
        subnets: Arc<dyn Subnets>,
        tenants: Arc<dyn TenantResolver>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            subnets,
            tenants,
            audit,
        }
    }
}

#[tonic::async_trait]
impl SubnetService for SubnetServiceImpl {
    async fn get_subnet(
        &self,
        request: Request<GetSubnetRequest>,
    ) -> Result<Response<GetSubnetResponse>, Status> {
        let req = request.into_inner();
        debug!(subnet_id = %req.subnet_id, "GetSubnet");

        let outcome = async {
            validation::require(&req.subnet_id, ValidationError::SubnetIdRequired)?;
            Ok::<_, ServiceError>(self.subnets.get_subnet(&req.subnet_id).await?)
        }
        .await;

        Ok(respond("GetSubnet", outcome, |subnet| GetSubnetResponse {
            subnet: Some(subnet.into()),
            ..Default::default()
        }))
    }

    async fn list_subnets(
        &self,
        request: Request<ListSubnetsRequest>,
    ) -> Result<Response<ListSubnetsResponse>, Status> {
        let req = request.into_inner();
        debug!(network_id = %req.network_id, "ListSubnets");

        let outcome = async {
            validation::require(&req.network_id, ValidationError::NetworkIdRequired)?;
            Ok::<_, ServiceError>(self.subnets.list_subnets(&req.network_id).await?)
        }
        .await;

        Ok(respond("ListSubnets", outcome, |subnets| {
            ListSubnetsResponse {
                subnets: subnets.into_iter().map(Into::into).collect(),
                ..Default::default()
            }
        }))
    }

    async fn create_subnet(
        &self,
        request: Request<CreateSubnetRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(subnet = ?req.subnet, "CreateSubnet");

        let outcome = async {
            let subnet = validation::subnet_for_create(req.subnet)?;
            let subnet = tenant::normalize(self.tenants.as_ref(), subnet).await;
            let (network_id, cidr) = (subnet.network_id.clone(), subnet.cidr.clone());

            self.subnets.create_subnet(subnet).await?;

            info!(network_id = %network_id, cidr = %cidr, "Subnet created");
            self.audit.subnet_created(&network_id, &cidr);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("CreateSubnet", outcome))
    }

    async fn update_subnet(
        &self,
        request: Request<UpdateSubnetRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(subnet = ?req.subnet, "UpdateSubnet");

        let outcome = async {
            let subnet = validation::subnet_for_update(req.subnet)?;
            let subnet = tenant::normalize_update(self.tenants.as_ref(), subnet).await;
            let uid = subnet.uid.clone();

            self.subnets.update_subnet(subnet).await?;

            info!(id = %uid, "Subnet updated");
            self.audit.subnet_updated(&uid);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("UpdateSubnet", outcome))
    }

    async fn delete_subnet(
        &self,
        request: Request<DeleteSubnetRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(subnet_id = %req.subnet_id, network_id = %req.network_id, "DeleteSubnet");

        let outcome = async {
            validation::require(&req.subnet_id, ValidationError::SubnetIdRequired)?;
            validation::require(&req.network_id, ValidationError::NetworkIdRequired)?;
            self.subnets
                .delete_subnet(&req.subnet_id, &req.network_id)
                .await?;

            info!(id = %req.subnet_id, network_id = %req.network_id, "Subnet deleted");
            self.audit.subnet_deleted(&req.subnet_id, &req.network_id);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("DeleteSubnet", outcome))
    }

    async fn connect_subnets(
        &self,
        request: Request<ConnectSubnetsRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(subnet1 = %req.subnet1, subnet2 = %req.subnet2, "ConnectSubnets");

        let outcome = async {
            validation::require(&req.subnet1, ValidationError::SubnetIdRequired)?;
            validation::require(&req.subnet2, ValidationError::SubnetIdRequired)?;
            self.subnets.connect_subnets(&req.subnet1, &req.subnet2).await?;

            info!(subnet1 = %req.subnet1, subnet2 = %req.subnet2, "Subnets connected");
            self.audit.subnets_connected(&req.subnet1, &req.subnet2);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("ConnectSubnets", outcome))
    }
}
