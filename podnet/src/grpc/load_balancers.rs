//! LoadBalancerService: load balancer CRUD.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{debug, info};

use super::ServiceError;
use super::envelope::{common, respond};
use super::proto::load_balancer_service_server::LoadBalancerService;
use super::proto::*;
use super::tenant;
use super::validation::{self, ValidationError};
use crate::audit::AuditLogger;
use crate::driver::{LoadBalancers, TenantResolver};
use crate::model;

/// LoadBalancerService gRPC implementation.
pub struct LoadBalancerServiceImpl {
    load_balancers: Arc<dyn LoadBalancers>,
    tenants: Arc<dyn TenantResolver>,
    audit: Arc<AuditLogger>,
}

impl LoadBalancerServiceImpl {
    pub fn new(
        load_balancers: Arc<dyn LoadBalancers>,
        tenants: Arc<dyn TenantResolver>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            load_balancers,
            tenants,
            audit,
        }
    }
}

#[tonic::async_trait]
impl LoadBalancerService for LoadBalancerServiceImpl {
    async fn get_load_balancer(
        &self,
        request: Request<GetLoadBalancerRequest>,
    ) -> Result<Response<GetLoadBalancerResponse>, Status> {
        let req = request.into_inner();
        debug!(name = %req.name, "GetLoadBalancer");

        let outcome = async {
            validation::require(&req.name, ValidationError::LoadBalancerNameRequired)?;
            Ok::<_, ServiceError>(self.load_balancers.get_load_balancer(&req.name).await?)
        }
        .await;

        Ok(respond("GetLoadBalancer", outcome, |lb| {
            GetLoadBalancerResponse {
                load_balancer: Some(lb.into()),
                ..Default::default()
            }
        }))
    }

    async fn create_load_balancer(
        &self,
        request: Request<CreateLoadBalancerRequest>,
    ) -> Result<Response<CreateLoadBalancerResponse>, Status> {
        let req = request.into_inner();
        debug!(load_balancer = ?req.load_balancer, affinity = req.affinity, "CreateLoadBalancer");

        let outcome = async {
            let lb = validation::load_balancer_for_create(req.load_balancer)?;
            let affinity = validation::parse_affinity(req.affinity)?;
            let lb = tenant::normalize(self.tenants.as_ref(), lb).await;
            let name = lb.name.clone();

            let vip = self
                .load_balancers
                .create_load_balancer(lb, affinity)
                .await?;

            info!(name = %name, vip = %vip, affinity = affinity.as_str(), "Load balancer created");
            self.audit.load_balancer_created(&name, &vip);
            Ok::<_, ServiceError>(vip)
        }
        .await;

        Ok(respond("CreateLoadBalancer", outcome, |vip| {
            CreateLoadBalancerResponse {
                vip,
                ..Default::default()
            }
        }))
    }

    async fn update_load_balancer(
        &self,
        request: Request<UpdateLoadBalancerRequest>,
    ) -> Result<Response<UpdateLoadBalancerResponse>, Status> {
        let req = request.into_inner();
        debug!(name = %req.name, hosts = req.hosts.len(), "UpdateLoadBalancer");

        let outcome = async {
            validation::require(&req.name, ValidationError::LoadBalancerNameRequired)?;
            validation::validate_members(
                req.hosts.iter().map(|h| h.ip_address.as_str()),
                &req.external_ips,
            )?;
            let hosts: Vec<model::HostPort> = req.hosts.into_iter().map(Into::into).collect();
            let host_count = hosts.len();

            let vip = self
                .load_balancers
                .update_load_balancer(&req.name, hosts, req.external_ips)
                .await?;

            info!(name = %req.name, vip = %vip, "Load balancer updated");
            self.audit.load_balancer_updated(&req.name, host_count);
            Ok::<_, ServiceError>(vip)
        }
        .await;

        Ok(respond("UpdateLoadBalancer", outcome, |vip| {
            UpdateLoadBalancerResponse {
                vip,
                ..Default::default()
            }
        }))
    }

    async fn delete_load_balancer(
        &self,
        request: Request<DeleteLoadBalancerRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(name = %req.name, "DeleteLoadBalancer");

        let outcome = async {
            validation::require(&req.name, ValidationError::LoadBalancerNameRequired)?;
            self.load_balancers.delete_load_balancer(&req.name).await?;

            info!(name = %req.name, "Load balancer deleted");
            self.audit.load_balancer_deleted(&req.name);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("DeleteLoadBalancer", outcome))
    }
}
