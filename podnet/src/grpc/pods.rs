//! PodService: pod network attach, detach and status.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{debug, info};

use super::ServiceError;
use super::envelope::{common, respond};
use super::proto::pod_service_server::PodService;
use super::proto::*;
use super::validation;
use crate::audit::AuditLogger;
use crate::driver::Pods;

/// PodService gRPC implementation.
pub struct PodServiceImpl {
    pods: Arc<dyn Pods>,
    audit: Arc<AuditLogger>,
}

impl PodServiceImpl {
    pub fn new(pods: Arc<dyn Pods>, audit: Arc<AuditLogger>) -> Self {
        Self { pods, audit }
    }
}

#[tonic::async_trait]
impl PodService for PodServiceImpl {
    async fn setup_pod(
        &self,
        request: Request<SetupPodRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(
            pod = %req.pod_name,
            namespace = %req.namespace,
            container = %req.pod_infra_container_id,
            subnet_id = %req.subnet_id,
            "SetupPod"
        );

        let outcome = async {
            let pod = validation::pod_context(
                req.pod_name,
                req.namespace,
                req.pod_infra_container_id,
                req.container_runtime,
                req.network,
            )?;
            self.pods.setup_pod(&pod, &req.subnet_id).await?;

            let name = pod.qualified_name();
            info!(pod = %name, network = %pod.network.name, "Pod network set up");
            self.audit.pod_setup(&name, &pod.network.name);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("SetupPod", outcome))
    }

    async fn teardown_pod(
        &self,
        request: Request<TeardownPodRequest>,
    ) -> Result<Response<CommonResponse>, Status> {
        let req = request.into_inner();
        debug!(
            pod = %req.pod_name,
            namespace = %req.namespace,
            container = %req.pod_infra_container_id,
            "TeardownPod"
        );

        let outcome = async {
            let pod = validation::pod_context(
                req.pod_name,
                req.namespace,
                req.pod_infra_container_id,
                req.container_runtime,
                req.network,
            )?;
            self.pods.teardown_pod(&pod).await?;

            let name = pod.qualified_name();
            info!(pod = %name, network = %pod.network.name, "Pod network torn down");
            self.audit.pod_teardown(&name, &pod.network.name);
            Ok::<(), ServiceError>(())
        }
        .await;

        Ok(common("TeardownPod", outcome))
    }

    async fn pod_status(
        &self,
        request: Request<PodStatusRequest>,
    ) -> Result<Response<PodStatusResponse>, Status> {
        let req = request.into_inner();
        debug!(pod = %req.pod_name, namespace = %req.namespace, "PodStatus");

        let outcome = async {
            let pod = validation::pod_context(
                req.pod_name,
                req.namespace,
                req.pod_infra_container_id,
                req.container_runtime,
                req.network,
            )?;
            Ok::<_, ServiceError>(self.pods.pod_status(&pod).await?)
        }
        .await;

        Ok(respond("PodStatus", outcome, |ip| PodStatusResponse {
            ip,
            ..Default::default()
        }))
    }
}
