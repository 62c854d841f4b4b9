//! Tenant normalization stage.
//!
//! Runs before every create and update of a tenant-scoped resource so the
//! backend only ever sees its own canonical tenant identifiers. An update
//! leaving the tenant empty keeps it empty: the backend reads that as
//! "unchanged", and resolving it would substitute the default tenant.

use tracing::debug;

use crate::driver::TenantResolver;
use crate::model::TenantScoped;

/// Rewrite the resource's tenant through `TenantResolver::to_tenant_id`.
pub async fn normalize<T: TenantScoped>(resolver: &dyn TenantResolver, mut resource: T) -> T {
    let canonical = resolver.to_tenant_id(resource.tenant_id()).await;
    if canonical != resource.tenant_id() {
        debug!(raw = %resource.tenant_id(), tenant_id = %canonical, "Normalized tenant");
    }
    resource.set_tenant_id(canonical);
    resource
}

/// Like [`normalize`], but an empty tenant passes through untouched.
pub async fn normalize_update<T: TenantScoped>(resolver: &dyn TenantResolver, resource: T) -> T {
    if resource.tenant_id().is_empty() {
        return resource;
    }
    normalize(resolver, resource).await
}
