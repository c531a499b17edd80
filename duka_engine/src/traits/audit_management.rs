use crate::{db_types::AuditEntry, traits::AuditQueryFilter, traits::ShopError};

#[allow(async_fn_in_trait)]
pub trait AuditManagement: Clone {
    /// Fetches audit entries matching the filter, newest first.
    async fn fetch_audit_entries(&self, filter: AuditQueryFilter) -> Result<Vec<AuditEntry>, ShopError>;
}
