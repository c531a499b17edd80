use std::fmt::Debug;

use crate::{
    db_types::{AuditEntry, User},
    order_flow_api::require_elevated,
    traits::{AuditManagement, AuditQueryFilter, ShopError},
};

/// Read access to the audit trail. Entries are only ever written by the stores, as part of the change they record.
pub struct AuditApi<B> {
    db: B,
}

impl<B> Debug for AuditApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuditApi")
    }
}

impl<B> AuditApi<B>
where B: AuditManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Audit entries matching `filter`, newest first. Staff only.
    pub async fn entries(&self, filter: AuditQueryFilter, acting_user: &User) -> Result<Vec<AuditEntry>, ShopError> {
        require_elevated(acting_user, "read the audit log")?;
        self.db.fetch_audit_entries(filter).await
    }

    pub async fn history_for_order(&self, order_id: i64, acting_user: &User) -> Result<Vec<AuditEntry>, ShopError> {
        self.entries(AuditQueryFilter::default().with_order_id(order_id), acting_user).await
    }
}
