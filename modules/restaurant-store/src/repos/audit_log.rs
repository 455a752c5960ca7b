use dinekit_db::{ConnectionTrait, EntityRepository, Filters, Page, RecordId};
use dinekit_security::TenantContext;

use crate::error::StoreError;
use crate::models::{AuditEntry, NewAuditEntry, from_record, to_record};
use crate::schemas;

const ENTITY: &str = "audit entry";

/// Append-only audit trail of one restaurant. There is no update or delete.
pub struct AuditLogRepo<'c, C> {
    base: EntityRepository<'c, C>,
}

impl<'c, C> AuditLogRepo<'c, C>
where
    C: ConnectionTrait,
{
    #[must_use]
    pub fn new(conn: &'c C, ctx: TenantContext) -> Self {
        Self {
            base: EntityRepository::new(conn, schemas::audit_logs(), ctx),
        }
    }

    /// # Errors
    /// Returns [`StoreError::Scope`] without an active tenant.
    pub async fn append(&self, entry: &NewAuditEntry) -> Result<RecordId, StoreError> {
        let id = self.base.insert(to_record(ENTITY, entry)?).await?;
        tracing::debug!(id, action = %entry.action, entity = %entry.entity, "audit entry appended");
        Ok(id)
    }

    /// Entries about one entity, oldest first.
    ///
    /// # Errors
    /// Returns [`StoreError::Scope`] on storage failure.
    pub async fn for_entity(
        &self,
        entity: &str,
        entity_id: RecordId,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let filters = Filters::new()
            .eq("entity", entity)
            .eq("entity_id", entity_id);
        self.base
            .find_all(&filters, None, None)
            .await?
            .into_iter()
            .map(|r| from_record(ENTITY, r))
            .collect()
    }

    /// One page of the raw trail.
    ///
    /// # Errors
    /// Returns [`StoreError::Scope`] on storage failure.
    pub async fn page(&self, page_size: u64, page: u64) -> Result<Page, StoreError> {
        Ok(self.base.paginate(&Filters::new(), page_size, page).await?)
    }
}
