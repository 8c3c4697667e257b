//! SurrealDB implementation of [`DirectoryRepository`].
//!
//! Also carries the provisioning helpers (create organization/tenant,
//! soft-delete) used by the admin flow and the test suites; the engine
//! itself only consumes the read side.

use chrono::{DateTime, Utc};
use orgsync_core::error::OrgSyncResult;
use orgsync_core::models::organization::{CreateOrganization, Organization};
use orgsync_core::models::tenant::{CreateTenant, Tenant, TenantStatus};
use orgsync_core::models::tier::SubscriptionTier;
use orgsync_core::repository::DirectoryRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct OrganizationRow {
    name: String,
    slug: String,
    tier: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRow {
    fn into_organization(self, id: Uuid) -> Result<Organization, DbError> {
        let tier = SubscriptionTier::parse(&self.tier)
            .ok_or_else(|| DbError::Corrupt(format!("unknown tier: {}", self.tier)))?;
        Ok(Organization {
            id,
            name: self.name,
            slug: self.slug,
            tier,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct TenantRow {
    organization_id: Option<String>,
    owner_id: String,
    name: String,
    slug: String,
    tier: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRow {
    fn into_tenant(self, id: Uuid) -> Result<Tenant, DbError> {
        let organization_id = self
            .organization_id
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| DbError::Corrupt(format!("invalid org UUID: {e}")))?;
        let owner_id = Uuid::parse_str(&self.owner_id)
            .map_err(|e| DbError::Corrupt(format!("invalid owner UUID: {e}")))?;
        let tier = SubscriptionTier::parse(&self.tier)
            .ok_or_else(|| DbError::Corrupt(format!("unknown tier: {}", self.tier)))?;
        let status = TenantStatus::parse(&self.status)
            .ok_or_else(|| DbError::Corrupt(format!("unknown status: {}", self.status)))?;
        Ok(Tenant {
            id,
            organization_id,
            owner_id,
            name: self.name,
            slug: self.slug,
            tier,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TenantRowWithId {
    record_id: String,
    organization_id: Option<String>,
    owner_id: String,
    name: String,
    slug: String,
    tier: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRowWithId {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        TenantRow {
            organization_id: self.organization_id,
            owner_id: self.owner_id,
            name: self.name,
            slug: self.slug,
            tier: self.tier,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_tenant(id)
    }
}

/// SurrealDB implementation of the organization directory.
#[derive(Clone)]
pub struct SurrealDirectoryRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDirectoryRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Provision a new organization.
    pub async fn create_organization(
        &self,
        input: CreateOrganization,
    ) -> OrgSyncResult<Organization> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('organization', $id) SET \
                 name = $name, slug = $slug, tier = $tier",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("slug", input.slug))
            .bind(("tier", input.tier.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;
        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "organization".into(),
            id: id_str,
        })?;

        Ok(row.into_organization(id)?)
    }

    /// Provision a new tenant (location).
    pub async fn create_tenant(&self, input: CreateTenant) -> OrgSyncResult<Tenant> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('tenant', $id) SET \
                 organization_id = $org_id, owner_id = $owner_id, \
                 name = $name, slug = $slug, tier = $tier, \
                 status = 'active'",
            )
            .bind(("id", id_str.clone()))
            .bind(("org_id", input.organization_id.map(|o| o.to_string())))
            .bind(("owner_id", input.owner_id.to_string()))
            .bind(("name", input.name))
            .bind(("slug", input.slug))
            .bind(("tier", input.tier.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;
        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "tenant".into(),
            id: id_str,
        })?;

        Ok(row.into_tenant(id)?)
    }

    /// Soft-delete or restore a tenant.
    pub async fn set_tenant_status(
        &self,
        id: Uuid,
        status: TenantStatus,
    ) -> OrgSyncResult<()> {
        self.db
            .query(
                "UPDATE type::record('tenant', $id) SET \
                 status = $status, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("status", status.as_str().to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }
}

impl<C: Connection> DirectoryRepository for SurrealDirectoryRepository<C> {
    async fn get_tenant(&self, id: Uuid) -> OrgSyncResult<Tenant> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('tenant', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "tenant".into(),
            id: id_str,
        })?;

        Ok(row.into_tenant(id)?)
    }

    async fn get_organization(&self, id: Uuid) -> OrgSyncResult<Organization> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('organization', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "organization".into(),
            id: id_str,
        })?;

        Ok(row.into_organization(id)?)
    }

    async fn eligible_siblings(&self, source: &Tenant) -> OrgSyncResult<Vec<Tenant>> {
        let source_id = source.id.to_string();

        let mut result = match source.organization_id {
            Some(org_id) => self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM tenant \
                     WHERE organization_id = $org_id \
                     AND status = 'active' \
                     AND meta::id(id) != $source_id \
                     ORDER BY slug ASC",
                )
                .bind(("org_id", org_id.to_string()))
                .bind(("source_id", source_id))
                .await
                .map_err(DbError::from)?,
            None => self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM tenant \
                     WHERE owner_id = $owner_id \
                     AND organization_id = NONE \
                     AND status = 'active' \
                     AND meta::id(id) != $source_id \
                     ORDER BY slug ASC",
                )
                .bind(("owner_id", source.owner_id.to_string()))
                .bind(("source_id", source_id))
                .await
                .map_err(DbError::from)?,
        };

        let rows: Vec<TenantRowWithId> = result.take(0).map_err(DbError::from)?;
        let tenants = rows
            .into_iter()
            .map(|row| row.try_into_tenant())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(tenants)
    }
}
