//! SurrealDB implementation of [`ConfigGateway`] — the storage side of
//! the seven propagation type handlers.
//!
//! Dispatch is a match keyed on the propagation type; each arm delegates
//! to one domain method. Every apply runs inside a multi-statement
//! transaction scoped to the single target tenant, so one target's
//! failure can never corrupt another's.
//!
//! Apply semantics per descriptor mode:
//! - overwrite domains (products, categories, hours, profile,
//!   brand_assets, feature_flags): delete the target's rows for that
//!   domain and insert the snapshot wholesale;
//! - merge domain (user_roles): upsert keyed by user id — grants on the
//!   target absent from the source are left untouched.
//!
//! Both shapes are idempotent: applying the same snapshot twice yields
//! the same target state as applying it once.

use orgsync_core::error::OrgSyncResult;
use orgsync_core::models::propagation::PropagationType;
use orgsync_core::models::snapshot::{
    BrandAssets, BusinessHours, BusinessProfile, CategoryRecord, ConfigSnapshot, FeatureFlag,
    ProductRecord, RoleAssignment,
};
use orgsync_core::repository::ConfigGateway;
use serde_json::json;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ProductRow {
    sku: String,
    name: String,
    description: Option<String>,
    price_cents: i64,
    tax_rate_bps: u32,
    active: bool,
}

#[derive(Debug, SurrealValue)]
struct CategoryRow {
    slug: String,
    name: String,
    position: u32,
}

#[derive(Debug, SurrealValue)]
struct RoleAssignmentRow {
    user_id: String,
    role: String,
}

#[derive(Debug, SurrealValue)]
struct FeatureFlagRow {
    flag_key: String,
    enabled: bool,
}

/// Row for the singleton domains storing their payload as one
/// FLEXIBLE object.
#[derive(Debug, SurrealValue)]
struct PayloadRow {
    data: serde_json::Value,
}

/// SurrealDB-backed gateway to the seven configuration domains.
#[derive(Clone)]
pub struct SurrealConfigGateway<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealConfigGateway<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    // -- reads ----------------------------------------------------------

    async fn read_products(&self, tenant_id: Uuid) -> OrgSyncResult<Vec<ProductRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM product WHERE tenant_id = $tenant_id \
                 ORDER BY sku ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|r| ProductRecord {
                sku: r.sku,
                name: r.name,
                description: r.description,
                price_cents: r.price_cents,
                tax_rate_bps: r.tax_rate_bps,
                active: r.active,
            })
            .collect())
    }

    async fn read_categories(&self, tenant_id: Uuid) -> OrgSyncResult<Vec<CategoryRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM category WHERE tenant_id = $tenant_id \
                 ORDER BY position ASC, slug ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CategoryRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|r| CategoryRecord {
                slug: r.slug,
                name: r.name,
                position: r.position,
            })
            .collect())
    }

    async fn read_role_assignments(
        &self,
        tenant_id: Uuid,
    ) -> OrgSyncResult<Vec<RoleAssignment>> {
        let mut result = self
            .db
            .query(
                "SELECT user_id, role FROM role_assignment \
                 WHERE tenant_id = $tenant_id ORDER BY user_id ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleAssignmentRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|r| {
                let user_id = Uuid::parse_str(&r.user_id)
                    .map_err(|e| DbError::Corrupt(format!("invalid user UUID: {e}")))?;
                let role = orgsync_core::models::actor::TenantRole::parse(&r.role)
                    .ok_or_else(|| DbError::Corrupt(format!("unknown role: {}", r.role)))?;
                Ok(RoleAssignment { user_id, role })
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn read_feature_flags(&self, tenant_id: Uuid) -> OrgSyncResult<Vec<FeatureFlag>> {
        let mut result = self
            .db
            .query(
                "SELECT flag_key, enabled FROM feature_flag \
                 WHERE tenant_id = $tenant_id ORDER BY flag_key ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FeatureFlagRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|r| FeatureFlag {
                key: r.flag_key,
                enabled: r.enabled,
            })
            .collect())
    }

    /// Read the FLEXIBLE payload of one singleton domain table.
    async fn read_payload<T: serde::de::DeserializeOwned>(
        &self,
        table: &'static str,
        tenant_id: Uuid,
    ) -> OrgSyncResult<T> {
        let query = format!("SELECT data FROM {table} WHERE tenant_id = $tenant_id");
        let mut result = self
            .db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PayloadRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: table.into(),
            id: tenant_id.to_string(),
        })?;

        let payload = serde_json::from_value(row.data)
            .map_err(|e| DbError::Corrupt(format!("undecodable {table} payload: {e}")))?;
        Ok(payload)
    }

    // -- writes ---------------------------------------------------------

    /// Overwrite a collection domain: delete the target's rows, insert
    /// the snapshot. One transaction per target.
    async fn overwrite_rows(
        &self,
        table: &'static str,
        tenant_id: Uuid,
        items: Vec<serde_json::Value>,
    ) -> OrgSyncResult<()> {
        let query = if items.is_empty() {
            format!(
                "BEGIN TRANSACTION; \
                 DELETE {table} WHERE tenant_id = $tenant_id; \
                 COMMIT TRANSACTION;"
            )
        } else {
            format!(
                "BEGIN TRANSACTION; \
                 DELETE {table} WHERE tenant_id = $tenant_id; \
                 INSERT INTO {table} $items; \
                 COMMIT TRANSACTION;"
            )
        };

        self.db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("items", items))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Overwrite a singleton domain's payload. One transaction per
    /// target.
    async fn overwrite_payload<T: serde::Serialize>(
        &self,
        table: &'static str,
        tenant_id: Uuid,
        payload: &T,
    ) -> OrgSyncResult<()> {
        let data = serde_json::to_value(payload)
            .map_err(|e| DbError::Corrupt(format!("unencodable {table} payload: {e}")))?;
        let query = format!(
            "BEGIN TRANSACTION; \
             DELETE {table} WHERE tenant_id = $tenant_id; \
             CREATE {table} SET tenant_id = $tenant_id, data = $data; \
             COMMIT TRANSACTION;"
        );

        self.db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("data", data))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Merge role assignments keyed by user id. Only the user ids named
    /// in the snapshot are replaced; target-local grants survive.
    async fn merge_role_assignments(
        &self,
        tenant_id: Uuid,
        assignments: &[RoleAssignment],
    ) -> OrgSyncResult<()> {
        if assignments.is_empty() {
            return Ok(());
        }

        let user_ids: Vec<String> = assignments.iter().map(|a| a.user_id.to_string()).collect();
        let items: Vec<serde_json::Value> = assignments
            .iter()
            .map(|a| {
                json!({
                    "tenant_id": tenant_id.to_string(),
                    "user_id": a.user_id.to_string(),
                    "role": a.role.as_str(),
                })
            })
            .collect();

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE role_assignment WHERE tenant_id = $tenant_id \
                 AND user_id IN $user_ids; \
                 INSERT INTO role_assignment $items; \
                 COMMIT TRANSACTION;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_ids", user_ids))
            .bind(("items", items))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }
}

fn product_items(tenant_id: Uuid, products: &[ProductRecord]) -> Vec<serde_json::Value> {
    products
        .iter()
        .map(|p| {
            let mut item = json!({
                "tenant_id": tenant_id.to_string(),
                "sku": p.sku,
                "name": p.name,
                "price_cents": p.price_cents,
                "tax_rate_bps": p.tax_rate_bps,
                "active": p.active,
            });
            if let Some(description) = &p.description {
                item["description"] = json!(description);
            }
            item
        })
        .collect()
}

fn category_items(tenant_id: Uuid, categories: &[CategoryRecord]) -> Vec<serde_json::Value> {
    categories
        .iter()
        .map(|c| {
            json!({
                "tenant_id": tenant_id.to_string(),
                "slug": c.slug,
                "name": c.name,
                "position": c.position,
            })
        })
        .collect()
}

fn flag_items(tenant_id: Uuid, flags: &[FeatureFlag]) -> Vec<serde_json::Value> {
    flags
        .iter()
        .map(|f| {
            json!({
                "tenant_id": tenant_id.to_string(),
                "flag_key": f.key,
                "enabled": f.enabled,
            })
        })
        .collect()
}

impl<C: Connection> ConfigGateway for SurrealConfigGateway<C> {
    async fn read_snapshot(
        &self,
        tenant_id: Uuid,
        propagation_type: PropagationType,
    ) -> OrgSyncResult<ConfigSnapshot> {
        match propagation_type {
            PropagationType::Products => {
                Ok(ConfigSnapshot::Products(self.read_products(tenant_id).await?))
            }
            PropagationType::Categories => Ok(ConfigSnapshot::Categories(
                self.read_categories(tenant_id).await?,
            )),
            PropagationType::Hours => Ok(ConfigSnapshot::Hours(
                self.read_payload::<BusinessHours>("business_hours", tenant_id)
                    .await?,
            )),
            PropagationType::Profile => Ok(ConfigSnapshot::Profile(
                self.read_payload::<BusinessProfile>("business_profile", tenant_id)
                    .await?,
            )),
            PropagationType::UserRoles => Ok(ConfigSnapshot::UserRoles(
                self.read_role_assignments(tenant_id).await?,
            )),
            PropagationType::BrandAssets => Ok(ConfigSnapshot::BrandAssets(
                self.read_payload::<BrandAssets>("brand_assets", tenant_id)
                    .await?,
            )),
            PropagationType::FeatureFlags => Ok(ConfigSnapshot::FeatureFlags(
                self.read_feature_flags(tenant_id).await?,
            )),
        }
    }

    async fn apply_snapshot(
        &self,
        tenant_id: Uuid,
        snapshot: &ConfigSnapshot,
    ) -> OrgSyncResult<()> {
        match snapshot {
            ConfigSnapshot::Products(products) => {
                self.overwrite_rows("product", tenant_id, product_items(tenant_id, products))
                    .await
            }
            ConfigSnapshot::Categories(categories) => {
                self.overwrite_rows(
                    "category",
                    tenant_id,
                    category_items(tenant_id, categories),
                )
                .await
            }
            ConfigSnapshot::Hours(hours) => {
                self.overwrite_payload("business_hours", tenant_id, hours)
                    .await
            }
            ConfigSnapshot::Profile(profile) => {
                self.overwrite_payload("business_profile", tenant_id, profile)
                    .await
            }
            ConfigSnapshot::UserRoles(assignments) => {
                self.merge_role_assignments(tenant_id, assignments).await
            }
            ConfigSnapshot::BrandAssets(assets) => {
                self.overwrite_payload("brand_assets", tenant_id, assets)
                    .await
            }
            ConfigSnapshot::FeatureFlags(flags) => {
                self.overwrite_rows("feature_flag", tenant_id, flag_items(tenant_id, flags))
                    .await
            }
        }
    }
}
