//! SurrealDB implementation of [`IdentityRepository`].
//!
//! Staff accounts and their per-tenant roles. Session issuance and
//! authentication live outside this system; only the resolved actor and
//! role facts are stored here.

use orgsync_core::error::OrgSyncResult;
use orgsync_core::models::actor::{Actor, TenantRole};
use orgsync_core::repository::IdentityRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ActorRow {
    display_name: String,
    platform_admin: bool,
}

#[derive(Debug, SurrealValue)]
struct RoleRow {
    role: String,
}

/// SurrealDB implementation of the identity service contract.
#[derive(Clone)]
pub struct SurrealIdentityRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealIdentityRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Provision a staff account.
    pub async fn create_actor(
        &self,
        display_name: &str,
        platform_admin: bool,
    ) -> OrgSyncResult<Actor> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('staff_account', $id) SET \
                 display_name = $display_name, \
                 platform_admin = $platform_admin",
            )
            .bind(("id", id_str.clone()))
            .bind(("display_name", display_name.to_string()))
            .bind(("platform_admin", platform_admin))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;
        let rows: Vec<ActorRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "staff_account".into(),
            id: id_str,
        })?;

        Ok(Actor {
            id,
            display_name: row.display_name,
            platform_admin: row.platform_admin,
        })
    }

    /// Grant or replace the actor's role on a tenant.
    pub async fn assign_role(
        &self,
        actor_id: Uuid,
        tenant_id: Uuid,
        role: TenantRole,
    ) -> OrgSyncResult<()> {
        self.db
            .query(
                "DELETE tenant_role WHERE actor_id = $actor_id \
                 AND tenant_id = $tenant_id; \
                 CREATE tenant_role SET actor_id = $actor_id, \
                 tenant_id = $tenant_id, role = $role;",
            )
            .bind(("actor_id", actor_id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role", role.as_str().to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }
}

impl<C: Connection> IdentityRepository for SurrealIdentityRepository<C> {
    async fn get_actor(&self, id: Uuid) -> OrgSyncResult<Actor> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('staff_account', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ActorRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "staff_account".into(),
            id: id_str,
        })?;

        Ok(Actor {
            id,
            display_name: row.display_name,
            platform_admin: row.platform_admin,
        })
    }

    async fn role_on(
        &self,
        actor_id: Uuid,
        tenant_id: Uuid,
    ) -> OrgSyncResult<Option<TenantRole>> {
        let mut result = self
            .db
            .query(
                "SELECT role FROM tenant_role WHERE \
                 actor_id = $actor_id AND tenant_id = $tenant_id",
            )
            .bind(("actor_id", actor_id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => {
                let role = TenantRole::parse(&row.role)
                    .ok_or_else(|| DbError::Corrupt(format!("unknown role: {}", row.role)))?;
                Ok(Some(role))
            }
            None => Ok(None),
        }
    }
}
