//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. Nested configuration payloads
//! (hours, profile, brand assets) are stored as FLEXIBLE objects.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizations (global scope)
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD slug ON TABLE organization TYPE string;
DEFINE FIELD tier ON TABLE organization TYPE string \
    ASSERT $value IN ['starter', 'professional', 'enterprise'];
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_slug ON TABLE organization \
    COLUMNS slug UNIQUE;

-- =======================================================================
-- Tenants (locations)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE tenant TYPE option<string>;
DEFINE FIELD owner_id ON TABLE tenant TYPE string;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD slug ON TABLE tenant TYPE string;
DEFINE FIELD tier ON TABLE tenant TYPE string \
    ASSERT $value IN ['starter', 'professional', 'enterprise'];
DEFINE FIELD status ON TABLE tenant TYPE string \
    ASSERT $value IN ['active', 'deleted'];
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_slug ON TABLE tenant COLUMNS slug UNIQUE;

-- =======================================================================
-- Staff accounts and per-tenant roles
-- =======================================================================
DEFINE TABLE staff_account SCHEMAFULL;
DEFINE FIELD display_name ON TABLE staff_account TYPE string;
DEFINE FIELD platform_admin ON TABLE staff_account TYPE bool \
    DEFAULT false;
DEFINE FIELD created_at ON TABLE staff_account TYPE datetime \
    DEFAULT time::now();

DEFINE TABLE tenant_role SCHEMAFULL;
DEFINE FIELD actor_id ON TABLE tenant_role TYPE string;
DEFINE FIELD tenant_id ON TABLE tenant_role TYPE string;
DEFINE FIELD role ON TABLE tenant_role TYPE string \
    ASSERT $value IN ['owner', 'admin', 'manager', 'viewer'];
DEFINE INDEX idx_tenant_role_actor ON TABLE tenant_role \
    COLUMNS actor_id, tenant_id UNIQUE;

-- =======================================================================
-- Configuration domains (tenant scope)
-- =======================================================================
DEFINE TABLE product SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE product TYPE string;
DEFINE FIELD sku ON TABLE product TYPE string;
DEFINE FIELD name ON TABLE product TYPE string;
DEFINE FIELD description ON TABLE product TYPE option<string>;
DEFINE FIELD price_cents ON TABLE product TYPE int;
DEFINE FIELD tax_rate_bps ON TABLE product TYPE int;
DEFINE FIELD active ON TABLE product TYPE bool;
DEFINE INDEX idx_product_tenant_sku ON TABLE product \
    COLUMNS tenant_id, sku UNIQUE;

DEFINE TABLE category SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE category TYPE string;
DEFINE FIELD slug ON TABLE category TYPE string;
DEFINE FIELD name ON TABLE category TYPE string;
DEFINE FIELD position ON TABLE category TYPE int;
DEFINE INDEX idx_category_tenant_slug ON TABLE category \
    COLUMNS tenant_id, slug UNIQUE;

DEFINE TABLE business_hours SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE business_hours TYPE string;
DEFINE FIELD data ON TABLE business_hours TYPE object FLEXIBLE;
DEFINE FIELD updated_at ON TABLE business_hours TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_business_hours_tenant ON TABLE business_hours \
    COLUMNS tenant_id UNIQUE;

DEFINE TABLE business_profile SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE business_profile TYPE string;
DEFINE FIELD data ON TABLE business_profile TYPE object FLEXIBLE;
DEFINE FIELD updated_at ON TABLE business_profile TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_business_profile_tenant ON TABLE business_profile \
    COLUMNS tenant_id UNIQUE;

DEFINE TABLE brand_assets SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE brand_assets TYPE string;
DEFINE FIELD data ON TABLE brand_assets TYPE object FLEXIBLE;
DEFINE FIELD updated_at ON TABLE brand_assets TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_brand_assets_tenant ON TABLE brand_assets \
    COLUMNS tenant_id UNIQUE;

DEFINE TABLE role_assignment SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE role_assignment TYPE string;
DEFINE FIELD user_id ON TABLE role_assignment TYPE string;
DEFINE FIELD role ON TABLE role_assignment TYPE string \
    ASSERT $value IN ['owner', 'admin', 'manager', 'viewer'];
DEFINE INDEX idx_role_assignment_tenant_user ON TABLE role_assignment \
    COLUMNS tenant_id, user_id UNIQUE;

DEFINE TABLE feature_flag SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE feature_flag TYPE string;
DEFINE FIELD flag_key ON TABLE feature_flag TYPE string;
DEFINE FIELD enabled ON TABLE feature_flag TYPE bool;
DEFINE INDEX idx_feature_flag_tenant_key ON TABLE feature_flag \
    COLUMNS tenant_id, flag_key UNIQUE;

-- =======================================================================
-- Propagation jobs, per-target results, audit trail
-- =======================================================================
DEFINE TABLE propagation_job SCHEMAFULL;
DEFINE FIELD source_tenant_id ON TABLE propagation_job TYPE string;
DEFINE FIELD types ON TABLE propagation_job TYPE array<string>;
DEFINE FIELD target_tenant_ids ON TABLE propagation_job \
    TYPE array<string>;
DEFINE FIELD requested_by ON TABLE propagation_job TYPE string;
DEFINE FIELD signature ON TABLE propagation_job TYPE string;
DEFINE FIELD status ON TABLE propagation_job TYPE string \
    ASSERT $value IN ['pending', 'running', 'completed', \
    'completed_with_errors', 'failed'];
DEFINE FIELD cancel_requested ON TABLE propagation_job TYPE bool \
    DEFAULT false;
DEFINE FIELD created_at ON TABLE propagation_job TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD completed_at ON TABLE propagation_job \
    TYPE option<datetime>;
DEFINE INDEX idx_propagation_job_signature ON TABLE propagation_job \
    COLUMNS signature;

DEFINE TABLE propagation_result SCHEMAFULL;
DEFINE FIELD job_id ON TABLE propagation_result TYPE string;
DEFINE FIELD target_tenant_id ON TABLE propagation_result TYPE string;
DEFINE FIELD propagation_type ON TABLE propagation_result TYPE string \
    ASSERT $value IN ['products', 'categories', 'hours', 'profile', \
    'user_roles', 'brand_assets', 'feature_flags'];
DEFINE FIELD outcome ON TABLE propagation_result TYPE string \
    ASSERT $value IN ['success', 'failed', 'skipped'];
DEFINE FIELD error_kind ON TABLE propagation_result \
    TYPE option<string>;
DEFINE FIELD applied_at ON TABLE propagation_result TYPE datetime;
DEFINE FIELD attempt_count ON TABLE propagation_result TYPE int;
DEFINE INDEX idx_propagation_result_pair ON TABLE propagation_result \
    COLUMNS job_id, propagation_type, target_tenant_id UNIQUE;

DEFINE TABLE propagation_audit SCHEMAFULL;
DEFINE FIELD job_id ON TABLE propagation_audit TYPE string;
DEFINE FIELD target_tenant_id ON TABLE propagation_audit TYPE string;
DEFINE FIELD propagation_type ON TABLE propagation_audit TYPE string;
DEFINE FIELD outcome ON TABLE propagation_audit TYPE string \
    ASSERT $value IN ['success', 'failed', 'skipped'];
DEFINE FIELD error_kind ON TABLE propagation_audit \
    TYPE option<string>;
DEFINE FIELD recorded_at ON TABLE propagation_audit TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_propagation_audit_pair ON TABLE propagation_audit \
    COLUMNS job_id, propagation_type, target_tenant_id UNIQUE;
";

/// Apply any pending migrations, in version order.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
