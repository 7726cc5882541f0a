//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. UUIDs, enums and calendar dates are stored
//! as strings; enums carry ASSERT constraints.

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
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD first_name ON TABLE user TYPE string;
DEFINE FIELD middle_name ON TABLE user TYPE option<string>;
DEFINE FIELD last_name ON TABLE user TYPE string;
DEFINE FIELD extension ON TABLE user TYPE option<string>;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['super_admin', 'admin', 'user'];
DEFINE FIELD department ON TABLE user TYPE option<string>;
DEFINE FIELD position ON TABLE user TYPE option<string>;
DEFINE FIELD employee_id ON TABLE user TYPE option<string>;
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['active', 'inactive'];
DEFINE FIELD sms_credits ON TABLE user TYPE decimal DEFAULT 0dec \
    ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_department ON TABLE user COLUMNS department;

-- =======================================================================
-- Sessions
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD user_id ON TABLE session TYPE string;
DEFINE FIELD token_hash ON TABLE session TYPE string;
DEFINE FIELD ip_address ON TABLE session TYPE option<string>;
DEFINE FIELD user_agent ON TABLE session TYPE option<string>;
DEFINE FIELD expires_at ON TABLE session TYPE datetime;
DEFINE FIELD created_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_token ON TABLE session \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_session_user ON TABLE session COLUMNS user_id;

-- =======================================================================
-- Receiving records
-- =======================================================================
DEFINE TABLE receiving_record SCHEMAFULL;
DEFINE FIELD control_no ON TABLE receiving_record TYPE string;
DEFINE FIELD date ON TABLE receiving_record TYPE string;
DEFINE FIELD particulars ON TABLE receiving_record TYPE option<string>;
DEFINE FIELD department ON TABLE receiving_record TYPE string;
DEFINE FIELD category ON TABLE receiving_record TYPE option<string>;
DEFINE FIELD record_type ON TABLE receiving_record TYPE option<string>;
DEFINE FIELD organization_barangay ON TABLE receiving_record \
    TYPE option<string>;
DEFINE FIELD municipality_address ON TABLE receiving_record \
    TYPE option<string>;
DEFINE FIELD province ON TABLE receiving_record TYPE option<string>;
DEFINE FIELD name ON TABLE receiving_record TYPE option<string>;
DEFINE FIELD contact ON TABLE receiving_record TYPE option<string>;
DEFINE FIELD action_taken ON TABLE receiving_record TYPE option<string>;
DEFINE FIELD amount_approved ON TABLE receiving_record \
    TYPE option<decimal>;
DEFINE FIELD status ON TABLE receiving_record TYPE string \
    ASSERT $value IN ['pending', 'approved', 'disapproved', 'served', \
    'on process', 'for releasing', 'completed'];
DEFINE FIELD district ON TABLE receiving_record TYPE option<string>;
DEFINE FIELD requisitioner ON TABLE receiving_record TYPE option<string>;
DEFINE FIELD served_request ON TABLE receiving_record \
    TYPE option<string>;
DEFINE FIELD remarks ON TABLE receiving_record TYPE option<string>;
DEFINE FIELD user_id ON TABLE receiving_record TYPE string;
DEFINE FIELD processed_by_user_id ON TABLE receiving_record \
    TYPE option<string>;
DEFINE FIELD processed_at ON TABLE receiving_record \
    TYPE option<datetime>;
DEFINE FIELD approved_at ON TABLE receiving_record \
    TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE receiving_record TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE receiving_record TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_record_control_no ON TABLE receiving_record \
    COLUMNS control_no UNIQUE;
DEFINE INDEX idx_record_department ON TABLE receiving_record \
    COLUMNS department;
DEFINE INDEX idx_record_created ON TABLE receiving_record \
    COLUMNS created_at;

-- =======================================================================
-- Record remarks (append-only)
-- =======================================================================
DEFINE TABLE record_remark SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete FULL;
DEFINE FIELD receiving_record_id ON TABLE record_remark TYPE string;
DEFINE FIELD user_id ON TABLE record_remark TYPE string;
DEFINE FIELD remark ON TABLE record_remark TYPE string;
DEFINE FIELD created_at ON TABLE record_remark TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_remark_record ON TABLE record_remark \
    COLUMNS receiving_record_id;

-- =======================================================================
-- Document images
-- =======================================================================
DEFINE TABLE document_image SCHEMAFULL;
DEFINE FIELD receiving_record_id ON TABLE document_image TYPE string;
DEFINE FIELD file_path ON TABLE document_image TYPE string;
DEFINE FIELD position ON TABLE document_image TYPE int;
DEFINE FIELD created_at ON TABLE document_image TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_image_record ON TABLE document_image \
    COLUMNS receiving_record_id;

-- =======================================================================
-- Outgoing records
-- =======================================================================
DEFINE TABLE outgoing_record SCHEMAFULL;
DEFINE FIELD category ON TABLE outgoing_record TYPE string \
    ASSERT $value IN ['legal_docs', 'memo', 'fuel_requests'];
DEFINE FIELD date ON TABLE outgoing_record TYPE string;
DEFINE FIELD particulars ON TABLE outgoing_record TYPE option<string>;
DEFINE FIELD record_type ON TABLE outgoing_record TYPE option<string>;
DEFINE FIELD recipient ON TABLE outgoing_record TYPE option<string>;
DEFINE FIELD vehicle ON TABLE outgoing_record TYPE option<string>;
DEFINE FIELD driver ON TABLE outgoing_record TYPE option<string>;
DEFINE FIELD amount ON TABLE outgoing_record TYPE option<decimal>;
DEFINE FIELD file_path ON TABLE outgoing_record TYPE option<string>;
DEFINE FIELD user_id ON TABLE outgoing_record TYPE string;
DEFINE FIELD created_at ON TABLE outgoing_record TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE outgoing_record TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_outgoing_created ON TABLE outgoing_record \
    COLUMNS created_at;

-- =======================================================================
-- SMS transaction history (append-only)
-- =======================================================================
DEFINE TABLE sms_transaction SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD name ON TABLE sms_transaction TYPE string;
DEFINE FIELD credit_amount ON TABLE sms_transaction TYPE decimal;
DEFINE FIELD status ON TABLE sms_transaction TYPE string \
    ASSERT $value IN ['Approved', 'Failed'];
DEFINE FIELD initiated_by ON TABLE sms_transaction TYPE string;
DEFINE FIELD message ON TABLE sms_transaction TYPE string;
DEFINE FIELD recipient ON TABLE sms_transaction TYPE string;
DEFINE FIELD user_id ON TABLE sms_transaction TYPE string;
DEFINE FIELD created_at ON TABLE sms_transaction TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_sms_name ON TABLE sms_transaction COLUMNS name;
DEFINE INDEX idx_sms_user_time ON TABLE sms_transaction \
    COLUMNS user_id, created_at;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies each
/// migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "could not record v{}: {}",
                    migration.version, e,
                ))
            })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(window[0].version < window[1].version);
        }
    }

    #[test]
    fn credits_cannot_go_negative() {
        assert!(SCHEMA_V1.contains("sms_credits ON TABLE user TYPE decimal DEFAULT 0dec"));
        assert!(SCHEMA_V1.contains("ASSERT $value >= 0"));
    }
}
