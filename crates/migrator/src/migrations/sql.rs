//! Statements issued against the schema table
//!
//! Table names are spliced in directly; callers validate them with
//! [`is_valid_table_name`](crate::config::is_valid_table_name) first.

/// Catalog lookup for the schema table. Binds `$1` = table name.
pub fn schema_table_exists() -> &'static str {
    "SELECT table_schema::text AS table_schema, \
            table_name::text AS table_name, \
            table_type::text AS table_type \
     FROM information_schema.tables \
     WHERE table_type = 'BASE TABLE' AND table_name = $1"
}

pub fn create_migration_table(table: &str) -> String {
    format!(
        "CREATE TABLE {} (\n    \
            id SERIAL,\n    \
            version VARCHAR UNIQUE NOT NULL,\n    \
            name VARCHAR UNIQUE NOT NULL,\n    \
            created_at TIMESTAMP NOT NULL DEFAULT now(),\n    \
            PRIMARY KEY (id)\n\
        );",
        table
    )
}

pub fn drop_migration_table(table: &str) -> String {
    format!("DROP TABLE {};", table)
}

pub fn number_of_applied_migrations(table: &str) -> String {
    format!("SELECT COUNT(id) AS count FROM {};", table)
}

pub fn select_migrations(table: &str) -> String {
    format!(
        "SELECT id, name, version, created_at FROM {} ORDER BY id ASC;",
        table
    )
}

pub fn select_latest_migration(table: &str) -> String {
    format!(
        "SELECT id, name, version, created_at FROM {} ORDER BY id DESC LIMIT 1;",
        table
    )
}

/// Binds `$1` = version, `$2` = name.
pub fn create_migration_entry(table: &str) -> String {
    format!("INSERT INTO {} (version, name) VALUES ($1, $2);", table)
}

/// Binds `$1` = version, `$2` = name.
pub fn delete_migration_entry(table: &str) -> String {
    format!("DELETE FROM {} WHERE version = $1 AND name = $2;", table)
}
