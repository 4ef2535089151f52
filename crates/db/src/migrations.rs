use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::connect_with_settings;

    const MANAGED_TABLES: &[&str] = &[
        "lead",
        "lead_service",
        "timeline_event",
        "ai_analysis",
        "quote",
        "quote_number_sequence",
        "lead_note",
    ];

    async fn table_names(pool: &sqlx::SqlitePool) -> Vec<String> {
        sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(pool)
            .await
            .expect("list tables")
            .into_iter()
            .map(|row| row.get::<String, _>("name"))
            .collect()
    }

    #[tokio::test]
    async fn migrations_create_pipeline_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let tables = table_names(&pool).await;
        for table in MANAGED_TABLES {
            assert!(tables.iter().any(|name| name == table), "missing table {table}");
        }
    }

    #[tokio::test]
    async fn running_migrations_twice_is_a_no_op() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("first run");
        let before = table_names(&pool).await;

        run_pending(&pool).await.expect("second run");
        assert_eq!(table_names(&pool).await, before);
    }

    #[tokio::test]
    async fn stage_column_rejects_unknown_values() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        sqlx::query(
            "INSERT INTO lead (id, tenant_id, consumer_name, created_at)
             VALUES ('l-1', 't-1', 'Test', '2026-01-01T00:00:00.000000Z')",
        )
        .execute(&pool)
        .await
        .expect("insert lead");

        let result = sqlx::query(
            "INSERT INTO lead_service (id, lead_id, tenant_id, service_type, stage, status,
                                       updated_at)
             VALUES ('s-1', 'l-1', 't-1', 'dak', 'Quote', 'New', '2026-01-01T00:00:00.000000Z')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
