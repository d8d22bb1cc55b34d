//! Schema convention checks for the migrations.

#![cfg(feature = "pg-tests")]

use folio_core::schema::ALL_KINDS;
use sqlx::PgPool;

/// All `id` columns must be bigint.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_all_pks_are_bigint(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name, data_type
         FROM information_schema.columns
         WHERE column_name = 'id'
           AND table_schema = 'public'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!rows.is_empty());
    for (table, data_type) in &rows {
        assert_eq!(data_type, "bigint", "Table {table}.id should be bigint");
    }
}

/// Every table carries `created_at` and `updated_at` as timestamptz.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_all_tables_have_timestamps(pool: PgPool) {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name
         FROM information_schema.tables
         WHERE table_schema = 'public'
           AND table_type = 'BASE TABLE'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(tables.iter().any(|(t,)| t == "revisions"));
    for (table,) in &tables {
        for column in ["created_at", "updated_at"] {
            let result: Option<(String,)> = sqlx::query_as(
                "SELECT data_type
                 FROM information_schema.columns
                 WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2",
            )
            .bind(table)
            .bind(column)
            .fetch_optional(&pool)
            .await
            .unwrap();

            let (data_type,) =
                result.unwrap_or_else(|| panic!("Table {table} is missing column {column}"));
            assert_eq!(
                data_type, "timestamp with time zone",
                "Column {table}.{column} should be timestamptz, got {data_type}"
            );
        }
    }
}

/// Every schema field has a live and a draft column of type jsonb.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_schema_columns_exist(pool: PgPool) {
    for kind in ALL_KINDS {
        let schema = kind.schema();
        for spec in schema.fields {
            for column in [spec.column, spec.draft_column] {
                let result: Option<(String,)> = sqlx::query_as(
                    "SELECT data_type
                     FROM information_schema.columns
                     WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2",
                )
                .bind(schema.table)
                .bind(column)
                .fetch_optional(&pool)
                .await
                .unwrap();

                let (data_type,) = result
                    .unwrap_or_else(|| panic!("Table {} is missing column {column}", schema.table));
                assert_eq!(
                    data_type, "jsonb",
                    "Column {}.{column} should be jsonb, got {data_type}",
                    schema.table
                );
            }
        }
    }
}
