use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::SqliteInitError;

pub(crate) const TABLES: [&str; 4] = [
    "students",
    "learning_sessions",
    "assessment_sessions",
    "active_sessions",
];

/// Runs the versioned migrations for the current schema.
///
/// A recorded version whose tables have since been dropped is re-applied; every
/// statement is idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? || existing_tables(pool).await?.len() < TABLES.len() {
        let mut tx = pool.begin().await?;
        create_v1(&mut tx).await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}

/// Entry point for the retry policy and the schema endpoint.
pub(crate) async fn ensure_schema(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    run_migrations(pool).await
}

/// Names of the application tables that currently exist.
pub(crate) async fn existing_tables(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
              AND name IN ('students', 'learning_sessions', 'assessment_sessions', 'active_sessions')
        ",
    )
    .fetch_all(pool)
    .await
}

// Version 1: students, learning sessions, question rows and session markers.
async fn create_v1(tx: &mut Transaction<'_, Sqlite>) -> Result<(), sqlx::Error> {
    let statements = [
        r"
            CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY,
                student_id TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                date_of_birth TEXT,
                email TEXT,
                phone TEXT,
                emergency_contact TEXT,
                emergency_phone TEXT,
                medical_notes TEXT,
                learning_goals TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        ",
        r"
            CREATE TABLE IF NOT EXISTS learning_sessions (
                id INTEGER PRIMARY KEY,
                student_id TEXT NOT NULL,
                shape TEXT NOT NULL CHECK (shape IN ('circle', 'square', 'triangle', 'rectangle')),
                explanation TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                FOREIGN KEY (student_id) REFERENCES students(student_id) ON DELETE CASCADE
            );
        ",
        r"
            CREATE TABLE IF NOT EXISTS active_sessions (
                id INTEGER PRIMARY KEY,
                student_id TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('active', 'completed', 'cancelled')),
                started_at TEXT NOT NULL,
                ended_at TEXT,
                FOREIGN KEY (student_id) REFERENCES students(student_id) ON DELETE CASCADE
            );
        ",
        r"
            CREATE TABLE IF NOT EXISTS assessment_sessions (
                id INTEGER PRIMARY KEY,
                student_id TEXT NOT NULL,
                session_id INTEGER,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                assessment TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                FOREIGN KEY (student_id) REFERENCES students(student_id) ON DELETE CASCADE,
                FOREIGN KEY (session_id) REFERENCES active_sessions(id) ON DELETE SET NULL
            );
        ",
        r"
            CREATE INDEX IF NOT EXISTS idx_learning_sessions_student_timestamp
                ON learning_sessions (student_id, timestamp);
        ",
        r"
            CREATE INDEX IF NOT EXISTS idx_learning_sessions_timestamp
                ON learning_sessions (timestamp);
        ",
        r"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_active_sessions_one_active
                ON active_sessions (student_id) WHERE status = 'active';
        ",
        r"
            CREATE INDEX IF NOT EXISTS idx_active_sessions_student_status_ended
                ON active_sessions (student_id, status, ended_at);
        ",
        r"
            CREATE INDEX IF NOT EXISTS idx_assessment_sessions_student_timestamp
                ON assessment_sessions (student_id, timestamp);
        ",
        r"
            CREATE INDEX IF NOT EXISTS idx_assessment_sessions_session
                ON assessment_sessions (session_id);
        ",
    ];

    for sql in statements {
        sqlx::query(sql).execute(&mut **tx).await?;
    }
    Ok(())
}
