use std::{path::Path, str::FromStr, time::Duration};

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

pub mod posts;

pub use posts::{
    render_csv, NewPost, OrderBy, OrderDir, PostQuery, PostRepository, ScoreDistribution,
    StoreStats,
};

pub async fn init_pool(db_path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    apply_schema(&pool).await?;
    Ok(pool)
}

async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            target_name TEXT NOT NULL,
            url TEXT,
            author TEXT,
            post_timestamp TEXT,
            text_content TEXT NOT NULL,
            screenshot_path TEXT,
            collected_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            status TEXT NOT NULL DEFAULT 'queued',
            misinfo_score INTEGER,
            tags TEXT,
            rationale TEXT,
            fact_check_questions TEXT,
            drafts TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    for index in [
        "CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(status)",
        "CREATE INDEX IF NOT EXISTS idx_posts_score ON posts(misinfo_score)",
        "CREATE INDEX IF NOT EXISTS idx_posts_target ON posts(target_name)",
        "CREATE INDEX IF NOT EXISTS idx_posts_collected_at ON posts(collected_at)",
    ] {
        sqlx::query(index).execute(pool).await?;
    }

    Ok(())
}

/// In-memory pool for tests. A single connection keeps every query on
/// the same `:memory:` database.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    apply_schema(&pool).await.unwrap();
    pool
}
