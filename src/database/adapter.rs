/// SQLite adapter for the node catalog database
///
/// Opens the database file, applies the catalog schema and hands out the
/// connection pool to the repository and template services.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Location understood as a private in-memory database (tests, ephemeral runs)
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Handle to the node catalog database
///
/// Cloning is cheap; every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct NodeDatabase {
    pool: SqlitePool,
    path: String,
}

impl NodeDatabase {
    /// Open (creating if missing) the node database at `path` and apply the schema
    ///
    /// This is the expensive step the shared lifecycle manager performs once per process.
    pub async fn open(path: &str) -> Result<Self> {
        let pool = if path == IN_MEMORY_PATH {
            // A single long-lived connection keeps the in-memory database alive
            let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        anyhow::anyhow!("Failed to create database directory '{}': {}", parent.display(), e)
                    })?;
                }
            }

            tracing::info!("🗄️ Opening node database: {}", path);

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);
            SqlitePool::connect_with(options).await?
        };

        let db = Self {
            pool,
            path: path.to_string(),
        };
        db.init_schema().await?;

        Ok(db)
    }

    /// Connection pool shared by the catalog services
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Location this database was opened from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the pool has been closed
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Close every pooled connection
    ///
    /// Only the shared lifecycle manager's shutdown path calls this.
    pub async fn close(&self) -> Result<()> {
        if self.pool.is_closed() {
            anyhow::bail!("Node database already closed: {}", self.path);
        }
        self.pool.close().await;
        Ok(())
    }

    /// Initialize the catalog schema
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                node_type TEXT PRIMARY KEY,
                package_name TEXT NOT NULL,
                display_name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT '',
                is_trigger BOOLEAN NOT NULL DEFAULT 0,
                version TEXT NOT NULL DEFAULT '1',
                properties TEXT NOT NULL DEFAULT '[]',
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS templates (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                node_types TEXT NOT NULL DEFAULT '[]',
                workflow TEXT NOT NULL,
                views INTEGER NOT NULL DEFAULT 0,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_nodes_package ON nodes(package_name)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_nodes_category ON nodes(category)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_templates_views ON templates(views)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
