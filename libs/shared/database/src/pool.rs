use anyhow::{anyhow, Context, Result};
use sqlx::any::{install_default_drivers, AnyArguments, AnyPoolOptions};
use sqlx::query::Query;
use sqlx::{Any, AnyPool};
use tracing::{debug, info};

use shared_config::AppConfig;

pub type DbPool = AnyPool;

/// Process-wide handle on the connection pool. Cloning is cheap and every
/// clone shares the same pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        if config.database_url.is_empty() {
            return Err(anyhow!("DATABASE_URL must be set"));
        }

        install_default_drivers();

        debug!("Opening database pool with {} connections", config.database_max_connections);

        let pool = AnyPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(config.database_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("failed to connect to database")?;

        info!("Database pool ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Runs an INSERT and returns the generated key.
    ///
    /// MySQL reports the key with the query result. SQLite does not through
    /// the Any driver, so the key is read back with `last_insert_rowid()` on
    /// the connection that ran the insert.
    pub async fn insert_returning_id<'q>(
        &self,
        query: Query<'q, Any, AnyArguments<'q>>,
    ) -> Result<i64, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        let result = query.execute(&mut *conn).await?;

        if let Some(id) = result.last_insert_id() {
            return Ok(id);
        }

        sqlx::query_scalar::<_, i64>("SELECT last_insert_rowid()")
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
