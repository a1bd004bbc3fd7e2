use crate::config::Config;
use crate::error::{BotError, Result};
use crate::store::{NewUser, RegisteredUser, UserStore};
use async_trait::async_trait;
use deadpool_postgres::{Config as PoolConfig, Pool, Runtime};
use std::time::Duration;
use tokio_postgres::NoTls;
use tracing::{debug, info, instrument};

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        user_name TEXT NOT NULL,
        status TEXT NOT NULL
    )
"#;

const INSERT_USER: &str = "INSERT INTO users (user_name, status) VALUES ($1, $2) RETURNING id";

pub struct PgUserStore {
    pool: Pool,
}

impl PgUserStore {
    /// Build the pool and make sure the database answers before serving.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = create_pool(&config.database_url, config.max_db_connections)?;

        let client = pool.get().await?;
        client
            .execute("SELECT 1", &[])
            .await
            .map_err(|e| BotError::ConnectionFailed {
                cause: format!("Ping failed: {}", e),
            })?;

        info!("Connected to PostgreSQL");

        Ok(Self { pool })
    }

    /// Create the `users` table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .batch_execute(CREATE_USERS_TABLE)
            .await
            .map_err(|e| BotError::persistence(format!("users table creation: {}", e)))?;

        debug!("users table ready");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self))]
    async fn insert_user(&self, user: &NewUser) -> Result<RegisteredUser> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(INSERT_USER, &[&user.user_name, &user.status])
            .await?;

        let id: i32 = row.get(0);
        info!("Registered user {} as row {}", user.user_name, id);

        Ok(RegisteredUser {
            id,
            user_name: user.user_name.clone(),
            status: user.status.clone(),
        })
    }

    async fn ping(&self) -> bool {
        match self.pool.get().await {
            Ok(client) => client.execute("SELECT 1", &[]).await.is_ok(),
            Err(_) => false,
        }
    }
}

fn create_pool(database_url: &str, max_size: u32) -> Result<Pool> {
    let mut cfg = PoolConfig::new();
    cfg.url = Some(database_url.to_string());

    cfg.pool = Some(deadpool_postgres::PoolConfig {
        max_size: max_size as usize,
        timeouts: deadpool_postgres::Timeouts {
            wait: Some(Duration::from_secs(5)),
            create: Some(Duration::from_secs(5)),
            recycle: Some(Duration::from_secs(5)),
        },
        ..Default::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| BotError::Internal(format!("Failed to create pool: {}", e)))
}
