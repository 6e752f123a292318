use async_trait::async_trait;
use tokio_postgres::{Client, Config, NoTls};
use tracing::{debug, error};

use super::{MigrationConnector, MigrationError, MigrationTarget, SchemaVersion, source::Migration};

/// Key of the session-level advisory lock held while migrating.
const LOCK_KEY: i64 = 0x6c69_6272_6172_7921;

const CREATE_VERSION_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS schema_migrations (
        version BIGINT NOT NULL PRIMARY KEY,
        dirty BOOLEAN NOT NULL
    )";

#[derive(Debug, Clone)]
pub struct PostgresMigrationConnector {
    config: Config,
}

impl PostgresMigrationConnector {
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MigrationConnector for PostgresMigrationConnector {
    async fn connect(&self) -> Result<Box<dyn MigrationTarget>, MigrationError> {
        let (client, connection) = self
            .config
            .connect(NoTls)
            .await
            .map_err(|err| MigrationError::Connect(err.into()))?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!(error = %err, "Migration connection failed");
            }
        });

        client.batch_execute(CREATE_VERSION_TABLE).await?;

        Ok(Box::new(PostgresMigrationTarget { client }))
    }
}

struct PostgresMigrationTarget {
    client: Client,
}

impl PostgresMigrationTarget {
    async fn record_version(&mut self, version: i64, dirty: bool) -> Result<(), MigrationError> {
        let transaction = self.client.transaction().await?;
        transaction.execute("TRUNCATE schema_migrations", &[]).await?;
        transaction
            .execute(
                "INSERT INTO schema_migrations (version, dirty) VALUES ($1, $2)",
                &[&version, &dirty],
            )
            .await?;
        transaction.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl MigrationTarget for PostgresMigrationTarget {
    async fn lock(&mut self) -> Result<(), MigrationError> {
        debug!("Waiting for migration lock");
        self.client
            .execute("SELECT pg_advisory_lock($1)", &[&LOCK_KEY])
            .await?;
        Ok(())
    }

    async fn unlock(&mut self) -> Result<(), MigrationError> {
        self.client
            .execute("SELECT pg_advisory_unlock($1)", &[&LOCK_KEY])
            .await?;
        Ok(())
    }

    async fn version(&mut self) -> Result<Option<SchemaVersion>, MigrationError> {
        let row = self
            .client
            .query_opt("SELECT version, dirty FROM schema_migrations LIMIT 1", &[])
            .await?;
        Ok(row.map(|row| SchemaVersion {
            version: row.get(0),
            dirty: row.get(1),
        }))
    }

    async fn apply(&mut self, migration: &Migration) -> Result<(), MigrationError> {
        self.record_version(migration.version, true).await?;

        // The migration and its clean version row commit together. On failure
        // the row stays dirty.
        let transaction = self.client.transaction().await?;
        transaction
            .batch_execute(&migration.sql)
            .await
            .map_err(|err| MigrationError::Apply {
                version: migration.version,
                source: err.into(),
            })?;
        transaction.execute("TRUNCATE schema_migrations", &[]).await?;
        transaction
            .execute(
                "INSERT INTO schema_migrations (version, dirty) VALUES ($1, false)",
                &[&migration.version],
            )
            .await?;
        transaction.commit().await?;

        Ok(())
    }
}
