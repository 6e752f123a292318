//! Schema migrations.
//!
//! The [`Migrator`] connects to the database with a bounded number of
//! attempts, then applies pending `<version>_<title>.up.sql` files in version
//! order. Progress is recorded in a single `schema_migrations` row holding
//! the current version and a dirty flag. A dirty row means an earlier
//! migration failed halfway and needs manual repair.

use std::{error::Error, fmt::Debug, path::PathBuf, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::MigrationConfig;

#[cfg(test)]
pub(crate) mod memory;
/// `PostgreSQL` migration target.
pub mod postgres;
/// Migration file discovery.
pub mod source;

use source::{Migration, load_migrations};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to read migrations from `{}`", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("migration file `{name}` does not start with a numeric version")]
    InvalidName { name: String },
    #[error("duplicate migration version {version}")]
    DuplicateVersion { version: i64 },
    #[error("failed to connect to the database")]
    Connect(#[source] Box<dyn Error + Send + Sync>),
    #[error("database unreachable after {attempts} attempts")]
    Unreachable {
        attempts: u32,
        #[source]
        source: Box<MigrationError>,
    },
    #[error("schema is dirty at version {version}, fix and force version")]
    Dirty { version: i64 },
    #[error("schema version {version} has no migration file")]
    UnknownVersion { version: i64 },
    #[error("migration {version} failed")]
    Apply {
        version: i64,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error(transparent)]
    Database(#[from] tokio_postgres::Error),
}

/// Version recorded in the bookkeeping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaVersion {
    pub version: i64,
    pub dirty: bool,
}

/// Connection to the database being migrated.
#[async_trait]
pub trait MigrationTarget: Send {
    /// Blocks until no other instance is migrating.
    async fn lock(&mut self) -> Result<(), MigrationError>;

    async fn unlock(&mut self) -> Result<(), MigrationError>;

    async fn version(&mut self) -> Result<Option<SchemaVersion>, MigrationError>;

    /// Runs the migration and records its version. The version is left dirty
    /// if the migration fails.
    async fn apply(&mut self, migration: &Migration) -> Result<(), MigrationError>;
}

#[async_trait]
pub trait MigrationConnector: Debug + Send + Sync {
    async fn connect(&self) -> Result<Box<dyn MigrationTarget>, MigrationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Pending migrations were applied, moving the schema from `from`
    /// (`None` for an empty database) to `to`.
    Applied { from: Option<i64>, to: i64 },
    /// The schema was already current.
    NoChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Connecting,
    Migrating,
    Up(MigrationOutcome),
    Failed,
}

#[derive(Debug)]
pub struct Migrator {
    connector: Box<dyn MigrationConnector>,
    path: PathBuf,
    attempts: u32,
    retry_delay: Duration,
    state: MigrationState,
}

impl Migrator {
    pub fn new(connector: Box<dyn MigrationConnector>, config: &MigrationConfig) -> Self {
        Self {
            connector,
            path: config.path.clone(),
            attempts: config.attempts.max(1),
            retry_delay: config.retry_delay(),
            state: MigrationState::Connecting,
        }
    }

    pub const fn state(&self) -> MigrationState {
        self.state
    }

    /// Brings the schema up to the latest migration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database stays unreachable, the migration files
    /// are invalid, the schema is dirty or a migration fails.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn run(&mut self) -> Result<MigrationOutcome, MigrationError> {
        let result = self.try_run().await;
        match &result {
            Ok(outcome) => {
                match outcome {
                    MigrationOutcome::Applied { from, to } => {
                        info!(from = ?from, to, "Migrations applied");
                    }
                    MigrationOutcome::NoChange => info!("No migration changes"),
                }
                self.transition(MigrationState::Up(*outcome));
            }
            Err(err) => {
                error!(error = %err, "Migration failed");
                self.transition(MigrationState::Failed);
            }
        }
        result
    }

    async fn try_run(&mut self) -> Result<MigrationOutcome, MigrationError> {
        self.transition(MigrationState::Connecting);
        let mut target = self.connect().await?;

        self.transition(MigrationState::Migrating);
        let migrations = load_migrations(&self.path)?;

        target.lock().await?;
        let outcome = migrate(target.as_mut(), &migrations).await;
        let unlocked = target.unlock().await;
        let outcome = outcome?;
        unlocked?;

        Ok(outcome)
    }

    async fn connect(&self) -> Result<Box<dyn MigrationTarget>, MigrationError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.connector.connect().await {
                Ok(target) => return Ok(target),
                Err(err) if attempt < self.attempts => {
                    warn!(
                        attempt,
                        attempts_left = self.attempts - attempt,
                        error = %err,
                        "Database is unreachable, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => {
                    return Err(MigrationError::Unreachable {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
            }
        }
    }

    fn transition(&mut self, state: MigrationState) {
        if self.state != state {
            info!(from = ?self.state, to = ?state, "Migrator state changed");
            self.state = state;
        }
    }
}

async fn migrate(
    target: &mut dyn MigrationTarget,
    migrations: &[Migration],
) -> Result<MigrationOutcome, MigrationError> {
    let current = target.version().await?;
    if let Some(SchemaVersion {
        version,
        dirty: true,
    }) = current
    {
        return Err(MigrationError::Dirty { version });
    }

    let from = current.map(|current| current.version);
    if let Some(version) = from {
        if !migrations.iter().any(|migration| migration.version == version) {
            return Err(MigrationError::UnknownVersion { version });
        }
    }

    let pending: Vec<_> = migrations
        .iter()
        .filter(|migration| from.is_none_or(|from| migration.version > from))
        .collect();
    let Some(last) = pending.last() else {
        return Ok(MigrationOutcome::NoChange);
    };
    let to = last.version;

    for migration in pending {
        info!(
            version = migration.version,
            title = %migration.title,
            "Applying migration"
        );
        target.apply(migration).await?;
    }

    Ok(MigrationOutcome::Applied { from, to })
}
