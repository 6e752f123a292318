use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    MigrationConnector, MigrationError, MigrationTarget, SchemaVersion, source::Migration,
};

#[derive(Debug, Default)]
struct SchemaState {
    version: Option<SchemaVersion>,
    applied: Vec<i64>,
    locked: bool,
    failing_version: Option<i64>,
}

/// Bookkeeping of a fake database shared by its connections.
#[derive(Debug, Clone, Default)]
pub struct MemorySchema {
    state: Arc<Mutex<SchemaState>>,
}

impl MemorySchema {
    pub async fn applied(&self) -> Vec<i64> {
        self.state.lock().await.applied.clone()
    }

    pub async fn is_locked(&self) -> bool {
        self.state.lock().await.locked
    }

    pub async fn set_version(&self, version: SchemaVersion) {
        self.state.lock().await.version = Some(version);
    }

    /// A reliable connector to this schema.
    pub fn connector(&self) -> MemoryMigrationConnector {
        MemoryMigrationConnector {
            schema: self.clone(),
            failures: Arc::new(AtomicU32::new(0)),
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }
}

/// Connector that refuses the first `failures` connection attempts.
#[derive(Debug, Clone)]
pub struct MemoryMigrationConnector {
    schema: MemorySchema,
    failures: Arc<AtomicU32>,
    attempts: Arc<AtomicU32>,
}

impl MemoryMigrationConnector {
    pub fn new() -> Self {
        MemorySchema::default().connector()
    }

    pub fn failing(self, failures: u32) -> Self {
        self.failures.store(failures, Ordering::SeqCst);
        self
    }

    /// Makes applying `version` fail.
    pub fn failing_version(self, version: i64) -> Self {
        if let Ok(mut state) = self.schema.state.try_lock() {
            state.failing_version = Some(version);
        }
        self
    }

    pub fn schema(&self) -> MemorySchema {
        self.schema.clone()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MigrationConnector for MemoryMigrationConnector {
    async fn connect(&self) -> Result<Box<dyn MigrationTarget>, MigrationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(MigrationError::Connect(
                io::Error::from(io::ErrorKind::ConnectionRefused).into(),
            ));
        }
        Ok(Box::new(MemoryMigrationTarget {
            schema: self.schema.clone(),
        }))
    }
}

struct MemoryMigrationTarget {
    schema: MemorySchema,
}

#[async_trait]
impl MigrationTarget for MemoryMigrationTarget {
    async fn lock(&mut self) -> Result<(), MigrationError> {
        self.schema.state.lock().await.locked = true;
        Ok(())
    }

    async fn unlock(&mut self) -> Result<(), MigrationError> {
        self.schema.state.lock().await.locked = false;
        Ok(())
    }

    async fn version(&mut self) -> Result<Option<SchemaVersion>, MigrationError> {
        Ok(self.schema.state.lock().await.version)
    }

    async fn apply(&mut self, migration: &Migration) -> Result<(), MigrationError> {
        let mut state = self.schema.state.lock().await;
        if state.failing_version == Some(migration.version) {
            state.version = Some(SchemaVersion {
                version: migration.version,
                dirty: true,
            });
            return Err(MigrationError::Apply {
                version: migration.version,
                source: io::Error::other("syntax error").into(),
            });
        }
        state.applied.push(migration.version);
        state.version = Some(SchemaVersion {
            version: migration.version,
            dirty: false,
        });
        Ok(())
    }
}
