//! The ledger service.
//!
//! [`Ledger`] owns the database and the engine configuration. Every operation
//! takes a [`Context`](crate::context::Context) and runs as its own unit of
//! work, so one `Ledger` can be shared by reference or `Arc` across threads.

mod companies;
mod loans;
mod overdue;
mod payments;

use crate::config::EngineConfig;
use crate::errors::Result;
use crate::store::Database;

/// loan ledger service handle
pub struct Ledger {
    db: Database,
    config: EngineConfig,
}

impl Ledger {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        Self { db, config }
    }

    /// validate the config, open its database and create missing tables
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let db = Database::from_config(&config)?;
        db.migrate()?;
        Ok(Self::new(db, config))
    }

    /// fresh in-memory ledger with default settings
    pub fn in_memory() -> Result<Self> {
        Self::open(EngineConfig::in_memory())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
