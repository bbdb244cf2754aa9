//! # confstore
//!
//! The configuration persistence layer: a typed, observable key/value store
//! shared between processes, versioned JSON backups, a one-shot migration
//! from the legacy `KeyValuePair` database, and the config-tree merge used to
//! layer overrides onto templates.
//!
//! ## Overview
//!
//! An application builds one [`TypedStore`] with [`open`] at startup and
//! passes clones of it to whoever needs configuration. [`open`] runs the
//! legacy migration before returning, so the first read already sees
//! migrated values.
//!
//! ## Key Types
//!
//! - [`TypedStore`] - The store handle (re-exported from `confstore-store`)
//! - [`BackupExt`] - Backup export and import on a store
//! - [`BackupDocument`] - A decoded backup
//! - [`LegacyConfig`] / [`MigrationOutcome`] - Legacy migration
//! - [`merge`] - The config-tree merge (re-exported from `confstore-core`)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use confstore::{BackupExt, Config, LegacyConfig};
//!
//! fn example() -> confstore::Result<()> {
//!     let config = Config {
//!         legacy: Some(LegacyConfig::new("databases/sager_net.db")),
//!         ..Config::default()
//!     };
//!     let store = confstore::open(&config)?;
//!
//!     store.set("service_mode", "vpn")?;
//!     let backup = store.export_json();
//!     store.import_json(&backup)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `confstore::core` - Values and the config merge
//! - `confstore::store` - The store and its backends

pub mod backup;
pub mod error;
pub mod legacy;
pub mod migrate;

pub use confstore_core as core;
pub use confstore_store as store;

pub use backup::{BackupDocument, BackupExt, ValueHolder, BACKUP_VERSION};
pub use error::{Error, Result};
pub use legacy::{LegacyDatabase, LegacyRecord};
pub use migrate::{LegacyConfig, MigrationOutcome, MigrationReport};

pub use confstore_core::{merge, merge_into, PreferenceValue, Tree, Value, ValueKind};
pub use confstore_store::{
    ChangeListener, ListenerId, MutablePreferences, StoreConfig, Subscription, TypedStore,
};

use serde::{Deserialize, Serialize};

/// Configuration for [`open`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The store itself.
    pub store: StoreConfig,
    /// The legacy database to migrate from. `None` skips the migration.
    pub legacy: Option<LegacyConfig>,
}

/// Open the store and run the legacy migration.
///
/// This is the one place a store handle should be built; clone the returned
/// handle to share it.
pub fn open(config: &Config) -> Result<TypedStore> {
    let store = TypedStore::open(&config.store)?;
    if let Some(legacy) = &config.legacy {
        let outcome = migrate::run(&store, legacy);
        tracing::debug!(?outcome, "legacy migration finished");
    }
    Ok(store)
}
