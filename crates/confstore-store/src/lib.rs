//! # confstore Store
//!
//! Durable, multi-process typed preference storage. Provides the
//! [`TypedStore`] handle over a pluggable [`Backend`], with SQLite and
//! in-memory implementations.
//!
//! ## Overview
//!
//! A store holds a flat map from string keys to typed [`Value`]s. Every
//! write is one atomic transaction against the backend; the committed
//! snapshot is then published to readers and subscribers, and listeners are
//! told which keys were written.
//!
//! ## Key Types
//!
//! - [`TypedStore`] - The shared store handle
//! - [`Backend`] - The trait for snapshot persistence
//! - [`SqliteBackend`] - SQLite storage shared between processes
//! - [`MemoryBackend`] - In-memory storage for tests
//! - [`MutablePreferences`] - The view handed to [`TypedStore::edit`]
//! - [`Subscription`] - A de-duplicated stream of one key's value
//! - [`ChangeListener`] - Raw per-key write callbacks
//!
//! ## Usage
//!
//! ```rust,no_run
//! use confstore_store::{StoreConfig, TypedStore};
//!
//! fn example() -> confstore_store::Result<()> {
//!     let store = TypedStore::open(&StoreConfig::new("configuration.db"))?;
//!
//!     store.set("proxy_port", 1080i32)?;
//!     assert_eq!(store.get::<i32>("proxy_port"), Some(1080));
//!
//!     // Several changes in one transaction
//!     store.edit(|prefs| {
//!         prefs.put("remote_dns", "1.1.1.1".into())?;
//!         prefs.remove("direct_dns")
//!     })?;
//!     Ok(())
//! }
//! ```
//!
//! [`Value`]: confstore_core::Value

pub mod config;
pub mod edit;
pub mod error;
pub mod listener;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod subscription;
pub mod traits;
pub mod typed;

pub use config::StoreConfig;
pub use edit::MutablePreferences;
pub use error::{Result, StoreError};
pub use listener::{ChangeListener, ListenerId};
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use subscription::Subscription;
pub use traits::{Backend, Snapshot, Transform};
pub use typed::TypedStore;
