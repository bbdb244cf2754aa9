//! # confstore Testkit
//!
//! Testing utilities for confstore.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Temporary on-disk stores and legacy databases
//! - **Generators**: Proptest strategies for values, keys and config trees
//! - **Golden vectors**: Backup documents with their expected contents
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use confstore_testkit::generators::entries;
//!
//! proptest! {
//!     #[test]
//!     fn entries_survive_reopen(entries in entries()) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use confstore_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! fixture.store.set("mtu", 1500i32).unwrap();
//! let other = fixture.open_handle();
//! assert_eq!(other.get::<i32>("mtu"), Some(1500));
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{LegacyDbBuilder, TestFixture};
pub use vectors::{accepted_vectors, rejected_vectors, GoldenBackup, Rejection};

/// Install a test-friendly tracing subscriber. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
