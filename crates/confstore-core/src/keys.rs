//! Reserved keys.
//!
//! These live in the same flat key space as user preferences but belong to
//! the store itself. They are never exported, never imported and cannot be
//! written through the client-facing put surface.

/// Set to `true` once the legacy database has been migrated.
pub const MIGRATION_KEY: &str = "__datastore_migrated_from_room__";

/// Version field of a backup document.
pub const VERSION_KEY: &str = "__version";

/// Returns true for keys owned by the store.
pub fn is_reserved(key: &str) -> bool {
    key == MIGRATION_KEY || key == VERSION_KEY
}
