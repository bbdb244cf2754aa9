//! Golden backup documents.
//!
//! Each accepted vector is a backup as another installation would have
//! written it, with the entries a store must hold after importing it. The
//! rejected vectors must fail without changing the store.

use std::collections::BTreeSet;

use confstore_core::Value;

/// A backup that must import.
#[derive(Debug, Clone)]
pub struct GoldenBackup {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// The backup text.
    pub json: &'static str,
    /// Store contents after import, ordered by key.
    pub entries: Vec<(&'static str, Value)>,
}

/// Why a rejected vector must fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    VersionMismatch,
    InvalidHolder,
    UnknownType,
    InvalidDocument,
}

/// Get all importable vectors.
pub fn accepted_vectors() -> Vec<GoldenBackup> {
    vec![
        GoldenBackup {
            name: "every kind",
            json: r#"{
                "__version": 2,
                "service_mode": {"type": 4, "value": "vpn"},
                "ipv6": {"type": 0, "value": true},
                "speed": {"type": 1, "value": 0.5},
                "mtu": {"type": 2, "value": 9000},
                "traffic_up": {"type": 3, "value": 1099511627776},
                "bypass_apps": {"type": 5, "value": ["com.b", "com.a", "com.a"]}
            }"#,
            entries: vec![
                (
                    "bypass_apps",
                    Value::StringSet(BTreeSet::from(["com.a".to_string(), "com.b".to_string()])),
                ),
                ("ipv6", Value::Boolean(true)),
                ("mtu", Value::Int(9000)),
                ("service_mode", Value::String("vpn".into())),
                ("speed", Value::Float(0.5)),
                ("traffic_up", Value::Long(1 << 40)),
            ],
        },
        GoldenBackup {
            name: "symbolic and fractional type tags",
            json: r#"{
                "__version": 2,
                "log_level": {"type": "LONG", "value": 3},
                "remote_dns": {"type": 4.0, "value": "1.1.1.1"}
            }"#,
            entries: vec![
                ("log_level", Value::Long(3)),
                ("remote_dns", Value::String("1.1.1.1".into())),
            ],
        },
        GoldenBackup {
            name: "migration flag is ignored",
            json: r#"{
                "__version": 2,
                "__datastore_migrated_from_room__": {"type": 0, "value": false},
                "proxy_apps": {"type": 0, "value": false}
            }"#,
            entries: vec![("proxy_apps", Value::Boolean(false))],
        },
        GoldenBackup {
            name: "version as string",
            json: r#"{"__version": "2", "ipv6": {"type": 0, "value": false}}"#,
            entries: vec![("ipv6", Value::Boolean(false))],
        },
        GoldenBackup {
            name: "version as double",
            json: r#"{"__version": 2.0, "mtu": {"type": 2, "value": 1500}}"#,
            entries: vec![("mtu", Value::Int(1500))],
        },
        GoldenBackup {
            name: "empty backup",
            json: r#"{"__version": 2}"#,
            entries: vec![],
        },
    ]
}

/// Get all vectors that must be rejected, with the expected reason.
pub fn rejected_vectors() -> Vec<(&'static str, &'static str, Rejection)> {
    vec![
        (
            "older version",
            r#"{"__version": 1, "a": {"type": 0, "value": true}}"#,
            Rejection::VersionMismatch,
        ),
        (
            "missing version",
            r#"{"a": {"type": 0, "value": true}}"#,
            Rejection::VersionMismatch,
        ),
        (
            "newer version as string",
            r#"{"__version": "3"}"#,
            Rejection::VersionMismatch,
        ),
        (
            "non-numeric version",
            r#"{"__version": "two", "a": {"type": 0, "value": true}}"#,
            Rejection::VersionMismatch,
        ),
        (
            "holder without type",
            r#"{"__version": 2, "a": {"value": true}}"#,
            Rejection::InvalidHolder,
        ),
        (
            "holder without value",
            r#"{"__version": 2, "a": {"type": 0}}"#,
            Rejection::InvalidHolder,
        ),
        (
            "value does not match type",
            r#"{"__version": 2, "a": {"type": 5, "value": "x"}}"#,
            Rejection::InvalidHolder,
        ),
        (
            "unknown type code",
            r#"{"__version": 2, "a": {"type": 6, "value": 1}}"#,
            Rejection::UnknownType,
        ),
        (
            "unknown type name",
            r#"{"__version": 2, "a": {"type": "DOUBLE", "value": 1.0}}"#,
            Rejection::UnknownType,
        ),
        ("not an object", r#"[2]"#, Rejection::InvalidDocument),
    ]
}
