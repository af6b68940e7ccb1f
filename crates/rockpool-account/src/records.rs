//! Persisted records and wire data model.
//!
//! Every struct here mirrors a JSON value that either lives under a storage
//! key or travels inside an export bundle. Field names are camelCase on the
//! wire; unknown fields survive round-trips through the flattened `extra`
//! maps, and missing fields resolve to explicit defaults once at parse time
//! rather than ad hoc per call site.

use chrono::{SecondsFormat, Utc};
use data_encoding::HEXLOWER;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

// ── Constants ──────────────────────────────────────────────────────

/// Marker identifying export bundles produced by this application.
pub const APP_MARKER: &str = "Rockpool";

/// Version stamped into new account records.
pub const ACCOUNT_RECORD_VERSION: u32 = 2;

/// Version stamped into export bundles.
pub const EXPORT_FORMAT_VERSION: u32 = 3;

/// Fixed length of an account identifier.
pub const ACCOUNT_ID_LEN: usize = 42;

/// Random suffix bytes in a generated account identifier.
const ACCOUNT_ID_SUFFIX_LEN: usize = 6;

// ── Records ────────────────────────────────────────────────────────

/// The persisted account record. Created once at registration, replaced
/// wholesale only by a successful import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Opaque 42-char identifier — time-based prefix plus random suffix.
    /// An identifier, not a secret.
    pub account_id: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// Record format version.
    pub version: u32,
}

/// Scanned-item counters, part of the game state restored on import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemCounters {
    pub bottles: u64,
    pub cans: u64,
    pub total: u64,
    /// Further item categories the game may add.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Live account + game state, as supplied by the game collaborator for
/// export and decomposed back into game-owned keys on import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountState {
    pub account_id: Option<String>,
    pub created_at: Option<String>,
    pub version: Option<u32>,
    pub points: u64,
    pub scanned_items: ItemCounters,
    pub nfts: Vec<serde_json::Value>,
    /// Fields owned by the collaborator that the core carries opaquely.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Mutable user-facing profile. Owned by the game/profile collaborator; the
/// core parses it only to validate and to read the display name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileRecord {
    pub name: String,
    pub avatar: Option<String>,
    pub initials: String,
    /// One-time username change flag.
    pub has_changed_username: bool,
    pub wallet_address: Option<String>,
    pub join_date: Option<String>,
    pub total_impact: u64,
    pub equipped_title: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The plaintext bundle assembled for export. Constructed fresh on every
/// export, encrypted immediately, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportBundle {
    /// Application marker — import refuses bundles that don't carry it.
    pub app: String,
    /// Bundle format version.
    pub version: u32,
    /// ISO-8601 export timestamp.
    pub exported_at: String,
    pub username: Option<String>,
    /// Serialized account + game state (a JSON string, carried opaquely).
    pub account: Option<String>,
    /// Serialized profile record (a JSON string, carried opaquely).
    pub profile: Option<String>,
    /// First 16 hex chars of the file-password hash.
    pub checksum: String,
}

/// Outer envelope written to the export file: `{"data": <container>}`.
///
/// Import also accepts the legacy `encrypted` field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<String>,
}

impl ExportFile {
    /// Wrap a freshly encrypted container under the current field name.
    #[must_use]
    pub const fn new(container: String) -> Self {
        Self {
            data: Some(container),
            encrypted: None,
        }
    }

    /// The encrypted container, preferring the current field over the
    /// legacy one.
    #[must_use]
    pub fn container(&self) -> Option<&str> {
        self.data.as_deref().or(self.encrypted.as_deref())
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Generate a fresh opaque account identifier: `0x` + hex ms-timestamp +
/// random hex suffix, truncated or zero-padded to exactly 42 chars.
#[must_use]
pub fn generate_account_id() -> String {
    let millis = Utc::now().timestamp_millis().unsigned_abs();
    let mut suffix = [0u8; ACCOUNT_ID_SUFFIX_LEN];
    OsRng.fill_bytes(&mut suffix);

    let mut id = format!("0x{millis:x}{}", HEXLOWER.encode(&suffix));
    id.truncate(ACCOUNT_ID_LEN);
    while id.len() < ACCOUNT_ID_LEN {
        id.push('0');
    }
    id
}

/// Current UTC time as an ISO-8601 string with millisecond precision.
#[must_use]
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn account_id_is_42_chars_with_hex_prefix() {
        let id = generate_account_id();
        assert_eq!(id.len(), ACCOUNT_ID_LEN);
        assert!(id.starts_with("0x"));
        assert!(id[2..].bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn account_ids_are_unique() {
        let a = generate_account_id();
        let b = generate_account_id();
        assert_ne!(a, b);
    }

    #[test]
    fn account_record_uses_camel_case_on_the_wire() {
        let record = AccountRecord {
            account_id: "0xabc".into(),
            created_at: now_iso8601(),
            version: ACCOUNT_RECORD_VERSION,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("accountId"));
        assert!(json.contains("createdAt"));
        assert!(!json.contains("account_id"));
    }

    #[test]
    fn account_state_defaults_resolve_from_empty_object() {
        let state: AccountState = serde_json::from_str("{}").unwrap();
        assert_eq!(state.points, 0);
        assert_eq!(state.scanned_items, ItemCounters::default());
        assert!(state.nfts.is_empty());
        assert_eq!(state.account_id, None);
    }

    #[test]
    fn account_state_preserves_unknown_fields() {
        let json = r#"{"points":50,"streakDays":7}"#;
        let state: AccountState = serde_json::from_str(json).unwrap();
        assert_eq!(state.points, 50);
        assert_eq!(state.extra["streakDays"], 7);

        let reserialized = serde_json::to_string(&state).unwrap();
        assert!(reserialized.contains("streakDays"));
    }

    #[test]
    fn item_counters_carry_extra_categories() {
        let json = r#"{"bottles":3,"cans":1,"total":5,"trash":1}"#;
        let counters: ItemCounters = serde_json::from_str(json).unwrap();
        assert_eq!(counters.bottles, 3);
        assert_eq!(counters.extra["trash"], 1);
    }

    #[test]
    fn profile_record_defaults_and_flags() {
        let profile: ProfileRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(profile.name, "");
        assert!(!profile.has_changed_username);

        let json = r#"{"name":"Ana","hasChangedUsername":true,"equippedTitle":"Tide Turner"}"#;
        let profile: ProfileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(profile.name, "Ana");
        assert!(profile.has_changed_username);
        assert_eq!(profile.equipped_title.as_deref(), Some("Tide Turner"));
    }

    #[test]
    fn export_file_prefers_current_field_name() {
        let file = ExportFile {
            data: Some("v2:aa:bb".into()),
            encrypted: Some("legacy".into()),
        };
        assert_eq!(file.container(), Some("v2:aa:bb"));
    }

    #[test]
    fn export_file_accepts_legacy_field_name() {
        let file: ExportFile = serde_json::from_str(r#"{"encrypted":"v2:aa:bb"}"#).unwrap();
        assert_eq!(file.container(), Some("v2:aa:bb"));
    }

    #[test]
    fn export_file_serializes_only_the_current_field() {
        let json = serde_json::to_string(&ExportFile::new("v2:aa:bb".into())).unwrap();
        assert_eq!(json, r#"{"data":"v2:aa:bb"}"#);
    }

    #[test]
    fn export_bundle_missing_fields_default() {
        let bundle: ExportBundle = serde_json::from_str(r#"{"app":"Rockpool"}"#).unwrap();
        assert_eq!(bundle.app, APP_MARKER);
        assert_eq!(bundle.username, None);
        assert_eq!(bundle.account, None);
        assert_eq!(bundle.checksum, "");
    }

    proptest! {
        #[test]
        fn account_state_roundtrips_points(points in any::<u64>()) {
            let state = AccountState { points, ..AccountState::default() };
            let json = serde_json::to_string(&state).unwrap();
            let back: AccountState = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back.points, points);
        }
    }
}
