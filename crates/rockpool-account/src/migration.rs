//! Export/import of the full local state as one encrypted portable bundle.
//!
//! # Security model
//!
//! - Export is gated by the session password; the bundle itself is encrypted
//!   under a key derived from a second, independent file password.
//! - Import never reuses imported credentials: the caller supplies a fresh
//!   PIN and session password and the account is re-keyed on restore.
//! - All validation (envelope parse, decrypt, marker check, sub-record
//!   parse) completes before the first write — a failed import leaves every
//!   persisted key untouched.
//! - The restore writes credential keys and game-owned keys together,
//!   because the two logically separate stores must stay consistent. There
//!   is no native transaction support: a crash between writes can leave
//!   them inconsistent.

use rockpool_crypto_core::{cipher, credential};
use std::fmt;
use tracing::debug;

use crate::error::AccountError;
use crate::lifecycle::{self, AccountManager, AuthState};
use crate::records::{
    self, AccountState, ExportBundle, ExportFile, ProfileRecord, APP_MARKER, EXPORT_FORMAT_VERSION,
};
use crate::storage::{keys, Storage};

/// Hex chars of the file-password hash embedded as the bundle checksum.
const CHECKSUM_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Parameters for [`AccountManager::export_account`].
pub struct ExportRequest<'a> {
    /// Must match the stored export-password hash.
    pub session_password: &'a str,
    /// Independent password protecting the exported file.
    pub file_password: &'a str,
    /// Live account + game state. Preferred over persisted copies when both
    /// live records are supplied, so exports reflect in-memory state not yet
    /// flushed to storage.
    pub live_account: Option<&'a AccountState>,
    /// Live profile record, paired with `live_account`.
    pub live_profile: Option<&'a ProfileRecord>,
}

impl fmt::Debug for ExportRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExportRequest(***)")
    }
}

/// Parameters for [`AccountManager::import_account`].
pub struct ImportRequest<'a> {
    /// Contents of the export file (outer JSON envelope).
    pub file_contents: &'a str,
    /// Password the file was exported with.
    pub file_password: &'a str,
    /// Fresh session password for the restored account.
    pub new_session_password: &'a str,
    /// Fresh PIN for the restored account.
    pub new_pin: &'a str,
}

impl fmt::Debug for ImportRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ImportRequest(***)")
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl<S: Storage> AccountManager<S> {
    /// Build and encrypt the export bundle, returning the file contents.
    ///
    /// The result is the outer JSON envelope `{"data": <container>}` —
    /// handed back for file sharing, never written to storage.
    ///
    /// # Errors
    ///
    /// - [`AccountError::InvalidSessionPassword`] if the session password
    ///   does not match; nothing is read beyond the stored hash
    /// - [`AccountError::Storage`] if persisted copies cannot be read
    /// - [`AccountError::Serialization`] if a record fails to serialize
    pub fn export_account(&self, req: &ExportRequest<'_>) -> Result<String, AccountError> {
        if !self.verify_session_password(req.session_password) {
            return Err(AccountError::InvalidSessionPassword);
        }

        let (account, profile, username) = match (req.live_account, req.live_profile) {
            (Some(live_account), Some(live_profile)) => {
                let account = serde_json::to_string(live_account)
                    .map_err(|e| AccountError::Serialization(e.to_string()))?;
                let profile = serde_json::to_string(live_profile)
                    .map_err(|e| AccountError::Serialization(e.to_string()))?;
                (
                    Some(account),
                    Some(profile),
                    Some(live_profile.name.clone()),
                )
            }
            _ => (
                self.storage.get(keys::ACCOUNT)?,
                self.storage.get(keys::PROFILE)?,
                self.storage.get(keys::USERNAME)?,
            ),
        };

        let file_key = credential::hash_export_password(req.file_password);
        let bundle = ExportBundle {
            app: APP_MARKER.to_string(),
            version: EXPORT_FORMAT_VERSION,
            exported_at: records::now_iso8601(),
            username,
            account,
            profile,
            checksum: file_key[..CHECKSUM_LEN].to_string(),
        };

        let plaintext = serde_json::to_string(&bundle)
            .map_err(|e| AccountError::Serialization(e.to_string()))?;
        let container = cipher::encrypt(&plaintext, &file_key);

        debug!("export bundle sealed");
        serde_json::to_string(&ExportFile::new(container))
            .map_err(|e| AccountError::Serialization(e.to_string()))
    }

    /// Decrypt an export file and restore it, replacing the local account
    /// wholesale and re-keying it with the supplied credentials.
    ///
    /// # Errors
    ///
    /// - [`AccountError::Validation`] on a malformed new PIN or password
    /// - [`AccountError::Format`] on a malformed envelope, payload, or
    ///   sub-record
    /// - [`AccountError::WrongFilePassword`] if decryption fails — wrong
    ///   password and corrupted file are indistinguishable
    /// - [`AccountError::ForeignFile`] if the bundle's marker is not ours
    /// - [`AccountError::Storage`] if a restore write fails
    ///
    /// On any of the validation errors, no persisted state is mutated.
    pub fn import_account(&mut self, req: &ImportRequest<'_>) -> Result<(), AccountError> {
        // Validation phase — nothing below writes until every check passes.
        lifecycle::validate_pin(req.new_pin)?;
        lifecycle::validate_password(req.new_session_password)?;

        let envelope: ExportFile = serde_json::from_str(req.file_contents)
            .map_err(|e| AccountError::Format(format!("outer envelope: {e}")))?;
        let Some(container) = envelope.container() else {
            return Err(AccountError::Format("missing encrypted data field".into()));
        };
        if !container.starts_with(cipher::AEAD_PREFIX)
            && !container.starts_with(cipher::FALLBACK_PREFIX)
        {
            // Legacy un-prefixed containers are not decoded best-effort.
            return Err(AccountError::Format("unrecognized container format".into()));
        }

        let file_key = credential::hash_export_password(req.file_password);
        let Some(plaintext) = cipher::decrypt(container, &file_key) else {
            return Err(AccountError::WrongFilePassword);
        };

        let bundle: ExportBundle = serde_json::from_str(&plaintext)
            .map_err(|e| AccountError::Format(format!("bundle payload: {e}")))?;
        if bundle.app != APP_MARKER {
            return Err(AccountError::ForeignFile);
        }

        let account_json = bundle.account.unwrap_or_else(|| "{}".to_string());
        let profile_json = bundle.profile.unwrap_or_else(|| "{}".to_string());
        let account_state: AccountState = serde_json::from_str(&account_json)
            .map_err(|e| AccountError::Format(format!("account sub-record: {e}")))?;
        serde_json::from_str::<ProfileRecord>(&profile_json)
            .map_err(|e| AccountError::Format(format!("profile sub-record: {e}")))?;
        let username = bundle.username.unwrap_or_default();

        // Re-key: imported credentials are never reused.
        let new_pin_hash = credential::hash_pin(req.new_pin);
        let new_password_hash = credential::hash_export_password(req.new_session_password);

        let items_json = serde_json::to_string(&account_state.scanned_items)
            .map_err(|e| AccountError::Serialization(e.to_string()))?;
        let nfts_json = serde_json::to_string(&account_state.nfts)
            .map_err(|e| AccountError::Serialization(e.to_string()))?;

        // Restore phase — auth keys and game-owned keys written together as
        // one logical transaction.
        self.storage.set(keys::PIN_HASH, &new_pin_hash)?;
        self.storage.set(keys::PASSWORD_HASH, &new_password_hash)?;
        self.storage.set(keys::USERNAME, &username)?;
        self.storage.set(keys::ACCOUNT, &account_json)?;
        self.storage.set(keys::PROFILE, &profile_json)?;
        self.storage.set(keys::SESSION, "true")?;
        self.storage.set(keys::GAME_POINTS, &account_state.points.to_string())?;
        self.storage.set(keys::GAME_ITEMS, &items_json)?;
        self.storage.set(keys::GAME_NFTS, &nfts_json)?;
        self.storage.set(keys::GAME_USER_META, &profile_json)?;

        self.state = AuthState::Authenticated;
        self.account_id = Some(
            account_state
                .account_id
                .unwrap_or_else(|| "imported".to_string()),
        );
        self.username = username;
        debug!("account imported and re-keyed");
        Ok(())
    }
}
