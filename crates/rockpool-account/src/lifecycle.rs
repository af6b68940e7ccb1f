//! Account lifecycle — open, register, login, logout, session-password gate.
//!
//! States: **Uninitialized** (no account record) → **Locked** (account
//! exists, no verified PIN this process) → **Authenticated** (PIN verified
//! this process). A fresh process always starts Locked when an account
//! exists, whatever the persisted session flag says: the flag only signals
//! that an unlocked session existed, for UX messaging, and must never gate
//! access on its own.
//!
//! Every operation reads, validates, then writes — a validation failure
//! leaves persisted state untouched.

use std::fmt;

use rockpool_crypto_core::credential;
use tracing::{debug, warn};

use crate::error::AccountError;
use crate::records::{self, AccountRecord, AccountState};
use crate::storage::{keys, Storage};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Required PIN length — the pin pad submits at exactly 4 digits.
const PIN_LEN: usize = 4;

/// Minimum session/export password length.
const MIN_PASSWORD_LEN: usize = 6;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Auth state of the manager for the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No account record exists.
    Uninitialized,
    /// An account exists but no PIN has been verified this process.
    Locked,
    /// A PIN has been verified this process.
    Authenticated,
}

/// Parameters for account registration.
pub struct RegisterRequest<'a> {
    /// Display name.
    pub name: &'a str,
    /// Session/export password (plaintext; hashed before storage).
    pub password: &'a str,
    /// Unlock PIN (plaintext; hashed before storage).
    pub pin: &'a str,
}

impl fmt::Debug for RegisterRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RegisterRequest(***)")
    }
}

/// Result of a successful registration. Contains only metadata — never
/// hashes or plaintext credentials.
#[derive(Debug, Clone)]
pub struct RegisterResult {
    /// The freshly generated account identifier.
    pub account_id: String,
}

/// The account lifecycle manager — one instance per app, storage injected.
pub struct AccountManager<S: Storage> {
    pub(crate) storage: S,
    pub(crate) state: AuthState,
    pub(crate) account_id: Option<String>,
    pub(crate) username: String,
}

impl<S: Storage> fmt::Debug for AccountManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountManager")
            .field("state", &self.state)
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Lifecycle operations
// ---------------------------------------------------------------------------

impl<S: Storage> AccountManager<S> {
    /// Open the manager over a storage backend.
    ///
    /// Reads the persisted credential and account keys to decide between
    /// `Uninitialized` and `Locked`. Never starts `Authenticated`: a
    /// persisted session flag does not survive a process restart as an
    /// unlocked session.
    ///
    /// # Errors
    ///
    /// - [`AccountError::Storage`] if the store cannot be read
    /// - [`AccountError::Format`] if the stored account record is corrupt
    pub fn open(storage: S) -> Result<Self, AccountError> {
        let pin_hash = storage.get(keys::PIN_HASH)?;
        let account_json = storage.get(keys::ACCOUNT)?;
        let username = storage.get(keys::USERNAME)?.unwrap_or_default();
        let session = storage.get(keys::SESSION)?;

        let (state, account_id) = match (pin_hash, account_json) {
            (Some(_), Some(json)) => {
                // The account key holds a bare record after registration but
                // the full account+game state after an import — parse with
                // the tolerant, defaulted view and take what's there.
                let record: AccountState = serde_json::from_str(&json)
                    .map_err(|e| AccountError::Format(format!("stored account record: {e}")))?;
                if session.as_deref() == Some("true") {
                    debug!("session flag set, PIN still required after process start");
                }
                (AuthState::Locked, record.account_id)
            }
            _ => (AuthState::Uninitialized, None),
        };

        Ok(Self {
            storage,
            state,
            account_id,
            username,
        })
    }

    /// Register a new account.
    ///
    /// Generates a fresh account identifier, hashes both credentials, and
    /// persists the record, hashes, username, and session flag. Transitions
    /// to `Authenticated`.
    ///
    /// # Errors
    ///
    /// - [`AccountError::Validation`] on a malformed name, password, or PIN
    /// - [`AccountError::Storage`] if any write fails
    pub fn register(&mut self, req: &RegisterRequest<'_>) -> Result<RegisterResult, AccountError> {
        validate_name(req.name)?;
        validate_password(req.password)?;
        validate_pin(req.pin)?;

        let account_id = records::generate_account_id();
        let pin_hash = credential::hash_pin(req.pin);
        let password_hash = credential::hash_export_password(req.password);
        let record = AccountRecord {
            account_id: account_id.clone(),
            created_at: records::now_iso8601(),
            version: records::ACCOUNT_RECORD_VERSION,
        };
        let record_json = serde_json::to_string(&record)
            .map_err(|e| AccountError::Serialization(e.to_string()))?;

        // One logical transaction — the underlying store has no native
        // transaction support.
        self.storage.set(keys::PIN_HASH, &pin_hash)?;
        self.storage.set(keys::PASSWORD_HASH, &password_hash)?;
        self.storage.set(keys::USERNAME, req.name)?;
        self.storage.set(keys::ACCOUNT, &record_json)?;
        self.storage.set(keys::SESSION, "true")?;

        self.state = AuthState::Authenticated;
        self.account_id = Some(account_id.clone());
        self.username = req.name.to_string();
        debug!(account_id = %account_id, "account registered");
        Ok(RegisterResult { account_id })
    }

    /// Verify the PIN and unlock for this process.
    ///
    /// An unbounded number of attempts is permitted — there is no lockout or
    /// backoff on PIN verification.
    ///
    /// # Errors
    ///
    /// - [`AccountError::NoAccount`] if no PIN hash is stored
    /// - [`AccountError::InvalidPin`] on a wrong PIN; nothing is mutated
    /// - [`AccountError::Storage`] if the store fails
    pub fn login(&mut self, pin: &str) -> Result<(), AccountError> {
        let Some(stored) = self.storage.get(keys::PIN_HASH)? else {
            return Err(AccountError::NoAccount);
        };
        if !credential::verify_pin(pin, &stored) {
            return Err(AccountError::InvalidPin);
        }

        self.storage.set(keys::SESSION, "true")?;
        self.state = AuthState::Authenticated;
        debug!("login verified");
        Ok(())
    }

    /// Clear the session flag and relock. Account record and credential
    /// hashes are untouched.
    ///
    /// # Errors
    ///
    /// [`AccountError::Storage`] if the flag cannot be written.
    pub fn logout(&mut self) -> Result<(), AccountError> {
        self.storage.set(keys::SESSION, "false")?;
        self.state = if self.account_id.is_some() {
            AuthState::Locked
        } else {
            AuthState::Uninitialized
        };
        Ok(())
    }

    /// Check a password against the stored export-password hash — the gate
    /// in front of export, independent of the PIN gate.
    ///
    /// Storage failures and a missing hash both read as `false`, so callers
    /// cannot distinguish "no account" from "wrong password".
    #[must_use]
    pub fn verify_session_password(&self, password: &str) -> bool {
        match self.storage.get(keys::PASSWORD_HASH) {
            Ok(Some(stored)) => credential::verify_export_password(password, &stored),
            Ok(None) => false,
            Err(e) => {
                warn!("session password check failed on storage read: {e}");
                false
            }
        }
    }

    // -- accessors ----------------------------------------------------------

    /// Current auth state.
    #[must_use]
    pub const fn state(&self) -> AuthState {
        self.state
    }

    /// Whether a PIN has been verified this process.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// Whether no account exists yet.
    #[must_use]
    pub fn is_first_time(&self) -> bool {
        self.state == AuthState::Uninitialized
    }

    /// The account identifier, if an account exists.
    #[must_use]
    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    /// The stored display name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The injected storage backend.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub(crate) fn validate_pin(pin: &str) -> Result<(), AccountError> {
    if pin.len() != PIN_LEN || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AccountError::Validation(format!(
            "PIN must be exactly {PIN_LEN} digits"
        )));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_name(name: &str) -> Result<(), AccountError> {
    if name.trim().is_empty() {
        return Err(AccountError::Validation("name must not be empty".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
