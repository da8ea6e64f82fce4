//! The authoritative connection lifecycle.
//!
//! `SessionState` is a plain owned value; whoever holds it is responsible
//! for serializing access. It holds one of two shapes:
//!
//! - **Disconnected**: `pairing_token` set, `identity` and `connected_at` unset.
//! - **Connected**: `identity` and `connected_at` set, `pairing_token` unset.
//!
//! Every status read while disconnected re-issues the pairing token, so a
//! caller polling status never sees the same token twice. Reads are not
//! idempotent.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::token::PairingToken;

/// Point-in-time view of the session, produced by [`SessionState::current_status`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub connected: bool,
    pub pairing_token: Option<String>,
    pub connected_at: Option<DateTime<Utc>>,
    pub identity: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct SessionState {
    connected: bool,
    pairing_token: Option<PairingToken>,
    connected_at: Option<DateTime<Utc>>,
    identity: Option<String>,
    last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// A disconnected session holding a fresh pairing token.
    pub fn new() -> Self {
        let state = Self {
            connected: false,
            pairing_token: Some(PairingToken::generate()),
            connected_at: None,
            identity: None,
            last_error: None,
        };
        info!("session initialized, waiting for pairing");
        state
    }

    /// Report the current status. Re-issues the pairing token first when
    /// disconnected.
    pub fn current_status(&mut self) -> StatusSnapshot {
        if !self.connected {
            self.refresh_token();
        }
        StatusSnapshot {
            connected: self.connected,
            pairing_token: self.pairing_token.as_ref().map(|t| t.as_str().to_owned()),
            connected_at: self.connected_at,
            identity: self.identity.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Confirm a scanned token and move to connected. Valid from any state.
    pub fn pair(&mut self, identity: impl Into<String>) {
        let identity = identity.into();
        self.connected = true;
        self.pairing_token = None;
        self.connected_at = Some(Utc::now());
        self.last_error = None;
        info!(identity = %identity, "session paired");
        self.identity = Some(identity);
    }

    /// Drop the pairing and immediately issue a new token.
    pub fn unpair(&mut self) {
        let previous = self.identity.take();
        self.connected = false;
        self.connected_at = None;
        self.refresh_token();
        info!(identity = ?previous, "session unpaired");
    }

    /// Record the most recent dispatch error. Last write wins.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// Connection check without the token side effect of `current_status`.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn refresh_token(&mut self) {
        let mut next = PairingToken::generate();
        while self.pairing_token.as_ref() == Some(&next) {
            next = PairingToken::generate();
        }
        debug!(issued_at = %next.issued_at(), "pairing token refreshed");
        self.pairing_token = Some(next);
    }
}
