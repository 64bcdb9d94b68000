use chat_provider::ChatProvider;
use conversation_store::KeyValueMedium;
use thiserror::Error;

/// Durable slot holding the accepted credential. An absent slot means the
/// credential was never supplied, distinct from an invalid supplied value.
pub const CREDENTIAL_KEY: &str = "auth_token";

/// Gate states. `Open` and `Unlocked` are the only states from which session
/// operations may reach the backend; every other state blocks them while
/// previously persisted local records stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Detecting,
    Open,
    Locked,
    AwaitingCredential,
    Unlocked,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("credential must not be empty")]
    EmptyCredential,

    #[error("credential was rejected: {0}")]
    InvalidCredential(String),

    #[error("credential validation request failed: {0}")]
    Probe(String),

    #[error("gate is not awaiting a credential")]
    NotAwaitingCredential,
}

/// Startup and mid-session authentication gate.
///
/// Detection runs once at startup and fails closed: when the detection call
/// cannot complete, the gate behaves as if authentication were required.
pub struct AuthGate<M: KeyValueMedium> {
    state: AuthState,
    medium: M,
    credential: Option<String>,
}

impl<M: KeyValueMedium> AuthGate<M> {
    #[must_use]
    pub fn new(medium: M) -> Self {
        Self {
            state: AuthState::Detecting,
            medium,
            credential: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Durable medium backing the credential slot.
    #[must_use]
    pub fn medium(&self) -> &M {
        &self.medium
    }

    /// Credential attached to protected requests; `None` in `Open`, where no
    /// request carries one.
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        match self.state {
            AuthState::Unlocked => self.credential.as_deref(),
            _ => None,
        }
    }

    /// Whether session operations may run against the backend.
    #[must_use]
    pub fn allows_session_ops(&self) -> bool {
        matches!(self.state, AuthState::Open | AuthState::Unlocked)
    }

    /// Runs auth detection and, when locked, silent validation of any stored
    /// credential. Returns the resulting state.
    pub async fn detect(&mut self, provider: &dyn ChatProvider) -> AuthState {
        match provider.auth_required().await {
            Ok(false) => {
                tracing::info!("backend requires no authentication");
                self.state = AuthState::Open;
            }
            Ok(true) => {
                self.state = AuthState::Locked;
                self.resolve_locked(provider).await;
            }
            Err(error) => {
                tracing::warn!(%error, "auth detection failed, failing closed");
                self.state = AuthState::Locked;
                self.resolve_locked(provider).await;
            }
        }

        self.state
    }

    async fn resolve_locked(&mut self, provider: &dyn ChatProvider) {
        let stored = match self.medium.get(CREDENTIAL_KEY) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, "credential slot unreadable");
                None
            }
        };

        let Some(token) = stored else {
            self.state = AuthState::AwaitingCredential;
            return;
        };

        // Lightweight authorized probe; any failure discards the stored
        // credential and falls through to interactive collection.
        match provider.list_models(Some(&token)).await {
            Ok(_) => {
                tracing::info!("stored credential validated");
                self.credential = Some(token);
                self.state = AuthState::Unlocked;
            }
            Err(error) => {
                tracing::info!(%error, "stored credential failed silent validation");
                self.discard_stored_credential();
                self.state = AuthState::AwaitingCredential;
            }
        }
    }

    /// Validates and stores a user-submitted credential.
    ///
    /// Empty or whitespace-only candidates are rejected locally without a
    /// network call. A failed probe leaves the gate awaiting a credential and
    /// stores nothing.
    pub async fn submit_credential(
        &mut self,
        provider: &dyn ChatProvider,
        candidate: &str,
    ) -> Result<(), AuthError> {
        if self.state != AuthState::AwaitingCredential {
            return Err(AuthError::NotAwaitingCredential);
        }

        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Err(AuthError::EmptyCredential);
        }

        match provider.list_models(Some(candidate)).await {
            Ok(_) => {
                if let Err(error) = self.medium.set(CREDENTIAL_KEY, candidate) {
                    tracing::warn!(%error, "credential accepted but not yet durable");
                }
                self.credential = Some(candidate.to_string());
                self.state = AuthState::Unlocked;
                Ok(())
            }
            Err(error) if error.is_credential_rejection() => {
                Err(AuthError::InvalidCredential(error.to_string()))
            }
            Err(error) => Err(AuthError::Probe(error.to_string())),
        }
    }

    /// Reacts to a protected call coming back rejected-for-credential reasons
    /// while `Unlocked`: discards the credential and awaits a new one.
    ///
    /// Returns true when the discard happened (once per rejection); repeated
    /// calls and calls in other states are no-ops.
    pub fn on_credential_rejected(&mut self) -> bool {
        if self.state != AuthState::Unlocked {
            return false;
        }

        tracing::info!("credential rejected mid-session, collecting a new one");
        self.credential = None;
        self.discard_stored_credential();
        self.state = AuthState::AwaitingCredential;
        true
    }

    fn discard_stored_credential(&mut self) {
        if let Err(error) = self.medium.remove(CREDENTIAL_KEY) {
            tracing::warn!(%error, "failed to clear stored credential");
        }
    }
}
