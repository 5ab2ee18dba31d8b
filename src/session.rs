use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Authentication state reported by the external auth provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthState {
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Opaque learner identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    /// Bearer token forwarded to the remote store, if the provider issues one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[derive(Debug)]
struct SessionInner {
    state: AuthState,
    identity: Option<Identity>,
}

/// Current identity and auth state, shared by the scheduler and the sync engine
#[derive(Debug)]
pub struct Session {
    inner: Mutex<SessionInner>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                state: AuthState::Loading,
                identity: None,
            }),
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AuthState {
        self.inner.lock().unwrap().state
    }

    /// The identity, only while authenticated
    pub fn identity(&self) -> Option<Identity> {
        let inner = self.inner.lock().unwrap();
        match inner.state {
            AuthState::Authenticated => inner.identity.clone(),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    pub fn sign_in(&self, identity: Identity) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = AuthState::Authenticated;
        inner.identity = Some(identity);
    }

    pub fn sign_out(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = AuthState::Unauthenticated;
        inner.identity = None;
    }

    pub fn set_loading(&self) {
        self.inner.lock().unwrap().state = AuthState::Loading;
    }
}
