//! Session Module
//!
//! Owns the persisted authentication state (token, flag, user) and its
//! lifecycle. The HTTP client and the router both receive a
//! [`SessionContext`] instead of reaching into storage themselves.

use std::sync::{Arc, RwLock, Weak};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::api::AuthUser;
use crate::storage::{KeyValueStore, StorageError};

pub const TOKEN_KEY: &str = "authToken";
pub const AUTHENTICATED_KEY: &str = "isAuthenticated";
pub const USER_KEY: &str = "currentUser";
pub const STARTED_AT_KEY: &str = "sessionStartedAt";

/// Session lifecycle transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login stored a new token
    Started,
    /// The user logged out
    Ended,
    /// The backend rejected the token
    Expired,
}

/// Observer notified on every session transition
pub trait SessionListener: Send + Sync {
    fn on_session_event(&self, event: SessionEvent);
}

/// Authentication facts the navigation guard needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub authenticated: bool,
    pub role: Option<String>,
}

/// Shared handle to the persisted session
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn KeyValueStore>,
    listeners: RwLock<Vec<Weak<dyn SessionListener>>>,
}

impl SessionContext {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Register a listener; it is dropped from the list once its last `Arc` goes away
    pub fn subscribe<L: SessionListener + 'static>(&self, listener: &Arc<L>) {
        let weak: Weak<dyn SessionListener> = Arc::downgrade(listener) as Weak<dyn SessionListener>;
        if let Ok(mut listeners) = self.inner.listeners.write() {
            listeners.retain(|l| l.strong_count() > 0);
            listeners.push(weak);
        }
    }

    /// Store a freshly issued token and its user.
    ///
    /// Either every key is written or none is: on a failed write the keys
    /// already stored are removed again before the error is returned.
    pub fn begin(&self, token: &str, user: &AuthUser) -> Result<(), StorageError> {
        let user_json =
            serde_json::to_string(user).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let started_at = Utc::now();

        if let Err(e) = self.store(token, &user_json, started_at) {
            if let Err(cleanup) = self.clear() {
                warn!("Failed to roll back partial session: {}", cleanup);
            }
            return Err(e);
        }

        info!("Session started for user: {} at {}", user.username, started_at);
        self.notify(SessionEvent::Started);
        Ok(())
    }

    /// Tear down the session on logout
    pub fn end(&self) -> Result<(), StorageError> {
        self.clear()?;
        info!("Session ended");
        self.notify(SessionEvent::Ended);
        Ok(())
    }

    /// Tear down the session after the backend answered 401.
    ///
    /// Never fails; storage errors are logged and listeners are still notified.
    pub fn expire(&self) {
        if let Err(e) = self.clear() {
            warn!("Failed to clear expired session: {}", e);
        }
        warn!("Session expired");
        self.notify(SessionEvent::Expired);
    }

    pub fn token(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .inner
            .storage
            .get_item(TOKEN_KEY)?
            .filter(|t| !t.is_empty()))
    }

    /// Read the authenticated flag; unreadable storage counts as logged out
    pub fn is_authenticated(&self) -> bool {
        match self.inner.storage.get_item(AUTHENTICATED_KEY) {
            Ok(flag) => flag.as_deref() == Some("true"),
            Err(e) => {
                warn!("Failed to read authenticated flag: {}", e);
                false
            }
        }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        let raw = match self.inner.storage.get_item(USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read current user: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Stored user record is unreadable: {}", e);
                None
            }
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.inner.storage.get_item(STARTED_AT_KEY).ok()??;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    pub fn auth_state(&self) -> AuthState {
        let authenticated = self.is_authenticated();
        let role = if authenticated {
            self.current_user()
                .map(|u| u.role)
                .filter(|r| !r.is_empty())
        } else {
            None
        };
        AuthState {
            authenticated,
            role,
        }
    }

    // The flag goes last so the guard never sees a session without a token.
    fn store(
        &self,
        token: &str,
        user_json: &str,
        started_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let storage = &self.inner.storage;
        storage.set_item(TOKEN_KEY, token)?;
        storage.set_item(USER_KEY, user_json)?;
        storage.set_item(STARTED_AT_KEY, &started_at.to_rfc3339())?;
        storage.set_item(AUTHENTICATED_KEY, "true")
    }

    fn clear(&self) -> Result<(), StorageError> {
        let storage = &self.inner.storage;
        storage.remove_item(AUTHENTICATED_KEY)?;
        storage.remove_item(TOKEN_KEY)?;
        storage.remove_item(USER_KEY)?;
        storage.remove_item(STARTED_AT_KEY)?;
        Ok(())
    }

    fn notify(&self, event: SessionEvent) {
        // Listeners may call back into the session, so the lock is released first.
        let listeners: Vec<Arc<dyn SessionListener>> = match self.inner.listeners.read() {
            Ok(listeners) => listeners.iter().filter_map(Weak::upgrade).collect(),
            Err(_) => return,
        };
        debug!("Notifying {} session listener(s) of {:?}", listeners.len(), event);
        for listener in listeners {
            listener.on_session_event(event);
        }
    }
}
