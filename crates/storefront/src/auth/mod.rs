//! Authentication session.
//!
//! Keeps the signed-in user and their access token, mirrored to durable
//! key-value storage so the session survives a restart. The session is
//! cleared on logout and whenever the backend answers `401`.

mod error;

pub use error::AuthError;

use marketplace_core::{Email, User};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument, warn};

use crate::api::{AccessToken, ApiError, AuthGrant, MarketplaceApi};
use crate::storage::{KeyValueStore, StorageError, load_json, save_json};

/// Storage key for the signed-in user record.
pub const USER_KEY: &str = "current_user";
/// Storage key for the access token.
pub const TOKEN_KEY: &str = "auth_token";

/// The signed-in user, if any, backed by durable storage.
pub struct AuthSession {
    store: Box<dyn KeyValueStore>,
    user: Option<User>,
    token: Option<AccessToken>,
}

impl AuthSession {
    /// Restore the session saved in `store`.
    ///
    /// An unreadable record or a user without a token (or the reverse) is
    /// logged and cleared, leaving the session signed out.
    #[must_use]
    pub fn restore(store: Box<dyn KeyValueStore>) -> Self {
        let mut session = Self {
            store,
            user: None,
            token: None,
        };

        let user = load_json::<User>(session.store.as_ref(), USER_KEY);
        let token = session.store.get(TOKEN_KEY);

        match (user, token) {
            (Ok(Some(user)), Ok(Some(token))) => {
                debug!(user_id = %user.id, "Restored session");
                session.user = Some(user);
                session.token = Some(AccessToken::new(token));
            }
            (Ok(None), Ok(None)) => {}
            (user, token) => {
                if let Err(error) = &user {
                    warn!(%error, "Discarding unreadable stored user");
                }
                if let Err(error) = &token {
                    warn!(%error, "Discarding unreadable stored token");
                }
                if let Err(error) = session.clear() {
                    warn!(%error, "Failed to clear stored session");
                }
            }
        }

        session
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::EmptyPassword` for bad
    /// input (without calling the backend), `AuthError::Api` if the backend
    /// refuses, and `AuthError::Storage` if the session cannot be saved.
    #[instrument(skip(self, api, password))]
    pub async fn login(
        &mut self,
        api: &dyn MarketplaceApi,
        email: &str,
        password: &SecretString,
    ) -> Result<&User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let grant = api.login(email.as_str(), password).await?;
        info!(user_id = %grant.user.id, "Signed in");
        self.establish(grant)
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingName`, `AuthError::InvalidEmail` or
    /// `AuthError::EmptyPassword` for bad input, otherwise as
    /// [`AuthSession::login`].
    #[instrument(skip(self, api, password))]
    pub async fn register(
        &mut self,
        api: &dyn MarketplaceApi,
        name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<&User, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }
        let email = Email::parse(email)?;
        validate_password(password)?;

        let grant = api.register(name, email.as_str(), password).await?;
        info!(user_id = %grant.user.id, "Registered");
        self.establish(grant)
    }

    /// Sign out.
    ///
    /// The backend is told on a best-effort basis; local state is cleared
    /// regardless of its answer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the stored session cannot be removed.
    #[instrument(skip(self, api))]
    pub async fn logout(&mut self, api: &dyn MarketplaceApi) -> Result<(), AuthError> {
        if let Some(token) = &self.token
            && let Err(error) = api.logout(token).await
        {
            warn!(%error, "Backend logout failed, clearing local session anyway");
        }
        self.clear()?;
        info!("Signed out");
        Ok(())
    }

    /// Re-fetch the signed-in user from the backend.
    ///
    /// Returns `Ok(None)` when signed out. A `401` clears the session and
    /// is still reported as an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Api` if the backend call fails and
    /// `AuthError::Storage` if the refreshed user cannot be saved.
    #[instrument(skip(self, api))]
    pub async fn refresh(&mut self, api: &dyn MarketplaceApi) -> Result<Option<&User>, AuthError> {
        let Some(token) = self.token.clone() else {
            return Ok(None);
        };
        match api.current_user(&token).await {
            Ok(user) => {
                self.set_user(user)?;
                Ok(self.user.as_ref())
            }
            Err(error) => {
                self.check_unauthorized(&error);
                Err(AuthError::Api(error))
            }
        }
    }

    /// Replace the stored user record, e.g. after a profile update.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be saved.
    pub fn set_user(&mut self, user: User) -> Result<(), StorageError> {
        save_json(self.store.as_mut(), USER_KEY, &user)?;
        self.user = Some(user);
        Ok(())
    }

    /// Forget the session, in memory and in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written. In-memory state is
    /// cleared either way.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.user = None;
        self.token = None;
        let user = self.store.remove(USER_KEY);
        let token = self.store.remove(TOKEN_KEY);
        user.and(token)
    }

    /// Clear the session if the backend answered `401`.
    pub fn check_unauthorized(&mut self, error: &ApiError) {
        if error.is_unauthorized() {
            warn!("Backend rejected token, signing out");
            if let Err(storage) = self.clear() {
                warn!(error = %storage, "Failed to clear stored session");
            }
        }
    }

    fn establish(&mut self, grant: AuthGrant) -> Result<&User, AuthError> {
        let AuthGrant { token, user } = grant;
        let saved = self
            .store
            .set(TOKEN_KEY, token.expose().to_string())
            .and_then(|()| save_json(self.store.as_mut(), USER_KEY, &user));
        if let Err(error) = saved {
            // Leave neither half of a session behind
            if let Err(rollback) = self.store.remove(TOKEN_KEY) {
                warn!(error = %rollback, "Failed to roll back stored token");
            }
            return Err(error.into());
        }

        self.token = Some(token);
        Ok(&*self.user.insert(user))
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

fn validate_password(password: &SecretString) -> Result<(), AuthError> {
    if password.expose_secret().is_empty() {
        return Err(AuthError::EmptyPassword);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketplace_core::EmailError;

    use super::*;
    use crate::api::MockApi;
    use crate::storage::{FileStore, MemoryStore};

    fn password() -> SecretString {
        SecretString::from("hunter2".to_string())
    }

    /// Memory store whose writes to one key always fail.
    struct BrokenKey {
        inner: MemoryStore,
        key: &'static str,
    }

    impl BrokenKey {
        fn check(&self, key: &str) -> Result<(), StorageError> {
            if key == self.key {
                return Err(StorageError::Io {
                    path: "storage.json".into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            Ok(())
        }
    }

    impl KeyValueStore for BrokenKey {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
            self.check(key)?;
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            self.check(key)?;
            self.inner.remove(key)
        }
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let api = MockApi::new().unwrap();

        let mut session = AuthSession::restore(Box::new(FileStore::open(&path).unwrap()));
        assert!(!session.is_authenticated());
        session
            .login(&api, "jane@example.com", &password())
            .await
            .unwrap();
        let token = session.token().unwrap().expose().to_string();
        drop(session);

        let restored = AuthSession::restore(Box::new(FileStore::open(&path).unwrap()));
        assert!(restored.is_authenticated());
        assert_eq!(restored.user().unwrap().email.as_str(), "jane@example.com");
        assert_eq!(restored.token().unwrap().expose(), token);
    }

    #[tokio::test]
    async fn test_login_validates_before_calling_backend() {
        let api = MockApi::new().unwrap();
        let mut session = AuthSession::restore(Box::new(MemoryStore::new()));

        let err = session.login(&api, "", &password()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(EmailError::Empty)));

        let err = session
            .login(&api, "jane@example.com", &SecretString::from(String::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmptyPassword));

        let err = session
            .register(&api, "   ", "jane@example.com", &password())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingName));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_storage() {
        let api = MockApi::new().unwrap();
        let mut session = AuthSession::restore(Box::new(MemoryStore::new()));
        session
            .register(&api, "Jane Smith", "jane@example.com", &password())
            .await
            .unwrap();

        session.logout(&api).await.unwrap();
        assert!(session.user().is_none());
        assert!(session.token().is_none());
        assert_eq!(session.store.get(USER_KEY).unwrap(), None);
        assert_eq!(session.store.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_removes_token_when_user_removal_fails() {
        let api = MockApi::new().unwrap();
        let mut store = MemoryStore::new();
        store.set(TOKEN_KEY, "mock-abc".to_string()).unwrap();
        let user = api
            .login("jane@example.com", &password())
            .await
            .unwrap()
            .user;
        save_json(&mut store, USER_KEY, &user).unwrap();

        let mut session = AuthSession::restore(Box::new(BrokenKey {
            inner: store,
            key: USER_KEY,
        }));
        assert!(session.is_authenticated());

        let err = session.clear().unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
        assert!(!session.is_authenticated());
        assert_eq!(session.store.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_login_save_leaves_no_token() {
        let api = MockApi::new().unwrap();
        let mut session = AuthSession::restore(Box::new(BrokenKey {
            inner: MemoryStore::new(),
            key: USER_KEY,
        }));

        let result = session.login(&api, "jane@example.com", &password()).await;
        assert!(result.is_err());
        assert!(!session.is_authenticated());
        assert_eq!(session.store.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_unauthorized_refresh_clears_session() {
        let api = MockApi::new().unwrap();
        let mut store = MemoryStore::new();
        store.set(TOKEN_KEY, "revoked-token".to_string()).unwrap();
        let user = api
            .login("jane@example.com", &password())
            .await
            .unwrap()
            .user;
        save_json(&mut store, USER_KEY, &user).unwrap();

        let mut session = AuthSession::restore(Box::new(store));
        assert!(session.is_authenticated());

        let err = session.refresh(&api).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!session.is_authenticated());
        assert_eq!(session.store.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_restore_discards_corrupt_user() {
        let mut store = MemoryStore::new();
        store.set(USER_KEY, "{\"id\":".to_string()).unwrap();
        store.set(TOKEN_KEY, "mock-abc".to_string()).unwrap();

        let session = AuthSession::restore(Box::new(store));
        assert!(!session.is_authenticated());
        assert_eq!(session.store.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_restore_discards_token_without_user() {
        let mut store = MemoryStore::new();
        store.set(TOKEN_KEY, "mock-abc".to_string()).unwrap();

        let session = AuthSession::restore(Box::new(store));
        assert!(session.token().is_none());
    }

    #[tokio::test]
    async fn test_debug_redacts_token() {
        let api = MockApi::new().unwrap();
        let mut session = AuthSession::restore(Box::new(MemoryStore::new()));
        session
            .login(&api, "jane@example.com", &password())
            .await
            .unwrap();
        let token = session.token().unwrap().expose().to_string();
        assert!(!format!("{session:?}").contains(&token));
    }
}
