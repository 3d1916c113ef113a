use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{DecodingKey, Validation};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::routes::{Redirect, Route};
use crate::schemas::{de_id_opt, Role, User};

/// Where the bearer token lives between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> AppResult<Option<String>>;
    fn save(&self, token: &str) -> AppResult<()>;
    fn clear(&self) -> AppResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> AppResult<Option<String>> {
        Ok(self
            .token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, token: &str) -> AppResult<()> {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

/// Token persisted as a single line in a file, for the CLI.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> AppResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents.trim().to_string()).filter(|token| !token.is_empty())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn save(&self, token: &str) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, token.trim())?;
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

/// Claims the client reads from the access token. The signature is checked
/// by the backend, never here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenClaims {
    #[serde(default, deserialize_with = "de_id_opt")]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn decode(token: &str) -> AppResult<Self> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        jsonwebtoken::decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|error| AppError::Unauthorized(format!("Malformed access token: {error}")))
    }

    /// Tokens without `exp` never expire client-side.
    pub fn is_expired_at(&self, now_ts: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now_ts)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    claims: Option<TokenClaims>,
    user: Option<User>,
    pending_redirect: Option<Redirect>,
}

/// Explicit session passed to every page controller and to the API client.
pub struct Session {
    store: Arc<dyn TokenStore>,
    state: RwLock<SessionState>,
}

impl Session {
    /// Restore a session from the store. A malformed stored token is dropped.
    pub fn new(store: Arc<dyn TokenStore>) -> AppResult<Self> {
        let session = Self {
            store,
            state: RwLock::new(SessionState::default()),
        };
        if let Some(token) = session.store.load()? {
            match TokenClaims::decode(&token) {
                Ok(claims) => {
                    let mut state = session.write_state();
                    state.token = Some(token);
                    state.claims = Some(claims);
                }
                Err(error) => {
                    tracing::warn!(error = %error, "Discarding stored token");
                    session.store.clear()?;
                }
            }
        }
        Ok(session)
    }

    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryTokenStore::default()),
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn set_token(&self, token: &str) -> AppResult<()> {
        let claims = TokenClaims::decode(token)?;
        self.store.save(token)?;
        let mut state = self.write_state();
        state.token = Some(token.to_string());
        state.claims = Some(claims);
        state.user = None;
        Ok(())
    }

    pub fn set_user(&self, user: User) {
        self.write_state().user = Some(user);
    }

    /// Current bearer token, `None` when absent or expired.
    pub fn token(&self) -> Option<String> {
        self.token_at(Utc::now().timestamp())
    }

    pub fn token_at(&self, now_ts: i64) -> Option<String> {
        let state = self.read_state();
        let expired = state
            .claims
            .as_ref()
            .is_some_and(|claims| claims.is_expired_at(now_ts));
        if expired {
            return None;
        }
        state.token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn is_expired_at(&self, now_ts: i64) -> bool {
        self.read_state()
            .claims
            .as_ref()
            .is_some_and(|claims| claims.is_expired_at(now_ts))
    }

    pub fn claims(&self) -> Option<TokenClaims> {
        self.read_state().claims.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read_state().user.clone()
    }

    /// Role of the signed-in user: the fetched profile wins over token claims.
    pub fn role(&self) -> Option<Role> {
        if !self.is_authenticated() {
            return None;
        }
        let state = self.read_state();
        if let Some(user) = state.user.as_ref() {
            return Some(user.role);
        }
        state
            .claims
            .as_ref()
            .and_then(|claims| claims.role.as_deref())
            .and_then(Role::parse)
    }

    pub fn user_id(&self) -> Option<String> {
        if !self.is_authenticated() {
            return None;
        }
        let state = self.read_state();
        if let Some(user) = state.user.as_ref() {
            return Some(user.id.clone());
        }
        state.claims.as_ref().and_then(|claims| claims.sub.clone())
    }

    pub fn clear(&self) -> AppResult<()> {
        self.store.clear()?;
        let mut state = self.write_state();
        state.token = None;
        state.claims = None;
        state.user = None;
        Ok(())
    }

    /// A 401 from the backend: forget the token and send the user to login.
    /// Unsaved form state is lost.
    pub fn handle_unauthorized(&self) {
        if let Err(error) = self.clear() {
            tracing::error!(error = %error, "Failed to clear stored token");
        }
        self.write_state().pending_redirect = Some(Redirect::now(Route::Login));
        tracing::info!("Session cleared after 401, redirecting to login");
    }

    pub fn schedule_redirect(&self, to: Route, after: Duration) {
        self.write_state().pending_redirect = Some(Redirect::delayed(to, after));
    }

    pub fn pending_redirect(&self) -> Option<Redirect> {
        self.read_state().pending_redirect
    }

    pub fn take_redirect(&self) -> Option<Redirect> {
        self.write_state().pending_redirect.take()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
