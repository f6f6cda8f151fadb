//! Session controller: orchestrates `AuthClient` and `SessionStore` into the
//! session state machine.
//!
//! ```text
//! LoggedOut --login--> Authenticating --ok--> LoggedIn(token, None)
//!                                    \--err--> LoggedOut
//! LoggedOut --restore (token stored)--> LoggedIn(token, None)
//! LoggedIn(token, _) --fetch_profile ok--> LoggedIn(token, Some(profile))
//! LoggedIn(token, _) --fetch_profile 401--> LoggedOut   (store cleared)
//! LoggedIn --logout(confirmed)--> LoggingOut --cleared--> LoggedOut
//! ```

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::api::{AuthClient, AuthError};
use crate::auth::{SessionStore, StorageError};
use crate::dialog::LogoutConfirmed;
use crate::models::{Credentials, NewAccount, Profile, Token};

use super::state::{SessionState, SessionStatus, StateTag};

/// Owns the session state and is its only mutator.
///
/// State lives in a watch channel so screens can observe transitions. All
/// methods take `&self`; guard states make concurrent intents safe.
pub struct SessionController {
    client: AuthClient,
    store: Arc<dyn SessionStore>,
    state: watch::Sender<SessionState>,
    /// Serializes store access so writes land in the order they were issued
    store_lock: Arc<Mutex<()>>,
}

/// Restores `fallback` if a guard-state transition is abandoned before it
/// completes, e.g. because the caller dropped the future mid-flight.
struct PendingTransition<'a> {
    state: &'a watch::Sender<SessionState>,
    fallback: Option<SessionState>,
}

impl<'a> PendingTransition<'a> {
    fn new(state: &'a watch::Sender<SessionState>, fallback: SessionState) -> Self {
        Self {
            state,
            fallback: Some(fallback),
        }
    }

    /// Change what an abandoned transition settles into
    fn settle_on_drop(&mut self, state: SessionState) {
        self.fallback = Some(state);
    }

    fn complete(mut self, next: SessionState) {
        self.fallback = None;
        self.state.send_replace(next);
    }
}

impl Drop for PendingTransition<'_> {
    fn drop(&mut self) {
        if let Some(fallback) = self.fallback.take() {
            self.state.send_replace(fallback);
        }
    }
}

impl SessionController {
    pub fn new(client: AuthClient, store: Arc<dyn SessionStore>) -> Self {
        let (state, _) = watch::channel(SessionState::LoggedOut);
        Self {
            client,
            store,
            state,
            store_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status()
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    fn current_token(&self) -> Option<Token> {
        self.state.borrow().token().cloned()
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Pick up a token persisted by a previous run.
    ///
    /// Makes no network call; the profile stays unresolved until requested.
    /// A storage read failure is treated as "no persisted session".
    pub async fn restore(&self) -> SessionState {
        if !matches!(*self.state.borrow(), SessionState::LoggedOut) {
            return self.state();
        }

        let loaded = {
            let _store = self.store_lock.lock().await;
            self.store.load().await
        };

        match loaded {
            Ok(Some(token)) => {
                let restored = self.state.send_if_modified(|state| {
                    if matches!(state, SessionState::LoggedOut) {
                        *state = SessionState::LoggedIn {
                            token,
                            profile: None,
                        };
                        true
                    } else {
                        false
                    }
                });
                if restored {
                    info!(
                        state = ?StateTag::LoggedIn,
                        backend = self.store.backend(),
                        "Restored persisted session"
                    );
                }
            }
            Ok(None) => debug!(backend = self.store.backend(), "No persisted session found"),
            Err(e) => warn!(
                error = %e,
                backend = self.store.backend(),
                "Failed to read persisted session, continuing logged out"
            ),
        }

        self.state()
    }

    // =========================================================================
    // Login / Register
    // =========================================================================

    /// Atomically move `LoggedOut -> Authenticating`, rejecting otherwise
    fn begin_login(&self) -> Result<(), AuthError> {
        let mut rejection = None;
        self.state.send_if_modified(|state| match state {
            SessionState::LoggedOut => {
                *state = SessionState::Authenticating;
                true
            }
            SessionState::Authenticating => {
                rejection = Some(AuthError::Busy("login"));
                false
            }
            SessionState::LoggingOut => {
                rejection = Some(AuthError::Busy("logout"));
                false
            }
            SessionState::LoggedIn { .. } => {
                rejection = Some(AuthError::AlreadyLoggedIn);
                false
            }
        });
        match rejection {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Exchange credentials for a token and persist it.
    ///
    /// At most one login is in flight; a second call while `Authenticating`
    /// fails with `AuthError::Busy`. On any failure the state returns to
    /// `LoggedOut` and nothing is persisted.
    ///
    /// Once the token is received its save runs on a task of its own. If the
    /// caller drops this future after that point the save still completes and
    /// the session settles as `LoggedIn`.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), AuthError> {
        credentials.validate()?;
        self.begin_login()?;
        let mut pending = PendingTransition::new(&self.state, SessionState::LoggedOut);
        info!(state = ?StateTag::Authenticating, username = %credentials.username, "Login started");

        let token = match self.client.login(credentials).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Login failed");
                pending.complete(SessionState::LoggedOut);
                return Err(e);
            }
        };

        let store_guard = Arc::clone(&self.store_lock).lock_owned().await;
        let store = Arc::clone(&self.store);
        let staged = token.clone();
        let saving = tokio::spawn(async move {
            // Released only after the medium has committed
            let _store = store_guard;
            store.save(&staged).await
        });
        pending.settle_on_drop(SessionState::LoggedIn {
            token: token.clone(),
            profile: None,
        });

        let saved = saving
            .await
            .unwrap_or_else(|e| Err(StorageError::Task(e.to_string())));
        if let Err(e) = saved {
            error!(error = %e, backend = self.store.backend(), "Failed to persist session token, login aborted");
            pending.complete(SessionState::LoggedOut);
            return Err(e.into());
        }

        pending.complete(SessionState::LoggedIn {
            token,
            profile: None,
        });
        info!(state = ?StateTag::LoggedIn, "Login successful");
        Ok(())
    }

    /// Create an account. Never changes session state.
    pub async fn register(&self, account: &NewAccount) -> Result<(), AuthError> {
        account.validate()?;
        match self.client.register(account).await {
            Ok(()) => {
                info!(username = %account.username, "Registration successful");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Registration failed");
                Err(e)
            }
        }
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Fetch the profile with the current token.
    ///
    /// A `SessionInvalid` response logs the session out and clears the
    /// stored token before the error is returned.
    pub async fn fetch_profile(&self) -> Result<Profile, AuthError> {
        let token = self.current_token().ok_or(AuthError::NotAuthenticated)?;

        match self.client.fetch_profile(&token).await {
            Ok(profile) => {
                let fetched = profile.clone();
                let applied = self.state.send_if_modified(|state| {
                    if let SessionState::LoggedIn {
                        token: current,
                        profile: slot,
                    } = state
                    {
                        if *current == token {
                            *slot = Some(fetched);
                            return true;
                        }
                    }
                    false
                });
                if applied {
                    debug!(username = %profile.username, "Profile loaded");
                    Ok(profile)
                } else {
                    debug!("Session changed during profile fetch, result discarded");
                    Err(AuthError::NotAuthenticated)
                }
            }
            Err(AuthError::SessionInvalid) => {
                self.expire_session(&token).await;
                Err(AuthError::SessionInvalid)
            }
            Err(e) => {
                warn!(error = %e, "Profile fetch failed");
                Err(e)
            }
        }
    }

    /// Return the cached profile, fetching it if not yet resolved
    pub async fn ensure_profile(&self) -> Result<Profile, AuthError> {
        if let Some(profile) = self.state.borrow().profile().cloned() {
            return Ok(profile);
        }
        self.fetch_profile().await
    }

    /// Drop a session whose token the server no longer accepts
    async fn expire_session(&self, token: &Token) {
        // Held across the transition so a following login's save lands after this clear
        let _store = self.store_lock.lock().await;

        let expired = self.state.send_if_modified(|state| {
            let same_session = state.token() == Some(token);
            if same_session {
                *state = SessionState::LoggedOut;
            }
            same_session
        });
        if !expired {
            debug!("Session already changed, stale token left to its owner");
            return;
        }

        if let Err(e) = self.store.clear().await {
            error!(error = %e, backend = self.store.backend(), "Failed to clear expired session token");
        }
        info!(state = ?StateTag::LoggedOut, "Session expired");
    }

    // =========================================================================
    // Logout
    // =========================================================================

    /// Revoke the session after the user confirmed the logout dialog.
    ///
    /// Idempotent: with no session, or while another logout is running, this
    /// is a successful no-op. If the stored token cannot be cleared the
    /// session is kept and the storage error returned.
    pub async fn logout(&self, _confirmed: LogoutConfirmed) -> Result<(), AuthError> {
        let mut previous = None;
        let mut rejection = None;
        self.state.send_if_modified(|state| match state {
            SessionState::LoggedIn { .. } => {
                previous = Some(std::mem::replace(state, SessionState::LoggingOut));
                true
            }
            SessionState::Authenticating => {
                rejection = Some(AuthError::Busy("login"));
                false
            }
            SessionState::LoggedOut | SessionState::LoggingOut => false,
        });

        if let Some(e) = rejection {
            return Err(e);
        }
        let Some(previous) = previous else {
            debug!("Logout with no active session");
            return Ok(());
        };

        let pending = PendingTransition::new(&self.state, previous);
        info!(state = ?StateTag::LoggingOut, "Logging out");

        let cleared = {
            let _store = self.store_lock.lock().await;
            self.store.clear().await
        };
        if let Err(e) = cleared {
            error!(error = %e, backend = self.store.backend(), "Failed to clear session token, logout aborted");
            // Dropping the pending transition restores the previous session
            drop(pending);
            return Err(e.into());
        }

        pending.complete(SessionState::LoggedOut);
        info!(state = ?StateTag::LoggedOut, "Logged out");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::{LOGIN_PATH, PROFILE_PATH, REGISTER_PATH};
    use crate::auth::{MemorySessionStore, StoreOp};
    use crate::dialog::ConfirmationDialog;
    use futures::FutureExt;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::{Notify, Semaphore};
    use wiremock::matchers::{any, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn controller_for(server: &MockServer, store: &Arc<MemorySessionStore>) -> SessionController {
        SessionController::new(AuthClient::new(server.uri()).unwrap(), store.clone())
    }

    fn confirmed() -> LogoutConfirmed {
        let mut dialog = ConfirmationDialog::new();
        dialog.request();
        dialog.confirm().unwrap()
    }

    fn token_response(token: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"data": {"token": token}}))
    }

    fn profile_response(username: &str, email: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(json!({"data": {"username": username, "email": email}}))
    }

    async fn mount_login(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(response)
            .mount(server)
            .await;
    }

    fn alice() -> Credentials {
        Credentials::new("alice", "secret")
    }

    // -------------------------------------------------------------------------
    // Login
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_persists_token_then_profile_resolves() {
        let server = MockServer::start().await;
        mount_login(&server, token_response("abc123")).await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .and(header("authorization", "Bearer abc123"))
            .respond_with(profile_response("alice", "alice@x.com"))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);

        controller.login(&alice()).await.unwrap();
        assert_eq!(
            controller.state(),
            SessionState::LoggedIn {
                token: Token::new("abc123"),
                profile: None,
            }
        );
        assert_eq!(store.load().await.unwrap(), Some(Token::new("abc123")));

        let profile = controller.fetch_profile().await.unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.email, "alice@x.com");
        assert_eq!(controller.state().profile(), Some(&profile));
    }

    #[tokio::test]
    async fn test_login_rejected_stores_nothing() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})),
        )
        .await;

        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);

        let err = controller
            .login(&Credentials::new("alice", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Invalid credentials");
        assert_eq!(controller.state(), SessionState::LoggedOut);
        assert!(store.peek().await.is_none());
        assert!(store.ops().await.is_empty());
    }

    #[tokio::test]
    async fn test_login_validation_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);

        let err = controller
            .login(&Credentials::new("alice", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert_eq!(controller.state(), SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn test_login_network_failure_returns_to_logged_out() {
        let store = Arc::new(MemorySessionStore::new());
        let controller =
            SessionController::new(AuthClient::new("http://127.0.0.1:1").unwrap(), store.clone());

        let err = controller.login(&alice()).await.unwrap_err();
        assert!(matches!(err, AuthError::NetworkUnavailable(_)));
        assert_eq!(controller.state(), SessionState::LoggedOut);
        assert!(store.peek().await.is_none());
    }

    #[tokio::test]
    async fn test_login_storage_failure_aborts() {
        let server = MockServer::start().await;
        mount_login(&server, token_response("abc123")).await;

        let store = Arc::new(MemorySessionStore::new());
        store.fail_writes(true);
        let controller = controller_for(&server, &store);

        let err = controller.login(&alice()).await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
        assert_eq!(controller.state(), SessionState::LoggedOut);
        assert!(store.peek().await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_logins_single_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(token_response("abc123").set_delay(Duration::from_millis(200)))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);
        let creds = alice();

        let (first, second, third) = tokio::join!(
            controller.login(&creds),
            controller.login(&creds),
            controller.login(&creds),
        );
        assert!(first.is_ok());
        assert!(matches!(second, Err(AuthError::Busy("login"))));
        assert!(matches!(third, Err(AuthError::Busy("login"))));
        assert!(controller.is_authenticated());
        assert_eq!(
            store.ops().await,
            vec![StoreOp::Save("abc123".to_string())]
        );
    }

    #[tokio::test]
    async fn test_subscribers_observe_authenticating() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            token_response("abc123").set_delay(Duration::from_millis(100)),
        )
        .await;

        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);
        let mut rx = controller.subscribe();
        let creds = alice();

        let (result, observed) = tokio::join!(controller.login(&creds), async {
            rx.changed().await.unwrap();
            let first = rx.borrow_and_update().tag();
            rx.changed().await.unwrap();
            let second = rx.borrow_and_update().tag();
            (first, second)
        });
        assert!(result.is_ok());
        assert_eq!(observed, (StateTag::Authenticating, StateTag::LoggedIn));
    }

    #[tokio::test]
    async fn test_abandoned_login_releases_guard() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            token_response("abc123").set_delay(Duration::from_millis(500)),
        )
        .await;

        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);
        let creds = alice();

        // Polled once, then dropped while the request is outstanding
        assert!(controller.login(&creds).now_or_never().is_none());
        assert_eq!(controller.state(), SessionState::LoggedOut);
        assert!(store.peek().await.is_none());
    }

    /// Holds every save until the test hands out a permit
    struct GatedStore {
        inner: MemorySessionStore,
        gate: Semaphore,
        save_started: Notify,
        save_done: Notify,
    }

    #[async_trait::async_trait]
    impl SessionStore for GatedStore {
        async fn save(&self, token: &Token) -> Result<(), StorageError> {
            self.save_started.notify_one();
            let _permit = self.gate.acquire().await.unwrap();
            let result = self.inner.save(token).await;
            self.save_done.notify_one();
            result
        }

        async fn load(&self) -> Result<Option<Token>, StorageError> {
            self.inner.load().await
        }

        async fn clear(&self) -> Result<(), StorageError> {
            self.inner.clear().await
        }

        fn backend(&self) -> &'static str {
            "gated"
        }
    }

    #[tokio::test]
    async fn test_abandoned_login_after_save_dispatched_commits() {
        let server = MockServer::start().await;
        mount_login(&server, token_response("abc123")).await;

        let store = Arc::new(GatedStore {
            inner: MemorySessionStore::new(),
            gate: Semaphore::new(0),
            save_started: Notify::new(),
            save_done: Notify::new(),
        });
        let controller =
            SessionController::new(AuthClient::new(server.uri()).unwrap(), store.clone());
        let creds = alice();

        let mut login = Box::pin(controller.login(&creds));
        tokio::select! {
            _ = &mut login => panic!("login finished while its save was held"),
            _ = store.save_started.notified() => {}
        }
        drop(login);

        // The save is already dispatched, so the session is kept
        assert_eq!(controller.current_token(), Some(Token::new("abc123")));

        store.gate.add_permits(1);
        store.save_done.notified().await;
        assert_eq!(store.inner.peek().await, Some(Token::new("abc123")));

        // The detached save released the store lock, so logout goes through
        controller.logout(confirmed()).await.unwrap();
        assert!(store.inner.peek().await.is_none());
    }

    #[tokio::test]
    async fn test_login_while_logged_in_rejected() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::with_token("abc123"));
        let controller = controller_for(&server, &store);
        controller.restore().await;

        let err = controller.login(&alice()).await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyLoggedIn));
        assert_eq!(controller.current_token(), Some(Token::new("abc123")));
    }

    // -------------------------------------------------------------------------
    // Register
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_register_conflict_leaves_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REGISTER_PATH))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({"message": "Username taken"})),
            )
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);

        let err = controller
            .register(&NewAccount::new("bob", "bob@x.com", "p"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Username taken");
        assert_eq!(controller.state(), SessionState::LoggedOut);
        assert!(store.ops().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_success_does_not_log_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REGISTER_PATH))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);

        controller
            .register(&NewAccount::new("bob", "bob@x.com", "p"))
            .await
            .unwrap();
        assert_eq!(controller.state(), SessionState::LoggedOut);
        assert!(store.peek().await.is_none());
    }

    // -------------------------------------------------------------------------
    // Restore
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_restore_makes_no_network_call() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::with_token("abc123"));
        let controller = controller_for(&server, &store);

        let state = controller.restore().await;
        assert_eq!(
            state,
            SessionState::LoggedIn {
                token: Token::new("abc123"),
                profile: None,
            }
        );
    }

    #[tokio::test]
    async fn test_restore_without_token() {
        let server = MockServer::start().await;
        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);

        assert_eq!(controller.restore().await, SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn test_restore_read_failure_degrades_to_logged_out() {
        let server = MockServer::start().await;
        let store = Arc::new(MemorySessionStore::with_token("abc123"));
        store.fail_reads(true);
        let controller = controller_for(&server, &store);

        assert_eq!(controller.restore().await, SessionState::LoggedOut);
    }

    // -------------------------------------------------------------------------
    // Profile
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cold_start_with_stale_token_expires_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::with_token("abc123"));
        let controller = controller_for(&server, &store);
        controller.restore().await;

        let err = controller.fetch_profile().await.unwrap_err();
        assert!(err.is_session_invalid());
        assert_eq!(err.user_message(), "session expired");
        assert_eq!(controller.state(), SessionState::LoggedOut);
        assert!(store.peek().await.is_none());
    }

    #[tokio::test]
    async fn test_session_invalid_after_profile_loaded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(profile_response("alice", "alice@x.com"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::with_token("abc123"));
        let controller = controller_for(&server, &store);
        controller.restore().await;

        controller.fetch_profile().await.unwrap();
        assert!(controller.state().profile().is_some());

        let err = controller.fetch_profile().await.unwrap_err();
        assert!(err.is_session_invalid());
        assert_eq!(controller.state(), SessionState::LoggedOut);
        assert!(store.peek().await.is_none());
    }

    #[tokio::test]
    async fn test_profile_server_error_keeps_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::with_token("abc123"));
        let controller = controller_for(&server, &store);
        controller.restore().await;

        let err = controller.fetch_profile().await.unwrap_err();
        assert!(matches!(err, AuthError::ServerError(_)));
        assert!(controller.is_authenticated());
        assert_eq!(store.peek().await, Some(Token::new("abc123")));
    }

    #[tokio::test]
    async fn test_fetch_profile_requires_session() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);

        let err = controller.fetch_profile().await.unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_ensure_profile_uses_cached_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .respond_with(profile_response("alice", "alice@x.com"))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::with_token("abc123"));
        let controller = controller_for(&server, &store);
        controller.restore().await;

        let first = controller.ensure_profile().await.unwrap();
        let second = controller.ensure_profile().await.unwrap();
        assert_eq!(first, second);
    }

    // -------------------------------------------------------------------------
    // Logout
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_dialog_cancel_then_confirm() {
        let server = MockServer::start().await;
        mount_login(&server, token_response("abc123")).await;

        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);
        controller.login(&alice()).await.unwrap();
        let ops_after_login = store.ops().await;

        let mut dialog = ConfirmationDialog::new();
        dialog.request();
        assert!(dialog.cancel());
        assert!(dialog.confirm().is_none());
        assert!(controller.is_authenticated());
        assert_eq!(store.ops().await, ops_after_login);

        dialog.request();
        let confirmation = dialog.confirm().unwrap();
        controller.logout(confirmation).await.unwrap();
        assert_eq!(controller.state(), SessionState::LoggedOut);
        assert!(store.peek().await.is_none());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let server = MockServer::start().await;
        mount_login(&server, token_response("abc123")).await;

        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);
        controller.login(&alice()).await.unwrap();

        let (first, second) = tokio::join!(
            controller.logout(confirmed()),
            controller.logout(confirmed())
        );
        assert!(first.is_ok());
        assert!(second.is_ok());
        controller.logout(confirmed()).await.unwrap();

        assert_eq!(controller.state(), SessionState::LoggedOut);
        assert!(store.peek().await.is_none());
    }

    #[tokio::test]
    async fn test_logout_storage_failure_keeps_session() {
        let server = MockServer::start().await;
        mount_login(&server, token_response("abc123")).await;

        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);
        controller.login(&alice()).await.unwrap();

        store.fail_writes(true);
        let err = controller.logout(confirmed()).await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
        assert_eq!(controller.current_token(), Some(Token::new("abc123")));
    }

    #[tokio::test]
    async fn test_store_writes_follow_transition_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(token_response("first"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_login(&server, token_response("second")).await;

        let store = Arc::new(MemorySessionStore::new());
        let controller = controller_for(&server, &store);

        controller.login(&alice()).await.unwrap();
        controller.logout(confirmed()).await.unwrap();
        controller.login(&alice()).await.unwrap();

        assert_eq!(
            store.ops().await,
            vec![
                StoreOp::Save("first".to_string()),
                StoreOp::Clear,
                StoreOp::Save("second".to_string()),
            ]
        );
        assert_eq!(store.peek().await, Some(Token::new("second")));
    }
}
