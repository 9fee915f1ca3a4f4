//! Auth state machine
//!
//! Owns the user registry and is the only component that mutates it. Every
//! transition runs under one async mutex and follows the same sequence:
//! build the next registry, persist it, swap it in, then notify listeners
//! and bound service clients.
//!
//! Authenticated requests read a credential snapshot, send, and on an
//! invalid-session failure refresh the access token and retry exactly once.

use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tether_domain::auth::{token, token_preview};
use tether_domain::request::AUTHORIZATION;
use tether_domain::{
    AppInfo, AuthRoutes, AuthUser, Credential, CredentialSet, ProviderKind, RebindEvent, Request,
    Response, UserEntry, UserId, UserRegistry,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{AuthListener, AuthRequest, RebindDispatcher, RebindTarget};
use crate::error::{SessionError, SessionResult};
use crate::ports::{Clock, EventStream, UserStorage};
use crate::request_client::RequestClient;

/// Query parameter carrying the access token on stream requests.
pub const STREAM_TOKEN_PARAM: &str = "tether_at";

#[derive(Deserialize)]
struct RefreshedSession {
    #[serde(alias = "accessToken")]
    access_token: String,
}

/// Collaborators of an [`AuthMachine`].
#[derive(Clone)]
pub struct AuthDeps {
    /// Client used for every backend call.
    pub request_client: Arc<RequestClient>,
    /// Durable registry storage.
    pub storage: Arc<dyn UserStorage>,
    /// Time source for expiry checks and activity timestamps.
    pub clock: Arc<dyn Clock>,
}

/// The authentication state machine.
pub struct AuthMachine {
    request_client: Arc<RequestClient>,
    routes: AuthRoutes,
    app_info: AppInfo,
    storage: Arc<dyn UserStorage>,
    clock: Arc<dyn Clock>,
    refresh_buffer_secs: i64,
    state: RwLock<UserRegistry>,
    transition: Mutex<()>,
    dispatcher: RebindDispatcher,
}

impl std::fmt::Debug for AuthMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("AuthMachine")
            .field("app_id", &self.app_info.client_app_id)
            .field("active_user", &state.active_user_id())
            .field("users", &state.len())
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl AuthMachine {
    /// Builds a machine from the registry found in storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the registry cannot be read.
    pub async fn load(
        deps: AuthDeps,
        app_info: AppInfo,
        refresh_buffer_secs: i64,
    ) -> SessionResult<Self> {
        let registry = deps.storage.load().await?.normalized();
        info!(
            app_id = %app_info.client_app_id,
            users = registry.len(),
            active_user = ?registry.active_user_id(),
            "loaded user registry"
        );

        Ok(Self {
            request_client: deps.request_client,
            routes: AuthRoutes::new(app_info.client_app_id.clone()),
            app_info,
            storage: deps.storage,
            clock: deps.clock,
            refresh_buffer_secs,
            state: RwLock::new(registry),
            transition: Mutex::new(()),
            dispatcher: RebindDispatcher::new(),
        })
    }

    /// Returns the app info used for login requests.
    #[must_use]
    pub const fn app_info(&self) -> &AppInfo {
        &self.app_info
    }

    /// Returns the request client shared with service clients.
    #[must_use]
    pub const fn request_client(&self) -> &Arc<RequestClient> {
        &self.request_client
    }

    /// Returns the rebind dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &RebindDispatcher {
        &self.dispatcher
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Returns true if there is an active user.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.state.read().active_credentials().is_some()
    }

    /// Returns the active user.
    #[must_use]
    pub fn active_user(&self) -> Option<AuthUser> {
        self.state.read().active_entry().map(UserEntry::to_user)
    }

    /// Returns the active user's credentials.
    #[must_use]
    pub fn active_credentials(&self) -> Option<CredentialSet> {
        self.state.read().active_credentials().cloned()
    }

    /// Returns every known user in registry order.
    #[must_use]
    pub fn list_users(&self) -> Vec<AuthUser> {
        self.state
            .read()
            .users()
            .iter()
            .map(UserEntry::to_user)
            .collect()
    }

    /// Returns a known user.
    #[must_use]
    pub fn user(&self, user_id: &UserId) -> Option<AuthUser> {
        self.state.read().get(user_id).map(UserEntry::to_user)
    }

    fn snapshot(&self) -> UserRegistry {
        self.state.read().clone()
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Registers an auth listener.
    pub fn add_listener(&self, listener: Arc<dyn AuthListener>) {
        self.dispatcher.add_listener(listener);
    }

    /// Unregisters an auth listener. Returns true if it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn AuthListener>) -> bool {
        self.dispatcher.remove_listener(listener)
    }

    /// Binds a service client for rebind events without owning it.
    pub fn bind_service_client<T: RebindTarget + 'static>(&self, client: &Arc<T>) {
        let weak: Weak<dyn RebindTarget> = Arc::downgrade(client) as Weak<dyn RebindTarget>;
        self.dispatcher.bind(weak);
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Logs in with a credential and makes the resulting user active.
    ///
    /// An anonymous login reuses an existing logged-in anonymous user
    /// without contacting the backend.
    ///
    /// # Errors
    ///
    /// Propagates request and transport failures of the login call, and
    /// storage failures.
    pub async fn login(&self, credential: Credential) -> SessionResult<AuthUser> {
        let _transition = self.transition.lock().await;
        let current = self.snapshot();
        let previous = current.active_entry().map(UserEntry::to_user);

        if credential.provider_kind() == ProviderKind::Anonymous
            && let Some(existing) = current.logged_in_anonymous().map(|u| u.user_id.clone())
        {
            info!(user_id = %existing, "reusing anonymous session");
            return self.activate(current, &existing, previous).await;
        }

        let device_id = current
            .active_entry()
            .or_else(|| current.users().last())
            .map(|u| u.device_id.clone());
        let mut body = credential.material();
        if let Some(object) = body.as_object_mut() {
            object.insert(
                "options".to_string(),
                self.app_info.device_options(device_id.as_deref()),
            );
        }

        let request = Request::post(
            self.routes
                .auth_provider_login_route(credential.provider_name()),
        )
        .with_json(&body);
        let response = self.request_client.execute(&request).await?;
        let credentials: CredentialSet = response.decode_json().map_err(SessionError::decode)?;

        info!(
            user_id = %credentials.user_id,
            provider = credential.provider_name(),
            access_token = %token_preview(&credentials.access_token),
            "logged in"
        );

        let user_id = credentials.user_id.clone();
        let mut next = current;
        next.upsert(UserEntry::logged_in(
            credentials,
            credential.provider_kind(),
            self.clock.now(),
        ));
        self.activate(next, &user_id, previous).await
    }

    /// Makes a logged-in user active.
    ///
    /// Switching to the user that is already active still notifies.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` for an unknown user and `UserNotLoggedIn` for
    /// a user without credentials.
    pub async fn switch_active_user(&self, user_id: &UserId) -> SessionResult<AuthUser> {
        let _transition = self.transition.lock().await;
        let current = self.snapshot();
        let previous = current.active_entry().map(UserEntry::to_user);
        self.activate(current, user_id, previous).await
    }

    /// Logs out the active user. Does nothing when logged out.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the new state cannot be persisted.
    pub async fn logout(&self) -> SessionResult<()> {
        let _transition = self.transition.lock().await;
        let Some(user_id) = self.state.read().active_user_id().cloned() else {
            debug!("logout requested with no active user");
            return Ok(());
        };
        self.logout_locked(&user_id).await
    }

    /// Logs out a specific user. The active pointer only changes if the
    /// user was active.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` for an unknown user.
    pub async fn logout_user(&self, user_id: &UserId) -> SessionResult<()> {
        let _transition = self.transition.lock().await;
        if !self.state.read().contains(user_id) {
            return Err(SessionError::UserNotFound(user_id.clone()));
        }
        self.logout_locked(user_id).await
    }

    /// Logs a user out if needed and deletes them from the registry.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` for an unknown user.
    pub async fn remove_user(&self, user_id: &UserId) -> SessionResult<()> {
        let _transition = self.transition.lock().await;
        self.remove_locked(user_id).await
    }

    /// Removes the active user.
    ///
    /// # Errors
    ///
    /// Returns `MustAuthenticateFirst` when there is no active user.
    pub async fn remove_active_user(&self) -> SessionResult<()> {
        let _transition = self.transition.lock().await;
        let user_id = self
            .state
            .read()
            .active_user_id()
            .cloned()
            .ok_or(SessionError::MustAuthenticateFirst)?;
        self.remove_locked(&user_id).await
    }

    /// Exchanges the active user's refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns `MustAuthenticateFirst` with no active user, and
    /// `InvalidSession` (after logging the user out) if the backend rejects
    /// the refresh token or there is none.
    pub async fn refresh_access_token(&self) -> SessionResult<CredentialSet> {
        let _transition = self.transition.lock().await;
        let credentials = self
            .active_credentials()
            .ok_or(SessionError::MustAuthenticateFirst)?;
        self.refresh_locked(credentials).await
    }

    async fn activate(
        &self,
        mut next: UserRegistry,
        user_id: &UserId,
        previous: Option<AuthUser>,
    ) -> SessionResult<AuthUser> {
        let entry = next
            .get_mut(user_id)
            .ok_or_else(|| SessionError::UserNotFound(user_id.clone()))?;
        if !entry.is_logged_in() {
            return Err(SessionError::UserNotLoggedIn(user_id.clone()));
        }
        entry.last_auth_activity = self.clock.now();
        let current = entry.to_user();
        next.set_active(Some(user_id.clone()))?;

        self.commit(
            next,
            vec![RebindEvent::ActiveUserChanged {
                previous,
                current: Some(current.clone()),
            }],
        )
        .await?;
        info!(user_id = %user_id, "active user changed");
        Ok(current)
    }

    async fn logout_locked(&self, user_id: &UserId) -> SessionResult<()> {
        let current = self.snapshot();
        let Some(credentials) = current.get(user_id).and_then(|u| u.credentials.clone()) else {
            debug!(user_id = %user_id, "user already logged out");
            return Ok(());
        };

        self.revoke_session(&credentials).await;
        let (next, events) = logged_out(current, user_id);
        self.commit(next, events).await?;
        info!(user_id = %user_id, "logged out");
        Ok(())
    }

    async fn remove_locked(&self, user_id: &UserId) -> SessionResult<()> {
        let current = self.snapshot();
        let entry = current
            .get(user_id)
            .cloned()
            .ok_or_else(|| SessionError::UserNotFound(user_id.clone()))?;

        let (mut next, mut events) = match &entry.credentials {
            Some(credentials) => {
                self.revoke_session(credentials).await;
                logged_out(current, user_id)
            }
            None => (current, Vec::new()),
        };
        if let Some(removed) = next.remove(user_id) {
            events.push(RebindEvent::UserRemoved {
                user: removed.to_user(),
            });
        }

        self.commit(next, events).await?;
        info!(user_id = %user_id, "removed user");
        Ok(())
    }

    /// Persists, swaps in, then notifies. Callers hold the transition lock.
    async fn commit(&self, next: UserRegistry, events: Vec<RebindEvent>) -> SessionResult<()> {
        self.storage.save(&next).await?;
        *self.state.write() = next;
        self.dispatcher.dispatch(self, &events);
        Ok(())
    }

    /// Logs a user out locally after the backend rejected their session.
    ///
    /// A persistence failure is logged and does not stop the transition.
    async fn force_logout(&self, user_id: &UserId) {
        let (next, events) = logged_out(self.snapshot(), user_id);
        if let Err(error) = self.storage.save(&next).await {
            warn!(user_id = %user_id, error = %error, "failed to persist forced logout");
        }
        *self.state.write() = next;
        self.dispatcher.dispatch(self, &events);
        info!(user_id = %user_id, "session invalidated; user logged out");
    }

    /// Best-effort server-side session invalidation.
    async fn revoke_session(&self, credentials: &CredentialSet) {
        let Some(refresh_token) = credentials.refresh_token.as_deref() else {
            return;
        };
        let request = Request::delete(self.routes.session_route())
            .with_header(AUTHORIZATION, format!("Bearer {refresh_token}"));
        if let Err(error) = self.request_client.execute(&request).await {
            warn!(
                user_id = %credentials.user_id,
                error = %error,
                "failed to invalidate remote session"
            );
        }
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    /// Refreshes unless another caller already replaced `stale`'s token.
    async fn refresh_if_stale(&self, stale: &CredentialSet) -> SessionResult<CredentialSet> {
        let _transition = self.transition.lock().await;
        match self.active_credentials() {
            Some(current) if current.user_id != stale.user_id => Err(SessionError::InvalidSession {
                user_id: stale.user_id.clone(),
            }),
            Some(current) if current.access_token != stale.access_token => {
                debug!(user_id = %current.user_id, "access token already refreshed");
                Ok(current)
            }
            Some(current) => self.refresh_locked(current).await,
            None => Err(SessionError::InvalidSession {
                user_id: stale.user_id.clone(),
            }),
        }
    }

    async fn refresh_locked(&self, credentials: CredentialSet) -> SessionResult<CredentialSet> {
        let user_id = credentials.user_id.clone();
        let Some(refresh_token) = credentials.refresh_token.as_deref() else {
            info!(user_id = %user_id, "no refresh token available");
            self.force_logout(&user_id).await;
            return Err(SessionError::InvalidSession { user_id });
        };

        let request = Request::post(self.routes.session_route())
            .with_header(AUTHORIZATION, format!("Bearer {refresh_token}"));
        let response = match self.request_client.execute(&request).await {
            Ok(response) => response,
            Err(error) if error.is_invalid_session() => {
                self.force_logout(&user_id).await;
                return Err(SessionError::InvalidSession { user_id });
            }
            Err(error) => return Err(error),
        };

        let session: RefreshedSession = response.decode_json().map_err(SessionError::decode)?;
        let refreshed = credentials.with_access_token(session.access_token);

        let mut next = self.snapshot();
        if let Some(entry) = next.get_mut(&user_id) {
            entry.credentials = Some(refreshed.clone());
            entry.last_auth_activity = self.clock.now();
        }
        self.storage.save(&next).await?;
        *self.state.write() = next;

        info!(
            user_id = %user_id,
            access_token = %token_preview(&refreshed.access_token),
            "access token refreshed"
        );
        Ok(refreshed)
    }

    // ------------------------------------------------------------------
    // Authenticated execution
    // ------------------------------------------------------------------

    /// Sends a request with the active user's access token.
    ///
    /// # Errors
    ///
    /// Returns `MustAuthenticateFirst` with no active user, `InvalidSession`
    /// if refreshing fails, and any other request or transport error
    /// unchanged.
    pub async fn execute_authenticated_request(
        &self,
        request: AuthRequest,
    ) -> SessionResult<Response> {
        self.with_session(request.refresh_on_failure, |credentials| {
            let authorized = request
                .request
                .clone()
                .with_header(AUTHORIZATION, format!("Bearer {}", credentials.access_token));
            async move { self.request_client.execute(&authorized).await }
        })
        .await
    }

    /// Sends a request and decodes the response with `decoder`.
    ///
    /// # Errors
    ///
    /// As [`Self::execute_authenticated_request`], plus whatever the decoder
    /// returns.
    pub async fn execute_authenticated<T, D>(&self, request: AuthRequest, decoder: D) -> SessionResult<T>
    where
        D: FnOnce(&Response) -> SessionResult<T> + Send,
    {
        let response = self.execute_authenticated_request(request).await?;
        decoder(&response)
    }

    /// Sends a request and decodes the JSON response body.
    ///
    /// # Errors
    ///
    /// As [`Self::execute_authenticated_request`], plus `Decode` if the body
    /// does not match `T`.
    pub async fn execute_authenticated_json<T: DeserializeOwned>(
        &self,
        request: AuthRequest,
    ) -> SessionResult<T> {
        self.execute_authenticated(request, |response| {
            response.decode_json().map_err(SessionError::decode)
        })
        .await
    }

    /// Opens a server-push stream, passing the access token as the
    /// `tether_at` query parameter.
    ///
    /// # Errors
    ///
    /// As [`Self::execute_authenticated_request`], plus
    /// `StreamingNotSupported` when the transport cannot stream.
    pub async fn open_authenticated_stream(
        &self,
        request: AuthRequest,
    ) -> SessionResult<Box<dyn EventStream>> {
        self.with_session(request.refresh_on_failure, |credentials| {
            let authorized = with_token_param(&request.request, &credentials.access_token);
            async move { self.request_client.open_stream(&authorized).await }
        })
        .await
    }

    /// Fetches the active user's profile document.
    ///
    /// # Errors
    ///
    /// As [`Self::execute_authenticated_json`].
    pub async fn profile(&self) -> SessionResult<serde_json::Value> {
        self.execute_authenticated_json(AuthRequest::new(Request::get(
            self.routes.profile_route(),
        )))
        .await
    }

    async fn with_session<T, F, Fut>(&self, refresh_on_failure: bool, send: F) -> SessionResult<T>
    where
        F: Fn(CredentialSet) -> Fut,
        Fut: Future<Output = SessionResult<T>>,
    {
        let mut credentials = self
            .active_credentials()
            .ok_or(SessionError::MustAuthenticateFirst)?;

        if credentials.can_refresh()
            && token::is_expiring(
                &credentials.access_token,
                self.clock.now(),
                self.refresh_buffer_secs,
            )
        {
            debug!(user_id = %credentials.user_id, "access token expiring; refreshing first");
            credentials = self.refresh_if_stale(&credentials).await?;
        }

        match send(credentials.clone()).await {
            Err(SessionError::Request(error)) if refresh_on_failure && error.is_invalid_session() => {
                info!(
                    user_id = %credentials.user_id,
                    status = %error.status,
                    "session rejected; refreshing and retrying once"
                );
                let refreshed = self.refresh_if_stale(&credentials).await?;
                send(refreshed).await
            }
            outcome => outcome,
        }
    }
}

/// The registry after `user_id` logs out, with the events that describe it.
///
/// Anonymous users are removed as well since they cannot log back in.
fn logged_out(mut next: UserRegistry, user_id: &UserId) -> (UserRegistry, Vec<RebindEvent>) {
    let previous = next.active_entry().map(UserEntry::to_user);
    let was_active = next.active_user_id() == Some(user_id);
    let mut events = Vec::new();

    let Some(user) = next.clear_credentials(user_id).map(UserEntry::to_user) else {
        return (next, events);
    };
    events.push(RebindEvent::UserLoggedOut { user: user.clone() });
    if was_active {
        events.push(RebindEvent::ActiveUserChanged {
            previous,
            current: None,
        });
    }
    if user.provider == ProviderKind::Anonymous {
        next.remove(user_id);
        events.push(RebindEvent::UserRemoved { user });
    }
    (next, events)
}

fn with_token_param(request: &Request, access_token: &str) -> Request {
    let encoded: String = url::form_urlencoded::byte_serialize(access_token.as_bytes()).collect();
    let separator = if request.path.contains('?') { '&' } else { '?' };
    let mut authorized = request.clone();
    authorized.path = format!(
        "{}{separator}{STREAM_TOKEN_PARAM}={encoded}",
        request.path
    );
    authorized
}
