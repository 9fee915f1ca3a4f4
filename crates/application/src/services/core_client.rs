//! Core service client
//!
//! The building block every service-specific client wraps. It calls backend
//! functions through the authenticated request path and remembers which
//! user it last acted for; a rebind event forgets that.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tether_domain::{RebindEvent, Request, ServiceRoutes, UserId};
use tracing::debug;

use crate::auth::{AuthMachine, AuthRequest, RebindTarget};
use crate::error::SessionResult;
use crate::ports::EventStream;

/// Query parameter carrying the encoded function call on stream requests.
pub const STREAM_REQUEST_PARAM: &str = "tether_request";

/// Calls backend functions on behalf of the active user.
pub struct CoreServiceClient {
    auth: Arc<AuthMachine>,
    routes: ServiceRoutes,
    service_name: Option<String>,
    bound_user: Mutex<Option<UserId>>,
    rebinds: AtomicU64,
}

impl std::fmt::Debug for CoreServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreServiceClient")
            .field("service_name", &self.service_name)
            .field("bound_user", &*self.bound_user.lock())
            .field("rebinds", &self.rebind_count())
            .finish_non_exhaustive()
    }
}

impl CoreServiceClient {
    /// Creates a client. It is not bound for rebind events until handed to
    /// [`AuthMachine::bind_service_client`].
    #[must_use]
    pub fn new(auth: Arc<AuthMachine>, routes: ServiceRoutes, service_name: Option<String>) -> Self {
        Self {
            auth,
            routes,
            service_name,
            bound_user: Mutex::new(None),
            rebinds: AtomicU64::new(0),
        }
    }

    /// Name of the backend service, if this client targets one.
    #[must_use]
    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    /// The user the last successful call was made for, until the next
    /// rebind event.
    #[must_use]
    pub fn bound_user(&self) -> Option<UserId> {
        self.bound_user.lock().clone()
    }

    /// Number of rebind events received.
    #[must_use]
    pub fn rebind_count(&self) -> u64 {
        self.rebinds.load(Ordering::Relaxed)
    }

    /// The auth machine this client sends through.
    #[must_use]
    pub const fn auth(&self) -> &Arc<AuthMachine> {
        &self.auth
    }

    /// Calls a backend function and decodes its JSON result.
    ///
    /// # Errors
    ///
    /// Any error of [`AuthMachine::execute_authenticated_json`].
    pub async fn call_function<T: DeserializeOwned>(
        &self,
        name: &str,
        arguments: Vec<Value>,
    ) -> SessionResult<T> {
        let request = Request::post(self.routes.function_call_route())
            .with_json(&self.function_document(name, arguments));
        self.send(request).await
    }

    /// Like [`Self::call_function`] with a per-call timeout.
    ///
    /// # Errors
    ///
    /// Any error of [`AuthMachine::execute_authenticated_json`].
    pub async fn call_function_with_timeout<T: DeserializeOwned>(
        &self,
        name: &str,
        arguments: Vec<Value>,
        timeout_ms: u64,
    ) -> SessionResult<T> {
        let request = Request::post(self.routes.function_call_route())
            .with_json(&self.function_document(name, arguments))
            .with_timeout_ms(timeout_ms);
        self.send(request).await
    }

    /// Opens a stream of results pushed by a backend function.
    ///
    /// # Errors
    ///
    /// Any error of [`AuthMachine::open_authenticated_stream`].
    pub async fn stream_function(
        &self,
        name: &str,
        arguments: Vec<Value>,
    ) -> SessionResult<Box<dyn EventStream>> {
        let document = self.function_document(name, arguments).to_string();
        let encoded: String = url::form_urlencoded::byte_serialize(document.as_bytes()).collect();
        let request = Request::get(format!(
            "{}?{STREAM_REQUEST_PARAM}={encoded}",
            self.routes.function_call_route()
        ));
        let stream = self
            .auth
            .open_authenticated_stream(AuthRequest::new(request))
            .await?;
        self.remember_active_user();
        Ok(stream)
    }

    async fn send<T: DeserializeOwned>(&self, request: Request) -> SessionResult<T> {
        let result = self
            .auth
            .execute_authenticated_json(AuthRequest::new(request))
            .await?;
        self.remember_active_user();
        Ok(result)
    }

    fn function_document(&self, name: &str, arguments: Vec<Value>) -> Value {
        let mut document = json!({ "name": name, "arguments": arguments });
        if let (Some(service), Some(object)) = (&self.service_name, document.as_object_mut()) {
            object.insert("service".to_string(), json!(service));
        }
        document
    }

    fn remember_active_user(&self) {
        let mut bound = self.bound_user.lock();
        if bound.is_none() {
            *bound = self.auth.active_user().map(|u| u.id);
        }
    }
}

impl RebindTarget for CoreServiceClient {
    fn on_rebind_event(&self, event: &RebindEvent) {
        let previous = self.bound_user.lock().take();
        self.rebinds.fetch_add(1, Ordering::Relaxed);
        debug!(
            service = ?self.service_name,
            kind = ?event.kind(),
            previous_user = ?previous,
            "service client rebound"
        );
    }
}
