//! App client
//!
//! Composes the request client, the auth state machine and the service
//! client factories for one backend app.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tether_domain::{AppInfo, AppRoutes};
use tracing::debug;

use crate::auth::{AuthDeps, AuthMachine};
use crate::config::ClientConfig;
use crate::error::{SessionError, SessionResult};
use crate::ports::{Clock, Transport, UserStorage};
use crate::request_client::RequestClient;
use crate::services::{CoreServiceClient, ServiceClientFactory};

/// Entry point of the SDK for one backend app.
#[derive(Debug)]
pub struct AppClient {
    info: AppInfo,
    routes: AppRoutes,
    auth: Arc<AuthMachine>,
    functions: Arc<CoreServiceClient>,
}

impl AppClient {
    /// Validates the config, loads the stored users and wires the client.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for an invalid config and `Storage` if the
    /// user registry cannot be read.
    pub async fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn UserStorage>,
        clock: Arc<dyn Clock>,
    ) -> SessionResult<Self> {
        config.validate()?;
        let info = config.app_info();
        let routes = AppRoutes::new(&info.client_app_id);

        let request_client = Arc::new(RequestClient::new(
            config.base_url.clone(),
            transport,
            config.request_timeout_ms,
        ));
        let deps = AuthDeps {
            request_client,
            storage,
            clock,
        };
        let auth = Arc::new(AuthMachine::load(deps, info.clone(), config.refresh_buffer_secs).await?);

        let functions = Arc::new(CoreServiceClient::new(
            auth.clone(),
            routes.service.clone(),
            None,
        ));
        auth.bind_service_client(&functions);

        Ok(Self {
            info,
            routes,
            auth,
            functions,
        })
    }

    /// The auth state machine.
    #[must_use]
    pub const fn auth(&self) -> &Arc<AuthMachine> {
        &self.auth
    }

    /// App info reported on login.
    #[must_use]
    pub const fn info(&self) -> &AppInfo {
        &self.info
    }

    /// Builds a service client with `factory` and binds it for rebind
    /// events. The caller owns the returned client.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when a named factory gets no service name or
    /// an unnamed factory gets one.
    pub fn service_client<T>(
        &self,
        factory: &ServiceClientFactory<T>,
        service_name: Option<&str>,
    ) -> SessionResult<T> {
        let service_name = match (factory, service_name) {
            (ServiceClientFactory::Named(_), Some(name)) if !name.is_empty() => {
                Some(name.to_string())
            }
            (ServiceClientFactory::Named(_), _) => {
                return Err(SessionError::Configuration(
                    "named service client factory requires a service name".to_string(),
                ));
            }
            (ServiceClientFactory::Unnamed(_), None) => None,
            (ServiceClientFactory::Unnamed(_), Some(name)) => {
                return Err(SessionError::Configuration(format!(
                    "unnamed service client factory does not take a service name (got '{name}')"
                )));
            }
        };

        debug!(service = ?service_name, "creating service client");
        let core = self.bound_core_client(service_name);
        Ok(factory.build(core, &self.info))
    }

    /// A core client for a named service, bound for rebind events.
    #[must_use]
    pub fn general_service_client(&self, service_name: &str) -> Arc<CoreServiceClient> {
        self.bound_core_client(Some(service_name.to_string()))
    }

    /// The core client used for app-level functions.
    #[must_use]
    pub const fn function_client(&self) -> &Arc<CoreServiceClient> {
        &self.functions
    }

    /// Calls an app-level backend function as the active user.
    ///
    /// # Errors
    ///
    /// Any error of [`CoreServiceClient::call_function`].
    pub async fn call_function<T: DeserializeOwned>(
        &self,
        name: &str,
        arguments: Vec<Value>,
    ) -> SessionResult<T> {
        self.functions.call_function(name, arguments).await
    }

    fn bound_core_client(&self, service_name: Option<String>) -> Arc<CoreServiceClient> {
        let core = Arc::new(CoreServiceClient::new(
            self.auth.clone(),
            self.routes.service.clone(),
            service_name,
        ));
        self.auth.bind_service_client(&core);
        core
    }
}
