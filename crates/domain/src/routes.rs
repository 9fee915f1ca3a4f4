//! Backend route builders.

/// Prefix shared by every client API route.
pub const CLIENT_API_BASE: &str = "/api/client/v2.0";

/// Routes used by the auth state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRoutes {
    client_app_id: String,
}

impl AuthRoutes {
    /// Creates the auth routes for an app.
    #[must_use]
    pub fn new(client_app_id: impl Into<String>) -> Self {
        Self {
            client_app_id: client_app_id.into(),
        }
    }

    /// Session route: POST refreshes the access token, DELETE logs out.
    #[must_use]
    pub fn session_route(&self) -> String {
        format!("{CLIENT_API_BASE}/auth/session")
    }

    /// Profile of the authenticated user.
    #[must_use]
    pub fn profile_route(&self) -> String {
        format!("{CLIENT_API_BASE}/auth/profile")
    }

    /// Base route of a login provider.
    #[must_use]
    pub fn auth_provider_route(&self, provider_name: &str) -> String {
        format!(
            "{CLIENT_API_BASE}/app/{}/auth/providers/{provider_name}",
            self.client_app_id
        )
    }

    /// Login route of a provider.
    #[must_use]
    pub fn auth_provider_login_route(&self, provider_name: &str) -> String {
        format!("{}/login", self.auth_provider_route(provider_name))
    }
}

/// Routes used by service clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRoutes {
    client_app_id: String,
}

impl ServiceRoutes {
    /// Creates the service routes for an app.
    #[must_use]
    pub fn new(client_app_id: impl Into<String>) -> Self {
        Self {
            client_app_id: client_app_id.into(),
        }
    }

    /// Function call route.
    #[must_use]
    pub fn function_call_route(&self) -> String {
        format!(
            "{CLIENT_API_BASE}/app/{}/functions/call",
            self.client_app_id
        )
    }
}

/// All routes of one app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRoutes {
    /// Auth routes.
    pub auth: AuthRoutes,
    /// Service routes.
    pub service: ServiceRoutes,
}

impl AppRoutes {
    /// Creates the routes for an app.
    #[must_use]
    pub fn new(client_app_id: &str) -> Self {
        Self {
            auth: AuthRoutes::new(client_app_id),
            service: ServiceRoutes::new(client_app_id),
        }
    }
}
