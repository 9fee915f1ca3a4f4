//! Service client factories.

use std::sync::Arc;

use tether_domain::AppInfo;

use super::CoreServiceClient;

/// Builds a service-specific client around a core client.
pub type FactoryFn<T> = Box<dyn Fn(Arc<CoreServiceClient>, &AppInfo) -> T + Send + Sync>;

/// How a service client is constructed.
///
/// `Named` factories target one configured backend service instance and
/// need its name; `Unnamed` factories talk to the app itself.
pub enum ServiceClientFactory<T> {
    /// Factory for clients with no service name.
    Unnamed(FactoryFn<T>),
    /// Factory for clients bound to a named service.
    Named(FactoryFn<T>),
}

impl<T> ServiceClientFactory<T> {
    /// Wraps an unnamed factory function.
    pub fn unnamed<F>(factory: F) -> Self
    where
        F: Fn(Arc<CoreServiceClient>, &AppInfo) -> T + Send + Sync + 'static,
    {
        Self::Unnamed(Box::new(factory))
    }

    /// Wraps a named factory function.
    pub fn named<F>(factory: F) -> Self
    where
        F: Fn(Arc<CoreServiceClient>, &AppInfo) -> T + Send + Sync + 'static,
    {
        Self::Named(Box::new(factory))
    }

    /// Returns true if the factory needs a service name.
    #[must_use]
    pub const fn requires_name(&self) -> bool {
        matches!(self, Self::Named(_))
    }

    pub(crate) fn build(&self, core: Arc<CoreServiceClient>, app_info: &AppInfo) -> T {
        match self {
            Self::Unnamed(factory) | Self::Named(factory) => factory(core, app_info),
        }
    }
}

impl<T> std::fmt::Debug for ServiceClientFactory<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unnamed(_) => f.write_str("ServiceClientFactory::Unnamed"),
            Self::Named(_) => f.write_str("ServiceClientFactory::Named"),
        }
    }
}
