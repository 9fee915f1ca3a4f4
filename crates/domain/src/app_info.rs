//! Identity of the application embedding the SDK.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Version reported to the backend in login requests.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Describes the embedding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    /// Backend app identifier.
    pub client_app_id: String,
    /// Name of the local application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_app_name: Option<String>,
    /// Version of the local application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_app_version: Option<String>,
}

impl AppInfo {
    /// Creates app info with only the app id.
    #[must_use]
    pub fn new(client_app_id: impl Into<String>) -> Self {
        Self {
            client_app_id: client_app_id.into(),
            local_app_name: None,
            local_app_version: None,
        }
    }

    /// Device description attached to login requests.
    ///
    /// `device_id` is the id of a previous session on this device, if any.
    #[must_use]
    pub fn device_options(&self, device_id: Option<&str>) -> serde_json::Value {
        let mut device = json!({
            "appId": self.local_app_name,
            "appVersion": self.local_app_version,
            "platform": std::env::consts::OS,
            "platformVersion": std::env::consts::ARCH,
            "sdkVersion": SDK_VERSION,
        });
        if let (Some(id), Some(object)) = (device_id, device.as_object_mut()) {
            object.insert("deviceId".to_string(), json!(id));
        }
        json!({ "device": device })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_device_options_include_previous_device() {
        let mut info = AppInfo::new("my-app");
        info.local_app_name = Some("demo".to_string());

        let options = info.device_options(Some("d1"));
        assert_eq!(options["device"]["deviceId"], "d1");
        assert_eq!(options["device"]["appId"], "demo");
        assert_eq!(options["device"]["sdkVersion"], SDK_VERSION);

        let options = info.device_options(None);
        assert!(options["device"].get("deviceId").is_none());
    }
}
