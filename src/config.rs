// Configuration read from the process environment. Everything the HTTP
// client needs is collected here once and then passed in explicitly, so the
// rest of the crate never looks at environment variables.

pub const API_KEY_VAR: &str = "FACTORIO_MOD_API_KEY";
pub const PORTAL_URL_VAR: &str = "FACTORIO_MOD_PORTAL_URL";
pub const DEFAULT_PORTAL_URL: &str = "https://mods.factorio.com";

/// Bearer token for the mod portal. An absent key is allowed on purpose:
/// requests still go out with `Bearer None` and the portal rejects them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    api_key: Option<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Credentials {
            api_key: Some(api_key.into()),
        }
    }

    pub fn missing() -> Self {
        Credentials { api_key: None }
    }

    pub fn is_present(&self) -> bool {
        self.api_key.is_some()
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        match &self.api_key {
            Some(key) => format!("Bearer {}", key),
            None => "Bearer None".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub portal_url: String,
    pub credentials: Credentials,
}

impl Config {
    pub fn new(portal_url: impl Into<String>, credentials: Credentials) -> Self {
        let portal_url: String = portal_url.into();
        Config {
            portal_url: portal_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Build the configuration from `FACTORIO_MOD_API_KEY` and
    /// `FACTORIO_MOD_PORTAL_URL`, falling back to the public portal.
    pub fn from_env() -> Self {
        let portal_url =
            std::env::var(PORTAL_URL_VAR).unwrap_or_else(|_| DEFAULT_PORTAL_URL.into());
        let credentials = match std::env::var(API_KEY_VAR) {
            Ok(key) => Credentials::new(key),
            Err(_) => Credentials::missing(),
        };
        Config::new(portal_url, credentials)
    }
}
