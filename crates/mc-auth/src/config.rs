use std::time::Duration;
use url::Url;

use crate::errors::{AuthError, Result};

/// Production endpoints of every service in the chain
pub mod endpoints {
    pub const MS_AUTHORIZE: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/authorize";
    pub const MS_TOKEN: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/token";
    pub const XBL_AUTHENTICATE: &str = "https://user.auth.xboxlive.com/user/authenticate";
    pub const XSTS_AUTHORIZE: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
    pub const MC_LOGIN: &str = "https://api.minecraftservices.com/authentication/login_with_xbox";
    pub const MC_PROFILE: &str = "https://api.minecraftservices.com/minecraft/profile";
    pub const MC_ENTITLEMENTS: &str = "https://api.minecraftservices.com/entitlements/mcstore";
}

/// Native-client callback used when no redirect URI is configured
pub const DEFAULT_REDIRECT_URI: &str = "https://login.microsoftonline.com/common/oauth2/nativeclient";

/// OAuth scope requested for both the code and refresh grants
pub const SCOPE: &str = "XboxLive.signin offline_access";

/// Host that issues the RPS ticket, sent as `SiteName`
pub const XBL_SITE_NAME: &str = "user.auth.xboxlive.com";

/// Relying parties
pub const RP_XBOX_AUTH: &str = "http://auth.xboxlive.com";
pub const RP_MINECRAFT: &str = "rp://api.minecraftservices.com/";

/// Entitlement name that proves ownership of the game
pub const GAME_ENTITLEMENT: &str = "game_minecraft";

/// Time skew for token expiration (refresh 5 minutes early)
pub const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(300);

/// Full set of URLs the provider talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize: String,
    pub token: String,
    pub xbl_authenticate: String,
    pub xsts_authorize: String,
    pub mc_login: String,
    pub mc_profile: String,
    pub mc_entitlements: String,
}

impl Endpoints {
    /// Re-root every endpoint path at `base`, keeping the production paths.
    ///
    /// Handy for pointing the whole chain at a mock server or a proxy.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let at = |full: &str| {
            let path = Url::parse(full)
                .map(|u| u.path().to_string())
                .unwrap_or_default();
            format!("{base}{path}")
        };

        Self {
            authorize: at(endpoints::MS_AUTHORIZE),
            token: at(endpoints::MS_TOKEN),
            xbl_authenticate: at(endpoints::XBL_AUTHENTICATE),
            xsts_authorize: at(endpoints::XSTS_AUTHORIZE),
            mc_login: at(endpoints::MC_LOGIN),
            mc_profile: at(endpoints::MC_PROFILE),
            mc_entitlements: at(endpoints::MC_ENTITLEMENTS),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize: endpoints::MS_AUTHORIZE.to_string(),
            token: endpoints::MS_TOKEN.to_string(),
            xbl_authenticate: endpoints::XBL_AUTHENTICATE.to_string(),
            xsts_authorize: endpoints::XSTS_AUTHORIZE.to_string(),
            mc_login: endpoints::MC_LOGIN.to_string(),
            mc_profile: endpoints::MC_PROFILE.to_string(),
            mc_entitlements: endpoints::MC_ENTITLEMENTS.to_string(),
        }
    }
}

/// HTTP client configuration, applied by the default transport only
#[derive(Debug, Clone)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            request: Duration::from_secs(30),
        }
    }
}

/// Configuration for [`AuthProvider`](crate::AuthProvider)
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Azure application (client) ID
    pub client_id: String,

    /// OAuth redirect URI
    pub redirect_uri: Url,

    /// Service URLs
    pub endpoints: Endpoints,

    /// HTTP client timeouts
    pub http_timeouts: HttpTimeouts,

    /// Custom user agent (optional)
    pub user_agent: Option<String>,
}

impl ProviderConfig {
    /// Create config for an application, using the native-client redirect
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: default_redirect_uri(),
            endpoints: Endpoints::default(),
            http_timeouts: HttpTimeouts::default(),
            user_agent: Some("mc-auth".to_string()),
        }
    }

    pub fn with_redirect_uri(mut self, redirect_uri: Url) -> Self {
        self.redirect_uri = redirect_uri;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeouts(mut self, http_timeouts: HttpTimeouts) -> Self {
        self.http_timeouts = http_timeouts;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Reject configurations the provider cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::InvalidConfig(
                "client_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_redirect_uri() -> Url {
    Url::parse(DEFAULT_REDIRECT_URI).expect("valid redirect URI")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_native_client_redirect() {
        let config = ProviderConfig::new("client");
        assert_eq!(config.redirect_uri.as_str(), DEFAULT_REDIRECT_URI);
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn test_validate_rejects_blank_client_id() {
        assert!(matches!(
            ProviderConfig::new("").validate(),
            Err(AuthError::InvalidConfig(_))
        ));
        assert!(matches!(
            ProviderConfig::new("   ").validate(),
            Err(AuthError::InvalidConfig(_))
        ));
        assert!(ProviderConfig::new("abc").validate().is_ok());
    }

    #[test]
    fn test_rooted_at_keeps_paths() {
        let endpoints = Endpoints::rooted_at("http://127.0.0.1:9000/");
        assert_eq!(
            endpoints.token,
            "http://127.0.0.1:9000/consumers/oauth2/v2.0/token"
        );
        assert_eq!(
            endpoints.mc_profile,
            "http://127.0.0.1:9000/minecraft/profile"
        );
        assert_eq!(
            endpoints.mc_entitlements,
            "http://127.0.0.1:9000/entitlements/mcstore"
        );
    }
}
