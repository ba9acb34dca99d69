use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{
    ProviderConfig, GAME_ENTITLEMENT, RP_MINECRAFT, RP_XBOX_AUTH, SCOPE, XBL_SITE_NAME,
};
use crate::errors::{AuthError, Result, SecurityTokenDenial, Stage};
use crate::models::*;
use crate::session::{
    GameProfile, LoginResult, PlatformTokens, RefreshResult, SecurityToken, ServiceToken, Ticket,
};
use crate::transport::{HttpTransport, RequestBody, ReqwestTransport, TransportError};

/// Grant presented to the Microsoft token endpoint
#[derive(Debug, Clone, Copy)]
pub enum PlatformGrant<'a> {
    AuthorizationCode(&'a str),
    RefreshToken(&'a str),
}

/// Drives the Microsoft -> Xbox Live -> XSTS -> Minecraft Services chain
///
/// Holds only immutable configuration, the transport and the error channel,
/// so one instance can serve any number of concurrent logins.
#[derive(Clone)]
pub struct AuthProvider {
    config: ProviderConfig,
    authorize_base: Url,
    transport: Arc<dyn HttpTransport>,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<AuthError>>>>,
}

impl std::fmt::Debug for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthProvider")
            .field("client_id", &self.config.client_id)
            .field("redirect_uri", &self.config.redirect_uri.as_str())
            .finish_non_exhaustive()
    }
}

impl AuthProvider {
    /// Create a provider backed by the default `reqwest` transport
    pub fn new(config: ProviderConfig) -> Result<Self> {
        // Reject a blank client id before building the HTTP client
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a provider on top of a caller supplied transport
    pub fn with_transport(config: ProviderConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;
        let authorize_base = Url::parse(&config.endpoints.authorize).map_err(|e| {
            AuthError::InvalidConfig(format!("invalid authorize endpoint: {e}"))
        })?;
        Ok(Self {
            config,
            authorize_base,
            transport,
            subscribers: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Receive every error returned by [`complete_login`](Self::complete_login)
    /// and [`refresh_tokens`](Self::refresh_tokens)
    ///
    /// Unbounded: nothing is dropped for a receiver that reads late. Dropping the
    /// receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthError> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    /// Build the authorization URL for the user to visit
    pub fn authorization_url(&self) -> Url {
        self.build_authorize_url(None)
    }

    /// Same as [`authorization_url`](Self::authorization_url) with an anti-CSRF `state`
    pub fn authorization_url_with_state(&self, state: &str) -> Url {
        self.build_authorize_url(Some(state))
    }

    fn build_authorize_url(&self, state: Option<&str>) -> Url {
        let mut url = self.authorize_base.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", SCOPE)
            .append_pair("prompt", "select_account");

        if let Some(s) = state {
            url.query_pairs_mut().append_pair("state", s);
        }

        url
    }

    /// Exchange an authorization code or refresh token for Microsoft tokens
    #[instrument(skip(self, grant))]
    pub async fn exchange_platform_token(&self, grant: PlatformGrant<'_>) -> Result<PlatformTokens> {
        let mut form = vec![
            ("client_id".to_string(), self.config.client_id.clone()),
            ("scope".to_string(), SCOPE.to_string()),
        ];
        match grant {
            PlatformGrant::AuthorizationCode(code) => {
                debug!("Exchanging authorization code for tokens");
                form.push(("grant_type".to_string(), "authorization_code".to_string()));
                form.push(("code".to_string(), code.to_string()));
                form.push((
                    "redirect_uri".to_string(),
                    self.config.redirect_uri.to_string(),
                ));
            }
            PlatformGrant::RefreshToken(refresh_token) => {
                debug!("Refreshing Microsoft access token");
                form.push(("grant_type".to_string(), "refresh_token".to_string()));
                form.push(("refresh_token".to_string(), refresh_token.to_string()));
            }
        }

        let response = self
            .transport
            .post(&self.config.endpoints.token, RequestBody::Form(form), &[])
            .await
            .map_err(|e| stage_error(Stage::PlatformToken, &e))?;

        let token: MsTokenResponse = decode(Stage::PlatformToken, response.data)?;
        let refresh_token = match (token.refresh_token, grant) {
            (Some(issued), _) => issued,
            // Microsoft may omit a rotated refresh token; the presented one stays valid
            (None, PlatformGrant::RefreshToken(previous)) => previous.to_string(),
            (None, PlatformGrant::AuthorizationCode(_)) => {
                return Err(AuthError::upstream(
                    Stage::PlatformToken,
                    "response is missing refresh_token",
                ));
            }
        };

        Ok(PlatformTokens::new(
            token.access_token,
            refresh_token,
            token.expires_in,
        ))
    }

    /// Authenticate with Xbox Live, returning the user ticket
    #[instrument(skip(self, ms_access_token))]
    pub async fn exchange_ticket(&self, ms_access_token: &str) -> Result<Ticket> {
        let request = XblAuthRequest {
            properties: XblAuthProperties {
                auth_method: "RPS".to_string(),
                site_name: XBL_SITE_NAME.to_string(),
                rps_ticket: format!("d={ms_access_token}"),
            },
            relying_party: RP_XBOX_AUTH.to_string(),
            token_type: "JWT".to_string(),
        };

        debug!("Authenticating with Xbox Live");
        let response = self
            .post_json(&self.config.endpoints.xbl_authenticate, &request)
            .await
            .map_err(|e| stage_error(Stage::Ticket, &e))?;

        let xbl: XblAuthResponse = decode(Stage::Ticket, response.data)?;
        Ok(Ticket { ticket: xbl.token })
    }

    /// Authorize with XSTS for the Minecraft Services relying party
    ///
    /// Only the first `xui` claim is read; further entries are ignored.
    #[instrument(skip(self, ticket))]
    pub async fn exchange_security_token(&self, ticket: &Ticket) -> Result<SecurityToken> {
        let request = XstsAuthRequest {
            properties: XstsAuthProperties {
                sandbox_id: "RETAIL".to_string(),
                user_tokens: vec![ticket.ticket.clone()],
            },
            relying_party: RP_MINECRAFT.to_string(),
            token_type: "JWT".to_string(),
        };

        debug!("Authorizing with XSTS");
        let response = self
            .post_json(&self.config.endpoints.xsts_authorize, &request)
            .await
            .map_err(|e| security_token_error(&e))?;

        let xsts: XstsAuthResponse = decode(Stage::SecurityToken, response.data)?;
        let user_hash = xsts
            .display_claims
            .xui
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::upstream(Stage::SecurityToken, "Missing XUI claims"))?
            .uhs;

        Ok(SecurityToken {
            token: xsts.token,
            user_hash,
        })
    }

    /// Login to Minecraft with the XSTS token
    #[instrument(skip(self, xsts))]
    pub async fn exchange_service_token(&self, xsts: &SecurityToken) -> Result<ServiceToken> {
        let request = McLoginRequest {
            identity_token: xsts.identity_token(),
        };

        debug!("Logging in to Minecraft Services");
        let response = self
            .post_json(&self.config.endpoints.mc_login, &request)
            .await
            .map_err(|e| stage_error(Stage::ServiceToken, &e))?;

        let mc: McLoginResponse = decode(Stage::ServiceToken, response.data)?;
        Ok(ServiceToken::new(mc.access_token, mc.expires_in))
    }

    /// Fetch the Minecraft profile
    #[instrument(skip(self, mc_access_token))]
    pub async fn fetch_profile(&self, mc_access_token: &str) -> Result<GameProfile> {
        debug!("Fetching Minecraft profile");
        let bearer = format!("Bearer {mc_access_token}");
        let response = self
            .transport
            .get(
                &self.config.endpoints.mc_profile,
                &[("Authorization", bearer.as_str())],
            )
            .await
            .map_err(|e| match e.status() {
                Some(404) => AuthError::NoLicense,
                _ => stage_error(Stage::Profile, &e),
            })?;

        if response.data.get("id").is_none_or(Value::is_null) {
            return Err(AuthError::NoLicense);
        }

        let profile: McProfileResponse = decode(Stage::Profile, response.data)?;
        let (Some(id), Some(name)) = (profile.id, profile.name) else {
            return Err(AuthError::upstream(
                Stage::Profile,
                "profile response is missing name",
            ));
        };

        Ok(GameProfile {
            id,
            name,
            skins: profile.skins,
            capes: profile.capes,
        })
    }

    /// Complete login flow from authorization code to full session
    ///
    /// Errors are published to subscribers and then returned.
    #[instrument(skip(self, code))]
    pub async fn complete_login(&self, code: &str) -> Result<LoginResult> {
        let result = self.run_login(code).await;
        self.report(result)
    }

    async fn run_login(&self, code: &str) -> Result<LoginResult> {
        debug!("Starting complete login flow");

        let platform = self
            .exchange_platform_token(PlatformGrant::AuthorizationCode(code))
            .await?;
        let ticket = self.exchange_ticket(&platform.access_token).await?;
        let xsts = self.exchange_security_token(&ticket).await?;
        let service = self.exchange_service_token(&xsts).await?;
        let profile = self.fetch_profile(&service.access_token).await?;

        info!(name = %profile.name, "Login complete");
        Ok(LoginResult {
            platform,
            service,
            profile,
        })
    }

    /// Re-run the chain from a stored refresh token, without re-fetching the profile
    ///
    /// Errors are published to subscribers and then returned.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<RefreshResult> {
        let result = self.run_refresh(refresh_token).await;
        self.report(result)
    }

    async fn run_refresh(&self, refresh_token: &str) -> Result<RefreshResult> {
        debug!("Refreshing session");

        let platform = self
            .exchange_platform_token(PlatformGrant::RefreshToken(refresh_token))
            .await?;
        let ticket = self.exchange_ticket(&platform.access_token).await?;
        let xsts = self.exchange_security_token(&ticket).await?;
        let service = self.exchange_service_token(&xsts).await?;

        info!("Refresh complete");
        Ok(RefreshResult { platform, service })
    }

    /// Check whether Minecraft Services still accepts the access token
    ///
    /// Never fails: any error reads as an invalid token.
    #[instrument(skip(self, mc_access_token))]
    pub async fn validate_token(&self, mc_access_token: &str) -> bool {
        match self.fetch_entitlements(mc_access_token).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Token validation failed: {}", e);
                false
            }
        }
    }

    /// Check whether the account owns the game
    ///
    /// Never fails: any error or malformed body reads as not owned.
    #[instrument(skip(self, mc_access_token))]
    pub async fn check_game_ownership(&self, mc_access_token: &str) -> bool {
        let data = match self.fetch_entitlements(mc_access_token).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Entitlement check failed: {}", e);
                return false;
            }
        };

        // Entries without a string name are skipped
        match data.get("items").and_then(Value::as_array) {
            Some(items) => items.iter().any(|item| {
                item.get("name").and_then(Value::as_str) == Some(GAME_ENTITLEMENT)
            }),
            None => {
                warn!("Malformed entitlements response: missing items");
                false
            }
        }
    }

    async fn fetch_entitlements(
        &self,
        mc_access_token: &str,
    ) -> std::result::Result<Value, TransportError> {
        let bearer = format!("Bearer {mc_access_token}");
        let response = self
            .transport
            .get(
                &self.config.endpoints.mc_entitlements,
                &[("Authorization", bearer.as_str())],
            )
            .await?;
        Ok(response.data)
    }

    async fn post_json<T: serde::Serialize>(
        &self,
        url: &str,
        request: &T,
    ) -> std::result::Result<crate::transport::HttpResponse, TransportError> {
        let body = serde_json::to_value(request)
            .map_err(|e| TransportError::Request(format!("failed to encode request: {e}")))?;
        self.transport.post(url, RequestBody::Json(body), &[]).await
    }

    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            warn!("Authentication chain failed: {}", err);
            if let Ok(mut subscribers) = self.subscribers.lock() {
                subscribers.retain(|tx| tx.send(err.clone()).is_ok());
            }
        }
        result
    }
}

/// Parse the redirect URL and extract the authorization code
///
/// Intended for the UI that hosts the Microsoft login page. A user who closes
/// that window without a redirect should be reported as [`AuthError::UserCancelled`].
pub fn parse_redirect(redirect_url: &str, expected_state: Option<&str>) -> Result<String> {
    let url = Url::parse(redirect_url).map_err(|_| AuthError::InvalidRedirect)?;
    let params: HashMap<_, _> = url.query_pairs().collect();

    if let Some(error) = params.get("error") {
        if error == "access_denied" {
            return Err(AuthError::UserCancelled);
        }
        return Err(AuthError::InvalidRedirect);
    }

    if let Some(expected) = expected_state {
        match params.get("state") {
            Some(actual) if actual == expected => {}
            _ => return Err(AuthError::StateMismatch),
        }
    }

    params
        .get("code")
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .ok_or(AuthError::InvalidRedirect)
}

fn stage_error(stage: Stage, err: &TransportError) -> AuthError {
    warn!("{} failed: {}", stage, err);
    AuthError::upstream(stage, err.upstream_message())
}

fn security_token_error(err: &TransportError) -> AuthError {
    if err.status() == Some(401) {
        let xerr = err
            .data()
            .and_then(|data| serde_json::from_value::<XstsErrorResponse>(data.clone()).ok());

        if let Some(xerr) = xerr {
            if let Some(denial) = SecurityTokenDenial::from_xerr(xerr.xerr) {
                warn!("XSTS denied authorization (XErr: {})", xerr.xerr);
                return denial.into();
            }
            warn!("Unmapped XSTS error code {}", xerr.xerr);
            let message = xerr.message.unwrap_or_else(|| err.upstream_message());
            return AuthError::upstream(
                Stage::SecurityToken,
                format!("{message} (XErr: {})", xerr.xerr),
            );
        }
    }

    stage_error(Stage::SecurityToken, err)
}

fn decode<T: DeserializeOwned>(stage: Stage, data: Value) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| AuthError::upstream(stage, format!("invalid response: {e}")))
}
