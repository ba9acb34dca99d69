#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mc_auth::{
    AuthProvider, Endpoints, HttpResponse, HttpTransport, ProviderConfig, RequestBody,
    TransportError,
};

pub const CLIENT_ID: &str = "test-client-id";
pub const PROFILE_ID: &str = "069a79f444e94726a5befca90e38aaf5";
pub const PROFILE_NAME: &str = "Notch";

pub const TOKEN_PATH: &str = "/consumers/oauth2/v2.0/token";
pub const XBL_PATH: &str = "/user/authenticate";
pub const XSTS_PATH: &str = "/xsts/authorize";
pub const MC_LOGIN_PATH: &str = "/authentication/login_with_xbox";
pub const PROFILE_PATH: &str = "/minecraft/profile";
pub const ENTITLEMENTS_PATH: &str = "/entitlements/mcstore";

pub fn provider(mock_server: &MockServer) -> AuthProvider {
    let config =
        ProviderConfig::new(CLIENT_ID).with_endpoints(Endpoints::rooted_at(&mock_server.uri()));
    AuthProvider::new(config).unwrap()
}

pub fn ms_token_body() -> Value {
    json!({
        "token_type": "bearer",
        "expires_in": 3600,
        "scope": "XboxLive.signin offline_access",
        "access_token": "ms_access",
        "refresh_token": "ms_refresh"
    })
}

pub fn xbl_body() -> Value {
    json!({
        "IssueInstant": "2024-01-01T00:00:00.0000000Z",
        "NotAfter": "2024-01-15T00:00:00.0000000Z",
        "Token": "xbl_ticket",
        "DisplayClaims": { "xui": [{ "uhs": "uhs123" }] }
    })
}

pub fn xsts_body() -> Value {
    json!({
        "IssueInstant": "2024-01-01T00:00:00.0000000Z",
        "NotAfter": "2024-01-01T16:00:00.0000000Z",
        "Token": "xsts_token",
        "DisplayClaims": { "xui": [{ "uhs": "uhs123" }] }
    })
}

pub fn mc_login_body() -> Value {
    json!({
        "username": "c4b2a5e6-0000-0000-0000-000000000000",
        "roles": [],
        "access_token": "mc_access",
        "token_type": "Bearer",
        "expires_in": 86400
    })
}

pub fn profile_body() -> Value {
    json!({
        "id": PROFILE_ID,
        "name": PROFILE_NAME,
        "skins": [{
            "id": "6a6e65e5-76dd-4c3c-a625-162924514568",
            "state": "ACTIVE",
            "url": "http://textures.minecraft.net/texture/1a4af718455d4aab528e7a61f86fa25e6a369d1768dcb13f7df319a713eb810b",
            "variant": "CLASSIC",
            "alias": "STEVE"
        }],
        "capes": []
    })
}

pub async fn mount_ok(mock_server: &MockServer, verb: &str, route: &str, body: Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(mock_server)
        .await;
}

/// Mount a successful response for every stage up to and including the service token
pub async fn mount_through_service_token(mock_server: &MockServer) {
    mount_ok(mock_server, "POST", TOKEN_PATH, ms_token_body()).await;
    mount_ok(mock_server, "POST", XBL_PATH, xbl_body()).await;
    mount_ok(mock_server, "POST", XSTS_PATH, xsts_body()).await;
    mount_ok(mock_server, "POST", MC_LOGIN_PATH, mc_login_body()).await;
}

/// Fail the test if the route is hit at all
pub async fn forbid(mock_server: &MockServer, verb: &str, route: &str) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(mock_server)
        .await;
}

/// Transport whose every request fails before reaching a server
#[derive(Debug, Default)]
pub struct FailingTransport {
    calls: AtomicUsize,
}

impl FailingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for FailingTransport {
    async fn post(
        &self,
        _url: &str,
        _body: RequestBody,
        _headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Request("connection refused".to_string()))
    }

    async fn get(
        &self,
        _url: &str,
        _headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Request("connection refused".to_string()))
    }
}
