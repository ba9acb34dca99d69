//! Microsoft account to Minecraft Services token exchange chain
//!
//! Turns a single OAuth authorization code into an authenticated Minecraft session.
//!
//! # Authentication Flow
//!
//! Each step consumes the output of the previous one:
//!
//! 1. Microsoft OAuth2 token exchange (authorization code or refresh token)
//! 2. Xbox Live user authentication (user ticket)
//! 3. XSTS authorization for Minecraft Services (token + user hash)
//! 4. Minecraft Services login (access token)
//! 5. Profile retrieval
//!
//! A refresh runs steps 1-4 only. Any failing step aborts the chain; no step is retried.
//!
//! # Example
//!
//! ```no_run
//! use mc_auth::{AuthProvider, ProviderConfig, parse_redirect};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = AuthProvider::new(ProviderConfig::new("your-azure-client-id"))?;
//!
//!     // Errors are pushed here as well as returned
//!     let mut errors = provider.subscribe();
//!     tokio::spawn(async move {
//!         while let Some(err) = errors.recv().await {
//!             eprintln!("auth error: {err}");
//!         }
//!     });
//!
//!     // Show this to the user, then capture the redirect
//!     println!("Visit: {}", provider.authorization_url());
//!     let redirect = "https://login.microsoftonline.com/common/oauth2/nativeclient?code=...";
//!     let code = parse_redirect(redirect, None)?;
//!
//!     let login = provider.complete_login(&code).await?;
//!     println!("Logged in as: {}", login.profile.name);
//!
//!     // Later, with the stored refresh token
//!     if login.needs_refresh() {
//!         let _refreshed = provider.refresh_tokens(&login.platform.refresh_token).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! ```
//! use mc_auth::{AuthError, Stage};
//!
//! fn explain(err: &AuthError) -> &'static str {
//!     match err {
//!         AuthError::NoPlatformAccount => "Create an Xbox profile first",
//!         AuthError::UnsupportedRegion => "Xbox Live is unavailable for this account",
//!         AuthError::NoLicense => "This account does not own Minecraft",
//!         AuthError::Upstream { stage: Stage::PlatformToken, .. } => "Sign in again",
//!         _ => "Authentication failed",
//!     }
//! }
//!
//! assert_eq!(explain(&AuthError::NoLicense), "This account does not own Minecraft");
//! ```
//!
//! # Custom Transport
//!
//! The provider only needs something implementing [`HttpTransport`]. Non-2xx
//! responses must come back as [`TransportError::Status`].
//!
//! ```
//! use std::sync::Arc;
//! use mc_auth::{
//!     AuthProvider, HttpResponse, HttpTransport, ProviderConfig, RequestBody, TransportError,
//! };
//!
//! struct Offline;
//!
//! #[async_trait::async_trait]
//! impl HttpTransport for Offline {
//!     async fn post(
//!         &self,
//!         _url: &str,
//!         _body: RequestBody,
//!         _headers: &[(&str, &str)],
//!     ) -> Result<HttpResponse, TransportError> {
//!         Err(TransportError::Request("offline".to_string()))
//!     }
//!
//!     async fn get(
//!         &self,
//!         _url: &str,
//!         _headers: &[(&str, &str)],
//!     ) -> Result<HttpResponse, TransportError> {
//!         Err(TransportError::Request("offline".to_string()))
//!     }
//! }
//!
//! # fn main() -> anyhow::Result<()> {
//! let provider = AuthProvider::with_transport(ProviderConfig::new("client"), Arc::new(Offline))?;
//!
//! // Auxiliary checks degrade to false instead of failing
//! assert!(!tokio_test::block_on(provider.validate_token("token")));
//! assert!(tokio_test::block_on(provider.complete_login("code")).is_err());
//! # Ok(())
//! # }
//! ```
//!
//! # Important Notes
//!
//! - Tokens are returned, never stored; persistence is up to the caller
//! - Tokens and authorization codes are never logged
//! - Timeouts are applied by the transport, the chain itself enforces none

pub mod config;
pub mod errors;
pub mod models;
pub mod provider;
pub mod session;
pub mod transport;

// Re-export main types
pub use config::{Endpoints, HttpTimeouts, ProviderConfig};
pub use errors::{AuthError, Result, SecurityTokenDenial, Stage};
pub use models::{McCape, McSkin};
pub use provider::{AuthProvider, PlatformGrant, parse_redirect};
pub use session::{
    AccountInfo, AccountType, GameProfile, LoginResult, PlatformTokens, RefreshResult,
    SecurityToken, ServiceToken, Ticket,
};
pub use transport::{HttpResponse, HttpTransport, RequestBody, ReqwestTransport, TransportError};
