use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TOKEN_EXPIRY_SKEW;
use crate::models::{McCape, McSkin};

/// Result of a full login: every caller-facing token plus the profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResult {
    pub platform: PlatformTokens,
    pub service: ServiceToken,
    pub profile: GameProfile,
}

impl LoginResult {
    /// Check if the Minecraft access token needs refresh
    pub fn needs_refresh(&self) -> bool {
        self.service.is_expired()
    }

    /// Denormalized view used by game launch arguments
    pub fn account(&self) -> AccountInfo {
        AccountInfo {
            username: self.profile.name.clone(),
            uuid: self.profile.id.clone(),
            account_type: AccountType::Msa,
        }
    }
}

/// Result of a token refresh, the profile is not re-fetched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshResult {
    pub platform: PlatformTokens,
    pub service: ServiceToken,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountInfo {
    pub username: String,
    pub uuid: String,
    pub account_type: AccountType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Msa,
}

/// Microsoft OAuth tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub expires_at: DateTime<Utc>,
}

impl PlatformTokens {
    pub fn new(access_token: String, refresh_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
            expires_at: expires_from_now(expires_in),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Xbox Live user ticket, only ever handed to the XSTS stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub ticket: String,
}

/// XSTS token scoped to Minecraft Services, with the user hash of the first claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityToken {
    pub token: String,
    pub user_hash: String,
}

impl SecurityToken {
    /// Value of the `identityToken` field expected by Minecraft Services
    pub fn identity_token(&self) -> String {
        format!("XBL3.0 x={};{}", self.user_hash, self.token)
    }
}

/// Minecraft access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceToken {
    pub access_token: String,
    pub expires_in: u64,
    pub expires_at: DateTime<Utc>,
}

impl ServiceToken {
    pub fn new(access_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            expires_in,
            expires_at: expires_from_now(expires_in),
        }
    }

    pub fn is_expired(&self) -> bool {
        let skew_duration = chrono::Duration::from_std(TOKEN_EXPIRY_SKEW)
            .unwrap_or(chrono::Duration::seconds(300));
        Utc::now() + skew_duration >= self.expires_at
    }
}

/// Public Minecraft profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameProfile {
    /// UUID without dashes
    pub id: String,
    /// Player name
    pub name: String,
    #[serde(default)]
    pub skins: Vec<McSkin>,
    #[serde(default)]
    pub capes: Vec<McCape>,
}

fn expires_from_now(expires_in: u64) -> DateTime<Utc> {
    let seconds = i64::try_from(expires_in).unwrap_or(i64::MAX);
    let delta = chrono::Duration::try_seconds(seconds).unwrap_or(chrono::Duration::MAX);
    Utc::now()
        .checked_add_signed(delta)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
