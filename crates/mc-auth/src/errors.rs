use std::fmt;

use thiserror::Error;

/// Hop of the token exchange chain that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PlatformToken,
    Ticket,
    SecurityToken,
    ServiceToken,
    Profile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PlatformToken => "Platform token exchange",
            Self::Ticket => "Ticket exchange",
            Self::SecurityToken => "Security token exchange",
            Self::ServiceToken => "Service token exchange",
            Self::Profile => "Profile fetch",
        };
        f.write_str(name)
    }
}

/// Authentication chain error types
///
/// Cloneable so the same value can be pushed to subscribers and returned to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{stage} failed: {message}")]
    Upstream { stage: Stage, message: String },

    #[error("No Xbox account is associated with this Microsoft account - the user must create one")]
    NoPlatformAccount,

    #[error("Xbox Live is not available in this account's region")]
    UnsupportedRegion,

    #[error("Minecraft profile not found - user may not own Minecraft or hasn't created a profile")]
    NoLicense,

    #[error("User cancelled the authentication flow")]
    UserCancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid redirect URI or missing code")]
    InvalidRedirect,

    #[error("OAuth state mismatch - possible CSRF attack")]
    StateMismatch,
}

impl AuthError {
    pub(crate) fn upstream(stage: Stage, message: impl Into<String>) -> Self {
        Self::Upstream {
            stage,
            message: message.into(),
        }
    }

    /// Stage that failed, for the generic upstream kind
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Upstream { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Security token denials with a dedicated error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityTokenDenial {
    NoPlatformAccount,
    UnsupportedRegion,
}

impl From<SecurityTokenDenial> for AuthError {
    fn from(denial: SecurityTokenDenial) -> Self {
        match denial {
            SecurityTokenDenial::NoPlatformAccount => Self::NoPlatformAccount,
            SecurityTokenDenial::UnsupportedRegion => Self::UnsupportedRegion,
        }
    }
}

/// `XErr` codes returned with a 401 by the XSTS service
pub const SECURITY_TOKEN_DENIALS: &[(u64, SecurityTokenDenial)] = &[
    (2148916233, SecurityTokenDenial::NoPlatformAccount),
    (2148916238, SecurityTokenDenial::UnsupportedRegion),
];

impl SecurityTokenDenial {
    /// Look up an `XErr` code, `None` when it has no dedicated kind
    pub fn from_xerr(code: u64) -> Option<Self> {
        SECURITY_TOKEN_DENIALS
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, denial)| *denial)
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_xerr_codes() {
        assert_eq!(
            SecurityTokenDenial::from_xerr(2148916233),
            Some(SecurityTokenDenial::NoPlatformAccount)
        );
        assert_eq!(
            SecurityTokenDenial::from_xerr(2148916238),
            Some(SecurityTokenDenial::UnsupportedRegion)
        );
    }

    #[test]
    fn test_unknown_xerr_code() {
        assert_eq!(SecurityTokenDenial::from_xerr(2148916235), None);
        assert_eq!(SecurityTokenDenial::from_xerr(0), None);
    }

    #[test]
    fn test_upstream_message_names_stage() {
        let err = AuthError::upstream(Stage::Ticket, "bad ticket");
        assert_eq!(err.to_string(), "Ticket exchange failed: bad ticket");
        assert_eq!(err.stage(), Some(Stage::Ticket));
        assert_eq!(AuthError::NoLicense.stage(), None);
    }
}
