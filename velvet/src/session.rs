use tracing::{error, info, warn};

use crate::{Authenticator, UserId};

/// Who the card is acting as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// Signed in with the configured token.
    Authenticated(UserId),
    Anonymous(UserId),
    /// No sign-in worked. Reads keep working, writes are refused.
    ReadOnly,
}

impl Session {
    /// Signs in with `token` if one is given, falling back to an anonymous session.
    pub async fn establish<A: Authenticator>(auth: &A, token: Option<&str>) -> Self {
        let token = token.map(str::trim).filter(|token| !token.is_empty());
        if let Some(token) = token {
            match auth.sign_in_with_token(token).await {
                Ok(user) => {
                    info!(%user, "signed in with token");
                    return Self::Authenticated(user);
                }
                Err(e) => warn!(error = %e, "token sign-in failed, falling back to anonymous"),
            }
        }

        match auth.sign_in_anonymously().await {
            Ok(user) => {
                info!(%user, "signed in anonymously");
                Self::Anonymous(user)
            }
            Err(e) => {
                error!(error = %e, "anonymous sign-in failed, card is read-only");
                Self::ReadOnly
            }
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Authenticated(user) | Self::Anonymous(user) => Some(user),
            Self::ReadOnly => None,
        }
    }

    pub fn can_write(&self) -> bool {
        self.user_id().is_some()
    }
}
