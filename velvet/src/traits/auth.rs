use std::fmt::{self, Debug, Display};

use serde::{Deserialize, Serialize};

/// Identity of a signed-in user, recorded on the documents they create.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sign-in capabilities of the backend that hosts the store.
#[allow(async_fn_in_trait)]
pub trait Authenticator {
    /// Error type returned when a sign-in attempt is rejected.
    type AuthError: Debug + Display;

    /// Should sign in with a pre-issued token.
    async fn sign_in_with_token(&self, token: &str) -> Result<UserId, Self::AuthError>;

    /// Should open an anonymous session.
    async fn sign_in_anonymously(&self) -> Result<UserId, Self::AuthError>;
}
