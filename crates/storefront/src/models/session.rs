//! Session and user profile models.

use serde::{Deserialize, Serialize};

use tamarind_core::UserId;

/// The authenticated user's profile as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// An authenticated session: identity plus bearer token.
///
/// The invariant that identity and token are present together is enforced
/// structurally (a stored session missing either field fails to
/// deserialize and is discarded as corrupt). An empty token is treated the
/// same way by [`Session::is_valid`].
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserProfile,
    pub token: String,
}

impl Session {
    /// Whether the session carries a usable credential.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.token.is_empty()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
