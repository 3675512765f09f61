//! Sign-in hook for validating player identity.
//!
//! Skulk doesn't run an identity service. It defines the [`Authenticator`]
//! seam: one async method from a client-supplied token to a [`PlayerId`].
//! Plug in JWT validation, a platform sign-in API, or [`GuestAuthenticator`]
//! for anonymous play.

use std::sync::atomic::{AtomicU64, Ordering};

use skulk_protocol::PlayerId;

use crate::SessionError;

/// Validates a client's identity token and returns its identity.
///
/// # Example
///
/// ```rust
/// use skulk_session::{Authenticator, SessionError};
/// use skulk_protocol::PlayerId;
///
/// /// Treats the token as a numeric player ID. Development only.
/// struct NumericAuthenticator;
///
/// impl Authenticator for NumericAuthenticator {
///     async fn authenticate(
///         &self,
///         token: &str,
///     ) -> Result<PlayerId, SessionError> {
///         let id: u64 = token.parse().map_err(|_| {
///             SessionError::AuthFailed("token must be a number".into())
///         })?;
///         Ok(PlayerId(id))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates `token` and returns the player's identity.
    ///
    /// Called once per handshake that does not resume a session.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<PlayerId, SessionError>> + Send;
}

/// Anonymous sign-in: every handshake gets a fresh identity.
///
/// The token is ignored. IDs start at `first_id` and count up, so they
/// never collide within one server process.
#[derive(Debug)]
pub struct GuestAuthenticator {
    next: AtomicU64,
}

impl GuestAuthenticator {
    /// Creates an authenticator that hands out IDs from `first_id` upward.
    pub fn starting_at(first_id: u64) -> Self {
        Self {
            next: AtomicU64::new(first_id),
        }
    }
}

impl Default for GuestAuthenticator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl Authenticator for GuestAuthenticator {
    async fn authenticate(&self, _token: &str) -> Result<PlayerId, SessionError> {
        let id = PlayerId(self.next.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(player_id = %id, "guest signed in");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guest_authenticator_issues_sequential_ids() {
        let auth = GuestAuthenticator::starting_at(100);
        let a = auth.authenticate("").await.unwrap();
        let b = auth.authenticate("anything").await.unwrap();
        assert_eq!(a, PlayerId(100));
        assert_eq!(b, PlayerId(101));
    }
}
