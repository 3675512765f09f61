//! Player identity and session tracking for Skulk.
//!
//! 1. **Identity**: who a connection is ([`Authenticator`] trait, with
//!    [`GuestAuthenticator`] for anonymous sign-in).
//! 2. **Session tracking**: which identities are connected
//!    ([`SessionManager`]).
//! 3. **Resumption**: a dropped connection can present its session token
//!    within a grace period and get the same [`PlayerId`] back, along with
//!    the lobby it was last in.
//!
//! [`PlayerId`]: skulk_protocol::PlayerId

mod auth;
mod error;
mod manager;
mod session;

pub use auth::{Authenticator, GuestAuthenticator};
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionConfig, SessionState};
