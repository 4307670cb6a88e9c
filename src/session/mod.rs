/// Session manager: authenticates against the user store and issues,
/// restores, and revokes opaque session tokens.

mod manager;

pub use manager::{AuthSession, SessionManager, SessionState};
