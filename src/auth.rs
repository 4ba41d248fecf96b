//! Token-domain models: redacted secrets, token endpoint grants, and the client's token state.

pub mod grant;
pub mod secret;
pub mod state;

pub use grant::*;
pub use secret::*;
pub use state::*;

/// Minimum length for client credentials and issued tokens.
pub const TOKEN_MIN_LENGTH: usize = 12;
