//! Identity-provider integration: token verification, transparent refresh,
//! and the auth cookies carried by browser sessions.

pub mod cookies;
pub mod keycloak;
pub mod service;

pub use keycloak::KeycloakTokenService;
pub use service::{AuthError, Claims, TokenPair, TokenService};
