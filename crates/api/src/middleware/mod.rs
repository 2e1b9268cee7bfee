pub mod auth;

pub use auth::{auth_gate, AuthUser};
