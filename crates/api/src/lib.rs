//! HTTP surface for the Parley chat backend.
//!
//! Exposes the authenticated streaming chat endpoint plus a health check,
//! behind the shared tower-http middleware stack.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
