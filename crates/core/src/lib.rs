//! Domain types shared across the Parley backend: chat messages, the
//! provider/model catalog, and the core error taxonomy.

pub mod catalog;
pub mod chat;
pub mod error;
