pub mod chat_session_repo;

pub use chat_session_repo::ChatSessionRepo;
