pub mod discussion_service;
pub mod moderation_service;
pub mod profile_service;
pub mod query_service;
pub mod vote_service;
