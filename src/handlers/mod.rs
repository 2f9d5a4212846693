pub mod comments;
pub mod discussions;
