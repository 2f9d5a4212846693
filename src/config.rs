use std::env;
use std::str::FromStr;

use crate::models::MembershipTier;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub discussions: DiscussionLimits,
}

/// Tunables of the discussion engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscussionLimits {
    /// Minimum trimmed content length, in characters.
    pub min_content_length: usize,
    /// Maximum trimmed content length, in characters.
    pub max_content_length: usize,
    /// Deepest allowed comment depth; top-level comments are depth 0.
    pub max_depth: i32,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Lowest membership tier allowed to moderate a profile's discussions.
    pub moderator_tier: MembershipTier,
}

impl Default for DiscussionLimits {
    fn default() -> Self {
        Self {
            min_content_length: 2,
            max_content_length: 5000,
            max_depth: 8,
            default_page_size: 50,
            max_page_size: 200,
            moderator_tier: MembershipTier::Contributor,
        }
    }
}

impl DiscussionLimits {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_content_length: env_or("DISCUSSION_MIN_CONTENT_LENGTH", defaults.min_content_length),
            max_content_length: env_or("DISCUSSION_MAX_CONTENT_LENGTH", defaults.max_content_length),
            max_depth: env_or("DISCUSSION_MAX_DEPTH", defaults.max_depth),
            default_page_size: env_or("DISCUSSION_DEFAULT_PAGE_SIZE", defaults.default_page_size),
            max_page_size: env_or("DISCUSSION_MAX_PAGE_SIZE", defaults.max_page_size),
            moderator_tier: env_or("DISCUSSION_MODERATOR_TIER", defaults.moderator_tier),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            jwt_secret: env::var("JWT_SECRET")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            discussions: DiscussionLimits::from_env(),
        })
    }
}
