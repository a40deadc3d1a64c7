//! Keyfold Profile - profile bootstrap for Keyfold accounts
//!
//! This crate sits on top of `keyfold-auth` and handles the profile side
//! of an account's life:
//! - One-time initialization: a generated username and a default avatar,
//!   assigned exactly once per account no matter how many clients race for
//!   it (the engine's `username_initialized` gate arbitrates)
//! - Later edits, honored only while the account's `profile_edit_allowed`
//!   gate is open
//! - Username generation and validation

pub mod profile_manager;
pub mod username;

pub use profile_manager::{Profile, ProfileManager};

/// Configuration for profile bootstrap
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    /// Prefix for generated usernames
    pub username_prefix: String,

    /// Avatar assigned at first initialization
    pub default_avatar_url: String,

    /// Generated names to try before falling back to a timestamp suffix
    pub max_name_attempts: u32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            username_prefix: username::USERNAME_PREFIX.to_string(),
            default_avatar_url: "/avatars/default-01.png".to_string(),
            max_name_attempts: 50,
        }
    }
}
