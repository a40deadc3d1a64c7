//! Keyfold Auth - Identity resolution and account linking
//!
//! One persistent account, many ways in. This crate keeps a durable mapping
//! from every supported credential to its owning account: four wallet
//! providers (MetaMask, Phantom, WalletConnect, Sui) and four social
//! providers (Google, Discord, Twitter, Telegram). Logging in with any of
//! them lands on the same account, and additional providers can be attached
//! later without ever moving a credential between accounts.
//!
//! # Architecture
//!
//! - **CredentialKey**: canonical form of a raw credential; wallet
//!   addresses lower-cased, social logins composed as
//!   `social:<provider>:<id>` with the id kept verbatim
//! - **IdentityIndex**: the `credentials` table, one row per key; the
//!   primary key on the credential key is the uniqueness invariant
//! - **AccountStore**: the `accounts` table; profile fields, flag gates,
//!   login stamps
//! - **AuthManager**: the four engine operations
//!   (`authenticate_or_create`, `find_account_by_any_credential`,
//!   `link_additional_provider`, `get_connections`)
//!
//! # Database Schema
//!
//! - `accounts`: one row per account; primary credential in its presented
//!   form, profile fields, metadata flags, timestamps
//! - `credentials`: one row per credential key, including the primary;
//!   owner id, provider, method, link metadata
//!
//! # Key Guarantees
//!
//! - A credential key is owned by at most one account, enforced by the
//!   schema, not by application checks
//! - `authenticate_or_create` is deterministic and race-safe: concurrent
//!   first logins with the same credential produce exactly one account
//! - Linking never reassigns an owned credential and never half-applies:
//!   each mutation is one transaction over exactly two writes
//! - Logging in never touches an existing account's profile
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use keyfold_auth::{AuthManager, LinkRequest, LoginRequest, SocialProvider, WalletProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = keyfold_auth::connect_database(std::path::Path::new("keyfold.db")).await?;
//! let auth = AuthManager::new(db);
//!
//! // First wallet login creates the account
//! let login = auth
//!     .authenticate_or_create(LoginRequest::wallet(WalletProvider::MetaMask, "0xAbC123"))
//!     .await?;
//! assert!(login.is_new);
//!
//! // Attach a social login to the same account
//! auth.link_additional_provider(LinkRequest::social(
//!     "0xAbC123",
//!     SocialProvider::Google,
//!     "108000001",
//! ))
//! .await?;
//!
//! // Any credential resolves to the full picture
//! let summary = auth.get_connections("0xabc123").await?;
//! assert_eq!(summary.total_connections, 2);
//! # Ok(())
//! # }
//! ```

pub mod account_store;
pub mod auth_manager;
pub mod credential;
pub mod entities;
pub mod error;
pub mod identity_index;
pub mod migration;

pub use account_store::{Account, AccountMetadata, AccountStore, NewAccount};
pub use auth_manager::{
    AuthManager, ConnectionSummary, LinkOutcome, LinkRequest, LoginOutcome, LoginRequest,
    SocialConnection, WalletConnection,
};
pub use credential::{
    CredentialKey, LoginMethod, Provider, SocialProvider, WalletProvider, SOCIAL_KEY_PREFIX,
};
pub use error::AuthError;
pub use identity_index::{CredentialClaim, IdentityIndex};
pub use migration::Migrator;

use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// Open (creating if missing) the keyfold database at `db_path` and bring
/// its schema up to date.
pub async fn connect_database(db_path: &std::path::Path) -> Result<DatabaseConnection, DbErr> {
    let db_path_str = db_path.to_string_lossy().replace('\\', "/");
    let db_url = format!("sqlite:{}?mode=rwc", db_path_str);

    let db = Database::connect(db_url.as_str()).await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    info!("Keyfold database ready at {}", db_path.display());

    Ok(db)
}
