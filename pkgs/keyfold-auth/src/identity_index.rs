//! Credential-key ownership index
//!
//! The durable mapping from canonical credential key to owning account.
//! Ownership is claimed by inserting a row whose primary key is the
//! credential key itself, so "check then claim" never needs an application
//! lock: the loser of a race gets a unique-key violation, classified here
//! by [`is_duplicate_key`].

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use tracing::debug;

use crate::credential::{CredentialKey, Provider};
use crate::entities::{credentials, Credentials};

/// An ownership row ready to be claimed.
#[derive(Debug, Clone)]
pub struct CredentialClaim {
    pub key: CredentialKey,
    pub account_id: String,
    pub provider: Provider,
    /// The credential as presented, casing preserved for display.
    pub display_address: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub is_primary: bool,
}

/// Identity store over the `credentials` table.
pub struct IdentityIndex {
    db: DatabaseConnection,
}

impl IdentityIndex {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Point lookup: the ownership row for a key, if anyone owns it.
    pub async fn owner_of(
        &self,
        key: &CredentialKey,
    ) -> Result<Option<credentials::Model>, DbErr> {
        Credentials::find_by_id(key.as_str()).one(&self.db).await
    }

    /// Claim a key for an account by inserting its ownership row on `conn`
    /// (a transaction when the claim is part of a multi-write operation).
    ///
    /// A lost race surfaces as a unique-key violation; callers recognize it
    /// with [`is_duplicate_key`] and fall back to a lookup.
    pub async fn claim<C: ConnectionTrait>(
        &self,
        conn: &C,
        claim: CredentialClaim,
    ) -> Result<credentials::Model, DbErr> {
        debug!(
            "Claiming credential {} for account {}",
            claim.key, claim.account_id
        );

        let row = credentials::ActiveModel {
            key: Set(claim.key.as_str().to_string()),
            account_id: Set(claim.account_id),
            provider: Set(claim.provider.label().to_string()),
            method: Set(claim.provider.method().as_str().to_string()),
            display_address: Set(claim.display_address),
            provider_user_id: Set(claim.key.social_user_id().map(str::to_string)),
            email: Set(claim.email),
            username: Set(claim.username),
            is_primary: Set(claim.is_primary),
            linked_at: Set(Utc::now().timestamp_millis()),
        };

        row.insert(conn).await
    }

    /// All ownership rows of an account, primary first, then oldest link
    /// first.
    pub async fn keys_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<credentials::Model>, DbErr> {
        Credentials::find()
            .filter(credentials::Column::AccountId.eq(account_id))
            .order_by_desc(credentials::Column::IsPrimary)
            .order_by_asc(credentials::Column::LinkedAt)
            .all(&self.db)
            .await
    }

    /// Number of ownership rows of an account. Equals the account's total
    /// connection count, the primary credential included.
    pub async fn count_for_account(&self, account_id: &str) -> Result<u64, DbErr> {
        Credentials::find()
            .filter(credentials::Column::AccountId.eq(account_id))
            .count(&self.db)
            .await
    }
}

/// True when `err` is the unique-key violation raised by a lost claim race.
pub fn is_duplicate_key(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
