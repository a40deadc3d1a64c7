//! Account repository
//!
//! CRUD over account rows. Login and linking never write profile fields
//! here; profile writes go through the explicit setters and respect the
//! flag gates (`username_initialized`, `profile_edit_allowed`).

use sea_orm::{
    prelude::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::credential::Provider;
use crate::entities::accounts;

/// Flag gates plus the open key/value bag attached to every account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountMetadata {
    pub username_initialized: bool,
    pub profile_edit_allowed: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for AccountMetadata {
    fn default() -> Self {
        Self {
            username_initialized: false,
            profile_edit_allowed: true,
            extra: serde_json::Map::new(),
        }
    }
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    /// The creating credential exactly as presented, casing preserved.
    pub primary_credential: String,
    pub primary_provider: String,
    pub primary_method: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
    pub metadata: AccountMetadata,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_login_at: i64,
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        let extra = serde_json::from_str(&model.metadata_json).unwrap_or_default();
        Self {
            account_id: model.account_id,
            primary_credential: model.primary_credential,
            primary_provider: model.primary_provider,
            primary_method: model.primary_method,
            display_name: model.display_name,
            avatar_url: model.avatar_url,
            email: model.email,
            metadata: AccountMetadata {
                username_initialized: model.username_initialized,
                profile_edit_allowed: model.profile_edit_allowed,
                extra,
            },
            created_at: model.created_at,
            updated_at: model.updated_at,
            last_login_at: model.last_login_at,
        }
    }
}

/// Seed values for a fresh account row.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// The creating credential as presented, casing preserved.
    pub display_credential: String,
    pub provider: Provider,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
}

/// Account repository
pub struct AccountStore {
    db: DatabaseConnection,
}

impl AccountStore {
    /// Create a new account store
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a fresh account row on `conn` (the creation transaction).
    ///
    /// The metadata flags are written here, in the same transaction that
    /// creates the account: `username_initialized` starts false,
    /// `profile_edit_allowed` starts true.
    pub async fn insert_new<C: ConnectionTrait>(
        &self,
        conn: &C,
        seed: NewAccount,
    ) -> Result<Account, DbErr> {
        let account_id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp_millis();

        let metadata_json =
            serde_json::json!({ "created_via": seed.provider.label() }).to_string();

        let account = accounts::ActiveModel {
            account_id: Set(account_id),
            primary_credential: Set(seed.display_credential),
            primary_provider: Set(seed.provider.label().to_string()),
            primary_method: Set(seed.provider.method().as_str().to_string()),
            display_name: Set(seed.display_name),
            avatar_url: Set(seed.avatar_url),
            email: Set(seed.email),
            username_initialized: Set(false),
            profile_edit_allowed: Set(true),
            metadata_json: Set(metadata_json),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(now),
        };

        let model = account.insert(conn).await?;
        debug!("Inserted account {}", model.account_id);

        Ok(model.into())
    }

    /// Get an account by id
    pub async fn get(&self, account_id: &str) -> Result<Option<Account>, DbErr> {
        let account = accounts::Entity::find_by_id(account_id.to_string())
            .one(&self.db)
            .await?;

        Ok(account.map(|a| a.into()))
    }

    /// Stamp a successful login
    pub async fn touch_last_login(&self, account_id: &str) -> Result<(), DbErr> {
        let now = chrono::Utc::now().timestamp_millis();

        accounts::Entity::update_many()
            .filter(accounts::Column::AccountId.eq(account_id))
            .col_expr(accounts::Column::LastLoginAt, Expr::value(now))
            .exec(&self.db)
            .await?;

        debug!("Touched last_login_at for account {}", account_id);
        Ok(())
    }

    /// Bump `updated_at` on `conn` (used inside link transactions)
    pub async fn touch_updated<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: &str,
    ) -> Result<(), DbErr> {
        let now = chrono::Utc::now().timestamp_millis();

        accounts::Entity::update_many()
            .filter(accounts::Column::AccountId.eq(account_id))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
            .exec(conn)
            .await?;

        Ok(())
    }

    /// One-time claim of the username-initialization gate.
    ///
    /// Returns true only for the caller that flipped the flag; everyone
    /// else (including concurrent callers) gets false. The conditional
    /// UPDATE makes the claim atomic without any application lock.
    pub async fn claim_username_initialization(&self, account_id: &str) -> Result<bool, DbErr> {
        let now = chrono::Utc::now().timestamp_millis();

        let result = accounts::Entity::update_many()
            .filter(accounts::Column::AccountId.eq(account_id))
            .filter(accounts::Column::UsernameInitialized.eq(false))
            .col_expr(accounts::Column::UsernameInitialized, Expr::value(true))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
            .exec(&self.db)
            .await?;

        let claimed = result.rows_affected == 1;
        if claimed {
            info!("Claimed username initialization for account {}", account_id);
        }

        Ok(claimed)
    }

    /// Allow or forbid later profile edits
    pub async fn set_profile_edit_allowed(
        &self,
        account_id: &str,
        allowed: bool,
    ) -> Result<(), DbErr> {
        accounts::Entity::update_many()
            .filter(accounts::Column::AccountId.eq(account_id))
            .col_expr(accounts::Column::ProfileEditAllowed, Expr::value(allowed))
            .exec(&self.db)
            .await?;

        debug!(
            "Set profile_edit_allowed={} for account {}",
            allowed, account_id
        );
        Ok(())
    }

    /// Write profile fields. Only the provided fields change.
    pub async fn set_profile(
        &self,
        account_id: &str,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<(), DbErr> {
        if display_name.is_none() && avatar_url.is_none() {
            return Ok(());
        }

        let now = chrono::Utc::now().timestamp_millis();

        let mut update = accounts::Entity::update_many()
            .filter(accounts::Column::AccountId.eq(account_id))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(now));

        if let Some(name) = display_name {
            update = update.col_expr(accounts::Column::DisplayName, Expr::value(name));
        }
        if let Some(url) = avatar_url {
            update = update.col_expr(accounts::Column::AvatarUrl, Expr::value(url));
        }

        update.exec(&self.db).await?;

        debug!("Updated profile for account {}", account_id);
        Ok(())
    }

    /// Record an e-mail for the account unless one is already present.
    /// Never overwrites.
    pub async fn set_email_if_absent(&self, account_id: &str, email: &str) -> Result<(), DbErr> {
        accounts::Entity::update_many()
            .filter(accounts::Column::AccountId.eq(account_id))
            .filter(accounts::Column::Email.is_null())
            .col_expr(accounts::Column::Email, Expr::value(email))
            .exec(&self.db)
            .await?;

        Ok(())
    }

    /// Check whether any account already uses this display name
    pub async fn display_name_taken(&self, name: &str) -> Result<bool, DbErr> {
        let count = accounts::Entity::find()
            .filter(accounts::Column::DisplayName.eq(name))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }
}
