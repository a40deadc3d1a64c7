//! Credential ownership entity
//!
//! One row per credential key. The primary key on `key` is the uniqueness
//! invariant the whole engine leans on: claiming a key is an insert, and
//! two concurrent claims cannot both succeed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credentials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String, // canonical credential key
    pub account_id: String,
    pub provider: String, // lower-case provider label
    pub method: String,   // "wallet" or "social"
    pub display_address: String, // as presented at claim time, casing preserved
    pub provider_user_id: Option<String>, // socials only
    pub email: Option<String>,
    pub username: Option<String>, // provider-side handle, socials only
    pub is_primary: bool,
    pub linked_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::AccountId"
    )]
    Account,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
