//! Identity resolution and account linking
//!
//! The single entry point for the four engine operations: authenticate or
//! create, find by any credential, link an additional provider, and the
//! connection summary. All mutations run as one transaction over exactly
//! two writes; the uniqueness of credential keys is enforced by the
//! `credentials` primary key, never by application checks.

use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::account_store::{Account, AccountStore, NewAccount};
use crate::credential::{CredentialKey, LoginMethod, Provider, SocialProvider, WalletProvider};
use crate::error::AuthError;
use crate::identity_index::{is_duplicate_key, CredentialClaim, IdentityIndex};

/// A login attempt via any of the eight supported methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Raw credential: a wallet address, a composed `social:<provider>:<id>`
    /// key, or a bare social provider user id.
    pub credential: String,
    pub provider: Provider,
    /// Provider-side e-mail, recorded on the credential and used to fill an
    /// absent account e-mail. Never overwrites.
    pub email: Option<String>,
    /// Provider-side handle (socials).
    pub username: Option<String>,
    /// Applied only when this login creates the account.
    pub display_name: Option<String>,
    /// Applied only when this login creates the account.
    pub avatar_url: Option<String>,
}

impl LoginRequest {
    pub fn wallet(provider: WalletProvider, address: &str) -> Self {
        Self {
            credential: address.to_string(),
            provider: Provider::Wallet(provider),
            email: None,
            username: None,
            display_name: None,
            avatar_url: None,
        }
    }

    pub fn social(provider: SocialProvider, user_id: &str) -> Self {
        Self {
            credential: user_id.to_string(),
            provider: Provider::Social(provider),
            email: None,
            username: None,
            display_name: None,
            avatar_url: None,
        }
    }
}

/// Outcome of [`AuthManager::authenticate_or_create`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub account: Account,
    /// True only for the login that created the account.
    pub is_new: bool,
}

/// A request to attach one more credential to an existing account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRequest {
    /// Any credential already owned by the target account.
    pub target_credential: String,
    /// The credential to attach.
    pub new_credential: String,
    pub provider: Provider,
    pub email: Option<String>,
    pub username: Option<String>,
}

impl LinkRequest {
    pub fn wallet(target: &str, provider: WalletProvider, address: &str) -> Self {
        Self {
            target_credential: target.to_string(),
            new_credential: address.to_string(),
            provider: Provider::Wallet(provider),
            email: None,
            username: None,
        }
    }

    pub fn social(target: &str, provider: SocialProvider, user_id: &str) -> Self {
        Self {
            target_credential: target.to_string(),
            new_credential: user_id.to_string(),
            provider: Provider::Social(provider),
            email: None,
            username: None,
        }
    }
}

/// Outcome of a successful link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkOutcome {
    pub account_id: String,
    /// Canonical key that was attached.
    pub linked_key: String,
    pub total_connections: u64,
}

/// A wallet attached to an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConnection {
    /// Address as presented at claim time, casing preserved.
    pub address: String,
    pub provider: String,
    pub linked_at: i64,
}

/// A social login attached to an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConnection {
    pub provider: String,
    pub provider_user_id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub linked_at: i64,
}

/// Everything attached to one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSummary {
    pub account_id: String,
    /// The creating credential as presented, casing preserved.
    pub primary_credential: String,
    pub primary_provider: String,
    pub primary_method: String,
    /// Additional wallets, the primary excluded.
    pub linked_wallets: Vec<WalletConnection>,
    /// Additional social logins, the primary excluded.
    pub linked_socials: Vec<SocialConnection>,
    /// `1 + linked_wallets + linked_socials`.
    pub total_connections: u64,
}

/// Identity engine entry point.
pub struct AuthManager {
    db: DatabaseConnection,
    index: IdentityIndex,
    accounts: AccountStore,
}

impl AuthManager {
    /// Create a new auth manager
    pub fn new(db: DatabaseConnection) -> Self {
        let index = IdentityIndex::new(db.clone());
        let accounts = AccountStore::new(db.clone());
        Self {
            db,
            index,
            accounts,
        }
    }

    /// The account repository backing this manager.
    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    /// Log in with any supported credential, creating the account on first
    /// contact.
    ///
    /// Deterministic: the same credential always lands on the same account.
    /// Profile fields in the request are applied only when the account is
    /// created; an existing account's profile is never touched by login.
    /// When two callers race to create the same account, exactly one row is
    /// created and the loser transparently receives the winner's account
    /// with `is_new == false`.
    pub async fn authenticate_or_create(
        &self,
        request: LoginRequest,
    ) -> Result<LoginOutcome, AuthError> {
        let key = CredentialKey::new(&request.credential, request.provider)?;
        debug!("Authenticating credential {}", key);

        // Fast path: the key already has an owner.
        if let Some(owner) = self.index.owner_of(&key).await? {
            return self
                .complete_login(&owner.account_id, &key, request.email.as_deref())
                .await;
        }

        // Unowned key: create the account and claim the key in one
        // transaction. The claim insert carries the uniqueness invariant.
        let display = display_form(&request.credential, &key);
        let txn = self.db.begin().await?;

        let account = self
            .accounts
            .insert_new(
                &txn,
                NewAccount {
                    display_credential: display.clone(),
                    provider: request.provider,
                    display_name: request.display_name.clone(),
                    avatar_url: request.avatar_url.clone(),
                    email: request.email.clone(),
                },
            )
            .await?;

        let claim = CredentialClaim {
            key: key.clone(),
            account_id: account.account_id.clone(),
            provider: request.provider,
            display_address: display,
            email: request.email.clone(),
            username: request.username.clone(),
            is_primary: true,
        };

        match self.index.claim(&txn, claim).await {
            Ok(_) => {
                txn.commit().await?;
                info!(
                    "Created account {} via {}",
                    account.account_id, request.provider
                );
                Ok(LoginOutcome {
                    account,
                    is_new: true,
                })
            }
            Err(err) if is_duplicate_key(&err) => {
                // Lost the creation race: someone claimed the key between
                // our lookup and our insert. Roll back the half-built
                // account and return the winner's.
                txn.rollback().await?;
                warn!("Creation race on {}; falling back to lookup", key);

                match self.index.owner_of(&key).await? {
                    Some(owner) => {
                        self.complete_login(&owner.account_id, &key, request.email.as_deref())
                            .await
                    }
                    None => Err(AuthError::StorageConflict(key.as_str().to_string())),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve any credential to its owning account, if one exists.
    ///
    /// A point lookup on the credential key; never a scan. Read-only.
    pub async fn find_account_by_any_credential(
        &self,
        raw: &str,
    ) -> Result<Option<Account>, AuthError> {
        let key = CredentialKey::parse(raw)?;
        debug!("Resolving credential {}", key);

        let Some(owner) = self.index.owner_of(&key).await? else {
            return Ok(None);
        };

        Ok(self.accounts.get(&owner.account_id).await?)
    }

    /// Attach one more credential to the account owning `target_credential`.
    ///
    /// Refuses to move a credential that any account (the target included)
    /// already owns; a credential never changes hands. On success exactly
    /// two writes happen, in one transaction: the ownership row and the
    /// account's `updated_at`.
    pub async fn link_additional_provider(
        &self,
        request: LinkRequest,
    ) -> Result<LinkOutcome, AuthError> {
        let target_key = CredentialKey::parse(&request.target_credential)?;
        let new_key = CredentialKey::new(&request.new_credential, request.provider)?;

        let target = self
            .index
            .owner_of(&target_key)
            .await?
            .ok_or_else(|| AuthError::TargetNotFound(target_key.as_str().to_string()))?;

        // Ownership check before any write. The claim insert remains the
        // authority on conflicts; this read only decides which side of
        // AlreadyLinked to report.
        if let Some(owner) = self.index.owner_of(&new_key).await? {
            let owned_by_target = owner.account_id == target.account_id;
            warn!(
                "Refusing to link {}: already owned by {}",
                new_key,
                if owned_by_target {
                    "the target account"
                } else {
                    "another account"
                }
            );
            return Err(AuthError::AlreadyLinked {
                key: new_key.as_str().to_string(),
                owned_by_target,
            });
        }

        let claim = CredentialClaim {
            key: new_key.clone(),
            account_id: target.account_id.clone(),
            provider: request.provider,
            display_address: display_form(&request.new_credential, &new_key),
            email: request.email.clone(),
            username: request.username.clone(),
            is_primary: false,
        };

        let txn = self.db.begin().await?;
        match self.index.claim(&txn, claim).await {
            Ok(_) => {
                self.accounts.touch_updated(&txn, &target.account_id).await?;
                txn.commit().await?;
            }
            Err(err) if is_duplicate_key(&err) => {
                // Someone claimed the key between our check and our insert.
                txn.rollback().await?;
                warn!("Link race on {}; reporting current owner", new_key);

                let owned_by_target = match self.index.owner_of(&new_key).await? {
                    Some(owner) => owner.account_id == target.account_id,
                    None => {
                        return Err(AuthError::StorageConflict(new_key.as_str().to_string()));
                    }
                };
                return Err(AuthError::AlreadyLinked {
                    key: new_key.as_str().to_string(),
                    owned_by_target,
                });
            }
            Err(err) => return Err(err.into()),
        }

        let total_connections = self.index.count_for_account(&target.account_id).await?;
        info!(
            "Linked {} to account {} ({} connections)",
            new_key, target.account_id, total_connections
        );

        Ok(LinkOutcome {
            account_id: target.account_id,
            linked_key: new_key.as_str().to_string(),
            total_connections,
        })
    }

    /// Everything attached to the account owning `raw`.
    pub async fn get_connections(&self, raw: &str) -> Result<ConnectionSummary, AuthError> {
        let key = CredentialKey::parse(raw)?;
        debug!("Building connection summary for {}", key);

        let owner = self
            .index
            .owner_of(&key)
            .await?
            .ok_or_else(|| AuthError::TargetNotFound(key.as_str().to_string()))?;

        let account = self
            .accounts
            .get(&owner.account_id)
            .await?
            .ok_or_else(|| AuthError::TargetNotFound(key.as_str().to_string()))?;

        let mut linked_wallets = Vec::new();
        let mut linked_socials = Vec::new();

        for row in self.index.keys_for_account(&account.account_id).await? {
            if row.is_primary {
                continue;
            }
            if row.method == LoginMethod::Wallet.as_str() {
                linked_wallets.push(WalletConnection {
                    address: row.display_address,
                    provider: row.provider,
                    linked_at: row.linked_at,
                });
            } else {
                linked_socials.push(SocialConnection {
                    provider: row.provider,
                    provider_user_id: row.provider_user_id.unwrap_or_default(),
                    email: row.email,
                    username: row.username,
                    linked_at: row.linked_at,
                });
            }
        }

        let total_connections = 1 + (linked_wallets.len() + linked_socials.len()) as u64;

        Ok(ConnectionSummary {
            account_id: account.account_id,
            primary_credential: account.primary_credential,
            primary_provider: account.primary_provider,
            primary_method: account.primary_method,
            linked_wallets,
            linked_socials,
            total_connections,
        })
    }

    /// True when `candidate` is one of the credentials attached to the
    /// account owning `target`. Unknown targets and unknown candidates are
    /// both simply false.
    pub async fn connection_exists(
        &self,
        target: &str,
        candidate: &str,
    ) -> Result<bool, AuthError> {
        let target_key = CredentialKey::parse(target)?;
        let candidate_key = CredentialKey::parse(candidate)?;

        let Some(target_owner) = self.index.owner_of(&target_key).await? else {
            return Ok(false);
        };

        Ok(self
            .index
            .owner_of(&candidate_key)
            .await?
            .map(|owner| owner.account_id == target_owner.account_id)
            .unwrap_or(false))
    }

    /// Shared tail of every successful login against an existing account:
    /// stamp the login, fill an absent e-mail, return the account.
    async fn complete_login(
        &self,
        account_id: &str,
        key: &CredentialKey,
        email: Option<&str>,
    ) -> Result<LoginOutcome, AuthError> {
        self.accounts.touch_last_login(account_id).await?;
        if let Some(email) = email {
            self.accounts.set_email_if_absent(account_id, email).await?;
        }

        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or_else(|| AuthError::StorageConflict(key.as_str().to_string()))?;

        debug!("Login for existing account {}", account.account_id);
        Ok(LoginOutcome {
            account,
            is_new: false,
        })
    }
}

/// Display form of a credential: wallets keep their presented casing,
/// socials display as the canonical key (which keeps the id verbatim).
fn display_form(raw: &str, key: &CredentialKey) -> String {
    match key.method() {
        LoginMethod::Wallet => raw.trim().to_string(),
        LoginMethod::Social => key.as_str().to_string(),
    }
}
