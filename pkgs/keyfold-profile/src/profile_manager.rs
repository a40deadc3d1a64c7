//! Profile manager for flag-gated profile bootstrap and edits

use anyhow::{Context, Result};
use keyfold_auth::{Account, AuthManager};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::username;
use crate::ProfileConfig;

/// Public profile view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub account_id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Profile manager
pub struct ProfileManager {
    auth: AuthManager,
    config: ProfileConfig,
}

impl ProfileManager {
    /// Create a new profile manager
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_config(db, ProfileConfig::default())
    }

    pub fn with_config(db: DatabaseConnection, config: ProfileConfig) -> Self {
        let auth = AuthManager::new(db);
        Self { auth, config }
    }

    /// Initialize the profile of the account owning `credential`, exactly
    /// once per account.
    ///
    /// The first caller wins the initialization gate and assigns a unique
    /// generated username plus the default avatar; every later or
    /// concurrent caller gets `Ok(None)` and changes nothing. A name or
    /// avatar the account already carries (for example from signup hints)
    /// is kept, not regenerated.
    pub async fn initialize_profile(&self, credential: &str) -> Result<Option<Profile>> {
        let account = self.resolve(credential).await?;

        // One-time gate; the conditional update arbitrates concurrent calls
        let claimed = self
            .auth
            .accounts()
            .claim_username_initialization(&account.account_id)
            .await
            .context("Failed to claim username initialization")?;

        if !claimed {
            debug!(
                "Profile already initialized for account {}",
                account.account_id
            );
            return Ok(None);
        }

        let name = match account.display_name.clone() {
            Some(existing) => existing,
            None => self.unique_username().await?,
        };
        let avatar = account
            .avatar_url
            .clone()
            .unwrap_or_else(|| self.config.default_avatar_url.clone());

        self.auth
            .accounts()
            .set_profile(&account.account_id, Some(&name), Some(&avatar))
            .await
            .context("Failed to write initial profile")?;

        info!(
            "Initialized profile for account {} as {}",
            account.account_id, name
        );

        Ok(Some(Profile {
            account_id: account.account_id,
            display_name: Some(name),
            avatar_url: Some(avatar),
        }))
    }

    /// Update profile fields, honoring the edit gate and the username
    /// rules.
    pub async fn update_profile(
        &self,
        credential: &str,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<Profile> {
        let account = self.resolve(credential).await?;

        if !account.metadata.profile_edit_allowed {
            warn!(
                "Profile edits are disabled for account {}",
                account.account_id
            );
            anyhow::bail!("Profile edits are not allowed for this account");
        }

        if let Some(name) = display_name {
            if !username::is_valid(name) {
                anyhow::bail!(
                    "Invalid username: 3-20 characters, letters, digits and underscores only"
                );
            }
            if account.display_name.as_deref() != Some(name)
                && self
                    .auth
                    .accounts()
                    .display_name_taken(name)
                    .await
                    .context("Failed to probe username uniqueness")?
            {
                anyhow::bail!("Username is already taken");
            }
        }

        self.auth
            .accounts()
            .set_profile(&account.account_id, display_name, avatar_url)
            .await
            .context("Failed to update profile")?;

        let updated = self
            .auth
            .accounts()
            .get(&account.account_id)
            .await
            .context("Failed to reload account")?
            .context("Account vanished during update")?;

        debug!("Updated profile for account {}", updated.account_id);

        Ok(Profile {
            account_id: updated.account_id,
            display_name: updated.display_name,
            avatar_url: updated.avatar_url,
        })
    }

    /// Open or close the profile edit gate for an account.
    pub async fn set_edits_allowed(&self, credential: &str, allowed: bool) -> Result<()> {
        let account = self.resolve(credential).await?;

        self.auth
            .accounts()
            .set_profile_edit_allowed(&account.account_id, allowed)
            .await
            .context("Failed to set the edit gate")
    }

    /// Pick a generated username no account uses yet. Bounded retries,
    /// then a timestamp suffix.
    async fn unique_username(&self) -> Result<String> {
        for _ in 0..self.config.max_name_attempts {
            let candidate = {
                let mut rng = rand::thread_rng();
                username::generate(&mut rng, &self.config.username_prefix)
            };

            let taken = self
                .auth
                .accounts()
                .display_name_taken(&candidate)
                .await
                .context("Failed to probe username uniqueness")?;

            if !taken {
                return Ok(candidate);
            }
        }

        let fallback = format!(
            "{}{}",
            self.config.username_prefix,
            chrono::Utc::now().timestamp()
        );
        warn!(
            "Username generation exhausted {} attempts; using {}",
            self.config.max_name_attempts, fallback
        );
        Ok(fallback)
    }

    async fn resolve(&self, credential: &str) -> Result<Account> {
        self.auth
            .find_account_by_any_credential(credential)
            .await
            .context("Failed to resolve account")?
            .context("No account owns this credential")
    }
}
