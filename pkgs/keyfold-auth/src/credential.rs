//! Provider taxonomy and credential-key normalization
//!
//! Every login method reduces to a single canonical credential key:
//! wallet addresses are trimmed and lower-cased, social logins become
//! `social:<provider>:<id>` with a lower-cased provider segment and the
//! provider-side id kept verbatim (ids are case-sensitive).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Prefix shared by all social credential keys.
pub const SOCIAL_KEY_PREFIX: &str = "social:";

/// The supported wallet providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletProvider {
    MetaMask,
    Phantom,
    WalletConnect,
    Sui,
}

impl WalletProvider {
    /// Lower-case label used in storage and in credential keys.
    pub fn label(&self) -> &'static str {
        match self {
            WalletProvider::MetaMask => "metamask",
            WalletProvider::Phantom => "phantom",
            WalletProvider::WalletConnect => "walletconnect",
            WalletProvider::Sui => "sui",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "metamask" => Some(WalletProvider::MetaMask),
            "phantom" => Some(WalletProvider::Phantom),
            "walletconnect" => Some(WalletProvider::WalletConnect),
            "sui" => Some(WalletProvider::Sui),
            _ => None,
        }
    }
}

/// The supported social/OAuth providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    Google,
    Discord,
    Twitter,
    Telegram,
}

impl SocialProvider {
    /// Lower-case label used in storage and in credential keys.
    pub fn label(&self) -> &'static str {
        match self {
            SocialProvider::Google => "google",
            SocialProvider::Discord => "discord",
            SocialProvider::Twitter => "twitter",
            SocialProvider::Telegram => "telegram",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "google" => Some(SocialProvider::Google),
            "discord" => Some(SocialProvider::Discord),
            "twitter" => Some(SocialProvider::Twitter),
            "telegram" => Some(SocialProvider::Telegram),
            _ => None,
        }
    }
}

/// How a credential authenticates: a signing wallet or an OAuth identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMethod {
    Wallet,
    Social,
}

impl LoginMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginMethod::Wallet => "wallet",
            LoginMethod::Social => "social",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "wallet" => Some(LoginMethod::Wallet),
            "social" => Some(LoginMethod::Social),
            _ => None,
        }
    }
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the eight supported login providers.
///
/// The method is derived from the provider, so a nonsensical pairing such
/// as a "google wallet" cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Provider {
    Wallet(WalletProvider),
    Social(SocialProvider),
}

impl Provider {
    pub fn method(&self) -> LoginMethod {
        match self {
            Provider::Wallet(_) => LoginMethod::Wallet,
            Provider::Social(_) => LoginMethod::Social,
        }
    }

    /// Lower-case label used in storage and in credential keys.
    pub fn label(&self) -> &'static str {
        match self {
            Provider::Wallet(p) => p.label(),
            Provider::Social(p) => p.label(),
        }
    }

    /// Resolve a provider from the string pair used at the wire boundary.
    ///
    /// Unknown labels and mismatched pairings (for example `google` declared
    /// as a `wallet`) are rejected as [`AuthError::InvalidCredential`].
    pub fn from_labels(provider: &str, method: &str) -> Result<Self, AuthError> {
        let method = LoginMethod::from_label(method).ok_or_else(|| {
            AuthError::InvalidCredential(format!("unknown login method `{}`", method.trim()))
        })?;

        match method {
            LoginMethod::Wallet => WalletProvider::from_label(provider)
                .map(Provider::Wallet)
                .ok_or_else(|| {
                    AuthError::InvalidCredential(format!(
                        "`{}` is not a wallet provider",
                        provider.trim()
                    ))
                }),
            LoginMethod::Social => SocialProvider::from_label(provider)
                .map(Provider::Social)
                .ok_or_else(|| {
                    AuthError::InvalidCredential(format!(
                        "`{}` is not a social provider",
                        provider.trim()
                    ))
                }),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<WalletProvider> for Provider {
    fn from(p: WalletProvider) -> Self {
        Provider::Wallet(p)
    }
}

impl From<SocialProvider> for Provider {
    fn from(p: SocialProvider) -> Self {
        Provider::Social(p)
    }
}

/// Canonical form of a credential, the unit of ownership in the identity
/// store. Two raw credentials that normalize to the same key are the same
/// login.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialKey(String);

impl CredentialKey {
    /// Normalize a raw credential presented for the given provider.
    ///
    /// Social credentials may arrive pre-composed (`social:google:123`) or
    /// as the bare provider user id; both forms produce the same key. A
    /// pre-composed key naming a different provider than the declared one
    /// is rejected.
    pub fn new(raw: &str, provider: Provider) -> Result<Self, AuthError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AuthError::InvalidCredential(
                "empty credential".to_string(),
            ));
        }

        match provider {
            Provider::Wallet(_) => Ok(CredentialKey(trimmed.to_lowercase())),
            Provider::Social(social) => {
                let id = match split_social_key(trimmed) {
                    Some((label, id)) => {
                        if !label.eq_ignore_ascii_case(social.label()) {
                            return Err(AuthError::InvalidCredential(format!(
                                "credential names provider `{}` but `{}` was declared",
                                label.to_lowercase(),
                                social.label()
                            )));
                        }
                        id
                    }
                    None => trimmed,
                };
                Self::social(social, id)
            }
        }
    }

    /// Normalize a raw credential with no declared provider (lookup paths).
    ///
    /// Anything carrying the `social:` prefix is validated against the known
    /// social providers; everything else is treated as a wallet address.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AuthError::InvalidCredential(
                "empty credential".to_string(),
            ));
        }

        match split_social_key(trimmed) {
            Some((label, id)) => {
                let social = SocialProvider::from_label(label).ok_or_else(|| {
                    AuthError::InvalidCredential(format!(
                        "unknown social provider `{}`",
                        label.to_lowercase()
                    ))
                })?;
                Self::social(social, id)
            }
            None => Ok(CredentialKey(trimmed.to_lowercase())),
        }
    }

    /// Compose a social key from its parts.
    pub fn social(provider: SocialProvider, user_id: &str) -> Result<Self, AuthError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AuthError::InvalidCredential(
                "empty social user id".to_string(),
            ));
        }
        Ok(CredentialKey(format!(
            "{}{}:{}",
            SOCIAL_KEY_PREFIX,
            provider.label(),
            user_id
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn method(&self) -> LoginMethod {
        if self.0.starts_with(SOCIAL_KEY_PREFIX) {
            LoginMethod::Social
        } else {
            LoginMethod::Wallet
        }
    }

    /// The provider-side user id of a social key, `None` for wallet keys.
    pub fn social_user_id(&self) -> Option<&str> {
        self.0
            .strip_prefix(SOCIAL_KEY_PREFIX)?
            .split_once(':')
            .map(|(_, id)| id)
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CredentialKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Split `social:<provider>:<id>` into its provider and id segments. The id
/// keeps its original casing and may itself contain colons.
fn split_social_key(raw: &str) -> Option<(&str, &str)> {
    let mut parts = raw.splitn(3, ':');
    let head = parts.next()?;
    if !head.eq_ignore_ascii_case("social") {
        return None;
    }
    let provider = parts.next()?;
    let id = parts.next().unwrap_or("");
    Some((provider, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_keys_are_lowercased() {
        let provider = Provider::Wallet(WalletProvider::MetaMask);
        let key = CredentialKey::new("  0xAbCdEf1234  ", provider).unwrap();
        assert_eq!(key.as_str(), "0xabcdef1234");
        assert_eq!(key.method(), LoginMethod::Wallet);
        assert_eq!(key.social_user_id(), None);
    }

    #[test]
    fn social_keys_compose_from_bare_ids() {
        let provider = Provider::Social(SocialProvider::Google);
        let key = CredentialKey::new("108234567890", provider).unwrap();
        assert_eq!(key.as_str(), "social:google:108234567890");
        assert_eq!(key.method(), LoginMethod::Social);
        assert_eq!(key.social_user_id(), Some("108234567890"));
    }

    #[test]
    fn social_ids_stay_case_sensitive() {
        let provider = Provider::Social(SocialProvider::Discord);
        let upper = CredentialKey::new("social:discord:UserABC", provider).unwrap();
        let lower = CredentialKey::new("social:discord:userabc", provider).unwrap();
        assert_eq!(upper.as_str(), "social:discord:UserABC");
        assert_ne!(upper, lower);
    }

    #[test]
    fn precomposed_keys_must_match_declared_provider() {
        let provider = Provider::Social(SocialProvider::Google);
        let err = CredentialKey::new("social:discord:123", provider).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(_)));
    }

    #[test]
    fn empty_credentials_are_rejected() {
        let provider = Provider::Wallet(WalletProvider::Phantom);
        assert!(CredentialKey::new("   ", provider).is_err());
        assert!(CredentialKey::parse("").is_err());
        assert!(CredentialKey::new("social:google:", Provider::Social(SocialProvider::Google)).is_err());
    }

    #[test]
    fn parse_accepts_both_key_families() {
        let wallet = CredentialKey::parse("0xABC").unwrap();
        assert_eq!(wallet.as_str(), "0xabc");

        let social = CredentialKey::parse("social:telegram:42").unwrap();
        assert_eq!(social.as_str(), "social:telegram:42");

        assert!(CredentialKey::parse("social:myspace:42").is_err());
    }

    #[test]
    fn provider_labels_round_trip() {
        for provider in [
            WalletProvider::MetaMask,
            WalletProvider::Phantom,
            WalletProvider::WalletConnect,
            WalletProvider::Sui,
        ] {
            assert_eq!(WalletProvider::from_label(provider.label()), Some(provider));
        }
        for provider in [
            SocialProvider::Google,
            SocialProvider::Discord,
            SocialProvider::Twitter,
            SocialProvider::Telegram,
        ] {
            assert_eq!(SocialProvider::from_label(provider.label()), Some(provider));
        }
    }

    #[test]
    fn mismatched_label_pairs_are_rejected() {
        assert!(Provider::from_labels("google", "wallet").is_err());
        assert!(Provider::from_labels("metamask", "social").is_err());
        assert!(Provider::from_labels("metamask", "wallet").is_ok());
        assert!(Provider::from_labels("Telegram", "Social").is_ok());
    }
}
