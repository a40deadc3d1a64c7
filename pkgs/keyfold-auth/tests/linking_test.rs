//! Integration tests for account linking and connection summaries
//!
//! These tests cover link_additional_provider, get_connections, and
//! connection_exists:
//! - Attaching wallets and socials to an existing account
//! - Hijack refusal (credentials never change hands)
//! - Atomicity of failed links
//! - Summary shape and connection counting

use std::sync::Arc;

use keyfold_auth::migration::Migrator;
use keyfold_auth::{
    AuthError, AuthManager, LinkRequest, LoginRequest, SocialProvider, WalletProvider,
};
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

const METAMASK_ADDRESS: &str = "0xAbC123DeF456aBc789DeF012aBc345DeF678aBc9";
const PHANTOM_ADDRESS: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
const SUI_ADDRESS: &str = "0x02a212de6a9dfa3a69e22387acfbafbb1a9e591bd9d636e7895dcfc8de05f331";
const OTHER_ADDRESS: &str = "0x9999AaaaBbbbCcccDdddEeeeFfff000011112222";

const GOOGLE_ID: &str = "108234567890123456789";
const TELEGRAM_ID: &str = "777000111";

/// Helper function to create an in-memory database for testing
async fn create_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Log in once so the address owns an account
async fn create_wallet_account(auth: &AuthManager, address: &str) -> String {
    let outcome = auth
        .authenticate_or_create(LoginRequest::wallet(WalletProvider::MetaMask, address))
        .await
        .expect("wallet login should succeed");
    outcome.account.account_id
}

#[tokio::test]
async fn test_link_social_to_wallet_account() {
    let db = create_test_db().await.unwrap();
    let auth = AuthManager::new(db);
    let account_id = create_wallet_account(&auth, METAMASK_ADDRESS).await;

    let mut request = LinkRequest::social(METAMASK_ADDRESS, SocialProvider::Google, GOOGLE_ID);
    request.email = Some("alice@example.com".to_string());
    request.username = Some("alice".to_string());

    let outcome = auth.link_additional_provider(request).await.unwrap();
    assert_eq!(outcome.account_id, account_id);
    assert_eq!(outcome.linked_key, format!("social:google:{}", GOOGLE_ID));
    assert_eq!(outcome.total_connections, 2);

    let summary = auth.get_connections(METAMASK_ADDRESS).await.unwrap();
    assert_eq!(summary.account_id, account_id);
    assert_eq!(summary.total_connections, 2);
    assert!(summary.linked_wallets.is_empty());
    assert_eq!(summary.linked_socials.len(), 1);

    let social = &summary.linked_socials[0];
    assert_eq!(social.provider, "google");
    assert_eq!(social.provider_user_id, GOOGLE_ID);
    assert_eq!(social.email.as_deref(), Some("alice@example.com"));
    assert_eq!(social.username.as_deref(), Some("alice"));

    // Primary untouched by the link
    assert_eq!(summary.primary_credential, METAMASK_ADDRESS);
    assert_eq!(summary.primary_provider, "metamask");
    assert_eq!(summary.primary_method, "wallet");
}

#[tokio::test]
async fn test_linked_credential_logs_into_same_account() {
    let db = create_test_db().await.unwrap();
    let auth = AuthManager::new(db);
    let account_id = create_wallet_account(&auth, METAMASK_ADDRESS).await;

    auth.link_additional_provider(LinkRequest::social(
        METAMASK_ADDRESS,
        SocialProvider::Google,
        GOOGLE_ID,
    ))
    .await
    .unwrap();

    // Logging in with the linked social lands on the wallet's account
    let outcome = auth
        .authenticate_or_create(LoginRequest::social(
            SocialProvider::Google,
            GOOGLE_ID,
        ))
        .await
        .unwrap();
    assert!(!outcome.is_new);
    assert_eq!(outcome.account.account_id, account_id);

    // And resolves through the resolver too
    let found = auth
        .find_account_by_any_credential(&format!("social:google:{}", GOOGLE_ID))
        .await
        .unwrap()
        .expect("linked social should resolve");
    assert_eq!(found.account_id, account_id);
}

#[tokio::test]
async fn test_hijacking_an_owned_credential_is_refused() {
    let db = create_test_db().await.unwrap();
    let auth = AuthManager::new(db);

    let victim = create_wallet_account(&auth, METAMASK_ADDRESS).await;
    let attacker = create_wallet_account(&auth, OTHER_ADDRESS).await;
    assert_ne!(victim, attacker);

    // The attacker tries to attach the victim's wallet to their account
    let err = auth
        .link_additional_provider(LinkRequest::wallet(
            OTHER_ADDRESS,
            WalletProvider::MetaMask,
            METAMASK_ADDRESS,
        ))
        .await
        .unwrap_err();

    match err {
        AuthError::AlreadyLinked {
            key,
            owned_by_target,
        } => {
            assert_eq!(key, METAMASK_ADDRESS.to_lowercase());
            assert!(!owned_by_target);
        }
        other => panic!("expected AlreadyLinked, got {other:?}"),
    }

    // Ownership did not move and nothing was written
    let owner = auth
        .find_account_by_any_credential(METAMASK_ADDRESS)
        .await
        .unwrap()
        .expect("victim wallet still resolves");
    assert_eq!(owner.account_id, victim);

    let summary = auth.get_connections(OTHER_ADDRESS).await.unwrap();
    assert_eq!(summary.total_connections, 1);
}

#[tokio::test]
async fn test_relinking_own_credential_is_rejected_without_side_effects() {
    let db = create_test_db().await.unwrap();
    let auth = AuthManager::new(db);
    create_wallet_account(&auth, METAMASK_ADDRESS).await;

    // Linking the target's own primary credential back to itself
    let err = auth
        .link_additional_provider(LinkRequest::wallet(
            METAMASK_ADDRESS,
            WalletProvider::MetaMask,
            METAMASK_ADDRESS,
        ))
        .await
        .unwrap_err();

    match err {
        AuthError::AlreadyLinked {
            owned_by_target, ..
        } => assert!(owned_by_target),
        other => panic!("expected AlreadyLinked, got {other:?}"),
    }

    let summary = auth.get_connections(METAMASK_ADDRESS).await.unwrap();
    assert_eq!(summary.total_connections, 1);

    // Same for an already-linked secondary credential
    auth.link_additional_provider(LinkRequest::wallet(
        METAMASK_ADDRESS,
        WalletProvider::Phantom,
        PHANTOM_ADDRESS,
    ))
    .await
    .unwrap();

    let err = auth
        .link_additional_provider(LinkRequest::wallet(
            METAMASK_ADDRESS,
            WalletProvider::Phantom,
            PHANTOM_ADDRESS,
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::AlreadyLinked {
            owned_by_target: true,
            ..
        }
    ));

    let summary = auth.get_connections(METAMASK_ADDRESS).await.unwrap();
    assert_eq!(summary.total_connections, 2);
}

#[tokio::test]
async fn test_linking_to_unknown_target_fails_atomically() {
    let db = create_test_db().await.unwrap();
    let auth = AuthManager::new(db);

    let err = auth
        .link_additional_provider(LinkRequest::social(
            "0xDoesNotExist",
            SocialProvider::Google,
            GOOGLE_ID,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TargetNotFound(_)));

    // The new credential was not claimed by the failed attempt
    let missing = auth
        .find_account_by_any_credential(&format!("social:google:{}", GOOGLE_ID))
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_link_with_invalid_credential_changes_nothing() {
    let db = create_test_db().await.unwrap();
    let auth = AuthManager::new(db);
    create_wallet_account(&auth, METAMASK_ADDRESS).await;

    let err = auth
        .link_additional_provider(LinkRequest::social(
            METAMASK_ADDRESS,
            SocialProvider::Google,
            "   ",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredential(_)));

    let summary = auth.get_connections(METAMASK_ADDRESS).await.unwrap();
    assert_eq!(summary.total_connections, 1);
}

#[tokio::test]
async fn test_multi_provider_account_summary() {
    let db = create_test_db().await.unwrap();
    let auth = AuthManager::new(db);
    let account_id = create_wallet_account(&auth, METAMASK_ADDRESS).await;

    // Spaced out so linked_at timestamps order the summary deterministically
    auth.link_additional_provider(LinkRequest::wallet(
        METAMASK_ADDRESS,
        WalletProvider::Phantom,
        PHANTOM_ADDRESS,
    ))
    .await
    .unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    auth.link_additional_provider(LinkRequest::wallet(
        METAMASK_ADDRESS,
        WalletProvider::Sui,
        SUI_ADDRESS,
    ))
    .await
    .unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    auth.link_additional_provider(LinkRequest::social(
        METAMASK_ADDRESS,
        SocialProvider::Google,
        GOOGLE_ID,
    ))
    .await
    .unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    let last = auth
        .link_additional_provider(LinkRequest::social(
            METAMASK_ADDRESS,
            SocialProvider::Telegram,
            TELEGRAM_ID,
        ))
        .await
        .unwrap();
    assert_eq!(last.total_connections, 5);

    // Resolve through a lower-cased secondary wallet: same account, full
    // summary, primary casing preserved
    let summary = auth
        .get_connections(&SUI_ADDRESS.to_uppercase())
        .await
        .unwrap();
    assert_eq!(summary.account_id, account_id);
    assert_eq!(summary.primary_credential, METAMASK_ADDRESS);
    assert_eq!(summary.total_connections, 5);
    assert_eq!(summary.linked_wallets.len(), 2);
    assert_eq!(summary.linked_socials.len(), 2);

    // Wallet entries keep their presented casing
    let providers: Vec<&str> = summary
        .linked_wallets
        .iter()
        .map(|w| w.provider.as_str())
        .collect();
    assert_eq!(providers, vec!["phantom", "sui"]);
    assert_eq!(summary.linked_wallets[0].address, PHANTOM_ADDRESS);

    let socials: Vec<&str> = summary
        .linked_socials
        .iter()
        .map(|s| s.provider.as_str())
        .collect();
    assert_eq!(socials, vec!["google", "telegram"]);
}

#[tokio::test]
async fn test_summary_for_unknown_credential_is_not_found() {
    let db = create_test_db().await.unwrap();
    let auth = AuthManager::new(db);

    let err = auth.get_connections(METAMASK_ADDRESS).await.unwrap_err();
    assert!(matches!(err, AuthError::TargetNotFound(_)));
}

#[tokio::test]
async fn test_connection_exists() {
    let db = create_test_db().await.unwrap();
    let auth = AuthManager::new(db);
    create_wallet_account(&auth, METAMASK_ADDRESS).await;
    create_wallet_account(&auth, OTHER_ADDRESS).await;

    auth.link_additional_provider(LinkRequest::social(
        METAMASK_ADDRESS,
        SocialProvider::Google,
        GOOGLE_ID,
    ))
    .await
    .unwrap();

    // Own credentials, in either direction and any casing
    assert!(auth
        .connection_exists(METAMASK_ADDRESS, &format!("social:google:{}", GOOGLE_ID))
        .await
        .unwrap());
    assert!(auth
        .connection_exists(
            &format!("social:google:{}", GOOGLE_ID),
            &METAMASK_ADDRESS.to_lowercase()
        )
        .await
        .unwrap());

    // Another account's credential
    assert!(!auth
        .connection_exists(METAMASK_ADDRESS, OTHER_ADDRESS)
        .await
        .unwrap());

    // Unknown candidate / unknown target
    assert!(!auth
        .connection_exists(METAMASK_ADDRESS, "social:telegram:404")
        .await
        .unwrap());
    assert!(!auth
        .connection_exists("0xUnknownTarget", METAMASK_ADDRESS)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_concurrent_links_have_a_single_winner() {
    let db = create_test_db().await.unwrap();
    let auth = Arc::new(AuthManager::new(db));
    let first = create_wallet_account(&auth, METAMASK_ADDRESS).await;
    let second = create_wallet_account(&auth, OTHER_ADDRESS).await;

    // Two accounts race to claim the same fresh social login
    let a = {
        let auth = auth.clone();
        tokio::spawn(async move {
            auth.link_additional_provider(LinkRequest::social(
                METAMASK_ADDRESS,
                SocialProvider::Google,
                GOOGLE_ID,
            ))
            .await
        })
    };
    let b = {
        let auth = auth.clone();
        tokio::spawn(async move {
            auth.link_additional_provider(LinkRequest::social(
                OTHER_ADDRESS,
                SocialProvider::Google,
                GOOGLE_ID,
            ))
            .await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    for result in &results {
        if let Err(err) = result {
            assert!(matches!(err, AuthError::AlreadyLinked { .. }));
        }
    }

    // The key ended up on exactly one of the two accounts
    let owner = auth
        .find_account_by_any_credential(&format!("social:google:{}", GOOGLE_ID))
        .await
        .unwrap()
        .expect("someone owns the social login");
    assert!(owner.account_id == first || owner.account_id == second);
}
