//! Token lifecycle tests: issue, verify, kind separation, revocation
//! durability and refresh rotation. These run against the in-memory
//! revocation store and need no external services.

mod common;

use backoffice_service::authz::{Principal, Role};
use backoffice_service::config::JwtConfig;
use backoffice_service::services::{
    InMemoryRevocationStore, RevocationStore, TokenError, TokenKind, TokenService,
};
use std::sync::Arc;

fn test_jwt_config() -> (JwtConfig, (tempfile::NamedTempFile, tempfile::NamedTempFile)) {
    let (private_file, public_file) = common::create_test_keys().unwrap();
    let config = JwtConfig {
        private_key_path: private_file.path().to_str().unwrap().to_string(),
        public_key_path: public_file.path().to_str().unwrap().to_string(),
        access_token_expiry_minutes: 15,
        refresh_token_expiry_days: 7,
    };
    (config, (private_file, public_file))
}

fn manager_principal() -> Principal {
    Principal::new("mgr_1", Role::Manager, Some("est_bellevue".to_string()))
}

#[tokio::test]
async fn issued_pair_verifies_with_matching_kinds() {
    let (config, _keys) = test_jwt_config();
    let store = Arc::new(InMemoryRevocationStore::new());
    let tokens = TokenService::new(&config, store).unwrap();

    let pair = tokens.issue(&manager_principal()).unwrap();
    assert_eq!(pair.token_type, "Bearer");
    assert_eq!(pair.expires_in, 15 * 60);

    let principal = tokens
        .verify(&pair.access_token, TokenKind::Access)
        .await
        .unwrap();
    assert_eq!(principal.user_id, "mgr_1");
    assert_eq!(principal.role, Role::Manager);
    assert_eq!(principal.establishment_id.as_deref(), Some("est_bellevue"));
}

#[tokio::test]
async fn refresh_token_is_never_accepted_as_access_token() {
    let (config, _keys) = test_jwt_config();
    let tokens = TokenService::new(&config, Arc::new(InMemoryRevocationStore::new())).unwrap();

    let pair = tokens.issue(&manager_principal()).unwrap();
    let err = tokens
        .verify(&pair.refresh_token, TokenKind::Access)
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::WrongKind { .. }));
}

#[tokio::test]
async fn revocation_holds_across_service_instances_sharing_a_store() {
    // The store is the durability boundary: a new TokenService (a process
    // restart, as far as verification is concerned) backed by the same
    // store still sees the revocation.
    let (config, _keys) = test_jwt_config();
    let store: Arc<InMemoryRevocationStore> = Arc::new(InMemoryRevocationStore::new());

    let tokens = TokenService::new(&config, store.clone()).unwrap();
    let pair = tokens.issue(&manager_principal()).unwrap();
    tokens.revoke(&pair.access_token).await;

    let restarted = TokenService::new(&config, store.clone()).unwrap();
    let err = restarted
        .verify(&pair.access_token, TokenKind::Access)
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Revoked));

    assert!(store.is_revoked(&pair.access_token).await.unwrap());
}

#[tokio::test]
async fn refresh_rotation_invalidates_the_consumed_token() {
    let (config, _keys) = test_jwt_config();
    let tokens = TokenService::new(&config, Arc::new(InMemoryRevocationStore::new())).unwrap();

    let pair = tokens.issue(&manager_principal()).unwrap();
    let rotated = tokens.refresh(&pair.refresh_token).await.unwrap();

    // New pair works.
    assert!(tokens
        .verify(&rotated.access_token, TokenKind::Access)
        .await
        .is_ok());
    assert!(tokens
        .verify(&rotated.refresh_token, TokenKind::Refresh)
        .await
        .is_ok());

    // Replay of the consumed refresh token is rejected as revoked.
    let err = tokens.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, TokenError::Revoked));
}

#[tokio::test]
async fn revoking_both_tokens_of_a_pair_is_independent() {
    let (config, _keys) = test_jwt_config();
    let store = Arc::new(InMemoryRevocationStore::new());
    let tokens = TokenService::new(&config, store.clone()).unwrap();

    let pair = tokens.issue(&manager_principal()).unwrap();
    tokens.revoke(&pair.refresh_token).await;

    // Access token still valid; refresh token rejected.
    assert!(tokens
        .verify(&pair.access_token, TokenKind::Access)
        .await
        .is_ok());
    assert!(matches!(
        tokens
            .verify(&pair.refresh_token, TokenKind::Refresh)
            .await
            .unwrap_err(),
        TokenError::Revoked
    ));
}

#[tokio::test]
async fn garbage_and_foreign_tokens_are_malformed() {
    let (config, _keys) = test_jwt_config();
    let tokens = TokenService::new(&config, Arc::new(InMemoryRevocationStore::new())).unwrap();

    for garbage in ["", "abc", "a.b.c", "Bearer xyz"] {
        let err = tokens.verify(garbage, TokenKind::Access).await.unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)), "input: {garbage}");
    }
}
