//! Integration tests for session tracking and role resolution.
//!
//! Run with: cargo test -p phonestore-integration-tests --test session_resolution

use std::sync::Arc;

use secrecy::SecretString;

use phonestore_core::{Email, Role};
use phonestore_integration_tests::{
    TestContext, admin_profile, resolver_with_store, wholesale_profile,
};
use phonestore_storefront::backend::{AuthError, AuthProvider};
use phonestore_storefront::models::{AuthEvent, PrivilegedProfile, ResolvedProfile};
use phonestore_storefront::services::resolve_role;
use phonestore_storefront::storage::{FileStore, LocalStore, keys, save_json};

// ============================================================================
// Role priority
// ============================================================================

#[tokio::test]
async fn test_admin_wins_over_wholesale_for_every_identity() {
    let ctx = TestContext::new();

    for n in 0..5 {
        let session = ctx.restore_session(&format!("dual{n}@loja.com"));
        ctx.backend.add_employee(session.identity.id, admin_profile("Ana"));
        ctx.backend
            .add_wholesale_client(session.identity.id, wholesale_profile("Atacado Ana"));

        let resolved = resolve_role(&session.identity, ctx.backend.as_ref())
            .await
            .expect("lookups succeed");

        assert!(matches!(resolved, Some(PrivilegedProfile::Admin(_))));
    }

    // The wholesale lookup never ran
    assert_eq!(ctx.backend.employee_lookups(), 5);
    assert_eq!(ctx.backend.wholesale_lookups(), 0);
}

#[tokio::test]
async fn test_dual_record_identity_resolves_to_admin_and_drops_wholesale_cache() {
    let ctx = TestContext::new();
    let session = ctx.restore_session("gerente@loja.com");
    ctx.backend.add_employee(session.identity.id, admin_profile("Gerente"));
    ctx.backend
        .add_wholesale_client(session.identity.id, wholesale_profile("Gerente Atacado"));
    // Left over from an earlier wholesale resolution
    save_json(
        ctx.store.as_ref(),
        keys::WHOLESALE_PROFILE,
        &wholesale_profile("Antigo"),
    )
    .expect("seed cache");

    let mut resolver = ctx.resolver();
    resolver.initialize().await;

    assert_eq!(resolver.role(), Some(Role::Admin));
    assert!(matches!(resolver.resolved_profile(), ResolvedProfile::Admin(_)));
    assert!(ctx.store.contains(keys::ADMIN_PROFILE));
    assert!(!ctx.store.contains(keys::WHOLESALE_PROFILE));
}

// ============================================================================
// Cache consistency
// ============================================================================

#[tokio::test]
async fn test_caches_follow_each_resolution() {
    let ctx = TestContext::new();
    let session = ctx.restore_session("mudanca@loja.com");
    let id = session.identity.id;
    let mut resolver = ctx.resolver();

    // Wholesale only
    ctx.backend.add_wholesale_client(id, wholesale_profile("Loja Mudanca"));
    resolver.initialize().await;
    assert_eq!(resolver.role(), Some(Role::Wholesale));
    assert!(ctx.store.contains(keys::WHOLESALE_PROFILE));
    assert!(!ctx.store.contains(keys::ADMIN_PROFILE));

    // Promoted to employee
    ctx.backend.add_employee(id, admin_profile("Mudanca"));
    let refreshed = ctx.backend.refresh_session().expect("session exists");
    resolver
        .handle_event(AuthEvent::TokenRefreshed(refreshed))
        .await;
    assert_eq!(resolver.role(), Some(Role::Admin));
    assert!(ctx.store.contains(keys::ADMIN_PROFILE));
    assert!(!ctx.store.contains(keys::WHOLESALE_PROFILE));

    // Signed out
    resolver.handle_event(AuthEvent::SignedOut).await;
    assert_eq!(resolver.resolved_profile(), ResolvedProfile::None);
    assert!(!ctx.store.contains(keys::ADMIN_PROFILE));
    assert!(!ctx.store.contains(keys::WHOLESALE_PROFILE));
}

#[tokio::test]
async fn test_retail_identity_clears_both_caches() {
    let ctx = TestContext::new();
    ctx.restore_session("cliente@gmail.com");
    save_json(ctx.store.as_ref(), keys::ADMIN_PROFILE, &admin_profile("Ex")).expect("seed cache");

    let mut resolver = ctx.resolver();
    assert_eq!(resolver.role(), Some(Role::Admin), "cached profile renders first");
    resolver.initialize().await;

    assert_eq!(resolver.role(), Some(Role::Retail));
    assert!(resolver.retail_customer().is_some());
    assert!(ctx.store.keys().is_empty());
}

#[tokio::test]
async fn test_lookup_failure_keeps_profile_and_session() {
    let ctx = TestContext::new();
    let session = ctx.restore_session("atacado@loja.com");
    ctx.backend
        .add_wholesale_client(session.identity.id, wholesale_profile("Atacado"));
    let mut resolver = ctx.resolver();
    resolver.initialize().await;

    ctx.backend.fail_profile_lookups(true);
    let refreshed = ctx.backend.refresh_session().expect("session exists");
    resolver
        .handle_event(AuthEvent::TokenRefreshed(refreshed))
        .await;

    assert_eq!(resolver.role(), Some(Role::Wholesale));
    assert!(ctx.store.contains(keys::WHOLESALE_PROFILE));
    assert!(resolver.session().is_some());
    assert!(ctx.backend.current_session().is_some());
}

#[tokio::test]
async fn test_lookup_failure_on_first_resolution_is_retail() {
    let ctx = TestContext::new();
    ctx.restore_session("instavel@loja.com");
    ctx.backend.fail_profile_lookups(true);

    let mut resolver = ctx.resolver();
    resolver.initialize().await;

    assert!(!resolver.loading());
    assert_eq!(resolver.role(), Some(Role::Retail));
    assert!(resolver.session().is_some());
}

// ============================================================================
// Initial session check and logout
// ============================================================================

#[tokio::test]
async fn test_initial_session_error_forces_logout() {
    let ctx = TestContext::new();
    ctx.restore_session("corrompido@loja.com");
    save_json(ctx.store.as_ref(), keys::ADMIN_PROFILE, &admin_profile("A")).expect("seed cache");
    save_json(
        ctx.store.as_ref(),
        keys::WHOLESALE_PROFILE,
        &wholesale_profile("W"),
    )
    .expect("seed cache");
    ctx.backend.fail_session_check(true);

    let mut resolver = ctx.resolver();
    assert!(!resolver.loading());
    resolver.initialize().await;

    assert!(!resolver.loading());
    assert_eq!(resolver.resolved_profile(), ResolvedProfile::None);
    assert!(!ctx.store.contains(keys::ADMIN_PROFILE));
    assert!(!ctx.store.contains(keys::WHOLESALE_PROFILE));
    assert!(ctx.backend.current_session().is_none());
    assert_eq!(ctx.backend.employee_lookups(), 0);
}

#[tokio::test]
async fn test_loading_flips_once_after_initial_check() {
    let ctx = TestContext::new();
    let mut resolver = ctx.resolver();
    assert!(resolver.loading());
    assert!(resolver.retail_customer().is_none());

    resolver.initialize().await;
    assert!(!resolver.loading());

    // Later events do not bring loading back
    ctx.restore_session("depois@loja.com");
    let refreshed = ctx.backend.refresh_session().expect("session exists");
    resolver
        .handle_event(AuthEvent::TokenRefreshed(refreshed))
        .await;
    assert!(!resolver.loading());
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let ctx = TestContext::new();
    let session = ctx.restore_session("chefe@loja.com");
    ctx.backend.add_employee(session.identity.id, admin_profile("Chefe"));
    let mut resolver = ctx.resolver();
    resolver.initialize().await;
    assert!(ctx.store.contains(keys::ADMIN_PROFILE));

    resolver.logout().await;

    assert!(resolver.session().is_none());
    assert!(resolver.privileged_profile().is_none());
    assert_eq!(resolver.role(), None);
    assert!(!resolver.loading());
    assert!(ctx.store.keys().is_empty());
    assert!(ctx.backend.current_session().is_none());
}

// ============================================================================
// Sign-in
// ============================================================================

#[tokio::test]
async fn test_sign_in_resolves_through_event_stream() {
    let ctx = TestContext::new();
    let email = Email::parse("novo@loja.com").expect("valid email");
    let identity = ctx
        .backend
        .register_account(&email, "s3nha", serde_json::Map::new());
    ctx.backend
        .add_wholesale_client(identity.id, wholesale_profile("Novo Atacado"));

    let mut resolver = ctx.resolver();
    resolver.initialize().await;
    assert_eq!(resolver.role(), None);

    resolver
        .sign_in(&email, &SecretString::from("s3nha"))
        .await
        .expect("credentials accepted");
    assert!(resolver.next_event().await);

    assert_eq!(resolver.role(), Some(Role::Wholesale));
    assert!(resolver.retail_customer().is_none());
}

#[tokio::test]
async fn test_sign_in_failure_is_unwrapped() {
    let ctx = TestContext::new();
    let email = Email::parse("alguem@loja.com").expect("valid email");
    ctx.backend
        .register_account(&email, "certa", serde_json::Map::new());
    let resolver = ctx.resolver();

    let err = resolver
        .sign_in(&email, &SecretString::from("errada"))
        .await
        .expect_err("wrong password");

    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_teardown_unsubscribes() {
    let ctx = TestContext::new();
    let mut resolver = ctx.resolver();
    resolver.initialize().await;
    resolver.teardown();

    ctx.backend.sign_out().await.expect("sign out");
    assert!(!resolver.next_event().await);
    assert_eq!(resolver.drain_events().await, 0);
}

// ============================================================================
// Durable caches
// ============================================================================

#[tokio::test]
async fn test_cached_profile_survives_restart() {
    let dir = tempfile::tempdir().expect("temp dir");
    let ctx = TestContext::new();
    let session = ctx.restore_session("retorno@loja.com");
    ctx.backend.add_employee(session.identity.id, admin_profile("Retorno"));

    {
        let store: Arc<dyn LocalStore> = Arc::new(FileStore::open(dir.path()).expect("open"));
        let mut resolver = resolver_with_store(&ctx.backend, store);
        resolver.initialize().await;
        assert_eq!(resolver.role(), Some(Role::Admin));
    }

    let store: Arc<dyn LocalStore> = Arc::new(FileStore::open(dir.path()).expect("reopen"));
    let resolver = resolver_with_store(&ctx.backend, store);

    assert!(!resolver.loading());
    assert_eq!(resolver.role(), Some(Role::Admin));
    assert!(resolver.session().is_none());
}
