mod common;

use common::{memory_store, SpyStore, PASSWORD};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use textext_core::{RemoteStore, RepoError, Session, StoreError};

#[tokio::test]
async fn no_session_resolves_to_none() {
    let session = Session::new(memory_store());

    assert!(session.current_user().await.unwrap().is_none());
    assert_eq!(
        session.require_user().await.unwrap_err(),
        RepoError::Unauthenticated
    );
}

#[tokio::test]
async fn concurrent_callers_share_one_resolution() {
    let spy = SpyStore::wrap(memory_store());
    spy.set_account_delay(Duration::from_millis(20));
    let session = Session::new(spy.clone() as Arc<dyn RemoteStore>);

    let (first, second, third) = tokio::join!(
        session.current_user(),
        session.current_user(),
        session.current_user()
    );
    assert!(first.unwrap().is_none());
    assert!(second.unwrap().is_none());
    assert!(third.unwrap().is_none());
    assert_eq!(spy.account_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn register_sign_out_and_sign_in_refresh_the_memo() {
    let session = Session::new(memory_store());
    assert!(session.current_user().await.unwrap().is_none());

    let user = session
        .register("ada@example.com", PASSWORD, "ada")
        .await
        .unwrap();
    assert_eq!(user.username, "ada");
    assert!(user.modules.is_empty());

    let current = session.require_user().await.unwrap();
    assert_eq!(current.account_id, user.account_id);

    session.sign_out().await.unwrap();
    assert!(session.current_user().await.unwrap().is_none());
    session.sign_out().await.unwrap();

    let signed_in = session
        .sign_in("ada@example.com", PASSWORD)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(signed_in.id, user.id);
}

#[tokio::test]
async fn wrong_password_is_a_remote_validation_error() {
    let session = Session::new(memory_store());
    session
        .register("ada@example.com", PASSWORD, "ada")
        .await
        .unwrap();
    session.sign_out().await.unwrap();

    let err = session
        .sign_in("ada@example.com", "not the password")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Store(StoreError::RemoteValidation { ref code, .. })
            if code == "user_invalid_credentials"
    ));
    assert!(session.current_user().await.unwrap().is_none());
}

#[tokio::test]
async fn memo_survives_until_invalidated() {
    let spy = SpyStore::wrap(memory_store());
    let session = Session::new(spy.clone() as Arc<dyn RemoteStore>);
    session
        .register("ada@example.com", PASSWORD, "ada")
        .await
        .unwrap();

    session.current_user().await.unwrap();
    session.current_user().await.unwrap();
    let resolved_once = spy.account_calls.load(Ordering::SeqCst);

    session.invalidate().await;
    session.current_user().await.unwrap();
    assert_eq!(spy.account_calls.load(Ordering::SeqCst), resolved_once + 1);
}

#[tokio::test]
async fn failed_registration_does_not_leave_a_stale_user() {
    let spy = SpyStore::wrap(memory_store());
    let session = Session::new(spy.clone() as Arc<dyn RemoteStore>);
    session
        .register("ada@example.com", PASSWORD, "ada")
        .await
        .unwrap();
    assert_eq!(session.require_user().await.unwrap().username, "ada");

    spy.set_fail_writes(true);
    let err = session
        .register("grace@example.com", PASSWORD, "grace")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Store(StoreError::Network(_))));

    // The store session now belongs to grace, who has no profile yet.
    assert!(session.current_user().await.unwrap().is_none());
}
