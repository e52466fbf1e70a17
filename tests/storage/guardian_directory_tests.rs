//! GuardianDirectory interface tests.

use uuid::Uuid;

use pickup_tracker::interfaces::GuardianDirectory;

fn guardian_ref() -> String {
    format!("test_guardian_{}", Uuid::new_v4())
}

pub async fn test_unknown_guardian_has_no_token<S: GuardianDirectory>(store: &S) {
    let guardian = guardian_ref();
    assert!(store.push_token(&guardian).await.unwrap().is_none());
}

pub async fn test_register_and_lookup<S: GuardianDirectory>(store: &S) {
    let guardian = guardian_ref();

    store
        .register_push_token(&guardian, "ExponentPushToken[first]")
        .await
        .expect("register should succeed");

    assert_eq!(
        store.push_token(&guardian).await.unwrap().as_deref(),
        Some("ExponentPushToken[first]")
    );
}

pub async fn test_register_replaces_token<S: GuardianDirectory>(store: &S) {
    let guardian = guardian_ref();

    store
        .register_push_token(&guardian, "ExponentPushToken[old]")
        .await
        .unwrap();
    store
        .register_push_token(&guardian, "ExponentPushToken[new]")
        .await
        .expect("re-register should succeed");

    assert_eq!(
        store.push_token(&guardian).await.unwrap().as_deref(),
        Some("ExponentPushToken[new]")
    );
}

/// Run all GuardianDirectory interface tests against an implementation.
#[macro_export]
macro_rules! run_guardian_directory_tests {
    ($store:expr) => {
        use $crate::storage::guardian_directory_tests::*;

        test_unknown_guardian_has_no_token($store).await;
        println!("  test_unknown_guardian_has_no_token: PASSED");

        test_register_and_lookup($store).await;
        println!("  test_register_and_lookup: PASSED");

        test_register_replaces_token($store).await;
        println!("  test_register_replaces_token: PASSED");
    };
}
