//! Scenarios 4, 5, and 6 from `SPEC_FULL.md` §8: cross-instance global
//! keys, pattern delete across both tiers, and TTL expiry at level `BOTH`.

mod common;

use serde_json::json;
use tiered_cache::{CacheObject, DeleteOptions, GetOptions, Lookup, Primitive, SetOptions, TierLevel};
use tokio::time::{sleep, Duration};

#[tokio::test]
async fn global_key_is_visible_across_instances_only_with_is_global() {
    let a = common::remote_provider("global-a").await.unwrap();
    let b = common::remote_provider("global-b").await.unwrap();

    a.set_primitive(
        "G",
        Primitive::String("x".to_string()),
        SetOptions { level: Some(TierLevel::REMOTE), is_global: true, ..Default::default() },
    )
    .await
    .unwrap();

    let seen_global = b
        .get_primitive("G", GetOptions { force_remote: true, is_global: true, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(seen_global, Lookup::Present(Primitive::String("x".to_string())));

    let seen_namespaced = b
        .get_primitive("G", GetOptions { force_remote: true, is_global: false, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(seen_namespaced, Lookup::Absent);

    a.delete("G", DeleteOptions { is_global: true, ..Default::default() }).await.unwrap();
    a.dispose().await;
    b.dispose().await;
}

#[tokio::test]
async fn pattern_delete_only_removes_matching_keys_across_both_tiers() {
    let provider = common::remote_provider("pattern").await.unwrap();

    for i in 0..10 {
        provider
            .set_primitive(
                &format!("DEL-{i}::unittest-ME"),
                Primitive::Number(f64::from(i)),
                SetOptions { level: Some(TierLevel::BOTH), is_global: true, ..Default::default() },
            )
            .await
            .unwrap();
    }
    for i in 0..10 {
        provider
            .set_primitive(
                &format!("REMOVE-{i}-ME-{i}"),
                Primitive::Number(f64::from(i)),
                SetOptions { level: Some(TierLevel::BOTH), is_global: true, ..Default::default() },
            )
            .await
            .unwrap();
    }

    provider.delete("*::unittest*", DeleteOptions { is_pattern: true, ..Default::default() }).await.unwrap();
    for i in 0..10 {
        let got = provider
            .get_primitive(
                &format!("REMOVE-{i}-ME-{i}"),
                GetOptions { force_remote: true, is_global: true, ..Default::default() },
            )
            .await
            .unwrap();
        assert!(got.is_present());
    }

    provider.delete("*REMOVE-?-ME-?", DeleteOptions { is_pattern: true, ..Default::default() }).await.unwrap();
    for i in 0..10 {
        let got = provider
            .get_primitive(
                &format!("REMOVE-{i}-ME-{i}"),
                GetOptions { force_remote: true, is_global: true, ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(got, Lookup::Absent);
    }

    provider.dispose().await;
}

#[tokio::test]
async fn ttl_expires_object_from_both_tiers() {
    let provider = common::remote_provider("ttl").await.unwrap();

    let mut obj = CacheObject::new();
    obj.insert("name".to_string(), json!("n"));
    obj.insert("age".to_string(), json!(55));

    provider
        .set_object(
            "O",
            obj,
            SetOptions { duration_secs: 1, level: Some(TierLevel::BOTH), ..Default::default() },
        )
        .await
        .unwrap();

    sleep(Duration::from_millis(1_100)).await;

    let got = provider
        .get_object("O", GetOptions { force_remote: true, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(got, Lookup::Absent);

    provider.dispose().await;
}
